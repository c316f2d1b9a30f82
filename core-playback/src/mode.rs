//! Play mode and the next/previous index policy

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the queue advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    #[default]
    Sequential,
    Random,
    SingleLoop,
}

impl PlayMode {
    pub const ALL: [PlayMode; 3] = [PlayMode::Sequential, PlayMode::Random, PlayMode::SingleLoop];

    /// Stable numeric code used by hosts that persist the mode.
    pub fn code(&self) -> i32 {
        match self {
            PlayMode::Sequential => 0,
            PlayMode::Random => 1,
            PlayMode::SingleLoop => 2,
        }
    }

    /// Unknown codes fall back to [`PlayMode::Sequential`].
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => PlayMode::Random,
            2 => PlayMode::SingleLoop,
            _ => PlayMode::Sequential,
        }
    }

    /// Label shown to listeners.
    pub fn description(&self) -> &'static str {
        match self {
            PlayMode::Sequential => "顺序播放",
            PlayMode::Random => "随机播放",
            PlayMode::SingleLoop => "单曲循环",
        }
    }

    /// Index to play after `current` in a queue of `total` tracks.
    ///
    /// - Sequential: `(current + 1) % total`
    /// - SingleLoop: `current`
    /// - Random: uniform over `[0, total)` excluding `current`, or `current`
    ///   when `total <= 1`
    ///
    /// An empty queue yields `current`.
    pub fn next_index(&self, current: usize, total: usize) -> usize {
        if total == 0 {
            return current;
        }
        match self {
            PlayMode::Sequential => (current + 1) % total,
            PlayMode::Random => random_other(current, total),
            PlayMode::SingleLoop => current,
        }
    }

    /// Index to play before `current`. Random picks like [`next_index`](Self::next_index).
    pub fn previous_index(&self, current: usize, total: usize) -> usize {
        if total == 0 {
            return current;
        }
        match self {
            PlayMode::Sequential => (current % total + total - 1) % total,
            PlayMode::Random => random_other(current, total),
            PlayMode::SingleLoop => current,
        }
    }
}

/// Resample until the pick differs from `current`.
fn random_other(current: usize, total: usize) -> usize {
    if total <= 1 {
        return current;
    }
    let mut rng = rand::thread_rng();
    loop {
        let candidate = rng.gen_range(0..total);
        if candidate != current {
            return candidate;
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayMode::Sequential => "Sequential",
            PlayMode::Random => "Random",
            PlayMode::SingleLoop => "SingleLoop",
        };
        f.write_str(name)
    }
}
