//! Catalog domain models
//!
//! Everything here is fully populated: missing response fields are filled
//! with the defaults below by the mapping layer in [`crate::parse`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Artwork used when a response carries none.
pub const DEFAULT_ARTWORK_URL: &str =
    "https://p2.music.126.net/6y-UleORITEDbvrOLV0Q8A==/5639395138885805.jpg";

pub const UNKNOWN_TITLE: &str = "未知歌曲";
pub const UNKNOWN_ARTIST: &str = "未知歌手";
pub const UNKNOWN_ALBUM: &str = "未知专辑";
pub const UNKNOWN_COLLECTION: &str = "未知歌单";
pub const IMPORTED_COLLECTION: &str = "导入的歌单";

/// Track id meaning "unresolvable".
pub const SENTINEL_TRACK_ID: &str = "0";

/// Returns `true` for ids that must never reach a stream endpoint.
pub fn is_sentinel_id(id: &str) -> bool {
    id.is_empty() || id == SENTINEL_TRACK_ID
}

/// A single entry in a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Provider catalog id. `""` and `"0"` are sentinels.
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub album_name: String,
    pub artwork_url: String,
}

impl Track {
    pub fn is_resolvable(&self) -> bool {
        !is_sentinel_id(&self.id)
    }
}

/// An ordered, immutable list of tracks. Insertion order is playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub tracks: Vec<Track>,
}

impl Collection {
    pub fn new(id: i64, name: impl Into<String>, tracks: Vec<Track>) -> Self {
        Self {
            id,
            name: name.into(),
            tracks,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }
}

/// Where a resolved collection came from.
///
/// Informational only: callers treat all three the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionSource {
    /// Fresh fetch from the catalog
    Network,
    /// Cache hit without touching the network
    Cache,
    /// Network failed after all retries; served from cache
    CacheFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCollection {
    pub collection: Collection,
    pub source: CollectionSource,
}

/// Playable stream for one track.
///
/// Valid when `status_code == 200` or `stream_url` is non-empty; see
/// [`StreamDescriptor::is_valid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub status_code: i64,
    pub message: String,
    pub title: String,
    pub artist_name: String,
    pub album_name: String,
    pub artwork_url: String,
    pub stream_url: String,
    pub bitrate_label: String,
    pub size: String,
    pub lyrics: String,
    pub translated_lyrics: String,
}

impl StreamDescriptor {
    pub fn is_valid(&self) -> bool {
        self.status_code == 200 || !self.stream_url.is_empty()
    }

    /// Stream address with a leading `http://` upgraded to `https://`.
    pub fn secure_stream_url(&self) -> Cow<'_, str> {
        match self.stream_url.strip_prefix("http://") {
            Some(rest) => Cow::Owned(format!("https://{}", rest)),
            None => Cow::Borrowed(&self.stream_url),
        }
    }
}

/// Requested audio quality, substituted into `{level}` endpoint placeholders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    #[default]
    Standard,
    Exhigh,
    Lossless,
    Hires,
    Jyeffect,
    Sky,
    Jymaster,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 7] = [
        QualityLevel::Standard,
        QualityLevel::Exhigh,
        QualityLevel::Lossless,
        QualityLevel::Hires,
        QualityLevel::Jyeffect,
        QualityLevel::Sky,
        QualityLevel::Jymaster,
    ];

    /// Wire value used by stream endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Standard => "standard",
            QualityLevel::Exhigh => "exhigh",
            QualityLevel::Lossless => "lossless",
            QualityLevel::Hires => "hires",
            QualityLevel::Jyeffect => "jyeffect",
            QualityLevel::Sky => "sky",
            QualityLevel::Jymaster => "jymaster",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            QualityLevel::Standard => "Standard",
            QualityLevel::Exhigh => "Extra high",
            QualityLevel::Lossless => "Lossless",
            QualityLevel::Hires => "Hi-Res",
            QualityLevel::Jyeffect => "HD surround",
            QualityLevel::Sky => "Immersive surround",
            QualityLevel::Jymaster => "Master",
        }
    }

    /// Parse a wire value. Unknown values fall back to `Standard`.
    pub fn from_value(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value))
            .unwrap_or_default()
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(status_code: i64, stream_url: &str) -> StreamDescriptor {
        StreamDescriptor {
            status_code,
            stream_url: stream_url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_descriptor_validity() {
        assert!(!descriptor(0, "").is_valid());
        assert!(descriptor(0, "https://cdn/a.mp3").is_valid());
        assert!(descriptor(200, "").is_valid());
        assert!(!descriptor(404, "").is_valid());
    }

    #[test]
    fn test_secure_stream_url() {
        assert_eq!(
            descriptor(200, "http://cdn/a.mp3").secure_stream_url(),
            "https://cdn/a.mp3"
        );
        assert_eq!(
            descriptor(200, "https://cdn/a.mp3").secure_stream_url(),
            "https://cdn/a.mp3"
        );
        assert_eq!(descriptor(200, "").secure_stream_url(), "");
        // only the scheme prefix is rewritten
        assert_eq!(
            descriptor(200, "ftp://x/http://y").secure_stream_url(),
            "ftp://x/http://y"
        );
    }

    #[test]
    fn test_sentinel_ids() {
        assert!(is_sentinel_id(""));
        assert!(is_sentinel_id("0"));
        assert!(!is_sentinel_id("00"));
        assert!(!is_sentinel_id("1234"));
    }

    #[test]
    fn test_quality_level_values() {
        assert_eq!(QualityLevel::default(), QualityLevel::Standard);
        assert_eq!(QualityLevel::from_value("lossless"), QualityLevel::Lossless);
        assert_eq!(QualityLevel::from_value(" JYMASTER "), QualityLevel::Jymaster);
        assert_eq!(QualityLevel::from_value("ultra"), QualityLevel::Standard);
        assert_eq!(QualityLevel::Hires.to_string(), "hires");

        let json = serde_json::to_string(&QualityLevel::Exhigh).unwrap();
        assert_eq!(json, "\"exhigh\"");
    }

    #[test]
    fn test_collection_accessors() {
        let collection = Collection::new(
            7,
            "Mix",
            vec![Track {
                id: "1".into(),
                title: "A".into(),
                artist_name: "B".into(),
                album_name: "C".into(),
                artwork_url: DEFAULT_ARTWORK_URL.into(),
            }],
        );

        assert_eq!(collection.len(), 1);
        assert!(!collection.is_empty());
        assert_eq!(collection.track(0).map(|t| t.title.as_str()), Some("A"));
        assert!(collection.track(1).is_none());
    }
}
