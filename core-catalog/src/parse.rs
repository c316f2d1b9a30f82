//! Tolerant response mapping
//!
//! Catalog and stream providers return loosely-shaped JSON. Every accessor
//! here returns a value or a default, so the rest of the crate only sees
//! fully-populated [`Track`] / [`StreamDescriptor`] records. Numbers and
//! strings are accepted interchangeably for scalar fields.

use serde_json::{Map, Value};

use crate::error::{CatalogError, Result};
use crate::models::{
    Collection, StreamDescriptor, Track, DEFAULT_ARTWORK_URL, SENTINEL_TRACK_ID, UNKNOWN_ALBUM,
    UNKNOWN_ARTIST, UNKNOWN_COLLECTION, UNKNOWN_TITLE,
};

/// Catalog error code meaning "server busy, try later".
const BUSY_CODE: i64 = -447;
const BUSY_MESSAGES: &[&str] = &["服务器忙碌", "请稍后再试"];

/// Stream provider `status` and message text for "data incomplete".
const INCOMPLETE_STATUS: i64 = 400;
const INCOMPLETE_MESSAGE: &str = "信息获取不完整";

/// Read a scalar field as text. Missing, null and non-scalar values yield `default`.
pub(crate) fn text(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

/// Read a scalar field as an integer, accepting numeric strings.
pub(crate) fn int(obj: &Map<String, Value>, key: &str, default: i64) -> i64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

pub(crate) fn object<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

/// First element of a non-empty array field, if it is an object.
pub(crate) fn first_object<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Map<String, Value>> {
    obj.get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object)
}

pub(crate) fn parse_root(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CatalogError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(CatalogError::Parse(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Catalog responses
// ============================================================================

/// Outcome of mapping one catalog response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CatalogPayload {
    /// The server asked us to come back later
    Busy,
    /// A collection, possibly with zero tracks
    Collection(Collection),
}

pub(crate) fn is_busy(root: &Map<String, Value>) -> bool {
    let msg = text(root, "msg", "");
    int(root, "code", 200) == BUSY_CODE || BUSY_MESSAGES.iter().any(|m| msg.contains(m))
}

/// Map a catalog detail response.
///
/// The collection lives at `result.playlist`, or directly at `result`.
/// A missing `result` object is a parse failure.
pub(crate) fn parse_catalog_response(body: &[u8], requested_id: i64) -> Result<CatalogPayload> {
    let root = parse_root(body)?;

    if is_busy(&root) {
        return Ok(CatalogPayload::Busy);
    }

    let result = object(&root, "result")
        .ok_or_else(|| CatalogError::Parse("response has no result object".to_string()))?;
    let playlist = object(result, "playlist").unwrap_or(result);

    let tracks = playlist
        .get("tracks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(catalog_track)
                .collect()
        })
        .unwrap_or_default();

    Ok(CatalogPayload::Collection(Collection::new(
        int(playlist, "id", requested_id),
        text(playlist, "name", UNKNOWN_COLLECTION),
        tracks,
    )))
}

/// Map one catalog track entry.
///
/// Artist comes from `ar[0].name`, else `artists[0].name`. Album name and
/// artwork come from `al`, else `album`.
pub(crate) fn catalog_track(obj: &Map<String, Value>) -> Track {
    let artist_name = first_object(obj, "ar")
        .or_else(|| first_object(obj, "artists"))
        .map(|artist| text(artist, "name", UNKNOWN_ARTIST))
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let album = object(obj, "al").or_else(|| object(obj, "album"));
    let (album_name, artwork_url) = match album {
        Some(album) => (
            text(album, "name", UNKNOWN_ALBUM),
            text(album, "picUrl", DEFAULT_ARTWORK_URL),
        ),
        None => (UNKNOWN_ALBUM.to_string(), DEFAULT_ARTWORK_URL.to_string()),
    };

    Track {
        id: text(obj, "id", SENTINEL_TRACK_ID),
        title: text(obj, "name", UNKNOWN_TITLE),
        artist_name,
        album_name,
        artwork_url,
    }
}

// ============================================================================
// Stream responses
// ============================================================================

pub(crate) fn has_incomplete_marker(body: &[u8]) -> bool {
    let incomplete_status = parse_root(body)
        .map(|root| int(&root, "status", 0) == INCOMPLETE_STATUS)
        .unwrap_or(false);
    incomplete_status || String::from_utf8_lossy(body).contains(INCOMPLETE_MESSAGE)
}

/// Map a stream provider response.
///
/// Two shapes are accepted:
/// - `{"data": [{"songname", "artistname", "albumname", "pic", "url"}]}`,
///   treated as status 200 when the array is non-empty
/// - a flat object with `status, msg, name, ar_name, al_name, pic, url,
///   lyric, tlyric, size, level`
///
/// The caller checks [`StreamDescriptor::is_valid`]; this only maps fields.
pub(crate) fn parse_stream_response(body: &[u8]) -> Result<StreamDescriptor> {
    let root = parse_root(body)?;

    if let Some(items) = root.get("data").and_then(Value::as_array) {
        let Some(entry) = items.first().and_then(Value::as_object) else {
            return Ok(StreamDescriptor::default());
        };
        return Ok(StreamDescriptor {
            status_code: 200,
            title: text(entry, "songname", ""),
            artist_name: text(entry, "artistname", ""),
            album_name: text(entry, "albumname", ""),
            artwork_url: text(entry, "pic", ""),
            stream_url: text(entry, "url", ""),
            ..Default::default()
        });
    }

    Ok(StreamDescriptor {
        status_code: int(&root, "status", 0),
        message: text(&root, "msg", ""),
        title: text(&root, "name", ""),
        artist_name: text(&root, "ar_name", ""),
        album_name: text(&root, "al_name", ""),
        artwork_url: text(&root, "pic", ""),
        stream_url: text(&root, "url", ""),
        bitrate_label: text(&root, "level", ""),
        size: text(&root, "size", ""),
        lyrics: text(&root, "lyric", ""),
        translated_lyrics: text(&root, "tlyric", ""),
    })
}

// ============================================================================
// Search responses
// ============================================================================

/// Map a search response of the form `{"data": [{songid, songname, ...}]}`.
pub(crate) fn parse_search_response(body: &[u8]) -> Result<Vec<Track>> {
    let root = parse_root(body)?;

    Ok(root
        .get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|entry| Track {
                    id: text(entry, "songid", SENTINEL_TRACK_ID),
                    title: text(entry, "songname", UNKNOWN_TITLE),
                    artist_name: text(entry, "artistname", UNKNOWN_ARTIST),
                    album_name: text(entry, "albumname", UNKNOWN_ALBUM),
                    artwork_url: text(entry, "pic", DEFAULT_ARTWORK_URL),
                })
                .collect()
        })
        .unwrap_or_default())
}
