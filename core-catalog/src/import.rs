//! Import of user-supplied collection JSON
//!
//! Accepts a pasted document in any of these layouts:
//!
//! ```text
//! {"result":   {"id", "name", "tracks": [...]}}
//! {"playlist": {"id", "name", "tracks": [...]}}
//! {"id", "name", "tracks": [...]}
//! ```
//!
//! Track entries follow the catalog rules, plus flat `artist` / `ar_name`
//! strings for hand-written files.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::models::{
    Collection, Track, DEFAULT_ARTWORK_URL, IMPORTED_COLLECTION, SENTINEL_TRACK_ID,
    UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};
use crate::parse::{first_object, int, object, parse_root, text};

/// Parse an imported collection document.
///
/// # Errors
///
/// [`CatalogError::Parse`] when the input is not a JSON object, or when
/// `result` / `playlist` is present but not an object.
pub fn parse_custom_collection(json: &str) -> Result<Collection> {
    let root = parse_root(json.as_bytes())?;

    let body = if root.contains_key("result") {
        object(&root, "result")
            .ok_or_else(|| CatalogError::Parse("\"result\" is not an object".to_string()))?
    } else if root.contains_key("playlist") {
        object(&root, "playlist")
            .ok_or_else(|| CatalogError::Parse("\"playlist\" is not an object".to_string()))?
    } else {
        &root
    };

    let tracks: Vec<Track> = body
        .get("tracks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(imported_track)
                .collect()
        })
        .unwrap_or_default();

    debug!(tracks = tracks.len(), "Parsed imported collection");

    Ok(Collection::new(
        int(body, "id", 0),
        text(body, "name", IMPORTED_COLLECTION),
        tracks,
    ))
}

/// An imported collection is playable when it has at least one track.
pub fn is_playable_collection(collection: &Collection) -> bool {
    !collection.is_empty()
}

fn imported_track(obj: &Map<String, Value>) -> Track {
    let artist_name = first_object(obj, "artists")
        .or_else(|| first_object(obj, "ar"))
        .map(|artist| text(artist, "name", UNKNOWN_ARTIST))
        .or_else(|| obj.get("artist").and_then(Value::as_str).map(str::to_string))
        .or_else(|| obj.get("ar_name").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let album = object(obj, "album").or_else(|| object(obj, "al"));
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
