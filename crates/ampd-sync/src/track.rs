//! The normalized view of the track the player is on.

use std::sync::OnceLock;

use ampd_proto::protocol::TrackRef;
use regex::Regex;
use serde::Serialize;

static STREAM_URL: OnceLock<Option<Regex>> = OnceLock::new();

/// True when `file` is a web-radio style URL rather than a library path.
pub fn is_stream_url(file: &str) -> bool {
    STREAM_URL
        .get_or_init(|| Regex::new(r"(?i)^(http|https)://").ok())
        .as_ref()
        .map(|re| re.is_match(file))
        .unwrap_or(false)
}

/// Builds cover image URLs against the backend.  No request is made; the
/// result is handed to whatever renders the image.
#[derive(Debug, Clone)]
pub struct CoverUrls {
    base: String,
}

impl CoverUrls {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn for_file(&self, file: &str) -> String {
        format!(
            "{}/api/find-track-cover?path={}",
            self.base,
            urlencoding::encode(file)
        )
    }
}

/// Snapshot of the current track as shown to consumers.
///
/// Built fresh for every accepted snapshot and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTrack {
    pub id: i64,
    pub title: String,
    pub artist_name: String,
    pub album_name: String,
    pub file: String,
    /// Seconds, 0 when unknown.
    pub length: u64,
    pub cover_url: String,
    /// Directory holding the file, empty at the library root.
    pub dir: String,
    pub elapsed: f64,
    pub progress: f64,
    /// Set only on the snapshot where the track identity switched.
    pub changed: bool,
}

impl NormalizedTrack {
    pub(crate) fn from_ref(
        track: &TrackRef,
        cover_url: String,
        dir: String,
        elapsed: f64,
        changed: bool,
    ) -> Self {
        Self {
            id: track.id,
            title: track.title.clone(),
            artist_name: track.artist_name.clone(),
            album_name: track.album_name.clone(),
            file: track.file.clone(),
            length: track.length,
            cover_url,
            dir,
            elapsed,
            progress: elapsed,
            changed,
        }
    }

    /// False for the placeholder the backend reports when nothing usable is
    /// loaded: no file, and artist or title missing.
    pub fn is_real(&self) -> bool {
        (!self.artist_name.is_empty() && !self.title.is_empty()) || !self.file.is_empty()
    }

    pub fn is_stream(&self) -> bool {
        is_stream_url(&self.file)
    }
}
