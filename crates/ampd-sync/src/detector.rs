//! Track-change detection.
//!
//! Owns the one piece of cross-snapshot memory in the pipeline: the last
//! track it built.  A detector is created once per session and starts with no
//! previous track, so the first track seen is always reported as changed.  It
//! is never reset afterwards; a reconnect re-sends the same id and must not
//! look like a track change.

use ampd_proto::protocol::StatePayload;
use tracing::debug;

use crate::paths::directory_of;
use crate::track::{CoverUrls, NormalizedTrack};

pub struct TrackChangeDetector {
    covers: CoverUrls,
    previous: Option<NormalizedTrack>,
}

impl TrackChangeDetector {
    pub fn new(covers: CoverUrls) -> Self {
        Self {
            covers,
            previous: None,
        }
    }

    /// Build the normalized track for `payload`.
    ///
    /// Returns `None` when the player has no current track; the previous
    /// track is kept in that case.
    pub fn accept(&mut self, payload: &StatePayload) -> Option<NormalizedTrack> {
        let current = payload.current_track.as_ref()?;

        let changed = match &self.previous {
            None => true,
            Some(prev) => prev.id != current.id,
        };
        if changed {
            debug!(
                "detector: track changed to id={} {:?}",
                current.id, current.file
            );
        }

        let track = NormalizedTrack::from_ref(
            current,
            self.covers.for_file(&current.file),
            directory_of(&current.file),
            payload.server_status.elapsed_time,
            changed,
        );
        self.previous = Some(track.clone());
        Some(track)
    }

    pub fn previous(&self) -> Option<&NormalizedTrack> {
        self.previous.as_ref()
    }
}
