//! Combined affordances for the player control panel.

use ampd_proto::protocol::PlayerState;

/// Which controls make sense right now, derived from several signals at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlPanelView {
    /// Transport buttons usable at all.
    pub controls_enabled: bool,
    /// Track info only exists for library tracks that are loaded.
    pub show_track_info: bool,
    /// Relative seek needs a step and a seekable (non-stream) source.
    pub show_seek_buttons: bool,
    pub can_clear_queue: bool,
}

impl ControlPanelView {
    pub fn derive(
        playback_state: Option<PlayerState>,
        is_stream: bool,
        queue_track_count: usize,
        connected: bool,
        seek_step_secs: u32,
    ) -> Self {
        let loaded = playback_state.map(|s| s.is_active()).unwrap_or(false);
        Self {
            controls_enabled: connected,
            show_track_info: loaded && !is_stream,
            show_seek_buttons: seek_step_secs > 0 && !is_stream,
            can_clear_queue: connected && queue_track_count > 0,
        }
    }
}
