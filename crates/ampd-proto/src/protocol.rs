use serde::{Deserialize, Serialize};

/// Topic carrying the periodic player snapshot (`StatePayload`).
pub const STATE_TOPIC: &str = "/topic/state";

/// Topic carrying the queue listing (JSON array of `TrackRef`).
pub const QUEUE_TOPIC: &str = "/topic/queue";

/// One message as delivered by the pub/sub channel.  The body is kept as raw
/// text; decoding is the consumer's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub body: String,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
        }
    }

    pub fn state(body: impl Into<String>) -> Self {
        Self::new(STATE_TOPIC, body)
    }

    pub fn queue(body: impl Into<String>) -> Self {
        Self::new(QUEUE_TOPIC, body)
    }
}

/// Commands sent from the client to the backend.
///
/// Serialized as `{"type": "ADD_DIR", "payload": {"dir": "..."}}`; unit
/// commands carry no payload.  The action names are stable protocol constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundCommand {
    SetPlay,
    SetPause,
    SetStop,
    SetNext,
    SetPrev,
    SetSeek {
        value: f64,
    },
    SetControlPanel {
        #[serde(rename = "controlPanel")]
        control_panel: ModesPanel,
    },
    RmAll,
    GetQueue,
    AddDir {
        dir: String,
    },
    AddPlaylist {
        playlist: String,
    },
}

impl OutboundCommand {
    /// Protocol action name, as it appears in the `type` field.
    pub fn action(&self) -> &'static str {
        match self {
            OutboundCommand::SetPlay => "SET_PLAY",
            OutboundCommand::SetPause => "SET_PAUSE",
            OutboundCommand::SetStop => "SET_STOP",
            OutboundCommand::SetNext => "SET_NEXT",
            OutboundCommand::SetPrev => "SET_PREV",
            OutboundCommand::SetSeek { .. } => "SET_SEEK",
            OutboundCommand::SetControlPanel { .. } => "SET_CONTROL_PANEL",
            OutboundCommand::RmAll => "RM_ALL",
            OutboundCommand::GetQueue => "GET_QUEUE",
            OutboundCommand::AddDir { .. } => "ADD_DIR",
            OutboundCommand::AddPlaylist { .. } => "ADD_PLAYLIST",
        }
    }
}

/// Player state as reported in `serverStatus.state`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Play,
    Pause,
    Stop,
}

impl PlayerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerState::Play => "play",
            PlayerState::Pause => "pause",
            PlayerState::Stop => "stop",
        }
    }

    /// True while a track is loaded (playing or paused).
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Play | PlayerState::Pause)
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status of the pub/sub channel, owned by the transport.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        *self == ConnectionState::Open
    }
}

/// The five mode toggles of the player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ModesPanel {
    pub random: bool,
    pub consume: bool,
    pub single: bool,
    pub crossfade: bool,
    pub repeat: bool,
}

/// Names a single flag of `ModesPanel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Random,
    Consume,
    Single,
    Crossfade,
    Repeat,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Mode::Random),
            "consume" => Ok(Mode::Consume),
            "single" => Ok(Mode::Single),
            "crossfade" => Ok(Mode::Crossfade),
            "repeat" => Ok(Mode::Repeat),
            other => anyhow::bail!("Unknown mode: {}", other),
        }
    }
}

impl ModesPanel {
    pub fn get(&self, mode: Mode) -> bool {
        match mode {
            Mode::Random => self.random,
            Mode::Consume => self.consume,
            Mode::Single => self.single,
            Mode::Crossfade => self.crossfade,
            Mode::Repeat => self.repeat,
        }
    }

    /// Copy of this panel with one flag flipped.
    pub fn toggled(mut self, mode: Mode) -> Self {
        let flag = match mode {
            Mode::Random => &mut self.random,
            Mode::Consume => &mut self.consume,
            Mode::Single => &mut self.single,
            Mode::Crossfade => &mut self.crossfade,
            Mode::Repeat => &mut self.repeat,
        };
        *flag = !*flag;
        self
    }
}

/// `serverStatus` block of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub state: PlayerState,
    /// Seconds into the current track.
    pub elapsed_time: f64,
}

/// A playable item as known to the backend.  `id` is the identity; everything
/// else is descriptive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "artist")]
    pub artist_name: String,
    #[serde(default)]
    pub album_name: String,
    #[serde(default)]
    pub file: String,
    /// Track length in seconds, 0 when unknown (streams).
    #[serde(default)]
    pub length: u64,
}

/// Full player snapshot pushed on `STATE_TOPIC`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    #[serde(default)]
    pub current_track: Option<TrackRef>,
    pub server_status: ServerStatus,
    #[serde(rename = "mpdModesPanelMsg", alias = "modePanel")]
    pub mode_panel: ModesPanel,
}

/// Queue listing pushed on `QUEUE_TOPIC`.
pub type QueueListing = Vec<TrackRef>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dir_wire_format() {
        let cmd = OutboundCommand::AddDir {
            dir: "Music/Jazz".to_string(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "ADD_DIR", "payload": {"dir": "Music/Jazz"}})
        );
        assert_eq!(cmd.action(), "ADD_DIR");
    }

    #[test]
    fn test_unit_command_has_no_payload() {
        let json = serde_json::to_value(OutboundCommand::RmAll).unwrap();
        assert_eq!(json, serde_json::json!({"type": "RM_ALL"}));
    }

    #[test]
    fn test_control_panel_payload_key() {
        let cmd = OutboundCommand::SetControlPanel {
            control_panel: ModesPanel {
                random: true,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "SET_CONTROL_PANEL");
        assert_eq!(json["payload"]["controlPanel"]["random"], true);
        assert_eq!(json["payload"]["controlPanel"]["repeat"], false);
    }

    #[test]
    fn test_state_payload_from_backend_json() {
        let body = r#"{
            "serverStatus": {"state": "play", "elapsedTime": 42},
            "currentTrack": {"id": 7, "title": "So What", "artistName": "Miles Davis",
                             "file": "Jazz/Miles/So What.flac", "length": 545},
            "mpdModesPanelMsg": {"random": true, "consume": false, "single": false,
                                 "crossfade": false, "repeat": true}
        }"#;
        let payload: StatePayload = serde_json::from_str(body).unwrap();
        let track = payload.current_track.unwrap();
        assert_eq!(track.id, 7);
        assert_eq!(track.artist_name, "Miles Davis");
        assert_eq!(payload.server_status.state, PlayerState::Play);
        assert_eq!(payload.server_status.elapsed_time, 42.0);
        assert!(payload.mode_panel.random && payload.mode_panel.repeat);
    }

    #[test]
    fn test_state_payload_null_track_and_alias() {
        let body = r#"{
            "serverStatus": {"state": "stop", "elapsedTime": 0},
            "currentTrack": null,
            "modePanel": {"random": false, "consume": false, "single": false,
                          "crossfade": false, "repeat": false}
        }"#;
        let payload: StatePayload = serde_json::from_str(body).unwrap();
        assert!(payload.current_track.is_none());
        assert_eq!(payload.mode_panel, ModesPanel::default());
    }

    #[test]
    fn test_unknown_player_state_rejected() {
        let body = r#"{
            "serverStatus": {"state": "rewinding", "elapsedTime": 0},
            "mpdModesPanelMsg": {"random": false, "consume": false, "single": false,
                                 "crossfade": false, "repeat": false}
        }"#;
        assert!(serde_json::from_str::<StatePayload>(body).is_err());
    }

    #[test]
    fn test_modes_toggle() {
        let panel = ModesPanel::default().toggled(Mode::Single);
        assert!(panel.get(Mode::Single));
        assert!(!panel.toggled(Mode::Single).get(Mode::Single));
        assert_eq!("Repeat".parse::<Mode>().unwrap(), Mode::Repeat);
        assert!("shuffle".parse::<Mode>().is_err());
    }
}
