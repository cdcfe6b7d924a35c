//! User intents → outbound protocol commands.
//!
//! `commands_for` is the pure mapping; `dispatch` sends the result through the
//! channel.  Nothing is buffered or retried: a closed channel is reported to
//! the caller before any command goes out.

use std::sync::Arc;

use ampd_proto::protocol::{ConnectionState, ModesPanel, OutboundCommand};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::channel::ChannelAdapter;
use crate::error::DispatchError;
use crate::paths::relative_to_root;
use crate::track::NormalizedTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Everything a UI can ask the player to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// Jump by the configured step from `from_secs`.  `length_secs` bounds a
    /// forward jump when known (non-zero).
    SeekRelative {
        direction: SeekDirection,
        from_secs: f64,
        length_secs: u64,
    },
    SeekTo(f64),
    AddDirectory(String),
    /// Add a directory and start playing it.
    PlayDirectory(String),
    AddPlaylist(String),
    /// Empty the queue, then ask for the (now empty) listing.
    ClearQueue,
    RefreshQueue,
    /// Start playback after the queue was changed.
    SetPlaying,
    SetModes(ModesPanel),
}

impl Intent {
    /// Seek relative to where `track` currently is.
    pub fn seek_from(track: &NormalizedTrack, direction: SeekDirection) -> Self {
        Intent::SeekRelative {
            direction,
            from_secs: track.elapsed,
            length_secs: track.length,
        }
    }
}

pub struct CommandDispatcher {
    channel: Arc<dyn ChannelAdapter>,
    state_rx: watch::Receiver<ConnectionState>,
    seek_step_secs: u32,
}

impl CommandDispatcher {
    pub fn new(channel: Arc<dyn ChannelAdapter>, seek_step_secs: u32) -> Self {
        let state_rx = channel.connection_state();
        Self {
            channel,
            state_rx,
            seek_step_secs,
        }
    }

    pub fn seek_step_secs(&self) -> u32 {
        self.seek_step_secs
    }

    /// Commands for `intent`, in send order.  May be empty (e.g. a relative
    /// seek with a zero step).
    pub fn commands_for(&self, intent: &Intent) -> Vec<OutboundCommand> {
        match intent {
            Intent::Play | Intent::SetPlaying => vec![OutboundCommand::SetPlay],
            Intent::Pause => vec![OutboundCommand::SetPause],
            Intent::Stop => vec![OutboundCommand::SetStop],
            Intent::Next => vec![OutboundCommand::SetNext],
            Intent::Previous => vec![OutboundCommand::SetPrev],
            Intent::SeekRelative {
                direction,
                from_secs,
                length_secs,
            } => {
                if self.seek_step_secs == 0 {
                    return Vec::new();
                }
                let step = f64::from(self.seek_step_secs);
                let value = match direction {
                    SeekDirection::Backward => (from_secs - step).max(0.0),
                    SeekDirection::Forward if *length_secs > 0 => {
                        (from_secs + step).min(*length_secs as f64)
                    }
                    SeekDirection::Forward => from_secs + step,
                };
                vec![OutboundCommand::SetSeek { value }]
            }
            Intent::SeekTo(secs) => vec![OutboundCommand::SetSeek {
                value: secs.max(0.0),
            }],
            Intent::AddDirectory(dir) => vec![add_dir(dir)],
            Intent::PlayDirectory(dir) => vec![add_dir(dir), OutboundCommand::SetPlay],
            Intent::AddPlaylist(name) => vec![OutboundCommand::AddPlaylist {
                playlist: name.clone(),
            }],
            Intent::ClearQueue => vec![OutboundCommand::RmAll, OutboundCommand::GetQueue],
            Intent::RefreshQueue => vec![OutboundCommand::GetQueue],
            Intent::SetModes(panel) => vec![OutboundCommand::SetControlPanel {
                control_panel: *panel,
            }],
        }
    }

    /// Map `intent` and send the commands in order.  Stops at the first
    /// failure and returns it.
    pub fn dispatch(&self, intent: &Intent) -> Result<(), DispatchError> {
        let state = *self.state_rx.borrow();
        if !state.is_open() {
            warn!("dispatch: {:?} rejected, channel {:?}", intent, state);
            return Err(DispatchError::ChannelClosed(state));
        }
        for command in self.commands_for(intent) {
            debug!("dispatch: sending {}", command.action());
            self.channel.send(&command)?;
        }
        Ok(())
    }
}

fn add_dir(dir: &str) -> OutboundCommand {
    OutboundCommand::AddDir {
        dir: relative_to_root(dir).to_string(),
    }
}
