use ampd_proto::protocol::ConnectionState;

/// A single inbound message that could not be turned into a typed value.
/// The message is dropped; the stream it came from keeps going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Body is not valid JSON.
    #[error("malformed message on {topic}: {reason}")]
    Malformed { topic: String, reason: String },
    /// Valid JSON, but not the shape expected for the topic.
    #[error("unexpected payload shape on {topic}: {reason}")]
    Schema { topic: String, reason: String },
}

impl DecodeError {
    pub fn topic(&self) -> &str {
        match self {
            DecodeError::Malformed { topic, .. } | DecodeError::Schema { topic, .. } => topic,
        }
    }
}

/// Failure to hand a command to the channel.  Never retried here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("channel is not open ({0:?})")]
    ChannelClosed(ConnectionState),
    #[error("failed to send {action}: {reason}")]
    Send {
        action: &'static str,
        reason: String,
    },
}
