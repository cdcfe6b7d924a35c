//! Contract between the core and the pub/sub transport.
//!
//! The transport owns the connection: it delivers inbound messages tagged with
//! their topic, publishes its `ConnectionState`, and accepts outbound commands.
//! `LoopbackChannel` is an in-process implementation used for tests and for
//! driving the core without a network.

use std::sync::Mutex;

use ampd_proto::protocol::{ConnectionState, InboundMessage, OutboundCommand};
use tokio::sync::{broadcast, watch};

use crate::error::DispatchError;

pub trait ChannelAdapter: Send + Sync {
    /// New receiver for every inbound message, in delivery order.
    fn subscribe(&self) -> broadcast::Receiver<InboundMessage>;

    /// Current and future connection states.
    fn connection_state(&self) -> watch::Receiver<ConnectionState>;

    /// Hand one command to the transport.  Must not block and must not queue
    /// while disconnected.
    fn send(&self, command: &OutboundCommand) -> Result<(), DispatchError>;
}

pub struct LoopbackChannel {
    inbound_tx: broadcast::Sender<InboundMessage>,
    state_tx: watch::Sender<ConnectionState>,
    sent: Mutex<Vec<OutboundCommand>>,
}

impl LoopbackChannel {
    pub fn new(capacity: usize) -> Self {
        let (inbound_tx, _) = broadcast::channel(capacity);
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            inbound_tx,
            state_tx,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Deliver a message to every subscriber.  Returns how many received it.
    pub fn deliver(&self, message: InboundMessage) -> usize {
        self.inbound_tx.send(message).unwrap_or(0)
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    /// Commands accepted so far, oldest first.
    pub fn sent(&self) -> Vec<OutboundCommand> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of live inbound subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inbound_tx.receiver_count()
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChannelAdapter for LoopbackChannel {
    fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound_tx.subscribe()
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn send(&self, command: &OutboundCommand) -> Result<(), DispatchError> {
        let state = *self.state_tx.borrow();
        if !state.is_open() {
            return Err(DispatchError::ChannelClosed(state));
        }
        let mut sent = self.sent.lock().map_err(|e| DispatchError::Send {
            action: command.action(),
            reason: e.to_string(),
        })?;
        sent.push(command.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_requires_open_state() {
        let channel = LoopbackChannel::default();
        assert_eq!(
            channel.send(&OutboundCommand::SetPlay),
            Err(DispatchError::ChannelClosed(ConnectionState::Connecting))
        );
        channel.set_state(ConnectionState::Open);
        channel.send(&OutboundCommand::SetPlay).unwrap();
        assert_eq!(channel.sent(), vec![OutboundCommand::SetPlay]);
    }

    #[test]
    fn test_deliver_without_subscribers() {
        let channel = LoopbackChannel::default();
        assert_eq!(channel.deliver(InboundMessage::state("{}")), 0);
        let _rx = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(channel.deliver(InboundMessage::state("{}")), 1);
    }
}
