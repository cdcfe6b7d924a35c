use std::sync::Arc;
use std::time::Duration;

use ampd_proto::protocol::{ConnectionState, InboundMessage, OutboundCommand};
use ampd_proto::wire::Frame;
use ampd_sync::{ChannelAdapter, DispatchError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use anyhow::Context;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMMAND_QUEUE: usize = 32;

/// Items on the queue between `TcpChannel` and its background task.
enum Outgoing {
    Command(OutboundCommand),
    /// Answered once everything queued before it has been written.
    Flush(oneshot::Sender<()>),
}

/// `ChannelAdapter` over the length-prefixed TCP bridge.
///
/// A background task owns the socket and reconnects after
/// `reconnect_delay` whenever the connection drops.  Commands are only
/// accepted while the connection is open; anything still pending when it
/// drops is discarded.  Closing the channel writes what is already queued
/// before the socket is released.
pub struct TcpChannel {
    inbound_tx: broadcast::Sender<InboundMessage>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    command_tx: mpsc::Sender<Outgoing>,
    cancel: CancellationToken,
}

impl TcpChannel {
    pub fn spawn(address: String, reconnect_delay: Duration, capacity: usize) -> Self {
        let (inbound_tx, _) = broadcast::channel(capacity.max(1));
        let state_tx = Arc::new(watch::channel(ConnectionState::Connecting).0);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let cancel = CancellationToken::new();

        let link = Link {
            address,
            reconnect_delay,
            inbound_tx: inbound_tx.clone(),
            state_tx: Arc::clone(&state_tx),
            command_rx,
            cancel: cancel.clone(),
        };
        tokio::spawn(link.run());

        Self {
            inbound_tx,
            state_tx,
            command_tx,
            cancel,
        }
    }

    /// Wait until every command accepted so far has been written to the
    /// socket.  Fails if the connection drops first.
    pub async fn flush(&self) -> anyhow::Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command_tx
            .send(Outgoing::Flush(ack_tx))
            .await
            .map_err(|_| anyhow::anyhow!("bridge task has stopped"))?;
        ack_rx
            .await
            .context("connection closed before pending commands were written")
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ChannelAdapter for TcpChannel {
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
        self.command_tx
            .try_send(Outgoing::Command(command.clone()))
            .map_err(|e| DispatchError::Send {
                action: command.action(),
                reason: e.to_string(),
            })
    }
}

/// Background side of `TcpChannel`.
struct Link {
    address: String,
    reconnect_delay: Duration,
    inbound_tx: broadcast::Sender<InboundMessage>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    command_rx: mpsc::Receiver<Outgoing>,
    cancel: CancellationToken,
}

impl Link {
    async fn run(mut self) {
        loop {
            self.state_tx.send_replace(ConnectionState::Connecting);
            let connect = tokio::select! {
                _ = self.cancel.cancelled() => break,
                res = TcpStream::connect(&self.address) => res,
            };

            match connect {
                Ok(stream) => {
                    info!("bridge: connected to {}", self.address);
                    self.state_tx.send_replace(ConnectionState::Open);
                    if let Err(e) = self.session(stream).await {
                        warn!("bridge: connection lost: {}", e);
                    }
                }
                Err(e) => warn!("bridge: connect to {} failed: {}", self.address, e),
            }

            self.state_tx.send_replace(ConnectionState::Closed);
            let mut dropped = 0;
            // Pending flush acks are dropped too, which fails their waiters.
            while let Ok(out) = self.command_rx.try_recv() {
                if matches!(out, Outgoing::Command(_)) {
                    dropped += 1;
                }
            }
            if dropped > 0 {
                warn!("bridge: discarded {} unsent commands", dropped);
            }

            if self.cancel.is_cancelled() {
                break;
            }
            debug!("bridge: reconnecting in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        self.state_tx.send_replace(ConnectionState::Closed);
        info!("bridge: closed");
    }

    /// Pump one connection until it drops or the channel is closed.
    async fn session(&mut self, stream: TcpStream) -> anyhow::Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let mut read_buffer = Vec::with_capacity(4096);
        let mut buf = vec![0u8; 4096];

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    while let Ok(out) = self.command_rx.try_recv() {
                        write_outgoing(&mut writer, out).await?;
                    }
                    writer.flush().await?;
                    return Ok(());
                }

                Some(out) = self.command_rx.recv() => {
                    write_outgoing(&mut writer, out).await?;
                }

                read = reader.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        anyhow::bail!("bridge closed the connection");
                    }
                    read_buffer.extend_from_slice(&buf[..n]);
                    while let Some((frame, consumed)) = Frame::decode(&read_buffer)? {
                        read_buffer.drain(..consumed);
                        match frame {
                            Frame::Inbound(msg) => {
                                // No subscribers is fine.
                                let _ = self.inbound_tx.send(msg);
                            }
                            Frame::Command(cmd) => {
                                debug!("bridge: ignoring echoed command {}", cmd.action());
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn write_outgoing(writer: &mut OwnedWriteHalf, out: Outgoing) -> anyhow::Result<()> {
    match out {
        Outgoing::Command(command) => {
            let encoded = Frame::Command(command).encode()?;
            writer.write_all(&encoded).await?;
        }
        Outgoing::Flush(ack) => {
            writer.flush().await?;
            let _ = ack.send(());
        }
    }
    Ok(())
}
