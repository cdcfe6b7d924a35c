//! Derived-signal publisher: single-owner fan-out of the snapshot stream.
//!
//! One spawned task holds the only inbound subscription to the channel and
//! exclusively owns the deduplicator and the track-change detector.  Every
//! inbound message is decoded once, in delivery order, and the results are
//! written to a set of `watch` channels (latest value) plus a `broadcast`
//! channel of track events (every accepted track, so no `changed` flag is
//! lost to coalescing).
//!
//! Consumers subscribe through `DerivedSignals`.  Subscribing or dropping a
//! receiver never touches the upstream subscription.  `shutdown()` (or
//! dropping the handle) cancels the task, which drops the inbound receiver.
//!
//! Watch signals only notify when the value actually differs, so a snapshot
//! that repeats the mode flags does not wake mode consumers.

use std::sync::Arc;

use ampd_proto::config::Config;
use ampd_proto::protocol::{
    ConnectionState, InboundMessage, ModesPanel, PlayerState, QueueListing, StatePayload,
    QUEUE_TOPIC, STATE_TOPIC,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::channel::ChannelAdapter;
use crate::dedup::SnapshotDeduplicator;
use crate::detector::TrackChangeDetector;
use crate::error::DecodeError;
use crate::stats::SyncStats;
use crate::track::{CoverUrls, NormalizedTrack};
use crate::view::ControlPanelView;

#[derive(Debug, Clone)]
pub struct PublisherOptions {
    pub covers: CoverUrls,
    /// Capacity of the track-event and decode-error broadcast channels.
    pub capacity: usize,
}

impl PublisherOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            covers: CoverUrls::new(&config.backend.base_url),
            capacity: config.sync.channel_capacity.max(1),
        }
    }
}

/// Sending halves of every derived signal.  Shared by the task (writer) and
/// the handle (which only creates receivers).
struct SignalSenders {
    track_events: broadcast::Sender<NormalizedTrack>,
    current_track: watch::Sender<Option<NormalizedTrack>>,
    mode_panel: watch::Sender<ModesPanel>,
    playback_state: watch::Sender<Option<PlayerState>>,
    queue_track_count: watch::Sender<usize>,
    is_current_track_stream: watch::Sender<bool>,
    connection_open: watch::Sender<bool>,
    decode_errors: broadcast::Sender<DecodeError>,
}

impl SignalSenders {
    fn new(capacity: usize) -> Self {
        Self {
            track_events: broadcast::channel(capacity).0,
            current_track: watch::channel(None).0,
            mode_panel: watch::channel(ModesPanel::default()).0,
            playback_state: watch::channel(None).0,
            queue_track_count: watch::channel(0).0,
            is_current_track_stream: watch::channel(false).0,
            connection_open: watch::channel(false).0,
            decode_errors: broadcast::channel(capacity).0,
        }
    }
}

/// Store `value` and notify receivers only if it differs from the current one.
fn set_if_changed<T: PartialEq>(tx: &watch::Sender<T>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    })
}

/// State owned by the publisher task.
struct Publisher {
    dedup: SnapshotDeduplicator,
    detector: TrackChangeDetector,
    signals: Arc<SignalSenders>,
    stats: SyncStats,
}

impl Publisher {
    fn handle_message(&mut self, msg: &InboundMessage) {
        match msg.topic.as_str() {
            STATE_TOPIC => self.handle_state(&msg.body),
            QUEUE_TOPIC => self.handle_queue(&msg.body),
            other => trace!("publisher: ignoring topic {}", other),
        }
    }

    fn handle_state(&mut self, body: &str) {
        match self.dedup.accept(body) {
            Ok(Some(payload)) => self.publish(&payload),
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    fn handle_queue(&mut self, body: &str) {
        let listing: QueueListing = match serde_json::from_str(body) {
            Ok(listing) => listing,
            Err(e) => {
                self.stats.record_malformed();
                let err = if e.is_syntax() || e.is_eof() {
                    DecodeError::Malformed {
                        topic: QUEUE_TOPIC.to_string(),
                        reason: e.to_string(),
                    }
                } else {
                    DecodeError::Schema {
                        topic: QUEUE_TOPIC.to_string(),
                        reason: e.to_string(),
                    }
                };
                self.report(err);
                return;
            }
        };
        self.stats.record_queue_update();
        if set_if_changed(&self.signals.queue_track_count, listing.len()) {
            debug!("publisher: queue has {} tracks", listing.len());
        }
    }

    fn publish(&mut self, payload: &StatePayload) {
        set_if_changed(&self.signals.mode_panel, payload.mode_panel);
        if set_if_changed(
            &self.signals.playback_state,
            Some(payload.server_status.state),
        ) {
            debug!("publisher: player state {}", payload.server_status.state);
        }

        let Some(track) = self.detector.accept(payload) else {
            return;
        };
        if !track.is_real() {
            trace!("publisher: placeholder track id={} filtered", track.id);
            return;
        }

        set_if_changed(&self.signals.is_current_track_stream, track.is_stream());
        // No receivers is fine.
        let _ = self.signals.track_events.send(track.clone());
        self.signals.current_track.send_replace(Some(track));
    }

    fn apply_connection(&self, state: ConnectionState) {
        if set_if_changed(&self.signals.connection_open, state.is_open()) {
            info!("publisher: connection {:?}", state);
        }
    }

    fn report(&self, err: DecodeError) {
        warn!("publisher: dropped message: {}", err);
        let _ = self.signals.decode_errors.send(err);
    }

    async fn run(
        mut self,
        mut inbound: broadcast::Receiver<InboundMessage>,
        mut connection: watch::Receiver<ConnectionState>,
        cancel: CancellationToken,
    ) {
        info!("publisher: started");
        let initial = *connection.borrow_and_update();
        self.apply_connection(initial);
        let mut connection_alive = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("publisher: shutdown requested");
                    break;
                }

                changed = connection.changed(), if connection_alive => match changed {
                    Ok(()) => {
                        let state = *connection.borrow_and_update();
                        self.apply_connection(state);
                    }
                    Err(_) => {
                        connection_alive = false;
                        self.apply_connection(ConnectionState::Closed);
                    }
                },

                msg = inbound.recv() => match msg {
                    Ok(msg) => self.handle_message(&msg),
                    Err(RecvError::Lagged(n)) => {
                        warn!("publisher: missed {} inbound messages", n);
                    }
                    Err(RecvError::Closed) => {
                        info!("publisher: inbound channel closed");
                        break;
                    }
                },
            }
        }

        self.apply_connection(ConnectionState::Closed);
        info!("publisher: stopped");
    }
}

/// Subscribe to `channel` once and start the publisher task.
///
/// Must be called from within a tokio runtime.  The inbound subscription is
/// taken before this returns, so messages delivered afterwards are not lost.
pub fn spawn_publisher(channel: &dyn ChannelAdapter, options: PublisherOptions) -> DerivedSignals {
    let signals = Arc::new(SignalSenders::new(options.capacity.max(1)));
    let stats = SyncStats::new();
    let cancel = CancellationToken::new();

    let publisher = Publisher {
        dedup: SnapshotDeduplicator::new(stats.clone()),
        detector: TrackChangeDetector::new(options.covers),
        signals: Arc::clone(&signals),
        stats: stats.clone(),
    };
    let task = tokio::spawn(publisher.run(
        channel.subscribe(),
        channel.connection_state(),
        cancel.clone(),
    ));

    DerivedSignals {
        signals,
        stats,
        cancel,
        task: Some(task),
    }
}

/// Consumer-side handle to the derived signals.
pub struct DerivedSignals {
    signals: Arc<SignalSenders>,
    stats: SyncStats,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DerivedSignals {
    /// Latest real track; `None` until the first one arrives.
    pub fn current_track(&self) -> watch::Receiver<Option<NormalizedTrack>> {
        self.signals.current_track.subscribe()
    }

    /// Every accepted real track, in order.
    pub fn track_events(&self) -> broadcast::Receiver<NormalizedTrack> {
        self.signals.track_events.subscribe()
    }

    pub fn mode_panel(&self) -> watch::Receiver<ModesPanel> {
        self.signals.mode_panel.subscribe()
    }

    pub fn playback_state(&self) -> watch::Receiver<Option<PlayerState>> {
        self.signals.playback_state.subscribe()
    }

    pub fn queue_track_count(&self) -> watch::Receiver<usize> {
        self.signals.queue_track_count.subscribe()
    }

    pub fn is_current_track_stream(&self) -> watch::Receiver<bool> {
        self.signals.is_current_track_stream.subscribe()
    }

    pub fn connection_open(&self) -> watch::Receiver<bool> {
        self.signals.connection_open.subscribe()
    }

    pub fn decode_errors(&self) -> broadcast::Receiver<DecodeError> {
        self.signals.decode_errors.subscribe()
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Control-panel affordances from the current signal values.
    pub fn control_panel(&self, seek_step_secs: u32) -> ControlPanelView {
        ControlPanelView::derive(
            *self.signals.playback_state.borrow(),
            *self.signals.is_current_track_stream.borrow(),
            *self.signals.queue_track_count.borrow(),
            *self.signals.connection_open.borrow(),
            seek_step_secs,
        )
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait until it has released the inbound subscription.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("publisher: task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for DerivedSignals {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
