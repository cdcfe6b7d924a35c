//! Client-side state sync for the player backend.
//!
//! Inbound snapshots from a `ChannelAdapter` are decoded once, deduplicated,
//! checked for track changes and fanned out as derived signals.  User intents
//! go the other way through `CommandDispatcher`.

pub mod channel;
pub mod dedup;
pub mod detector;
pub mod dispatcher;
pub mod error;
pub mod paths;
pub mod publisher;
pub mod stats;
pub mod track;
pub mod view;

pub use channel::{ChannelAdapter, LoopbackChannel};
pub use dedup::{deduplicate, SnapshotDeduplicator};
pub use detector::TrackChangeDetector;
pub use dispatcher::{CommandDispatcher, Intent, SeekDirection};
pub use error::{DecodeError, DispatchError};
pub use publisher::{spawn_publisher, DerivedSignals, PublisherOptions};
pub use stats::{StatsReport, SyncStats};
pub use track::{is_stream_url, CoverUrls, NormalizedTrack};
pub use view::ControlPanelView;
