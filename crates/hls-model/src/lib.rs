//! Shared data model for the HLS recording pipeline.
//!
//! Types here are owned by no single crate: the playlist fetcher/processor
//! produce [`SegmentDescriptor`]s, the recorder consumes them and drives
//! [`RecorderState`], and lifecycle transitions are reported as
//! [`LifecycleEvent`]s to anything subscribed on the event bus.

pub mod config;
pub mod events;
pub mod filler;
pub mod key;
pub mod playlist_state;
pub mod recorder_state;
pub mod segment;

pub use config::RecorderConfig;
pub use events::{LifecycleEvent, StopReason};
pub use filler::is_filler_uri;
pub use key::EncryptionInfo;
pub use playlist_state::PlaylistState;
pub use recorder_state::{RecorderId, RecorderState};
pub use segment::SegmentDescriptor;
