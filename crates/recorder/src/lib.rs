//! Segment processing, muxer sink, recorder loop and client event bus for
//! the HLS recording engine: C6 through C9 of the pipeline.

pub mod error;
pub mod events;
pub mod loop_;
pub mod muxer;
pub mod segment;

pub use error::RecorderError;
pub use events::EventBus;
pub use loop_::RecorderLoop;
pub use muxer::MuxerSink;
pub use segment::SegmentProcessor;
