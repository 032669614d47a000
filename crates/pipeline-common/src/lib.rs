//! # Pipeline Common
//!
//! This crate provides common abstractions for building media processing pipelines.
//! It defines generic traits and implementations that can be used across different
//! types of media processors, including FLV and HLS streams.
//!
//! ## Features
//!
//! - Generic `Processor<T>` trait for processing any type of data
//! - `ChannelPipeline` for running processor stages on their own tasks,
//!   connected by channels
//! - Common error types and context sharing utilities
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

use thiserror::Error;

pub mod cancellation;
pub mod channel_pipeline;
mod context;
pub mod processor;
mod run_completion;
mod utils;

/// Re-export key traits and types
pub use cancellation::CancellationToken;
pub use channel_pipeline::ChannelPipeline;
pub use context::StreamerContext;
pub use processor::Processor;
pub use run_completion::{RunCompletionError, settle_run};
pub use utils::{
    expand_filename_template, expand_path_template, expand_path_template_at, sanitize_filename,
};

/// Common error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{0}")]
    Strategy(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Stage process failed ({stage}): {source}")]
    StageProcess {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Stage finish failed ({stage}): {source}")]
    StageFinish {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
