//! Generic processing stage trait shared by [`crate::Pipeline`] and
//! [`crate::ChannelPipeline`].

use std::sync::Arc;

use crate::{PipelineError, StreamerContext};

/// A single stage in a processing pipeline.
///
/// A processor consumes one `T` at a time and may emit zero or more `T`s
/// through `output` (a stage can split, merge or filter). `finish` runs once
/// after the input is exhausted, giving the stage a chance to flush buffered
/// state.
pub trait Processor<T>: Send {
    /// Stable name used in error messages and progress logs.
    fn name(&self) -> &'static str;

    fn process(
        &mut self,
        context: &Arc<StreamerContext>,
        input: T,
        output: &mut dyn FnMut(T) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError>;

    fn finish(
        &mut self,
        context: &Arc<StreamerContext>,
        output: &mut dyn FnMut(T) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError>;
}
