//! Cooperative cancellation token shared across pipeline stages and contexts.

/// Cooperative cancellation handle. Cloning shares the same underlying flag:
/// triggering cancellation through any clone is observed by every other
/// handle derived from it.
pub type CancellationToken = tokio_util::sync::CancellationToken;
