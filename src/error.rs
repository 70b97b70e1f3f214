//! Error types for WOS bus operations
//!
//! Every error path emits a log record through the client's dual-sink
//! logger, and the operation also returns a typed `BusError` for callers
//! that want to branch on it.
//! Nothing in this crate panics or aborts the host on a bus failure.

use thiserror::Error;

/// Errors surfaced by [`crate::BusClient`] operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// Operation attempted before a successful connect, or after the
    /// link reached a terminal state.
    #[error("not connected")]
    NotConnected,

    /// Subscribe called with an empty topic filter.
    #[error("empty topic filter")]
    InvalidTopicFilter,

    /// The transport rejected a subscribe request.
    #[error("subscribe failed")]
    SubscribeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The transport rejected a publish request.
    #[error("publish failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}
