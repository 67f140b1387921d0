//! Error types for the queue engine and its stores.
//!
//! The engine surfaces a small, typed error set. Store adapters attach
//! human-readable context with [`anyhow::Context`] and wrap the result in
//! [`Error::Store`], so callers see a single persistence-failure variant with
//! the full cause chain preserved.

/// Result type for queue and store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the queue engine and store adapters.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The queue has been closed; no further operations are accepted.
    #[error("queue is closed")]
    Closed,

    /// `init` was called more than once on the same queue.
    #[error("queue already initialized")]
    AlreadyInitialized,

    /// A non-blocking dequeue found nothing ready.
    #[error("no items ready")]
    NoItems,

    /// The overflow tier holds no items. Internal to the promotion path;
    /// the engine API never returns this.
    #[error("no overflow items")]
    NoOverflowItems,

    /// The underlying store failed (I/O, corruption, closed handle).
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl Error {
    /// Wrap a store-level failure, preserving its cause chain.
    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::Store(err.into())
    }

    /// True if this error means the queue was shut down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
