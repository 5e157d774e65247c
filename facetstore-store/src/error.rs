//! Store layer errors

use thiserror::Error;

/// The per-transaction item ceiling honored by the adapter, matching the
/// DynamoDB-compatible backend's own hard limit.
pub const MAX_TRANSACTION_ITEMS: usize = 25;

/// Errors that can occur in the storage layer.
///
/// `Validation` and `Capacity` are programmer errors raised before any
/// backend call is dispatched. `Concurrency` is the one retryable kind;
/// callers pattern-match on it to decide whether to retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record in the transaction did not satisfy its structural/facet
    /// check (wrong kind at the wrong slot, or carrying a foreign facet).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The transaction would exceed the backend's per-transaction item
    /// ceiling.
    #[error("transaction too large: {len} items exceeds the limit of {max}")]
    Capacity {
        /// Items the caller tried to write.
        len: usize,
        /// The ceiling honored by this backend.
        max: usize,
    },

    /// The conditional state write failed: some other commit already
    /// advanced the sequence past what the caller expected.
    #[error("concurrent modification: expected seq {expected}, found {actual:?}")]
    Concurrency {
        /// Sequence the caller expected to still hold.
        expected: i64,
        /// Sequence actually found (`None` if the row vanished, which
        /// should not happen under normal operation).
        actual: Option<i64>,
    },

    /// Any other backend/transport failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// A record's payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage layer operations.
pub type Result<T> = std::result::Result<T, StoreError>;
