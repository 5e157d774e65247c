//! Facet-level errors.

use thiserror::Error;

/// Errors surfaced by [`crate::Facet`] operations.
///
/// `Concurrency` is pulled up from [`facetstore_store::StoreError`]
/// explicitly rather than relying on the blanket `#[from]` on `Store`,
/// so retry loops can match on it without reaching into the store
/// layer's error type.
#[derive(Debug, Error)]
pub enum FacetError {
    /// The conditional state write lost a race: some other commit
    /// already advanced the sequence past what the caller expected.
    /// Retryable, typically by re-`get`ting and re-`append`ing.
    #[error("concurrent modification: expected seq {expected}, found {actual:?}")]
    Concurrency {
        /// Sequence the caller expected to still hold.
        expected: i64,
        /// Sequence actually found, if any.
        actual: Option<i64>,
    },

    /// Any other store-layer failure (validation, capacity, transport).
    #[error("store error: {0}")]
    Store(facetstore_store::StoreError),

    /// A record's payload could not be decoded into `T`, `IE`, or `OE`.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<facetstore_store::StoreError> for FacetError {
    fn from(err: facetstore_store::StoreError) -> Self {
        match err {
            facetstore_store::StoreError::Concurrency { expected, actual } => {
                FacetError::Concurrency { expected, actual }
            }
            other => FacetError::Store(other),
        }
    }
}

/// Result type for facet operations.
pub type Result<T> = std::result::Result<T, FacetError>;
