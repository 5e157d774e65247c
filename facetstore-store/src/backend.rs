//! Storage port: the interface the facet orchestrator needs from a
//! backend, independent of which one is actually wired in.

use async_trait::async_trait;
use facetstore_record::Record;

use crate::error::Result;

/// A transactional composite-key KV backend, as the facet orchestrator
/// needs to see it.
///
/// Implementations (`MemoryBackend`, and the feature-gated
/// `DynamoDbBackend`) must preserve one property no matter how they are
/// built: `put_transaction` either writes every row or writes none. A
/// loop of individual puts is not a valid implementation of this trait.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Point read of the unique state row for `(facet, id)`.
    ///
    /// Must be a strongly/consistently-read lookup. A stale read here
    /// would let a caller compute `previous_seq` against data that is
    /// already behind, turning every append into a guaranteed conflict.
    async fn get_state(&self, facet: &str, id: &str) -> Result<Option<Record>>;

    /// Range scan of every row under the `(facet, id)` partition,
    /// consistent, in unspecified order (callers needing order, e.g.
    /// `recalculate`'s inbound replay, sort client-side).
    async fn get_records(&self, facet: &str, id: &str) -> Result<Vec<Record>>;

    /// One atomic transactional write: the state row, the new inbound
    /// rows, and the new outbound rows all commit together or not at
    /// all.
    ///
    /// `previous_seq` is the sequence the caller believes the state row
    /// currently holds (`0` for a fresh entity). The backend must accept
    /// the state put only if the row does not yet exist, or its current
    /// sequence equals `previous_seq`; every inbound/outbound row must
    /// not already exist. A violation of either condition surfaces as
    /// [`crate::error::StoreError::Concurrency`].
    async fn put_transaction(
        &self,
        facet: &str,
        state: Record,
        previous_seq: i64,
        inbound: Vec<Record>,
        outbound: Vec<Record>,
    ) -> Result<()>;
}

/// Lets a `Facet` hold a shared handle to its backend (for introspection
/// in tests, or for fanning the same backend out across several facets)
/// without giving up trait-object ergonomics.
#[async_trait]
impl<S: StoreBackend + ?Sized> StoreBackend for std::sync::Arc<S> {
    async fn get_state(&self, facet: &str, id: &str) -> Result<Option<Record>> {
        (**self).get_state(facet, id).await
    }

    async fn get_records(&self, facet: &str, id: &str) -> Result<Vec<Record>> {
        (**self).get_records(facet, id).await
    }

    async fn put_transaction(
        &self,
        facet: &str,
        state: Record,
        previous_seq: i64,
        inbound: Vec<Record>,
        outbound: Vec<Record>,
    ) -> Result<()> {
        (**self).put_transaction(facet, state, previous_seq, inbound, outbound).await
    }
}
