//! In-memory backend implementation.
//!
//! Used for tests, `facetstore-testkit` fixtures, and the demo binary.
//! A single `RwLock` write guard covers the whole commit, which gives
//! the same all-or-nothing, checked-then-acted semantics a real
//! transactional backend provides without any network round trip.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use facetstore_record::{partition_key, Record, STATE_SORT_KEY};
use tracing::debug;

use crate::backend::StoreBackend;
use crate::error::{Result, StoreError};
use crate::validate::validate_transaction;

/// In-memory `StoreBackend`, keyed by partition then sort key.
#[derive(Default)]
pub struct MemoryBackend {
    partitions: RwLock<HashMap<String, HashMap<String, Record>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing the conditional-write checks.
    ///
    /// Intended for test fixtures that need to pre-populate a partition
    /// (e.g. a recalculate test's cached state plus prior inbound rows)
    /// without going through a commit.
    pub fn seed(&self, record: Record) {
        let mut partitions = self.partitions.write().unwrap();
        partitions.entry(record.partition_key.clone()).or_default().insert(record.sort_key.clone(), record);
    }

    /// Total row count across every partition (test introspection).
    pub fn row_count(&self) -> usize {
        self.partitions.read().unwrap().values().map(|p| p.len()).sum()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn get_state(&self, facet: &str, id: &str) -> Result<Option<Record>> {
        let partitions = self.partitions.read().unwrap();
        Ok(partitions
            .get(&partition_key(facet, id))
            .and_then(|p| p.get(STATE_SORT_KEY))
            .cloned())
    }

    async fn get_records(&self, facet: &str, id: &str) -> Result<Vec<Record>> {
        let partitions = self.partitions.read().unwrap();
        Ok(partitions.get(&partition_key(facet, id)).map(|p| p.values().cloned().collect()).unwrap_or_default())
    }

    async fn put_transaction(
        &self,
        facet: &str,
        state: Record,
        previous_seq: i64,
        inbound: Vec<Record>,
        outbound: Vec<Record>,
    ) -> Result<()> {
        validate_transaction(facet, &state, &inbound, &outbound)?;

        let mut partitions = self.partitions.write().unwrap();
        let partition = partitions.entry(state.partition_key.clone()).or_default();

        // Condition on the state row: attribute_not_exists OR seq == previous_seq.
        if let Some(existing) = partition.get(STATE_SORT_KEY) {
            if existing.sequence != previous_seq {
                return Err(StoreError::Concurrency {
                    expected: previous_seq,
                    actual: Some(existing.sequence),
                });
            }
        }

        // Condition on every inbound/outbound row: attribute_not_exists.
        for r in inbound.iter().chain(outbound.iter()) {
            if partition.contains_key(&r.sort_key) {
                return Err(StoreError::Concurrency { expected: previous_seq, actual: None });
            }
        }

        debug!(
            %facet,
            partition = %state.partition_key,
            seq = state.sequence,
            inbound = inbound.len(),
            outbound = outbound.len(),
            "committing transaction"
        );

        partition.insert(STATE_SORT_KEY.to_string(), state);
        for r in inbound {
            partition.insert(r.sort_key.clone(), r);
        }
        for r in outbound {
            partition.insert(r.sort_key.clone(), r);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn get_state_on_empty_partition_is_none() {
        let backend = MemoryBackend::new();
        assert!(backend.get_state("widget", "abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_then_read_back() {
        let backend = MemoryBackend::new();
        let state = Record::new_state("widget", "abc", 1, "{\"a\":1}".into(), Utc::now());
        let inbound = vec![Record::new_inbound("widget", "abc", 1, "T", "{}".into(), Utc::now())];
        backend.put_transaction("widget", state, 0, inbound, vec![]).await.unwrap();

        let got = backend.get_state("widget", "abc").await.unwrap().unwrap();
        assert_eq!(got.sequence, 1);
        let records = backend.get_records("widget", "abc").await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn stale_previous_seq_is_a_concurrency_error() {
        let backend = MemoryBackend::new();
        let state = Record::new_state("widget", "abc", 1, "{}".into(), Utc::now());
        backend.put_transaction("widget", state, 0, vec![], vec![]).await.unwrap();

        let next = Record::new_state("widget", "abc", 2, "{}".into(), Utc::now());
        // Caller thinks previous_seq is still 0, but it's already 1.
        let err = backend.put_transaction("widget", next, 0, vec![], vec![]).await.unwrap_err();
        match err {
            StoreError::Concurrency { expected, actual } => {
                assert_eq!(expected, 0);
                assert_eq!(actual, Some(1));
            }
            other => panic!("expected Concurrency, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_inbound_sequence_is_rejected() {
        let backend = MemoryBackend::new();
        let inbound = Record::new_inbound("widget", "abc", 1, "T", "{}".into(), Utc::now());
        backend.seed(inbound.clone());

        let state = Record::new_state("widget", "abc", 1, "{}".into(), Utc::now());
        let err =
            backend.put_transaction("widget", state, 0, vec![inbound], vec![]).await.unwrap_err();
        assert!(matches!(err, StoreError::Concurrency { .. }));
    }

    #[tokio::test]
    async fn failed_commit_writes_nothing() {
        let backend = MemoryBackend::new();
        let state = Record::new_state("widget", "abc", 1, "{}".into(), Utc::now());
        backend.put_transaction("widget", state, 0, vec![], vec![]).await.unwrap();

        let conflicting = Record::new_state("widget", "abc", 2, "{}".into(), Utc::now());
        let inbound = vec![Record::new_inbound("widget", "abc", 2, "T", "{}".into(), Utc::now())];
        assert!(backend
            .put_transaction("widget", conflicting, 0, inbound, vec![])
            .await
            .is_err());

        // Only the original STATE row and nothing else should be present.
        assert_eq!(backend.row_count(), 1);
        let got = backend.get_state("widget", "abc").await.unwrap().unwrap();
        assert_eq!(got.sequence, 1);
    }
}
