//! Fixture-seeding helpers for tests built on [`facetstore_store::MemoryBackend`].
//!
//! These bypass the transactional `put_transaction` path on purpose:
//! tests exercising `recalculate`, stale-row tolerance, or a
//! partially-populated partition need to put rows directly into the
//! backend without going through a full commit.

use chrono::{DateTime, Utc};
use facetstore_record::Record;
use facetstore_store::MemoryBackend;
use serde::Serialize;

/// Options for seeding one inbound row via [`append_inbound`].
pub struct AppendInboundOptions {
    /// Event type name (embedded in the sort key).
    pub event_type: String,
    /// Sequence this row occupies.
    pub seq: i64,
    /// When the event was recorded (defaults to now).
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Seed a state row for `(facet, id)` at `seq`, encoding `state` as its payload.
pub fn seed_state<T: Serialize>(
    backend: &MemoryBackend,
    facet: &str,
    id: &str,
    seq: i64,
    state: &T,
) -> anyhow::Result<()> {
    let payload = serde_json::to_string(state)?;
    backend.seed(Record::new_state(facet, id, seq, payload, Utc::now()));
    Ok(())
}

/// Seed one inbound event row for `(facet, id)`.
pub fn seed_inbound<E: Serialize>(
    backend: &MemoryBackend,
    facet: &str,
    id: &str,
    options: AppendInboundOptions,
    payload: &E,
) -> anyhow::Result<()> {
    let AppendInboundOptions { event_type, seq, recorded_at } = options;
    let payload = serde_json::to_string(payload)?;
    let ts = recorded_at.unwrap_or_else(Utc::now);
    backend.seed(Record::new_inbound(facet, id, seq, &event_type, payload, ts));
    Ok(())
}

/// Seed a row with a sort key unrecognized by [`facetstore_record::RecordKind`],
/// to exercise a backend's tolerance of stray/foreign rows under a partition.
pub fn seed_stray_row(backend: &MemoryBackend, facet: &str, id: &str, sort_key: &str) {
    let mut row = Record::new_state(facet, id, 0, "{}".to_string(), Utc::now());
    row.sort_key = sort_key.to_string();
    backend.seed(row);
}
