//! Record Model for the Facet Event Store
//!
//! A `Record` is one row as it would sit in a composite-key KV backend:
//! a partition key, a sort key, and a handful of denormalized attributes.
//! The sort key's prefix discriminates the row's kind (state, inbound
//! event, outbound event) so a partition range-scan can be filtered
//! without a second read.
//!
//! This crate has zero I/O: it only builds and inspects rows. Reading
//! and writing them is the job of `facetstore-store`.

#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sort key of the unique state row for an entity.
pub const STATE_SORT_KEY: &str = "STATE";

/// Sort key prefix for inbound event rows.
pub const INBOUND_PREFIX: &str = "INBOUND";

/// Sort key prefix for outbound event rows.
pub const OUTBOUND_PREFIX: &str = "OUTBOUND";

/// Discriminates the kind of a record by its sort key.
///
/// `Unknown` covers any row whose sort key does not match one of the
/// three known prefixes (a foreign or stray row left by some other
/// writer). Range-scan consumers (`recalculate`) are expected to ignore
/// it rather than error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// The unique materialized-state row.
    State,
    /// An accepted inbound event row.
    Inbound,
    /// An emitted outbound event row.
    Outbound,
    /// A row this crate does not recognize.
    Unknown,
}

impl RecordKind {
    /// Classify a sort key by its prefix.
    pub fn from_sort_key(sort_key: &str) -> Self {
        if sort_key == STATE_SORT_KEY {
            RecordKind::State
        } else if sort_key.starts_with(INBOUND_PREFIX) {
            RecordKind::Inbound
        } else if sort_key.starts_with(OUTBOUND_PREFIX) {
            RecordKind::Outbound
        } else {
            RecordKind::Unknown
        }
    }
}

/// One persisted row under a `<facet>/<id>` partition.
///
/// `payload` is the record's serialized JSON text (the external wire
/// format's `_itm` attribute). This crate never interprets it, the
/// caller decides what type it decodes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// `"<facet>/<id>"`.
    pub partition_key: String,
    /// `"STATE"` | `"INBOUND/<type>/<seq>"` | `"OUTBOUND/<type>/<seq>/<index>"`.
    pub sort_key: String,
    /// Facet name, denormalized for validation.
    pub facet: String,
    /// Event or state type name.
    pub typ: String,
    /// Monotonically assigned sequence number.
    pub sequence: i64,
    /// Capture time, epoch milliseconds.
    pub timestamp_millis: i64,
    /// Capture time, ISO-8601 string.
    pub timestamp_date: String,
    /// Serialized entity or event, as JSON text.
    pub payload: String,
}

/// Build the partition key for an entity: `"<facet>/<id>"`.
pub fn partition_key(facet: &str, id: &str) -> String {
    format!("{facet}/{id}")
}

impl Record {
    /// Construct the unique state row for an entity.
    ///
    /// Sort key is `"STATE"`; type is the facet name (the state's
    /// "type" is the facet itself, there is only ever one shape of
    /// state per facet).
    pub fn new_state(facet: &str, id: &str, seq: i64, payload: String, ts: DateTime<Utc>) -> Self {
        Self {
            partition_key: partition_key(facet, id),
            sort_key: STATE_SORT_KEY.to_string(),
            facet: facet.to_string(),
            typ: facet.to_string(),
            sequence: seq,
            timestamp_millis: ts.timestamp_millis(),
            timestamp_date: ts.to_rfc3339(),
            payload,
        }
    }

    /// Construct an inbound event row.
    ///
    /// Sort key is `"INBOUND/<type>/<seq>"`.
    pub fn new_inbound(
        facet: &str,
        id: &str,
        seq: i64,
        typ: &str,
        payload: String,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            partition_key: partition_key(facet, id),
            sort_key: format!("{INBOUND_PREFIX}/{typ}/{seq}"),
            facet: facet.to_string(),
            typ: typ.to_string(),
            sequence: seq,
            timestamp_millis: ts.timestamp_millis(),
            timestamp_date: ts.to_rfc3339(),
            payload,
        }
    }

    /// Construct an outbound event row.
    ///
    /// Sort key is `"OUTBOUND/<type>/<seq>/<index>"`; `index` rises
    /// per commit, starting at 0, to disambiguate multiple outbound
    /// events sharing the same commit sequence.
    pub fn new_outbound(
        facet: &str,
        id: &str,
        seq: i64,
        index: i64,
        typ: &str,
        payload: String,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            partition_key: partition_key(facet, id),
            sort_key: format!("{OUTBOUND_PREFIX}/{typ}/{seq}/{index}"),
            facet: facet.to_string(),
            typ: typ.to_string(),
            sequence: seq,
            timestamp_millis: ts.timestamp_millis(),
            timestamp_date: ts.to_rfc3339(),
            payload,
        }
    }

    /// This record's kind, from its sort key.
    pub fn kind(&self) -> RecordKind {
        RecordKind::from_sort_key(&self.sort_key)
    }

    /// Is this the state row?
    pub fn is_state(&self) -> bool {
        self.kind() == RecordKind::State
    }

    /// Is this an inbound event row?
    pub fn is_inbound(&self) -> bool {
        self.kind() == RecordKind::Inbound
    }

    /// Is this an outbound event row?
    pub fn is_outbound(&self) -> bool {
        self.kind() == RecordKind::Outbound
    }

    /// Does this record carry the given facet name?
    pub fn is_facet(&self, name: &str) -> bool {
        self.facet == name
    }
}

/// Pull `(event_type, sequence)` back out of an inbound sort key.
///
/// Returns `None` if `sort_key` is not a well-formed
/// `"INBOUND/<type>/<seq>"` key (e.g. a stray row of unknown shape).
pub fn parse_inbound_sort_key(sort_key: &str) -> Option<(String, i64)> {
    let rest = sort_key.strip_prefix(&format!("{INBOUND_PREFIX}/"))?;
    let (typ, seq) = rest.rsplit_once('/')?;
    let seq: i64 = seq.parse().ok()?;
    Some((typ.to_string(), seq))
}

/// Pull `(event_type, sequence, index)` back out of an outbound sort key.
///
/// Returns `None` if `sort_key` is not a well-formed
/// `"OUTBOUND/<type>/<seq>/<index>"` key.
pub fn parse_outbound_sort_key(sort_key: &str) -> Option<(String, i64, i64)> {
    let rest = sort_key.strip_prefix(&format!("{OUTBOUND_PREFIX}/"))?;
    let (rest, index) = rest.rsplit_once('/')?;
    let (typ, seq) = rest.rsplit_once('/')?;
    let seq: i64 = seq.parse().ok()?;
    let index: i64 = index.parse().ok()?;
    Some((typ.to_string(), seq, index))
}
