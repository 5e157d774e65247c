//! Facet orchestrator.
//!
//! A [`Facet`] composes a [`facetstore_processor::Processor`] with a
//! [`facetstore_store::StoreBackend`] to expose the four operations
//! callers actually use: `get`, `append`, `append_to`, `recalculate`.
//! It owns sequence assignment and the decode/encode boundary between
//! typed events/state and the store's JSON-text records; the processor
//! stays oblivious to both I/O and the record shape.

#![warn(clippy::all)]

pub mod config;
mod error;

use chrono::Utc;
use facetstore_processor::{Event, Processor, ProcessorOutput};
use facetstore_record::{parse_inbound_sort_key, Record, RecordKind};
use facetstore_store::StoreBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub use error::{FacetError, Result};
pub use facetstore_processor::{ReducerInput, RuleTable};

/// A materialized entity as returned by [`Facet::get`].
///
/// Deliberately narrower than the raw state row: `state` and `seq` are
/// the only two fields a caller ever needs, `seq` to feed straight back
/// into [`Facet::append_to`]. Callers that need the raw `Record` (its
/// timestamp, its facet tag) can read it directly off `StoreBackend`.
#[derive(Debug, Clone, PartialEq)]
pub struct Item<T> {
    /// Current state.
    pub state: T,
    /// Sequence of the commit that produced this state.
    pub seq: i64,
}

/// Result of a write operation (`append`, `append_to`, `recalculate`).
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeOutput<T, OE> {
    /// Sequence of the commit just made.
    pub seq: i64,
    /// State after the commit.
    pub item: T,
    /// Outbound events produced while replaying history (not re-persisted).
    pub past_outbound_events: Vec<Event<OE>>,
    /// Outbound events produced by the newly appended events (persisted this commit).
    pub new_outbound_events: Vec<Event<OE>>,
}

/// Composes a processor and a store backend into the get/append/
/// append_to/recalculate surface for one facet.
pub struct Facet<B, T, IE, OE> {
    facet_name: String,
    store: B,
    processor: Processor<T, IE, OE>,
}

impl<B, T, IE, OE> Facet<B, T, IE, OE>
where
    B: StoreBackend,
    T: Serialize + DeserializeOwned,
    IE: Serialize + DeserializeOwned + Clone,
    OE: Serialize,
{
    /// Build a facet orchestrator named `facet_name` over `store`,
    /// driven by `processor`.
    pub fn new(facet_name: impl Into<String>, store: B, processor: Processor<T, IE, OE>) -> Self {
        Self { facet_name: facet_name.into(), store, processor }
    }

    /// Point-read an entity's current state, if it has ever been committed.
    pub async fn get(&self, id: &str) -> Result<Option<Item<T>>> {
        let Some(record) = self.store.get_state(&self.facet_name, id).await? else {
            return Ok(None);
        };
        let state: T = serde_json::from_str(&record.payload)?;
        Ok(Some(Item { state, seq: record.sequence }))
    }

    /// Read current state, reduce `new_events` on top of it, and commit.
    pub async fn append(&self, id: &str, new_events: Vec<Event<IE>>) -> Result<ChangeOutput<T, OE>> {
        let existing = self.store.get_state(&self.facet_name, id).await?;
        let (prior_state, prior_seq) = match existing {
            Some(record) => (Some(serde_json::from_str::<T>(&record.payload)?), record.sequence),
            None => (None, 0),
        };

        let output = self.processor.run(prior_state, &[], &new_events);
        self.commit(id, prior_seq, &new_events, output).await
    }

    /// Like [`Self::append`], but skips the read: `state`/`seq` are
    /// supplied by the caller as if freshly returned by `get`. Saves a
    /// round trip when the caller already holds a recent read.
    pub async fn append_to(
        &self,
        id: &str,
        state: T,
        seq: i64,
        new_events: Vec<Event<IE>>,
    ) -> Result<ChangeOutput<T, OE>> {
        let output = self.processor.run(Some(state), &[], &new_events);
        self.commit(id, seq, &new_events, output).await
    }

    /// Replay the entire inbound log from the initializer, then reduce
    /// `new_events` on top of that. Ignores the cached state payload
    /// entirely except for its sequence, and tolerates (ignores) any
    /// row that isn't a recognized inbound/state row.
    pub async fn recalculate(&self, id: &str, new_events: Vec<Event<IE>>) -> Result<ChangeOutput<T, OE>> {
        let records = self.store.get_records(&self.facet_name, id).await?;

        let mut prior_seq = 0i64;
        let mut inbound: Vec<Record> = Vec::new();
        for record in records {
            match record.kind() {
                RecordKind::State => prior_seq = record.sequence,
                RecordKind::Inbound => inbound.push(record),
                RecordKind::Outbound | RecordKind::Unknown => {}
            }
        }
        inbound.sort_by_key(|record| record.sequence);

        let past_events = inbound
            .into_iter()
            .map(|record| {
                let typ = parse_inbound_sort_key(&record.sort_key)
                    .map(|(typ, _)| typ)
                    .unwrap_or_else(|| record.typ.clone());
                let payload: IE = serde_json::from_str(&record.payload)?;
                Ok(Event::new(typ, payload))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(facet = %self.facet_name, %id, past_events = past_events.len(), "recalculating from full replay");

        let output = self.processor.run(None, &past_events, &new_events);
        self.commit(id, prior_seq, &new_events, output).await
    }

    async fn commit(
        &self,
        id: &str,
        previous_seq: i64,
        new_events: &[Event<IE>],
        output: ProcessorOutput<T, OE>,
    ) -> Result<ChangeOutput<T, OE>> {
        let now = Utc::now();
        let state_seq = previous_seq + new_events.len() as i64;

        let mut inbound_records = Vec::with_capacity(new_events.len());
        for (i, event) in new_events.iter().enumerate() {
            let seq_i = previous_seq + 1 + i as i64;
            let payload = serde_json::to_string(&event.payload)?;
            inbound_records.push(Record::new_inbound(&self.facet_name, id, seq_i, &event.typ, payload, now));
        }

        let mut outbound_records = Vec::with_capacity(output.new_outbound_events.len());
        for (index, event) in output.new_outbound_events.iter().enumerate() {
            let payload = serde_json::to_string(&event.payload)?;
            outbound_records.push(Record::new_outbound(
                &self.facet_name,
                id,
                state_seq,
                index as i64,
                &event.typ,
                payload,
                now,
            ));
        }

        let state_payload = serde_json::to_string(&output.state)?;
        let state_record = Record::new_state(&self.facet_name, id, state_seq, state_payload, now);

        debug!(
            facet = %self.facet_name,
            %id,
            previous_seq,
            state_seq,
            new_inbound = inbound_records.len(),
            new_outbound = outbound_records.len(),
            "committing"
        );

        self.store
            .put_transaction(&self.facet_name, state_record, previous_seq, inbound_records, outbound_records)
            .await?;

        Ok(ChangeOutput {
            seq: state_seq,
            item: output.state,
            past_outbound_events: output.past_outbound_events,
            new_outbound_events: output.new_outbound_events,
        })
    }
}
