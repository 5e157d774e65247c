//! Pure event reduction.
//!
//! [`Processor`] folds an ordered sequence of inbound events into a next
//! state, dispatching each event to a [`Reducer`] registered under its
//! type name. Reducers never touch I/O, the only effect they can have
//! is mutating the accumulator they're handed and publishing outbound
//! events through the `publish` accumulator passed into the call.
//!
//! The past/new split on outbound events exists so a full replay (as
//! `recalculate` performs) can reconstruct the historical outbound
//! timeline without re-delivering anything already sent.

#![warn(clippy::all)]

use std::collections::HashMap;

/// A named event with an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    /// Event type name, used to look up the reducer in the rule table.
    pub typ: String,
    /// Event payload.
    pub payload: E,
}

impl<E> Event<E> {
    /// Build an event with the given type name and payload.
    pub fn new(typ: impl Into<String>, payload: E) -> Self {
        Self { typ: typ.into(), payload }
    }
}

/// Everything a [`Reducer`] call sees about its position in the fold.
pub struct ReducerInput<'a, T, IE, OE> {
    /// The accumulator going into this call.
    pub state: T,
    /// The event payload being applied.
    pub current: &'a IE,
    /// Events already durable before this reduction started, in order.
    pub past_inbound_events: &'a [Event<IE>],
    /// Events the caller is appending in this reduction, in order.
    pub new_inbound_events: &'a [Event<IE>],
    /// `past_inbound_events` followed by `new_inbound_events`.
    pub all: &'a [Event<IE>],
    /// Index of `current` within `all`.
    pub current_index: usize,
    /// Index in `all` where `new_inbound_events` begins (== `past_inbound_events.len()`).
    pub state_index: usize,
    /// Accumulator a reducer pushes outbound events onto. Whether a
    /// pushed event lands in `past_outbound_events` or
    /// `new_outbound_events` is decided by the caller based on
    /// `current_index` vs `state_index`, not by the reducer.
    pub publish: &'a mut Vec<Event<OE>>,
}

/// A pure state transition for one event type.
///
/// Implementations must be deterministic and must not perform I/O.
/// The processor may call a reducer during a dry-run replay
/// (`recalculate`) as freely as during a live append.
pub trait Reducer<T, IE, OE>: Send + Sync {
    /// Compute the next state for one event, optionally publishing
    /// outbound events via `input.publish`.
    fn reduce(&self, input: ReducerInput<'_, T, IE, OE>) -> T;
}

impl<T, IE, OE, F> Reducer<T, IE, OE> for F
where
    F: Fn(ReducerInput<'_, T, IE, OE>) -> T + Send + Sync,
{
    fn reduce(&self, input: ReducerInput<'_, T, IE, OE>) -> T {
        self(input)
    }
}

/// Dispatch table from event-type name to the reducer that handles it.
///
/// An event type with no entry is not an error: it is silently skipped,
/// so inbound rows written under an older rule set stay replayable
/// after rules are added or removed.
pub struct RuleTable<T, IE, OE> {
    rules: HashMap<String, Box<dyn Reducer<T, IE, OE>>>,
}

impl<T, IE, OE> RuleTable<T, IE, OE> {
    /// An empty rule table; every event type is ignored until rules are added.
    pub fn new() -> Self {
        Self { rules: HashMap::new() }
    }

    /// Register (or replace) the reducer for `typ`.
    pub fn on(mut self, typ: impl Into<String>, rule: impl Reducer<T, IE, OE> + 'static) -> Self {
        self.rules.insert(typ.into(), Box::new(rule));
        self
    }
}

impl<T, IE, OE> Default for RuleTable<T, IE, OE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a [`Processor::run`] call.
pub struct ProcessorOutput<T, OE> {
    /// State after folding every event in `all`.
    pub state: T,
    /// Outbound events published while reducing events at or before
    /// `state_index` (i.e. while replaying history).
    pub past_outbound_events: Vec<Event<OE>>,
    /// Outbound events published while reducing newly appended events.
    pub new_outbound_events: Vec<Event<OE>>,
}

/// A pure reducer: initializer plus a rule table, with no store, no
/// clock, no other side-channel.
pub struct Processor<T, IE, OE> {
    rules: RuleTable<T, IE, OE>,
    initializer: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T, IE, OE> Processor<T, IE, OE> {
    /// Build a processor from a rule table and an explicit initializer.
    pub fn new(rules: RuleTable<T, IE, OE>, initializer: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self { rules, initializer: Box::new(initializer) }
    }

    /// Fold `past_inbound_events` then `new_inbound_events` over `state`
    /// (or `T::default()`-via-initializer if `state` is `None`),
    /// splitting published outbound events by whether they arose from
    /// replayed history or from the newly appended events.
    pub fn run(
        &self,
        state: Option<T>,
        past_inbound_events: &[Event<IE>],
        new_inbound_events: &[Event<IE>],
    ) -> ProcessorOutput<T, OE>
    where
        IE: Clone,
    {
        let mut state = state.unwrap_or_else(|| (self.initializer)());

        let state_index = past_inbound_events.len();
        let all: Vec<Event<IE>> =
            past_inbound_events.iter().chain(new_inbound_events.iter()).cloned().collect();

        let mut past_outbound_events = Vec::new();
        let mut new_outbound_events = Vec::new();

        for (current_index, event) in all.iter().enumerate() {
            let Some(rule) = self.rules.rules.get(&event.typ) else {
                continue;
            };

            let mut published = Vec::new();
            state = rule.reduce(ReducerInput {
                state,
                current: &event.payload,
                past_inbound_events,
                new_inbound_events,
                all: &all,
                current_index,
                state_index,
                publish: &mut published,
            });

            if current_index < state_index {
                past_outbound_events.extend(published);
            } else {
                new_outbound_events.extend(published);
            }
        }

        ProcessorOutput { state, past_outbound_events, new_outbound_events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum InEvent {
        Deposited(i64),
        Withdrawn(i64),
    }

    #[derive(Debug, Clone, PartialEq)]
    enum OutEvent {
        BalanceCrossedZero,
    }

    fn counter_processor() -> Processor<i64, InEvent, OutEvent> {
        let rules = RuleTable::new()
            .on(
                "deposited",
                |input: ReducerInput<'_, i64, InEvent, OutEvent>| {
                    let InEvent::Deposited(amount) = input.current else { return input.state };
                    input.state + amount
                },
            )
            .on(
                "withdrawn",
                |input: ReducerInput<'_, i64, InEvent, OutEvent>| {
                    let InEvent::Withdrawn(amount) = input.current else { return input.state };
                    let next = input.state - amount;
                    if next <= 0 && input.state > 0 {
                        input.publish.push(Event::new("balance_crossed_zero", OutEvent::BalanceCrossedZero));
                    }
                    next
                },
            );
        Processor::new(rules, || 0)
    }

    fn event(typ: &str, payload: InEvent) -> Event<InEvent> {
        Event::new(typ, payload)
    }

    #[test]
    fn empty_fold_yields_initializer_state() {
        let processor = counter_processor();
        let output = processor.run(None, &[], &[]);
        assert_eq!(output.state, 0);
        assert!(output.past_outbound_events.is_empty());
        assert!(output.new_outbound_events.is_empty());
    }

    #[test]
    fn unknown_event_types_are_silently_ignored() {
        let processor = counter_processor();
        let events = vec![event("teleported", InEvent::Deposited(999))];
        let output = processor.run(Some(5), &[], &events);
        assert_eq!(output.state, 5);
    }

    #[test]
    fn folds_past_then_new_events_in_order() {
        let processor = counter_processor();
        let past = vec![event("deposited", InEvent::Deposited(10))];
        let new = vec![event("deposited", InEvent::Deposited(5))];
        let output = processor.run(None, &past, &new);
        assert_eq!(output.state, 15);
    }

    #[test]
    fn outbound_events_split_by_past_versus_new_boundary() {
        let processor = counter_processor();
        let past = vec![event("deposited", InEvent::Deposited(10)), event("withdrawn", InEvent::Withdrawn(10))];
        let new = vec![event("deposited", InEvent::Deposited(10)), event("withdrawn", InEvent::Withdrawn(10))];
        let output = processor.run(None, &past, &new);

        assert_eq!(output.state, 0);
        assert_eq!(output.past_outbound_events.len(), 1);
        assert_eq!(output.new_outbound_events.len(), 1);
        assert_eq!(output.past_outbound_events[0].payload, OutEvent::BalanceCrossedZero);
        assert_eq!(output.new_outbound_events[0].payload, OutEvent::BalanceCrossedZero);
    }

    #[test]
    fn replaying_the_same_log_twice_is_deterministic() {
        let processor = counter_processor();
        let events = vec![
            event("deposited", InEvent::Deposited(7)),
            event("withdrawn", InEvent::Withdrawn(3)),
            event("deposited", InEvent::Deposited(1)),
        ];

        let first = processor.run(None, &[], &events);
        let second = processor.run(None, &[], &events);
        assert_eq!(first.state, second.state);
        assert_eq!(first.state, 5);
    }

    #[test]
    fn folding_in_two_steps_matches_folding_in_one_step() {
        let processor = counter_processor();
        let a = vec![event("deposited", InEvent::Deposited(4))];
        let b = vec![event("deposited", InEvent::Deposited(6))];

        let combined = processor.run(None, &[], &[a.clone(), b.clone()].concat());
        let staged = processor.run(None, &a, &b);

        assert_eq!(combined.state, staged.state);
    }
}
