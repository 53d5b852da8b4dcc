//! A module which contains the scenario events that drive a simulation and the queue that holds
//! them until their tick comes up.

use rand::rngs::StdRng;
use rand::Rng;

use crate::message::NodeId;

/// One entry of the adversarial schedule: at `tick`, the named nodes fail, the named nodes
/// recover, and optionally a client asks the proposer `request` to get `proposed_value` chosen.
///
/// A `tick` of `None` means "soon": it is resolved to the current tick plus a uniform delay in
/// `{0..5}` the next time the event queue is consulted. Only events appended by the protocol
/// itself (the retry after a superseded ACCEPTED) may start out without a tick; scenario events
/// must carry one.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    pub tick: Option<u64>,
    pub failures: Vec<NodeId>,
    pub recoveries: Vec<NodeId>,
    pub request: Option<usize>,
    pub proposed_value: Option<T>,
}

impl<T> Event<T> {
    /// A client request: at `tick`, the proposer starts driving `value`.
    pub fn proposal(tick: u64, proposer: usize, value: T) -> Self {
        Event {
            tick: Some(tick),
            failures: Vec::new(),
            recoveries: Vec::new(),
            request: Some(proposer),
            proposed_value: Some(value),
        }
    }

    pub fn failure(tick: u64, nodes: Vec<NodeId>) -> Self {
        Event {
            tick: Some(tick),
            failures: nodes,
            recoveries: Vec::new(),
            request: None,
            proposed_value: None,
        }
    }

    pub fn recovery(tick: u64, nodes: Vec<NodeId>) -> Self {
        Event {
            tick: Some(tick),
            failures: Vec::new(),
            recoveries: nodes,
            request: None,
            proposed_value: None,
        }
    }

    /// A protocol-generated retry: no tick yet, re-targets `proposer` with the value it already
    /// holds so it can run again under a fresh proposal number.
    pub fn retry(proposer: usize, value: Option<T>) -> Self {
        Event {
            tick: None,
            failures: Vec::new(),
            recoveries: Vec::new(),
            request: Some(proposer),
            proposed_value: value,
        }
    }
}

/// The pending scenario events, in the order they were supplied or appended.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<Event<T>>,
}

impl<T> EventQueue<T> {
    pub fn new(events: Vec<Event<T>>) -> Self {
        EventQueue { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn push(&mut self, event: Event<T>) {
        self.events.push(event);
    }

    /// Resolves the most recently appended event's missing tick to `tick + delay`, with the delay
    /// drawn uniformly from `{0..5}`. Earlier events are left alone; the protocol only ever
    /// appends, so only the tail can be pending.
    pub fn assign_pending_tick(&mut self, tick: u64, rng: &mut StdRng) {
        if let Some(last) = self.events.last_mut() {
            if last.tick.is_none() {
                let delay = rng.gen_range(0, 6);
                last.tick = Some(tick + delay);
            }
        }
    }

    /// Removes and returns the first event scheduled at exactly `tick`, if any.
    pub fn take_at(&mut self, tick: u64) -> Option<Event<T>> {
        let position = self.events.iter().position(|e| e.tick == Some(tick))?;
        Some(self.events.remove(position))
    }

    /// Whether some pending event already re-targets the given proposer. The ACCEPTED retry rule
    /// uses this to avoid piling up duplicate retries for one proposer.
    pub fn retargets(&self, proposer: usize) -> bool {
        self.events.iter().any(|e| e.request == Some(proposer))
    }
}
