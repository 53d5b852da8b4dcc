//! The module that contains the structs representing proposers and acceptors of the single-decree
//! Paxos algorithm, and the simulator that drives them. It also contains the main logic of the
//! algorithm: the per-kind message handlers, the quorum bookkeeping and the tick loop that
//! interleaves scenario events with message deliveries.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use std::mem;

use log::Level;
use rand::rngs::StdRng;
use rand::{FromEntropy, SeedableRng};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::event::{Event, EventQueue};
use crate::message::{LogRecord, Message, MessageKind, NodeId};
use crate::network::Network;
use crate::report::{Consensus, Delivery, Outcome, Prior, SimulationReport, TickTrace};

/// The struct representing a proposer in the Paxos algorithm. A proposer drives at most one
/// proposal number at a time; `promised_by` and `accepted_by` collect the votes it has seen,
/// keyed by proposal number so a superseded attempt cannot borrow votes from a fresh one.
#[derive(Debug)]
pub struct Proposer<T> {
    id: usize,

    pub failed: bool,

    // The proposal number this proposer is currently driving. None until a client asks it to
    // propose.
    n: Option<u64>,

    // The value it is trying to get chosen. A PROMISE carrying a previously accepted value
    // overwrites this, which is how an earlier binding propagates to later proposals.
    value: Option<T>,

    log: Vec<LogRecord<T>>,

    promised_by: HashMap<u64, Vec<usize>>,

    accepted_by: HashMap<u64, Vec<usize>>,

    consensus: bool,
}

impl<T> Proposer<T>
where
    T: Copy + Clone + Debug + PartialEq,
{
    pub fn new(id: usize) -> Self {
        Proposer {
            id,
            failed: false,
            n: None,
            value: None,
            log: Vec::new(),
            promised_by: HashMap::new(),
            accepted_by: HashMap::new(),
            consensus: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn n(&self) -> Option<u64> {
        self.n
    }

    pub fn value(&self) -> Option<T> {
        self.value
    }

    pub fn consensus(&self) -> bool {
        self.consensus
    }

    pub fn log(&self) -> &[LogRecord<T>] {
        &self.log
    }

    /// Adopts a freshly allocated proposal number and the value a client asked for, and records
    /// the synthetic PROPOSE that marks the start of the attempt.
    pub fn start_proposal(&mut self, n: u64, value: T) {
        self.n = Some(n);
        self.value = Some(value);
        self.log.push(LogRecord {
            source: None,
            destination: NodeId::Proposer(self.id),
            kind: MessageKind::Propose,
            n: self.n,
            value: self.value,
        });
    }

    /// The value of this proposer's first PROPOSE record: what it originally asked for, before
    /// any adoption of previously accepted values.
    pub fn proposed_value(&self) -> Option<T> {
        self.log
            .iter()
            .find(|r| r.kind == MessageKind::Propose)
            .and_then(|r| r.value)
    }

    fn record(&mut self, message: &Message) {
        self.log.push(LogRecord {
            source: message.source,
            destination: message.destination,
            kind: message.kind,
            n: self.n,
            value: self.value,
        });
    }

    fn promise_count(&self, n: u64) -> usize {
        self.promised_by.get(&n).map_or(0, |votes| votes.len())
    }

    fn add_promise(&mut self, n: u64, acceptor: usize) {
        let votes = self.promised_by.entry(n).or_insert_with(Vec::new);
        if !votes.contains(&acceptor) {
            votes.push(acceptor);
        }
    }

    fn accepted_count(&self, n: u64) -> usize {
        self.accepted_by.get(&n).map_or(0, |votes| votes.len())
    }

    fn add_accepted(&mut self, n: u64, acceptor: usize) {
        let votes = self.accepted_by.entry(n).or_insert_with(Vec::new);
        if !votes.contains(&acceptor) {
            votes.push(acceptor);
        }
    }

    fn accepted_voters(&self, n: u64) -> &[usize] {
        match self.accepted_by.get(&n) {
            Some(votes) => votes,
            None => &[],
        }
    }
}

/// The struct representing an acceptor in the Paxos algorithm. Its protocol state is the highest
/// proposal number it has promised (never decreasing) and the value it last accepted.
#[derive(Debug)]
pub struct Acceptor<T> {
    id: usize,

    pub failed: bool,

    // The highest proposal number this acceptor has promised. Starts at 1, the smallest number
    // the allocator can hand out, so the first PREPARE always succeeds.
    n: u64,

    value: Option<T>,

    log: Vec<LogRecord<T>>,
}

impl<T> Acceptor<T>
where
    T: Copy + Clone + Debug + PartialEq,
{
    pub fn new(id: usize) -> Self {
        Acceptor {
            id,
            failed: false,
            n: 1,
            value: None,
            log: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn value(&self) -> Option<T> {
        self.value
    }

    pub fn log(&self) -> &[LogRecord<T>] {
        &self.log
    }

    fn record(&mut self, message: &Message) {
        self.log.push(LogRecord {
            source: message.source,
            destination: message.destination,
            kind: message.kind,
            n: Some(self.n),
            value: self.value,
        });
    }

    /// The largest-`n` PROMISE this acceptor has on record, and the value it held at that point.
    /// This is the gate an incoming ACCEPT is compared against.
    fn max_promise(&self) -> (Option<u64>, Option<T>) {
        let mut best: Option<(u64, Option<T>)> = None;
        for record in self.log.iter().filter(|r| r.kind == MessageKind::Promise) {
            if let Some(n) = record.n {
                if best.map_or(true, |(max, _)| n > max) {
                    best = Some((n, record.value));
                }
            }
        }
        match best {
            Some((n, value)) => (Some(n), value),
            None => (None, None),
        }
    }

    /// The most recent ACCEPT this acceptor logged, if any: the prior binding a PROMISE reports.
    pub fn last_accept(&self) -> Option<Prior<T>> {
        self.log
            .iter()
            .rev()
            .find(|r| r.kind == MessageKind::Accept)
            .and_then(|r| match (r.n, r.value) {
                (Some(n), Some(value)) => Some(Prior { n, value }),
                _ => None,
            })
    }
}

/// A construction-time problem with the cluster shape or the scenario. These abort before the
/// first tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    NoProposers,
    AcceptorCount(usize),
    UnknownNode { event: usize, node: NodeId },
    MissingTick { event: usize },
    IncompleteRequest { event: usize },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SimulationError::NoProposers => write!(f, "the cluster needs at least one proposer"),
            SimulationError::AcceptorCount(count) => write!(
                f,
                "{} acceptors do not form a 2f+1 cluster (an odd count of at least 3 is required)",
                count
            ),
            SimulationError::UnknownNode { event, node } => {
                write!(f, "event {} references {}, which is not in the cluster", event, node)
            }
            SimulationError::MissingTick { event } => write!(
                f,
                "event {} has no tick: scenario events must be scheduled explicitly",
                event
            ),
            SimulationError::IncompleteRequest { event } => {
                write!(f, "event {} carries a request without a proposed value", event)
            }
        }
    }
}

impl std::error::Error for SimulationError {}

/// A message that cannot be handled as addressed. The tick loop logs these and moves on; one
/// malformed delivery must not halt the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryError {
    MissingSource(MessageKind),
    Misrouted { kind: MessageKind, node: NodeId },
    UnknownNode(NodeId),
    NotProposing(NodeId),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DeliveryError::MissingSource(kind) => {
                write!(f, "a {} must name its source", kind)
            }
            DeliveryError::Misrouted { kind, node } => {
                write!(f, "a {} cannot be addressed to {}", kind, node)
            }
            DeliveryError::UnknownNode(node) => {
                write!(f, "{} is not in the cluster", node)
            }
            DeliveryError::NotProposing(node) => {
                write!(f, "{} holds no proposal number", node)
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

/// The discrete-event simulator: the cluster, the pending scenario events, the proposal-number
/// allocator and the output sinks, advanced one tick at a time by `run`.
#[derive(Debug)]
pub struct Paxos<T> {
    network: Network<T>,

    events: EventQueue<T>,

    rng: StdRng,

    max_duration: u64,

    majority: usize,

    // The global allocator. Incremented before each assignment, so the numbers handed out are
    // 1, 2, 3, ... for the lifetime of this simulator.
    proposal_number: u64,

    announcements: Vec<Consensus<T>>,

    ticks: Vec<TickTrace<T>>,
}

impl<T> Paxos<T>
where
    T: Serialize + DeserializeOwned + Copy + Clone + Debug + PartialEq,
{
    pub fn new(
        no_of_proposers: usize,
        no_of_acceptors: usize,
        max_duration: u64,
        events: Vec<Event<T>>,
        seed: Option<u64>,
    ) -> Result<Self, SimulationError> {
        if no_of_proposers == 0 {
            return Err(SimulationError::NoProposers);
        }
        if no_of_acceptors < 3 || no_of_acceptors % 2 == 0 {
            return Err(SimulationError::AcceptorCount(no_of_acceptors));
        }

        let network = Network::new(no_of_proposers, no_of_acceptors);
        for (index, event) in events.iter().enumerate() {
            if event.tick.is_none() {
                return Err(SimulationError::MissingTick { event: index });
            }
            for &node in event.failures.iter().chain(event.recoveries.iter()) {
                if !network.contains(node) {
                    return Err(SimulationError::UnknownNode { event: index, node });
                }
            }
            if let Some(proposer) = event.request {
                let node = NodeId::Proposer(proposer);
                if !network.contains(node) {
                    return Err(SimulationError::UnknownNode { event: index, node });
                }
                if event.proposed_value.is_none() {
                    return Err(SimulationError::IncompleteRequest { event: index });
                }
            }
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let majority = no_of_acceptors / 2 + 1;

        if log_enabled!(Level::Info) {
            info!(
                "No of Proposers: {}; No of Acceptors: {}; Total Duration (ticks): {}; \
                 Total Events: {}; Majority: {}.",
                no_of_proposers,
                no_of_acceptors,
                max_duration,
                events.len(),
                majority
            );
        }

        Ok(Paxos {
            network,
            events: EventQueue::new(events),
            rng,
            max_duration,
            majority,
            proposal_number: 0,
            announcements: Vec::new(),
            ticks: Vec::new(),
        })
    }

    pub fn network(&self) -> &Network<T> {
        &self.network
    }

    /// Steps through all the ticks. Each tick applies at most one scenario event and performs one
    /// work unit: either a client PROPOSE delivered directly to its proposer, or one extraction
    /// from the network queue. Terminates early once nothing is in flight and nothing is pending.
    pub fn run(&mut self) -> SimulationReport<T> {
        for current_tick in 0..self.max_duration {
            // If there are no pending messages or events, we can end the simulation.
            if self.network.is_idle() && self.events.is_empty() {
                return self.shutdown(Outcome::Drained);
            }

            self.events.assign_pending_tick(current_tick, &mut self.rng);

            let mut trace = TickTrace::new(current_tick);
            match self.events.take_at(current_tick) {
                Some(event) => self.apply_event(event, &mut trace),
                None => trace.work = self.pump(),
            }
            self.ticks.push(trace);
        }

        self.shutdown(Outcome::TimeOver)
    }

    fn shutdown(&mut self, outcome: Outcome) -> SimulationReport<T> {
        let unresolved = self
            .network
            .proposers()
            .iter()
            .filter(|p| p.value().is_some() && !p.consensus())
            .map(|p| p.id())
            .collect();

        SimulationReport {
            outcome,
            ticks: mem::replace(&mut self.ticks, Vec::new()),
            announcements: mem::replace(&mut self.announcements, Vec::new()),
            unresolved,
        }
    }

    fn apply_event(&mut self, event: Event<T>, trace: &mut TickTrace<T>) {
        for &node in &event.failures {
            self.network.set_failed(node, true);
            trace.failed.push(node);
        }
        for &node in &event.recoveries {
            self.network.set_failed(node, false);
            trace.recovered.push(node);
        }

        match (event.request, event.proposed_value) {
            (Some(proposer), Some(value)) => {
                let n = self.next_proposal_number();
                if let Some(p) = self.network.proposer_mut(proposer) {
                    p.start_proposal(n, value);
                }
                // A client PROPOSE bypasses the queue and is delivered directly.
                trace.work = self.dispatch(Message::propose(NodeId::Proposer(proposer)));
            }
            _ => trace.work = self.pump(),
        }
    }

    fn next_proposal_number(&mut self) -> u64 {
        self.proposal_number += 1;
        self.proposal_number
    }

    /// Extracts at most one eligible message and delivers it.
    fn pump(&mut self) -> Option<Delivery<T>> {
        let message = self.network.extract_message()?;
        self.dispatch(message)
    }

    fn dispatch(&mut self, message: Message) -> Option<Delivery<T>> {
        match self.deliver(message) {
            Ok(delivery) => Some(delivery),
            Err(error) => {
                warn!("Dropping undeliverable message {:?}: {}.", message, error);
                None
            }
        }
    }

    fn deliver(&mut self, message: Message) -> Result<Delivery<T>, DeliveryError> {
        match message.kind {
            MessageKind::Propose => self.handle_propose(&message)?,
            MessageKind::Prepare => self.handle_prepare(&message)?,
            MessageKind::Promise => self.handle_promise(&message)?,
            MessageKind::Accept => self.handle_accept(&message)?,
            MessageKind::Accepted => self.handle_accepted(&message)?,
            MessageKind::Rejected => self.handle_rejected(&message)?,
        }
        Ok(self.snapshot(&message))
    }

    /// The work line of the trace: what the endpoints look like once the handler has run. The
    /// records are snapshots, so the trace stays meaningful after the nodes move on.
    fn snapshot(&self, message: &Message) -> Delivery<T> {
        let n = message.source.and_then(|src| self.n_of(src));
        let value = match message.kind {
            MessageKind::Propose | MessageKind::Accept | MessageKind::Accepted => {
                self.value_of(message.destination)
            }
            _ => None,
        };
        let prior = match (message.kind, message.source) {
            (MessageKind::Promise, Some(NodeId::Acceptor(a))) => {
                self.network.acceptor(a).and_then(|acc| acc.last_accept())
            }
            _ => None,
        };
        Delivery {
            source: message.source,
            destination: message.destination,
            kind: message.kind,
            n,
            value,
            prior,
        }
    }

    fn n_of(&self, id: NodeId) -> Option<u64> {
        match id {
            NodeId::Proposer(p) => self.network.proposer(p).and_then(|node| node.n()),
            NodeId::Acceptor(a) => self.network.acceptor(a).map(|node| node.n()),
        }
    }

    fn value_of(&self, id: NodeId) -> Option<T> {
        match id {
            NodeId::Proposer(p) => self.network.proposer(p).and_then(|node| node.value()),
            NodeId::Acceptor(a) => self.network.acceptor(a).and_then(|node| node.value()),
        }
    }

    fn expect_proposer(&self, id: NodeId, kind: MessageKind) -> Result<usize, DeliveryError> {
        match id {
            NodeId::Proposer(p) if self.network.proposer(p).is_some() => Ok(p),
            NodeId::Proposer(_) => Err(DeliveryError::UnknownNode(id)),
            _ => Err(DeliveryError::Misrouted { kind, node: id }),
        }
    }

    fn expect_acceptor(&self, id: NodeId, kind: MessageKind) -> Result<usize, DeliveryError> {
        match id {
            NodeId::Acceptor(a) if self.network.acceptor(a).is_some() => Ok(a),
            NodeId::Acceptor(_) => Err(DeliveryError::UnknownNode(id)),
            _ => Err(DeliveryError::Misrouted { kind, node: id }),
        }
    }

    // Handlers

    /// A client PROPOSE at its proposer: broadcast a PREPARE to every acceptor.
    fn handle_propose(&mut self, message: &Message) -> Result<(), DeliveryError> {
        let proposer = self.expect_proposer(message.destination, message.kind)?;

        if log_enabled!(Level::Info) {
            info!("[P={:?}] I will handle {:?}.", proposer, message);
        }

        for acceptor in self.network.acceptor_ids() {
            self.network.queue_message(Message::new(
                NodeId::Proposer(proposer),
                NodeId::Acceptor(acceptor),
                MessageKind::Prepare,
            ));
        }
        Ok(())
    }

    /// A PREPARE at an acceptor: promise if the proposer's number is not below what this acceptor
    /// has already promised, otherwise turn it away.
    fn handle_prepare(&mut self, message: &Message) -> Result<(), DeliveryError> {
        let source = message.source.ok_or(DeliveryError::MissingSource(message.kind))?;
        let proposer = self.expect_proposer(source, message.kind)?;
        let acceptor = self.expect_acceptor(message.destination, message.kind)?;

        if log_enabled!(Level::Info) {
            info!("[A={:?}] I will handle {:?}.", acceptor, message);
        }

        let p_n = self
            .n_of(source)
            .ok_or(DeliveryError::NotProposing(source))?;
        let a_n = self.network.acceptor(acceptor).map(|a| a.n());

        if a_n.map_or(false, |n| n <= p_n) {
            if let Some(p) = self.network.proposer_mut(proposer) {
                p.record(message);
            }
            if let Some(a) = self.network.acceptor_mut(acceptor) {
                a.n = p_n;
            }
            self.network.queue_message(Message::new(
                NodeId::Acceptor(acceptor),
                NodeId::Proposer(proposer),
                MessageKind::Promise,
            ));
        } else {
            // This acceptor has promised a higher number already.
            self.network.queue_message(Message::new(
                NodeId::Acceptor(acceptor),
                NodeId::Proposer(proposer),
                MessageKind::Rejected,
            ));
        }
        Ok(())
    }

    /// A PROMISE at a proposer: adopt any previously accepted value, count the vote, and on
    /// reaching the quorum broadcast an ACCEPT to every acceptor. Stale promises are dropped.
    fn handle_promise(&mut self, message: &Message) -> Result<(), DeliveryError> {
        let source = message.source.ok_or(DeliveryError::MissingSource(message.kind))?;
        let acceptor = self.expect_acceptor(source, message.kind)?;
        let proposer = self.expect_proposer(message.destination, message.kind)?;

        let (a_n, a_value) = match self.network.acceptor(acceptor) {
            Some(a) => (a.n(), a.value()),
            None => return Err(DeliveryError::UnknownNode(source)),
        };
        let p_n = self.network.proposer(proposer).and_then(|p| p.n());

        if p_n != Some(a_n) {
            // Either this proposer has moved on to a higher number, or the acceptor has.
            if log_enabled!(Level::Info) {
                info!("[P={:?}] I will ignore {:?}.", proposer, message);
            }
            return Ok(());
        }

        if log_enabled!(Level::Info) {
            info!("[P={:?}] I will handle {:?}.", proposer, message);
        }

        if let Some(p) = self.network.proposer_mut(proposer) {
            if let Some(value) = a_value {
                // Adopt the acceptor's previously accepted value in place of our own.
                p.value = Some(value);
            }
        }
        if let Some(a) = self.network.acceptor_mut(acceptor) {
            a.record(message);
        }

        let majority = self.majority;
        let reached = match self.network.proposer_mut(proposer) {
            Some(p) => {
                if p.promise_count(a_n) >= majority {
                    // The quorum was already there; just keep the extra vote.
                    p.add_promise(a_n, acceptor);
                    return Ok(());
                }
                p.add_promise(a_n, acceptor);
                p.promise_count(a_n) >= majority
            }
            None => false,
        };

        if reached {
            if log_enabled!(Level::Info) {
                info!("[P={:?}] Majority of PROMISE received.", proposer);
            }
            for acceptor in self.network.acceptor_ids() {
                self.network.queue_message(Message::new(
                    NodeId::Proposer(proposer),
                    NodeId::Acceptor(acceptor),
                    MessageKind::Accept,
                ));
            }
        }
        Ok(())
    }

    /// An ACCEPT at an acceptor: gate it against the largest-numbered PROMISE on record, bind the
    /// value and answer ACCEPTED, or turn it away.
    fn handle_accept(&mut self, message: &Message) -> Result<(), DeliveryError> {
        let source = message.source.ok_or(DeliveryError::MissingSource(message.kind))?;
        let proposer = self.expect_proposer(source, message.kind)?;
        let acceptor = self.expect_acceptor(message.destination, message.kind)?;

        if log_enabled!(Level::Info) {
            info!("[A={:?}] I will handle {:?}.", acceptor, message);
        }

        let p_n = self
            .n_of(source)
            .ok_or(DeliveryError::NotProposing(source))?;
        let p_value = self.value_of(source);

        let (n_star, v_star) = match self.network.acceptor(acceptor) {
            Some(a) => a.max_promise(),
            None => return Err(DeliveryError::UnknownNode(message.destination)),
        };

        if n_star.map_or(true, |n| n <= p_n) {
            let value = v_star.or(p_value);
            if let Some(a) = self.network.acceptor_mut(acceptor) {
                a.value = value;
                a.record(message);
            }
            self.network.queue_message(Message::new(
                NodeId::Acceptor(acceptor),
                NodeId::Proposer(proposer),
                MessageKind::Accepted,
            ));
        } else {
            self.network.queue_message(Message::new(
                NodeId::Acceptor(acceptor),
                NodeId::Proposer(proposer),
                MessageKind::Rejected,
            ));
        }
        Ok(())
    }

    /// An ACCEPTED at a proposer: count the vote at the matching number and announce consensus on
    /// the first quorum. A vote from a higher number means this proposer was superseded; it gets
    /// one pending retry event so it can come back with a fresh number.
    fn handle_accepted(&mut self, message: &Message) -> Result<(), DeliveryError> {
        let source = message.source.ok_or(DeliveryError::MissingSource(message.kind))?;
        let acceptor = self.expect_acceptor(source, message.kind)?;
        let proposer = self.expect_proposer(message.destination, message.kind)?;

        let a_n = match self.network.acceptor(acceptor) {
            Some(a) => a.n(),
            None => return Err(DeliveryError::UnknownNode(source)),
        };
        let p_n = self
            .n_of(message.destination)
            .ok_or(DeliveryError::NotProposing(message.destination))?;

        if p_n == a_n {
            if log_enabled!(Level::Info) {
                info!("[P={:?}] I will handle {:?}.", proposer, message);
            }

            if let Some(a) = self.network.acceptor_mut(acceptor) {
                a.record(message);
            }

            let majority = self.majority;
            let reached = match self.network.proposer_mut(proposer) {
                Some(p) => {
                    if p.accepted_count(p_n) >= majority {
                        p.add_accepted(p_n, acceptor);
                        return Ok(());
                    }
                    p.add_accepted(p_n, acceptor);
                    if p.accepted_count(p_n) >= majority {
                        p.consensus = true;
                        true
                    } else {
                        false
                    }
                }
                None => false,
            };

            if reached {
                self.announce(proposer, p_n);
            }
        } else if p_n > a_n {
            // A leftover vote from one of this proposer's earlier attempts.
            if log_enabled!(Level::Info) {
                info!("[P={:?}] I will ignore {:?}.", proposer, message);
            }
        } else {
            // The acceptor has moved past this proposer's number. Re-target the proposer with a
            // pending event so it retries under a fresh number, unless it is already satisfied or
            // a retry is already queued.
            let satisfied = self
                .network
                .proposer(proposer)
                .map_or(true, |p| p.consensus());
            if !satisfied && !self.events.retargets(proposer) {
                let value = self.network.proposer(proposer).and_then(|p| p.value());
                if log_enabled!(Level::Info) {
                    info!("[P={:?}] Superseded; scheduling a retry.", proposer);
                }
                self.events.push(Event::retry(proposer, value));
            }
        }
        Ok(())
    }

    /// A REJECTED at a proposer: the sender keeps a record of it, nothing else moves. The retry
    /// on superseded ACCEPTED votes is the only catch-up path.
    fn handle_rejected(&mut self, message: &Message) -> Result<(), DeliveryError> {
        let source = message.source.ok_or(DeliveryError::MissingSource(message.kind))?;
        let acceptor = self.expect_acceptor(source, message.kind)?;
        self.expect_proposer(message.destination, message.kind)?;

        if let Some(a) = self.network.acceptor_mut(acceptor) {
            a.record(message);
        }
        Ok(())
    }

    fn announce(&mut self, proposer: usize, n: u64) {
        let (proposed, first_voter) = match self.network.proposer(proposer) {
            Some(p) => {
                let proposed = p
                    .proposed_value()
                    .expect("Bug: consensus reached without a recorded PROPOSE");
                let voters = p.accepted_voters(n);
                assert!(!voters.is_empty(), "Bug: consensus reached without ACCEPTED votes");
                (proposed, voters[0])
            }
            None => return,
        };
        let accepted = self
            .network
            .acceptor(first_voter)
            .and_then(|a| a.value())
            .expect("Bug: accepting acceptor holds no value");

        let consensus = Consensus {
            proposer,
            n,
            proposed,
            accepted,
        };
        if log_enabled!(Level::Info) {
            info!("{}", consensus);
        }
        self.announcements.push(consensus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind::*;
    use crate::message::NodeId::*;

    fn simulator(events: Vec<Event<i64>>) -> Paxos<i64> {
        Paxos::new(2, 3, 90, events, Some(1)).unwrap()
    }

    fn drain(paxos: &mut Paxos<i64>) {
        while let Some(message) = paxos.network.extract_message() {
            paxos.deliver(message).unwrap();
        }
    }

    #[test]
    fn proposal_numbers_strictly_increase_from_one() {
        let mut paxos = simulator(vec![]);
        assert_eq!(paxos.next_proposal_number(), 1);
        assert_eq!(paxos.next_proposal_number(), 2);
        assert_eq!(paxos.next_proposal_number(), 3);
    }

    #[test]
    fn construction_rejects_bad_clusters() {
        let no_proposers = Paxos::<i64>::new(0, 3, 90, vec![], None);
        assert_eq!(no_proposers.unwrap_err(), SimulationError::NoProposers);

        let even = Paxos::<i64>::new(2, 4, 90, vec![], None);
        assert_eq!(even.unwrap_err(), SimulationError::AcceptorCount(4));

        let lone = Paxos::<i64>::new(2, 1, 90, vec![], None);
        assert_eq!(lone.unwrap_err(), SimulationError::AcceptorCount(1));
    }

    #[test]
    fn construction_validates_the_scenario() {
        let unknown = Paxos::<i64>::new(2, 3, 90, vec![Event::failure(0, vec![Acceptor(7)])], None);
        assert_eq!(
            unknown.unwrap_err(),
            SimulationError::UnknownNode { event: 0, node: Acceptor(7) }
        );

        let pending = Paxos::<i64>::new(2, 3, 90, vec![Event::retry(1, Some(5))], None);
        assert_eq!(pending.unwrap_err(), SimulationError::MissingTick { event: 0 });

        let incomplete = Event::<i64> {
            tick: Some(0),
            failures: Vec::new(),
            recoveries: Vec::new(),
            request: Some(1),
            proposed_value: None,
        };
        let incomplete = Paxos::new(2, 3, 90, vec![incomplete], None);
        assert_eq!(incomplete.unwrap_err(), SimulationError::IncompleteRequest { event: 0 });
    }

    #[test]
    fn prepare_from_a_silent_proposer_is_undeliverable() {
        let mut paxos = simulator(vec![]);
        let message = Message::new(Proposer(1), Acceptor(1), Prepare);
        assert_eq!(
            paxos.deliver(message).unwrap_err(),
            DeliveryError::NotProposing(Proposer(1))
        );
    }

    #[test]
    fn acceptor_numbers_never_decrease() {
        let mut paxos = simulator(vec![]);
        paxos.network.proposer_mut(1).unwrap().start_proposal(5, 42);
        paxos.network.proposer_mut(2).unwrap().start_proposal(3, 7);

        paxos.deliver(Message::new(Proposer(1), Acceptor(1), Prepare)).unwrap();
        assert_eq!(paxos.network.acceptor(1).unwrap().n(), 5);

        // The lower-numbered PREPARE is turned away and the promise stands.
        paxos.deliver(Message::new(Proposer(2), Acceptor(1), Prepare)).unwrap();
        assert_eq!(paxos.network.acceptor(1).unwrap().n(), 5);

        let kinds: Vec<MessageKind> = paxos.network.queued().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![Promise, Rejected]);
    }

    #[test]
    fn promise_quorum_triggers_the_accept_broadcast() {
        let mut paxos = simulator(vec![]);
        paxos.network.proposer_mut(1).unwrap().start_proposal(1, 42);
        paxos.deliver(Message::propose(Proposer(1))).unwrap();
        for _ in 0..3 {
            let prepare = paxos.network.extract_message().unwrap();
            paxos.deliver(prepare).unwrap();
        }

        // The first PROMISE is short of the quorum of two, so nothing is broadcast yet.
        let promise = paxos.network.extract_message().unwrap();
        paxos.deliver(promise).unwrap();
        assert!(paxos.network.queued().all(|m| m.kind == Promise));

        let promise = paxos.network.extract_message().unwrap();
        paxos.deliver(promise).unwrap();
        assert_eq!(paxos.network.queued().filter(|m| m.kind == Accept).count(), 3);
    }

    #[test]
    fn accepted_quorum_closes_consensus_once() {
        let mut paxos = simulator(vec![]);
        let n = paxos.next_proposal_number();
        paxos.network.proposer_mut(1).unwrap().start_proposal(n, 42);
        paxos.deliver(Message::propose(Proposer(1))).unwrap();
        drain(&mut paxos);

        let proposer = paxos.network.proposer(1).unwrap();
        assert!(proposer.consensus());
        assert_eq!(paxos.announcements.len(), 1);
        assert_eq!(paxos.announcements[0].proposer, 1);
        assert_eq!(paxos.announcements[0].n, 1);
        assert_eq!(paxos.announcements[0].proposed, 42);
        assert_eq!(paxos.announcements[0].accepted, 42);
        assert_eq!(paxos.network.proposer_by_n(1).unwrap().id(), 1);
    }

    #[test]
    fn superseded_accepted_schedules_exactly_one_retry() {
        let mut paxos = simulator(vec![]);
        paxos.network.proposer_mut(1).unwrap().start_proposal(1, 42);
        paxos.network.acceptor_mut(1).unwrap().n = 3;

        paxos.deliver(Message::new(Acceptor(1), Proposer(1), Accepted)).unwrap();
        assert_eq!(paxos.events.len(), 1);

        // A second stale vote does not pile up another retry.
        paxos.deliver(Message::new(Acceptor(1), Proposer(1), Accepted)).unwrap();
        assert_eq!(paxos.events.len(), 1);
    }
}
