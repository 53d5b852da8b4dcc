//! A module which contains the structured records a simulation emits (per-tick traces, consensus
//! announcements, the shutdown report) and the `Display` impls that render them in the
//! simulator's console format. The core only appends to these; anything that wants a different
//! rendering can walk the records itself.

use std::fmt;
use std::fmt::Debug;

use crate::message::{MessageKind, NodeId};

/// How a run ended. Exhausting the tick budget is a normal termination, not an error; `Drained`
/// means both the network queue and the event queue emptied out first.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Drained,
    TimeOver,
}

/// The most recent ACCEPT in an acceptor's log, reported alongside its PROMISE so the proposer's
/// side of the trace shows which previously-bound value is being propagated.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Prior<T> {
    pub n: u64,
    pub value: T,
}

/// The single work unit of one tick: which message was delivered, and what the endpoints looked
/// like once the handler finished. `n` is the source's proposal number, `value` the destination's
/// value (only reported for PROPOSE/ACCEPT/ACCEPTED), `prior` the source's last accept (only for
/// PROMISE).
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<T> {
    pub source: Option<NodeId>,
    pub destination: NodeId,
    pub kind: MessageKind,
    pub n: Option<u64>,
    pub value: Option<T>,
    pub prior: Option<Prior<T>>,
}

impl<T: Debug> fmt::Display for Delivery<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.source {
            Some(src) => write!(f, "{} -> {}\t{:<10}", src, self.destination, self.kind)?,
            None => write!(f, "   -> {}\t{:<10}", self.destination, self.kind)?,
        }
        if let Some(n) = self.n {
            write!(f, " n={}", n)?;
        }
        if self.kind == MessageKind::Promise {
            match self.prior {
                Some(ref prior) => write!(f, " (Prior: n={}, v={:?})", prior.n, prior.value)?,
                None => write!(f, " (Prior: None)")?,
            }
        }
        if let Some(ref value) = self.value {
            write!(f, " v={:?}", value)?;
        }
        Ok(())
    }
}

/// Everything that happened during one tick: liveness banners first, then at most one delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct TickTrace<T> {
    pub tick: u64,
    pub failed: Vec<NodeId>,
    pub recovered: Vec<NodeId>,
    pub work: Option<Delivery<T>>,
}

impl<T> TickTrace<T> {
    pub fn new(tick: u64) -> Self {
        TickTrace {
            tick,
            failed: Vec::new(),
            recovered: Vec::new(),
            work: None,
        }
    }
}

impl<T: Debug> fmt::Display for TickTrace<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.failed.is_empty() {
            writeln!(f, "{:03}: ** {} FAILS **", self.tick, join_ids(&self.failed))?;
        }
        if !self.recovered.is_empty() {
            writeln!(f, "{:03}: ** {} RECOVERS **", self.tick, join_ids(&self.recovered))?;
        }
        match self.work {
            Some(ref delivery) => writeln!(f, "{:03}: {}", self.tick, delivery),
            None => writeln!(f, "{:03}:", self.tick),
        }
    }
}

fn join_ids(ids: &[NodeId]) -> String {
    let rendered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    rendered.join(" ")
}

/// A proposer observed ACCEPTED from a quorum at its proposal number `n`. `proposed` is the value
/// from the proposer's original PROPOSE record; `accepted` is the value held by the first acceptor
/// that voted, which is the value actually chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus<T> {
    pub proposer: usize,
    pub n: u64,
    pub proposed: T,
    pub accepted: T,
}

impl<T: Debug> fmt::Display for Consensus<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "P{} has reached consensus (proposed {:?}, accepted {:?})",
            self.proposer, self.proposed, self.accepted
        )
    }
}

/// The full output of a run, flushed at shutdown: the tick-by-tick trace, every consensus
/// announcement in the order it was reached, and the proposers that set a value but never made it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport<T> {
    pub outcome: Outcome,
    pub ticks: Vec<TickTrace<T>>,
    pub announcements: Vec<Consensus<T>>,
    pub unresolved: Vec<usize>,
}

impl<T> SimulationReport<T> {
    /// The distinct chosen values across every announcement. Paxos safety says this never holds
    /// more than one element.
    pub fn chosen_values(&self) -> Vec<&T>
    where
        T: PartialEq,
    {
        let mut values: Vec<&T> = Vec::new();
        for consensus in &self.announcements {
            if !values.contains(&&consensus.accepted) {
                values.push(&consensus.accepted);
            }
        }
        values
    }
}

impl<T: Debug> fmt::Display for SimulationReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for tick in &self.ticks {
            write!(f, "{}", tick)?;
        }
        if self.outcome == Outcome::TimeOver {
            writeln!(f, "Simulation Terminated! Time Over!")?;
        }
        writeln!(f)?;
        for consensus in &self.announcements {
            writeln!(f, "{}", consensus)?;
        }
        writeln!(f)?;
        for proposer in &self.unresolved {
            writeln!(f, "P{} did not reach consensus", proposer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind::*;
    use crate::message::NodeId::*;

    #[test]
    fn work_line_for_a_prepare() {
        let delivery = Delivery::<i64> {
            source: Some(Proposer(1)),
            destination: Acceptor(2),
            kind: Prepare,
            n: Some(1),
            value: None,
            prior: None,
        };
        assert_eq!(delivery.to_string(), "P1 -> A2\tPREPARE    n=1");
    }

    #[test]
    fn work_line_for_a_promise_reports_the_prior() {
        let mut delivery = Delivery {
            source: Some(Acceptor(1)),
            destination: Proposer(2),
            kind: Promise,
            n: Some(2),
            value: None,
            prior: Some(Prior { n: 1, value: 42 }),
        };
        assert_eq!(delivery.to_string(), "A1 -> P2\tPROMISE    n=2 (Prior: n=1, v=42)");

        delivery.prior = None;
        assert_eq!(delivery.to_string(), "A1 -> P2\tPROMISE    n=2 (Prior: None)");
    }

    #[test]
    fn work_line_for_a_client_propose() {
        let delivery = Delivery {
            source: None,
            destination: Proposer(1),
            kind: Propose,
            n: None,
            value: Some(42),
            prior: None,
        };
        assert_eq!(delivery.to_string(), "   -> P1\tPROPOSE    v=42");
    }

    #[test]
    fn announcement_line() {
        let consensus = Consensus {
            proposer: 2,
            n: 2,
            proposed: 37,
            accepted: 42,
        };
        assert_eq!(
            consensus.to_string(),
            "P2 has reached consensus (proposed 37, accepted 42)"
        );
    }

    #[test]
    fn banners_precede_the_work_line() {
        let mut trace = TickTrace::<i64>::new(8);
        trace.failed.push(Proposer(1));
        assert_eq!(trace.to_string(), "008: ** P1 FAILS **\n008:\n");
    }
}
