//! A module which contains the network the cluster is wired to: the fixed populations of
//! proposers and acceptors, and the single FIFO queue of in-flight messages with its
//! liveness-aware extraction policy.

use std::collections::VecDeque;
use std::fmt::Debug;

use log::Level;

use crate::message::{Message, MessageKind, NodeId};
use crate::single_paxos::{Acceptor, Proposer};

/// All computers are connected to the network. The network owns the node populations and the
/// message queue; the simulator loop is the only caller, so no locking is involved.
#[derive(Debug)]
pub struct Network<T> {
    proposers: Vec<Proposer<T>>,
    acceptors: Vec<Acceptor<T>>,
    queue: VecDeque<Message>,
}

impl<T> Network<T>
where
    T: Copy + Clone + Debug + PartialEq,
{
    pub fn new(no_of_proposers: usize, no_of_acceptors: usize) -> Self {
        Network {
            proposers: (1..=no_of_proposers).map(Proposer::new).collect(),
            acceptors: (1..=no_of_acceptors).map(Acceptor::new).collect(),
            queue: VecDeque::new(),
        }
    }

    /// The number of messages currently in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// The in-flight messages, head first.
    pub fn queued(&self) -> impl Iterator<Item = &Message> {
        self.queue.iter()
    }

    /// Adds the message to the end of the queue.
    pub fn queue_message(&mut self, message: Message) {
        if log_enabled!(Level::Debug) {
            debug!("Queueing {:?} at position {}.", message, self.queue.len());
        }
        self.queue.push_back(message);
    }

    /// Finds, removes and returns the first message whose endpoints are both live. A PROPOSE is
    /// always eligible regardless of liveness. Messages that are skipped keep their positions, so
    /// a stalled message cannot be overtaken once its endpoints are back.
    pub fn extract_message(&mut self) -> Option<Message> {
        let position = self.queue.iter().position(|m| self.is_deliverable(m))?;
        let message = self.queue.remove(position);
        if log_enabled!(Level::Debug) {
            debug!("Extracted {:?} from position {}.", message, position);
        }
        message
    }

    fn is_deliverable(&self, message: &Message) -> bool {
        if message.kind == MessageKind::Propose {
            return true;
        }
        message.source.map_or(true, |src| self.is_live(src)) && self.is_live(message.destination)
    }

    fn is_live(&self, id: NodeId) -> bool {
        match id {
            NodeId::Proposer(p) => self.proposer(p).map_or(false, |node| !node.failed),
            NodeId::Acceptor(a) => self.acceptor(a).map_or(false, |node| !node.failed),
        }
    }

    /// Flips a node's liveness flag. Failing a failed node or recovering a live one is a no-op.
    /// Returns false when the id does not name a node in this cluster.
    pub fn set_failed(&mut self, id: NodeId, failed: bool) -> bool {
        match id {
            NodeId::Proposer(p) => match self.proposer_mut(p) {
                Some(node) => {
                    node.failed = failed;
                    true
                }
                None => false,
            },
            NodeId::Acceptor(a) => match self.acceptor_mut(a) {
                Some(node) => {
                    node.failed = failed;
                    true
                }
                None => false,
            },
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        match id {
            NodeId::Proposer(p) => self.proposer(p).is_some(),
            NodeId::Acceptor(a) => self.acceptor(a).is_some(),
        }
    }

    pub fn no_of_proposers(&self) -> usize {
        self.proposers.len()
    }

    pub fn no_of_acceptors(&self) -> usize {
        self.acceptors.len()
    }

    pub fn proposer(&self, id: usize) -> Option<&Proposer<T>> {
        self.proposers.iter().find(|p| p.id() == id)
    }

    pub fn proposer_mut(&mut self, id: usize) -> Option<&mut Proposer<T>> {
        self.proposers.iter_mut().find(|p| p.id() == id)
    }

    pub fn acceptor(&self, id: usize) -> Option<&Acceptor<T>> {
        self.acceptors.iter().find(|a| a.id() == id)
    }

    pub fn acceptor_mut(&mut self, id: usize) -> Option<&mut Acceptor<T>> {
        self.acceptors.iter_mut().find(|a| a.id() == id)
    }

    /// The proposer currently driving proposal number `n`, if any.
    pub fn proposer_by_n(&self, n: u64) -> Option<&Proposer<T>> {
        self.proposers.iter().find(|p| p.n() == Some(n))
    }

    pub fn proposers(&self) -> &[Proposer<T>] {
        &self.proposers
    }

    pub fn acceptors(&self) -> &[Acceptor<T>] {
        &self.acceptors
    }

    pub fn acceptor_ids(&self) -> Vec<usize> {
        self.acceptors.iter().map(|a| a.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind::*;
    use crate::message::NodeId::*;

    fn network() -> Network<i64> {
        Network::new(2, 3)
    }

    #[test]
    fn extraction_is_fifo_for_live_endpoints() {
        let mut net = network();
        net.queue_message(Message::new(Proposer(1), Acceptor(1), Prepare));
        net.queue_message(Message::new(Proposer(1), Acceptor(2), Prepare));
        assert_eq!(net.extract_message().unwrap().destination, Acceptor(1));
        assert_eq!(net.extract_message().unwrap().destination, Acceptor(2));
        assert_eq!(net.extract_message(), None);
    }

    #[test]
    fn failed_endpoints_block_extraction_but_not_order() {
        let mut net = network();
        net.queue_message(Message::new(Proposer(1), Acceptor(1), Prepare));
        net.queue_message(Message::new(Proposer(2), Acceptor(2), Prepare));
        net.set_failed(Proposer(1), true);

        // The head is blocked, so the scan skips over it without reordering.
        assert_eq!(net.extract_message().unwrap().source, Some(Proposer(2)));
        assert_eq!(net.extract_message(), None);
        assert_eq!(net.pending(), 1);

        net.set_failed(Proposer(1), false);
        assert_eq!(net.extract_message().unwrap().source, Some(Proposer(1)));
    }

    #[test]
    fn blocked_by_failed_destination() {
        let mut net = network();
        net.queue_message(Message::new(Acceptor(1), Proposer(1), Promise));
        net.set_failed(Proposer(1), true);
        assert_eq!(net.extract_message(), None);
        net.set_failed(Proposer(1), false);
        assert!(net.extract_message().is_some());
    }

    #[test]
    fn propose_is_always_eligible() {
        let mut net = network();
        net.set_failed(Proposer(1), true);
        net.queue_message(Message::propose(Proposer(1)));
        assert_eq!(net.extract_message().unwrap().kind, Propose);
    }

    #[test]
    fn liveness_flips_are_idempotent() {
        let mut net = network();
        assert!(net.set_failed(Acceptor(2), true));
        assert!(net.set_failed(Acceptor(2), true));
        assert!(net.acceptor(2).unwrap().failed);
        assert!(net.set_failed(Acceptor(2), false));
        assert!(net.set_failed(Acceptor(2), false));
        assert!(!net.acceptor(2).unwrap().failed);
        assert!(!net.set_failed(Acceptor(9), true));
    }

    #[test]
    fn lookup_by_proposal_number() {
        let mut net = network();
        assert!(net.proposer_by_n(1).is_none());
        net.proposer_mut(2).unwrap().start_proposal(1, 42);
        assert_eq!(net.proposer_by_n(1).unwrap().id(), 2);
    }
}
