//! A module which contains the definition of the node identities, the messages exchanged in the
//! single-decree Paxos algorithm, and the log records nodes keep about the messages they process.

use std::fmt;
use std::str::FromStr;

/// The identity of a node in the cluster. Ids are 1-based within each role, so the first proposer
/// is `P1` and the third acceptor is `A3`. Everything that needs to refer to a node (messages, log
/// records, quorum sets) carries one of these instead of a reference to the node itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeId {
    Proposer(usize),
    Acceptor(usize),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NodeId::Proposer(id) => write!(f, "P{}", id),
            NodeId::Acceptor(id) => write!(f, "A{}", id),
        }
    }
}

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 2 || !s.is_char_boundary(1) {
            return Err(ParseNodeIdError(s.to_string()));
        }
        let (role, id) = s.split_at(1);
        let id: usize = id.parse().map_err(|_| ParseNodeIdError(s.to_string()))?;
        match role {
            "P" | "p" => Ok(NodeId::Proposer(id)),
            "A" | "a" => Ok(NodeId::Acceptor(id)),
            _ => Err(ParseNodeIdError(s.to_string())),
        }
    }
}

/// The error returned when a node reference such as `P1` or `A3` cannot be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNodeIdError(pub String);

impl fmt::Display for ParseNodeIdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "not a node reference (expected e.g. P1 or A3): {:?}", self.0)
    }
}

impl std::error::Error for ParseNodeIdError {}

/// An enum which contains all types of messages which nodes, in the Paxos algorithm, can exchange.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Propose,
    Prepare,
    Promise,
    Accept,
    Accepted,
    Rejected,
}

impl MessageKind {
    pub fn name(&self) -> &'static str {
        match *self {
            MessageKind::Propose => "PROPOSE",
            MessageKind::Prepare => "PREPARE",
            MessageKind::Promise => "PROMISE",
            MessageKind::Accept => "ACCEPT",
            MessageKind::Accepted => "ACCEPTED",
            MessageKind::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A message in flight. It carries no payload of its own: the receiver reads the proposal number
/// and value from the source node's state at delivery time, so two messages from the same node are
/// distinguished only by what that node looks like when they arrive. A client PROPOSE has no
/// source, since it enters the system from outside the cluster.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Message {
    pub source: Option<NodeId>,
    pub destination: NodeId,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(source: NodeId, destination: NodeId, kind: MessageKind) -> Self {
        Message {
            source: Some(source),
            destination,
            kind,
        }
    }

    /// A client PROPOSE, delivered directly to the proposer named as its destination.
    pub fn propose(destination: NodeId) -> Self {
        Message {
            source: None,
            destination,
            kind: MessageKind::Propose,
        }
    }
}

/// One entry of a node's append-only log. `n` and `value` are the recording node's own state at
/// the time of the append, which is what makes logs usable as the ground truth for "what had this
/// node seen by then?" queries.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord<T> {
    pub source: Option<NodeId>,
    pub destination: NodeId,
    pub kind: MessageKind,
    pub n: Option<u64>,
    pub value: Option<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_render_and_parse() {
        assert_eq!(NodeId::Proposer(1).to_string(), "P1");
        assert_eq!(NodeId::Acceptor(3).to_string(), "A3");
        assert_eq!("P2".parse::<NodeId>().unwrap(), NodeId::Proposer(2));
        assert_eq!("a1".parse::<NodeId>().unwrap(), NodeId::Acceptor(1));
        assert!("X7".parse::<NodeId>().is_err());
        assert!("P".parse::<NodeId>().is_err());
    }

    #[test]
    fn client_propose_has_no_source() {
        let m = Message::propose(NodeId::Proposer(1));
        assert_eq!(m.source, None);
        assert_eq!(m.kind, MessageKind::Propose);
    }
}
