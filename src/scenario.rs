//! A module which reads scenario files: the ordered event lists that drive a simulation. A
//! scenario is a TOML document with one `[[event]]` table per event, e.g.
//!
//! ```toml
//! [[event]]
//! tick = 0
//! request = 1
//! value = 42
//!
//! [[event]]
//! tick = 8
//! fail = ["P1"]
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::event::Event;
use crate::message::NodeId;

// The on-disk shape. Node references are strings like "P1" so scenarios read the way traces do;
// they are resolved into NodeId values here, before the simulator ever sees them.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct RawScenario<T> {
    #[serde(default = "Vec::new")]
    event: Vec<RawEvent<T>>,
}

#[derive(Debug, Deserialize)]
struct RawEvent<T> {
    tick: Option<u64>,

    #[serde(default)]
    fail: Vec<String>,

    #[serde(default)]
    recover: Vec<String>,

    request: Option<usize>,

    value: Option<T>,
}

/// A problem with a scenario file. Parse and node-reference errors carry enough context to point
/// at the offending entry.
#[derive(Debug)]
pub enum ScenarioError {
    Io(io::Error),
    Parse(toml::de::Error),
    BadNode { event: usize, reference: String },
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ScenarioError::Io(ref error) => write!(f, "could not read the scenario: {}", error),
            ScenarioError::Parse(ref error) => write!(f, "could not parse the scenario: {}", error),
            ScenarioError::BadNode { event, ref reference } => {
                write!(f, "event {} names an unparsable node {:?}", event, reference)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<io::Error> for ScenarioError {
    fn from(error: io::Error) -> Self {
        ScenarioError::Io(error)
    }
}

impl From<toml::de::Error> for ScenarioError {
    fn from(error: toml::de::Error) -> Self {
        ScenarioError::Parse(error)
    }
}

/// Reads and parses the scenario file at `path`.
pub fn load_scenario<T, P>(path: P) -> Result<Vec<Event<T>>, ScenarioError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let text = fs::read_to_string(path)?;
    parse_scenario(&text)
}

/// Parses a scenario document. The events keep the order they have in the file, which is the
/// order the simulator will consult them in.
pub fn parse_scenario<T>(text: &str) -> Result<Vec<Event<T>>, ScenarioError>
where
    T: DeserializeOwned,
{
    let raw: RawScenario<T> = toml::from_str(text)?;

    let mut events = Vec::with_capacity(raw.event.len());
    for (index, raw_event) in raw.event.into_iter().enumerate() {
        events.push(Event {
            tick: raw_event.tick,
            failures: parse_nodes(index, raw_event.fail)?,
            recoveries: parse_nodes(index, raw_event.recover)?,
            request: raw_event.request,
            proposed_value: raw_event.value,
        });
    }
    Ok(events)
}

fn parse_nodes(event: usize, references: Vec<String>) -> Result<Vec<NodeId>, ScenarioError> {
    references
        .into_iter()
        .map(|reference| {
            reference
                .parse()
                .map_err(|_| ScenarioError::BadNode { event, reference })
        })
        .collect()
}
