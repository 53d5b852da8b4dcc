extern crate config;
extern crate env_logger;
#[macro_use]
extern crate log;
extern crate rand;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate toml;

pub mod configurations;
pub mod event;
pub mod message;
pub mod network;
pub mod report;
pub mod scenario;
pub mod single_paxos;
