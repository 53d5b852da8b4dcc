//! A script which asks for a value on the standard input and simulates one proposer driving it
//! through an otherwise quiet cluster.
//!
//! You can run this example as follows
//!     RUST_LOG=single_paxos=info cargo run --example propose

extern crate env_logger;
extern crate single_paxos;
#[macro_use]
extern crate text_io;

use std::io;
use std::io::prelude::*;

use single_paxos::configurations::get_settings;
use single_paxos::event::Event;
use single_paxos::single_paxos::Paxos;

fn main() {
    env_logger::init();

    let settings = get_settings("Config");

    print!("Enter the proposal: ");
    io::stdout().flush().ok().expect("Could not flush stdout"); // print! is not very clever.
    let value: i64 = read!();

    let mut paxos = Paxos::new(
        settings.cluster.proposers,
        settings.no_of_acceptors(),
        settings.max_duration(),
        vec![Event::proposal(0, 1, value)],
        settings.seed(),
    )
    .expect("a single proposal fits any configured cluster");

    print!("{}", paxos.run());
}
