//! An example which simulates the canonical crash-and-recovery schedule on the configured
//! cluster.
//!
//! Run this example as follows
//!     RUST_LOG=single_paxos=info cargo run --example simulate

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate single_paxos;

use single_paxos::configurations::get_settings;
use single_paxos::event::Event;
use single_paxos::message::NodeId;
use single_paxos::single_paxos::Paxos;

fn main() {
    env_logger::init();

    let settings = get_settings("Config");
    info!("Configurations = {:?}\n", settings);

    // One proposer proposes unopposed, fails, and a second proposer takes over with a different
    // value; the first recovers and converges on the value the cluster already bound.
    let events = vec![
        Event::proposal(0, 1, 42),
        Event::failure(8, vec![NodeId::Proposer(1)]),
        Event::proposal(11, 2, 37),
        Event::recovery(26, vec![NodeId::Proposer(1)]),
    ];

    let mut paxos = Paxos::<i64>::new(
        settings.cluster.proposers,
        settings.no_of_acceptors(),
        settings.max_duration(),
        events,
        settings.seed(),
    )
    .expect("the built-in schedule fits the configured cluster");

    print!("{}", paxos.run());
}
