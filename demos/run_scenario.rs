//! A script used to run a scenario file against the configured cluster.
//!
//! You can run this example as follows
//!     RUST_LOG=single_paxos=info cargo run --example run_scenario -- scenarios/crash_recovery.toml Config

extern crate env_logger;
#[macro_use]
extern crate log;
extern crate single_paxos;

use std::env;

use single_paxos::configurations::get_settings;
use single_paxos::scenario::load_scenario;
use single_paxos::single_paxos::Paxos;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    info!("{:?}", args);

    match args.len() {
        3 => {
            let events = match load_scenario::<i64, _>(&args[1]) {
                Ok(events) => events,
                Err(error) => {
                    eprintln!("Error: {}", error);
                    return;
                }
            };

            let settings = get_settings(&args[2]);
            match Paxos::new(
                settings.cluster.proposers,
                settings.no_of_acceptors(),
                settings.max_duration(),
                events,
                settings.seed(),
            ) {
                Ok(mut paxos) => print!("{}", paxos.run()),
                Err(error) => eprintln!("Error: {}", error),
            }
        }
        _ => {
            panic!("Expected 2 arguments (excluding file name)");
        }
    }
}
