//! A module that contains functions required to read, parse and return the configuration settings
//! from the file `Config.toml` at the root of this crate.

use config::{Config, File};

/// The cluster shape and the simulation knobs. The acceptor count and the default tick budget are
/// derived rather than configured, so a scenario file cannot ask for a cluster that tolerates
/// fewer failures than it claims.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub cluster: Cluster,

    #[serde(default)]
    pub simulation: Simulation,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Cluster {
    pub proposers: usize,

    // The number of acceptor failures the cluster must survive.
    pub tolerance: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Simulation {
    pub max_duration: Option<u64>,

    pub seed: Option<u64>,
}

impl Settings {
    /// The system requires 2f+1 acceptors to tolerate the failure of f of them.
    pub fn no_of_acceptors(&self) -> usize {
        2 * self.cluster.tolerance + 1
    }

    pub fn max_duration(&self) -> u64 {
        self.simulation
            .max_duration
            .unwrap_or(30 * self.no_of_acceptors() as u64)
    }

    pub fn seed(&self) -> Option<u64> {
        self.simulation.seed
    }
}

// TODO: propagate configuration errors instead of panicking.
pub fn get_settings(file_name: &str) -> Settings {
    let mut c = Config::default();
    c.merge(File::with_name(file_name)).unwrap();
    c.try_into::<Settings>().expect("Could not try_into")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_cluster_values() {
        let settings = Settings {
            cluster: Cluster {
                proposers: 2,
                tolerance: 1,
            },
            simulation: Simulation::default(),
        };
        assert_eq!(settings.no_of_acceptors(), 3);
        assert_eq!(settings.max_duration(), 90);
        assert_eq!(settings.seed(), None);
    }

    #[test]
    fn explicit_duration_wins_over_the_derived_one() {
        let settings = Settings {
            cluster: Cluster {
                proposers: 2,
                tolerance: 2,
            },
            simulation: Simulation {
                max_duration: Some(40),
                seed: Some(7),
            },
        };
        assert_eq!(settings.no_of_acceptors(), 5);
        assert_eq!(settings.max_duration(), 40);
        assert_eq!(settings.seed(), Some(7));
    }
}
