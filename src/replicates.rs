//! Monte Carlo replication.
//!
//! Each replicate is an independent simulation with its own seed and its own
//! `Context`; nothing is shared between them, so they run in parallel on a
//! `rayon` thread pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::context::{simulate, SimulationOutput};
use crate::error::SirError;
use crate::log::info;
use crate::parameters::Parameters;

/// The output of one replicate and the seed that produced it
#[derive(Debug, Clone)]
pub struct Replicate {
    pub seed: u64,
    pub output: SimulationOutput,
}

/// One row of the replicate summary report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplicateSummary {
    pub seed: u64,
    pub final_susceptible: usize,
    pub final_infected: usize,
    pub final_recovered: usize,
    pub peak_infected: usize,
    /// Earliest time at which `peak_infected` was observed
    pub peak_time: f64,
    /// Fraction of the population infected at any point, initial cases included
    pub final_size: f64,
    pub events_processed: usize,
    pub stale_events: usize,
    pub censored: usize,
}

impl ReplicateSummary {
    #[must_use]
    pub fn new(parameters: &Parameters, seed: u64, output: &SimulationOutput) -> ReplicateSummary {
        let peak_infected = output.peak_infected();
        let peak_time = output
            .series
            .iter()
            .find(|observation| observation.infected == peak_infected)
            .map_or(0.0, |observation| observation.time);
        let last = output.final_observation();
        let ever_infected = parameters.initial_infected + output.infections();
        #[allow(clippy::cast_precision_loss)]
        let final_size = ever_infected as f64 / parameters.population_size as f64;
        ReplicateSummary {
            seed,
            final_susceptible: last.map_or(0, |observation| observation.susceptible),
            final_infected: last.map_or(0, |observation| observation.infected),
            final_recovered: last.map_or(0, |observation| observation.recovered),
            peak_infected,
            peak_time,
            final_size,
            events_processed: output.events_processed,
            stale_events: output.stale_events,
            censored: output.censored,
        }
    }
}

/// Runs one simulation per seed, `threads` at a time.
///
/// Results are returned in the order of `seeds`. Each run uses `parameters`
/// with its seed replaced.
///
/// # Errors
///
/// Returns a `SirError::ConfigurationError` if `parameters` are invalid,
/// `threads` is zero, or the thread pool cannot be built.
pub fn run_replicates(
    parameters: &Parameters,
    seeds: &[u64],
    threads: usize,
) -> Result<Vec<Replicate>, SirError> {
    parameters.validate()?;
    if threads == 0 {
        return Err(SirError::configuration("threads", "must be at least 1"));
    }
    info!("running {} replicates on {} threads", seeds.len(), threads);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|error| SirError::configuration("threads", error))?;

    pool.install(|| {
        seeds
            .par_iter()
            .map(|&seed| -> Result<Replicate, SirError> {
                let output = simulate(parameters.clone().with_seed(seed))?;
                Ok(Replicate { seed, output })
            })
            .collect()
    })
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::parameters::Recovery;

    fn small() -> Parameters {
        Parameters {
            population_size: 200,
            initial_infected: 5,
            initial_recovered: 0,
            contact_rate: 4.0,
            transmission_probability: 0.2,
            recovery: Recovery::Markovian { rate: 0.5 },
            horizon: 30.0,
            seed: 0,
            observation_times: None,
        }
    }

    #[test]
    fn replicates_come_back_in_seed_order() {
        let seeds = [9, 3, 5, 1];
        let replicates = run_replicates(&small(), &seeds, 2).unwrap();
        let returned: Vec<u64> = replicates.iter().map(|replicate| replicate.seed).collect();
        assert_eq!(returned, seeds);
    }

    #[test]
    fn replicate_matches_a_single_run_with_the_same_seed() {
        let replicates = run_replicates(&small(), &[17, 18], 2).unwrap();
        let single = simulate(small().with_seed(17)).unwrap();
        assert_eq!(replicates[0].output, single);
        assert_ne!(replicates[0].output.transitions, replicates[1].output.transitions);
    }

    #[test]
    fn zero_threads_is_a_configuration_error() {
        let result = run_replicates(&small(), &[1], 0);
        assert!(matches!(result, Err(SirError::ConfigurationError(_))));
    }

    #[test]
    fn summary_reports_final_state() {
        let parameters = small();
        let output = simulate(parameters.clone().with_seed(4)).unwrap();
        let summary = ReplicateSummary::new(&parameters, 4, &output);
        assert_eq!(
            summary.final_susceptible + summary.final_infected + summary.final_recovered,
            200
        );
        assert!(summary.peak_infected >= 5);
        assert!(summary.final_size >= 5.0 / 200.0 && summary.final_size <= 1.0);
        assert_eq!(summary.final_susceptible, 200 - 5 - output.infections());
    }
}
