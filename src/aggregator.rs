//! Running per-status counts and the observable time series.

use serde::{Deserialize, Serialize};
use strum::EnumCount;

use crate::population::{InfectionStatus, Population};

/// The population counts at one point in time. This is the row type of the
/// output time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time: f64,
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl Observation {
    #[must_use]
    pub fn count(&self, status: InfectionStatus) -> usize {
        match status {
            InfectionStatus::Susceptible => self.susceptible,
            InfectionStatus::Infected => self.infected,
            InfectionStatus::Recovered => self.recovered,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.recovered
    }
}

/// Samples a piecewise-constant series at `time` by "last value held".
///
/// `history` must be ordered by time. Returns `None` before the first
/// record. The returned observation carries the queried `time`.
#[must_use]
pub fn value_at(history: &[Observation], time: f64) -> Option<Observation> {
    let index = history.partition_point(|observation| observation.time <= time);
    let held = history.get(index.checked_sub(1)?)?;
    Some(Observation { time, ..*held })
}

/// Maintains the number of individuals in each status and the recorded history.
#[derive(Debug, Clone)]
pub struct Aggregator {
    counts: [usize; InfectionStatus::COUNT],
    population_size: usize,
    history: Vec<Observation>,
}

impl Aggregator {
    /// Starts counting from the current statuses of `population`
    #[must_use]
    pub fn new(population: &Population) -> Aggregator {
        let mut counts = [0; InfectionStatus::COUNT];
        for individual in population.iter() {
            counts[individual.status().index()] += 1;
        }
        Aggregator {
            counts,
            population_size: population.len(),
            history: Vec::new(),
        }
    }

    /// Moves one individual from the `old` bucket to the `new` one.
    ///
    /// # Panics
    ///
    /// Panics if the `old` bucket is empty, which would break population
    /// conservation.
    pub fn on_transition(&mut self, old: InfectionStatus, new: InfectionStatus) {
        let bucket = &mut self.counts[old.index()];
        *bucket = bucket.checked_sub(1).unwrap_or_else(|| {
            panic!("scheduling invariant violated: no {old} individual left to move to {new}")
        });
        self.counts[new.index()] += 1;
        self.check_conservation();
    }

    #[must_use]
    pub fn count(&self, status: InfectionStatus) -> usize {
        self.counts[status.index()]
    }

    #[must_use]
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    #[must_use]
    pub fn snapshot(&self, time: f64) -> Observation {
        Observation {
            time,
            susceptible: self.count(InfectionStatus::Susceptible),
            infected: self.count(InfectionStatus::Infected),
            recovered: self.count(InfectionStatus::Recovered),
        }
    }

    /// Appends the current counts to the history
    ///
    /// # Panics
    ///
    /// Panics if `time` is earlier than the last recorded time.
    pub fn record(&mut self, time: f64) -> Observation {
        if let Some(last) = self.history.last() {
            if time < last.time {
                panic!(
                    "scheduling invariant violated: recording at {} after {}",
                    time, last.time
                );
            }
        }
        let observation = self.snapshot(time);
        self.history.push(observation);
        observation
    }

    #[must_use]
    pub fn history(&self) -> &[Observation] {
        &self.history
    }

    /// The counts in force at `time`, by "last value held"
    #[must_use]
    pub fn value_at(&self, time: f64) -> Option<Observation> {
        value_at(&self.history, time)
    }

    fn check_conservation(&self) {
        let total: usize = self.counts.iter().sum();
        if total != self.population_size {
            panic!(
                "scheduling invariant violated: counts sum to {} but population is {}",
                total, self.population_size
            );
        }
    }
}
