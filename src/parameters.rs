//! Construction-time configuration.
//!
//! Parameters can be built in code or loaded from a JSON file:
//!
//! ```json
//! {
//!     "population_size": 1000,
//!     "initial_infected": 10,
//!     "contact_rate": 10.0,
//!     "transmission_probability": 0.05,
//!     "recovery": { "markovian": { "rate": 0.25 } },
//!     "horizon": 40.0,
//!     "seed": 1234
//! }
//! ```
//!
//! A delayed (non-Markovian) recovery replaces the `recovery` entry with, e.g.,
//! `{ "delayed": { "infectious_period": { "fixed": { "duration": 4.0 } } } }`.
//! Optional fields are `initial_recovered` (default 0) and
//! `observation_times` (default: every transition is an observation).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::delay::InfectiousPeriod;
use crate::error::SirError;
use crate::log::debug;

/// How infected individuals recover
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Exponentially distributed infectious period with the given rate (γ)
    Markovian { rate: f64 },
    /// Infectious period drawn once at infection and completed through a delay channel
    Delayed { infectious_period: InfectiousPeriod },
}

impl Recovery {
    #[must_use]
    pub fn mean_infectious_period(&self) -> f64 {
        match self {
            Recovery::Markovian { rate } => 1.0 / rate,
            Recovery::Delayed { infectious_period } => infectious_period.mean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameters {
    /// Number of individuals (N)
    pub population_size: usize,
    /// Individuals infected at time zero (I0)
    pub initial_infected: usize,
    /// Individuals immune at time zero
    #[serde(default)]
    pub initial_recovered: usize,
    /// Per-individual rate of contact-seeking (c)
    pub contact_rate: f64,
    /// Probability of transmission given contact with an infected alter (β)
    pub transmission_probability: f64,
    pub recovery: Recovery,
    /// The run stops once the next event is later than this (tmax)
    pub horizon: f64,
    pub seed: u64,
    /// Increasing times at which the step-function output is sampled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_times: Option<Vec<f64>>,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            population_size: 1000,
            initial_infected: 10,
            initial_recovered: 0,
            contact_rate: 10.0,
            transmission_probability: 0.05,
            recovery: Recovery::Markovian { rate: 0.25 },
            horizon: 40.0,
            seed: 1234,
            observation_times: None,
        }
    }
}

impl Parameters {
    /// Reads and validates parameters from a JSON file
    ///
    /// # Errors
    ///
    /// Returns a `SirError` if the file cannot be read or parsed, or if the
    /// parameters are invalid.
    pub fn from_json_file(path: &Path) -> Result<Parameters, SirError> {
        debug!("loading parameters from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Parameters::from_json_str(&contents)
    }

    /// Parses and validates parameters from a JSON string
    ///
    /// # Errors
    ///
    /// Returns a `SirError` if parsing fails or the parameters are invalid.
    pub fn from_json_str(contents: &str) -> Result<Parameters, SirError> {
        let parameters: Parameters = serde_json::from_str(contents)?;
        parameters.validate()?;
        Ok(parameters)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Parameters {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_observation_times(mut self, observation_times: Vec<f64>) -> Parameters {
        self.observation_times = Some(observation_times);
        self
    }

    /// Expected number of secondary infections from one infected individual
    /// in a fully susceptible population: β · c · E[infectious period].
    #[must_use]
    pub fn basic_reproduction_number(&self) -> f64 {
        self.transmission_probability * self.contact_rate * self.recovery.mean_infectious_period()
    }

    /// Checks every parameter. Nothing is clamped.
    ///
    /// # Errors
    ///
    /// Returns `SirError::ConfigurationError` naming the first invalid parameter.
    pub fn validate(&self) -> Result<(), SirError> {
        if self.population_size == 0 {
            return Err(SirError::configuration(
                "population_size",
                "must be at least 1",
            ));
        }
        if self.initial_infected > self.population_size {
            return Err(SirError::configuration(
                "initial_infected",
                format!(
                    "{} exceeds population_size {}",
                    self.initial_infected, self.population_size
                ),
            ));
        }
        match self.initial_infected.checked_add(self.initial_recovered) {
            Some(seeded) if seeded <= self.population_size => {}
            _ => {
                return Err(SirError::configuration(
                    "initial_recovered",
                    format!(
                        "{} with {} initial_infected exceeds population_size {}",
                        self.initial_recovered, self.initial_infected, self.population_size
                    ),
                ));
            }
        }
        if !(self.contact_rate.is_finite() && self.contact_rate >= 0.0) {
            return Err(SirError::configuration(
                "contact_rate",
                format!("must be finite and non-negative, got {}", self.contact_rate),
            ));
        }
        if !(0.0..=1.0).contains(&self.transmission_probability) {
            return Err(SirError::configuration(
                "transmission_probability",
                format!("must lie in [0, 1], got {}", self.transmission_probability),
            ));
        }
        match self.recovery {
            Recovery::Markovian { rate } => {
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(SirError::configuration(
                        "recovery.markovian.rate",
                        format!("must be finite and positive, got {rate}"),
                    ));
                }
                if !rate.recip().is_finite() {
                    return Err(SirError::configuration(
                        "recovery.markovian.rate",
                        format!("{rate} gives an infinite mean infectious period"),
                    ));
                }
            }
            Recovery::Delayed { infectious_period } => infectious_period.validate()?,
        }
        if !(self.horizon.is_finite() && self.horizon >= 0.0) {
            return Err(SirError::configuration(
                "horizon",
                format!("must be finite and non-negative, got {}", self.horizon),
            ));
        }
        if let Some(observation_times) = &self.observation_times {
            validate_observation_times(observation_times, self.horizon)?;
        }
        Ok(())
    }
}

fn validate_observation_times(observation_times: &[f64], horizon: f64) -> Result<(), SirError> {
    for &time in observation_times {
        if !(time.is_finite() && (0.0..=horizon).contains(&time)) {
            return Err(SirError::configuration(
                "observation_times",
                format!("{time} is outside [0, {horizon}]"),
            ));
        }
    }
    if let Some(pair) = observation_times.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(SirError::configuration(
            "observation_times",
            format!("must be strictly increasing, found {} then {}", pair[0], pair[1]),
        ));
    }
    Ok(())
}

/// Evenly spaced observation times `0, step, 2 step, ...` up to and including `horizon`
///
/// # Errors
///
/// Returns a `SirError::ConfigurationError` if `step` is not positive or
/// `horizon` is negative.
pub fn observation_grid(horizon: f64, step: f64) -> Result<Vec<f64>, SirError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(SirError::configuration(
            "observation step",
            format!("must be finite and positive, got {step}"),
        ));
    }
    if !(horizon.is_finite() && horizon >= 0.0) {
        return Err(SirError::configuration(
            "horizon",
            format!("must be finite and non-negative, got {horizon}"),
        ));
    }
    // Multiplying rather than accumulating keeps the grid free of drift
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (horizon / step + 1e-9).floor() as u64;
    #[allow(clippy::cast_precision_loss)]
    Ok((0..=steps).map(|k| k as f64 * step).collect())
}
