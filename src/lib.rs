//! A discrete-event engine for individual-based SIR epidemic simulation
//!
//! Every individual in a closed, fully mixed population runs its own small
//! process: susceptible individuals attempt contacts with uniformly chosen
//! alters and may be infected by them, infected individuals recover after an
//! exponential or arbitrarily distributed infectious period, and recovered
//! individuals stay immune. The per-individual processes are interleaved in
//! simulated-time order by a single-threaded scheduler.
//!
//! The central object is the [`Context`], which owns all simulation state and
//! provides:
//! * a clock that only moves forward
//! * a time-ordered event queue with first-in-first-out tie breaking
//! * independent, reproducible random streams per purpose
//! * running S, I and R counts and the step-function time series
//!
//! ```rust
//! use ixa_sir::prelude::*;
//!
//! let parameters = Parameters {
//!     population_size: 500,
//!     initial_infected: 5,
//!     ..Parameters::default()
//! };
//! let output = simulate(parameters).unwrap();
//! let last = output.final_observation().unwrap();
//! assert_eq!(last.susceptible + last.infected + last.recovered, 500);
//! ```
//!
//! Runs are fully determined by their parameters, seed included.
pub mod aggregator;
pub mod clock;
pub mod context;
pub mod delay;
pub mod error;
pub mod event;
pub mod hashing;
pub mod log;
pub mod numeric;
pub mod parameters;
pub mod plan;
pub mod population;
pub mod prelude;
mod process;
pub mod random;
pub mod replicates;
pub mod report;
pub mod runner;

pub use context::{simulate, Context, SimulationOutput, TransitionRecord};
pub use error::SirError;
pub use parameters::{Parameters, Recovery};
pub use population::{InfectionStatus, PersonId};

// Used by `define_rng!`
pub use paste;
