pub use crate::aggregator::Observation;
pub use crate::context::{simulate, Context, SimulationOutput, TransitionRecord};
pub use crate::define_rng;
pub use crate::delay::InfectiousPeriod;
pub use crate::error::SirError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::{Parameters, Recovery};
pub use crate::population::{InfectionStatus, PersonId};
pub use crate::random::ContextRandomExt;
pub use crate::replicates::{run_replicates, ReplicateSummary};
