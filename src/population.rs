//! Individuals and the arena that owns them.
//!
//! Individuals are created once, when the simulation is constructed, and live
//! until it is dropped. They are addressed by a stable `PersonId` (an index
//! into the arena) so that events and other individuals refer to them by id
//! rather than by reference.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter};

use crate::plan::PlanId;

/// Identifies an individual. Ids are dense: `0..population_size`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(usize);

impl PersonId {
    #[must_use]
    pub fn new(index: usize) -> PersonId {
        PersonId(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Epidemiological status. Adding a compartment here forces every `match`
/// in the transition logic to handle it.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumCount,
    EnumIter,
    strum::Display,
)]
pub enum InfectionStatus {
    Susceptible,
    Infected,
    Recovered,
}

impl InfectionStatus {
    /// Position of this status in per-status count arrays
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, InfectionStatus::Recovered)
    }

    /// Whether moving from `self` to `next` goes forward through S → I → R
    #[must_use]
    pub fn precedes(self, next: InfectionStatus) -> bool {
        self < next
    }
}

/// Per-agent state.
#[derive(Debug, Clone)]
pub struct Individual {
    id: PersonId,
    status: InfectionStatus,
    /// Incremented on every status change. Events carry the value current at
    /// the time they were scheduled; a mismatch on delivery marks them stale.
    generation: u64,
    /// The one outstanding self-scheduled event, if any.
    pending: Option<PlanId>,
}

impl Individual {
    #[must_use]
    pub fn id(&self) -> PersonId {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> InfectionStatus {
        self.status
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn pending_handle(&self) -> Option<PlanId> {
        self.pending
    }
}

/// Index-addressable arena of individuals.
#[derive(Debug, Default)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    #[must_use]
    pub fn new() -> Population {
        Population::default()
    }

    /// Adds an individual with the given initial status and returns its id
    pub fn add_individual(&mut self, status: InfectionStatus) -> PersonId {
        let id = PersonId(self.individuals.len());
        self.individuals.push(Individual {
            id,
            status,
            generation: 0,
            pending: None,
        });
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `person_id` was not issued by this population.
    #[must_use]
    pub fn get(&self, person_id: PersonId) -> &Individual {
        &self.individuals[person_id.0]
    }

    #[must_use]
    pub fn status(&self, person_id: PersonId) -> InfectionStatus {
        self.get(person_id).status
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual> {
        self.individuals.iter()
    }

    /// Changes the status of an individual, returning the previous status.
    ///
    /// Bumps the generation counter, which makes every event scheduled for
    /// the individual before this call stale, and forgets the pending handle.
    pub(crate) fn set_status(
        &mut self,
        person_id: PersonId,
        status: InfectionStatus,
    ) -> InfectionStatus {
        let individual = &mut self.individuals[person_id.0];
        let previous = individual.status;
        individual.status = status;
        individual.generation += 1;
        individual.pending = None;
        previous
    }

    pub(crate) fn set_pending(&mut self, person_id: PersonId, handle: Option<PlanId>) {
        self.individuals[person_id.0].pending = handle;
    }

    /// Maps a draw `k` from `[1, n - 1]` onto an individual other than
    /// `person_id`, uniformly.
    #[must_use]
    pub fn alter(&self, person_id: PersonId, k: usize) -> PersonId {
        debug_assert!(k >= 1 && k < self.len(), "alter draw {k} out of range");
        let index = k - 1;
        if index >= person_id.0 {
            PersonId(index + 1)
        } else {
            PersonId(index)
        }
    }
}
