//! Events stored in the scheduler's queue.
//!
//! An event never changes once created. The time and the tie-breaking
//! sequence number are kept by the queue entry (`Plan<Event>`); the event
//! itself says what should happen and to whom.

use crate::population::{InfectionStatus, Individual, PersonId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A susceptible individual meets a uniformly chosen alter
    ContactAttempt,
    /// Markovian recovery, timed by an exponential clock
    Recovery,
    /// Recovery whose time was fixed in advance by a delay channel
    DelayedCompletion,
    /// An externally forced status change (importation, vaccination, treatment)
    Intervention(InfectionStatus),
}

impl EventKind {
    /// Self-scheduled events belong to the subject's own process and go
    /// stale when the subject changes status. Interventions are external.
    #[must_use]
    pub fn is_self_scheduled(self) -> bool {
        !matches!(self, EventKind::Intervention(_))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub subject: PersonId,
    /// The subject's generation counter when the event was scheduled
    pub generation: u64,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, subject: &Individual) -> Event {
        Event {
            kind,
            subject: subject.id(),
            generation: subject.generation(),
        }
    }

    /// True if the subject changed status after this event was scheduled
    #[must_use]
    pub fn is_stale(&self, subject: &Individual) -> bool {
        self.kind.is_self_scheduled() && self.generation != subject.generation()
    }
}
