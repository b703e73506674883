//! Per-individual transition logic.
//!
//! Every individual runs the same small process: a susceptible individual
//! keeps attempting contacts until one of them infects it, an infected
//! individual waits for its recovery, and a recovered individual does
//! nothing. `resume` is the single entry point; it is handed one event for
//! one individual, performs at most one status change, and schedules that
//! individual's next self-event.

use crate::context::Context;
use crate::define_rng;
use crate::event::{Event, EventKind};
use crate::log::trace;
use crate::parameters::Recovery;
use crate::population::{InfectionStatus, PersonId};
use crate::random::ContextRandomExt;

// Waiting times between contact attempts
define_rng!(ContactRng);
// Choice of alter and the transmission trial
define_rng!(TransmissionRng);
// Infectious period durations
define_rng!(RecoveryRng);

/// Advances the subject of `event` by one step.
///
/// `event` must not be stale.
///
/// # Panics
///
/// Panics if the event kind cannot happen to an individual with the subject's
/// current status.
pub(crate) fn resume(context: &mut Context, event: Event) {
    let person_id = event.subject;
    let status = context.get_status(person_id);
    match (status, event.kind) {
        (_, EventKind::Intervention(target)) => intervene(context, person_id, target),
        (InfectionStatus::Susceptible, EventKind::ContactAttempt) => {
            attempt_contact(context, person_id);
        }
        (InfectionStatus::Infected, EventKind::Recovery | EventKind::DelayedCompletion) => {
            context.transition(person_id, InfectionStatus::Recovered);
        }
        (InfectionStatus::Recovered, kind) => {
            trace!("person {person_id} is recovered; ignoring {kind:?}");
        }
        (
            InfectionStatus::Susceptible,
            EventKind::Recovery | EventKind::DelayedCompletion,
        )
        | (InfectionStatus::Infected, EventKind::ContactAttempt) => {
            panic!(
                "scheduling invariant violated: {:?} delivered to {} person {}",
                event.kind, status, person_id
            );
        }
    }
}

/// Schedules the next contact attempt of a susceptible individual.
///
/// Nothing is scheduled when there is no one to contact or the contact rate
/// is zero.
pub(crate) fn schedule_contact_attempt(context: &mut Context, person_id: PersonId) {
    if context.get_population().len() < 2 {
        return;
    }
    let contact_rate = context.get_parameters().contact_rate;
    let time = context.get_current_time() + context.sample_exponential(ContactRng, contact_rate);
    if !time.is_finite() {
        return;
    }
    let event = Event::new(
        EventKind::ContactAttempt,
        context.get_population().get(person_id),
    );
    let plan_id = context.plan_queue.add_plan(time, event);
    context.population.set_pending(person_id, Some(plan_id));
}

/// Schedules the recovery of a newly infected individual, either on an
/// exponential clock or through the recovery delay channel. A recovery time
/// that overflows to infinity is never scheduled.
pub(crate) fn schedule_recovery(context: &mut Context, person_id: PersonId) {
    let now = context.get_current_time();
    let recovery = context.get_parameters().recovery;
    let plan_id = match recovery {
        Recovery::Markovian { rate } => {
            let time = now + context.sample_exponential(RecoveryRng, rate);
            if time.is_finite() {
                let event =
                    Event::new(EventKind::Recovery, context.get_population().get(person_id));
                Some(context.plan_queue.add_plan(time, event))
            } else {
                None
            }
        }
        Recovery::Delayed { infectious_period } => {
            let duration = context.sample(RecoveryRng, |stream| infectious_period.sample(stream));
            let event = Event::new(
                EventKind::DelayedCompletion,
                context.get_population().get(person_id),
            );
            context.recovery_channel.schedule_completion(
                &mut context.plan_queue,
                now,
                duration,
                event,
            )
        }
    };
    context.population.set_pending(person_id, plan_id);
}

fn attempt_contact(context: &mut Context, person_id: PersonId) {
    let population_size = context.get_population().len();
    let k = context.sample_uniform_int(TransmissionRng, population_size - 1);
    let alter = context.get_population().alter(person_id, k);
    let transmission_probability = context.get_parameters().transmission_probability;
    if context.get_status(alter) == InfectionStatus::Infected
        && context.sample_bool(TransmissionRng, transmission_probability)
    {
        trace!("person {alter} infected person {person_id}");
        context.transition(person_id, InfectionStatus::Infected);
        schedule_recovery(context, person_id);
    } else {
        schedule_contact_attempt(context, person_id);
    }
}

/// Forces `person_id` into `target`. Only moves forward through S → I → R
/// take effect; anything else leaves the individual untouched.
fn intervene(context: &mut Context, person_id: PersonId, target: InfectionStatus) {
    let status = context.get_status(person_id);
    if !status.precedes(target) {
        trace!("intervention {status} -> {target} on person {person_id} has no effect");
        return;
    }
    context.transition(person_id, target);
    if target == InfectionStatus::Infected {
        schedule_recovery(context, person_id);
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::delay::InfectiousPeriod;
    use crate::parameters::Parameters;

    fn parameters(population_size: usize, initial_infected: usize) -> Parameters {
        Parameters {
            population_size,
            initial_infected,
            initial_recovered: 0,
            contact_rate: 1.0,
            transmission_probability: 1.0,
            recovery: Recovery::Markovian { rate: 1.0 },
            horizon: 10.0,
            seed: 42,
            observation_times: None,
        }
    }

    #[test]
    fn initial_events_follow_status() {
        let context = Context::new(parameters(3, 1)).unwrap();
        // One recovery for the infected individual, one contact attempt per
        // susceptible individual
        assert_eq!(context.pending_events(), 3);
        for person in context.get_population().iter() {
            assert!(person.pending_handle().is_some());
        }
    }

    #[test]
    fn single_individual_never_makes_contact() {
        let context = Context::new(parameters(1, 0)).unwrap();
        assert_eq!(context.pending_events(), 0);
    }

    #[test]
    fn zero_contact_rate_schedules_nothing() {
        let context = Context::new(Parameters {
            contact_rate: 0.0,
            ..parameters(4, 0)
        })
        .unwrap();
        assert_eq!(context.pending_events(), 0);
    }

    #[test]
    fn certain_transmission_from_the_only_other_individual() {
        // With N = 2 the alter is always the infected individual
        let mut context = Context::new(Parameters {
            recovery: Recovery::Delayed {
                infectious_period: InfectiousPeriod::Fixed { duration: 100.0 },
            },
            ..parameters(2, 1)
        })
        .unwrap();
        context.run(10.0).unwrap();
        assert_eq!(
            context.get_status(PersonId::new(1)),
            InfectionStatus::Infected
        );
    }

    #[test]
    fn interventions_only_move_forward() {
        let mut context = Context::new(Parameters {
            contact_rate: 0.0,
            ..parameters(3, 1)
        })
        .unwrap();
        let infected = PersonId::new(0);
        let susceptible = PersonId::new(1);
        let vaccinated = PersonId::new(2);
        context.add_intervention(1.0, infected, InfectionStatus::Susceptible);
        context.add_intervention(1.0, vaccinated, InfectionStatus::Recovered);
        context.add_intervention(2.0, vaccinated, InfectionStatus::Infected);
        context.add_intervention(3.0, susceptible, InfectionStatus::Susceptible);
        context.run(3.0).unwrap();

        assert_eq!(context.get_status(susceptible), InfectionStatus::Susceptible);
        assert_eq!(context.get_status(vaccinated), InfectionStatus::Recovered);
        assert_ne!(context.get_status(infected), InfectionStatus::Susceptible);
    }

    #[test]
    fn forced_infection_schedules_recovery() {
        let mut context = Context::new(Parameters {
            contact_rate: 0.0,
            recovery: Recovery::Delayed {
                infectious_period: InfectiousPeriod::Fixed { duration: 2.5 },
            },
            ..parameters(2, 0)
        })
        .unwrap();
        context.add_intervention(1.0, PersonId::new(0), InfectionStatus::Infected);
        context.run(10.0).unwrap();
        let transitions = context.get_transitions();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].time, 1.0);
        assert_eq!(transitions[1].time, 3.5);
        assert_eq!(transitions[1].to, InfectionStatus::Recovered);
    }
}
