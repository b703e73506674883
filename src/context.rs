//! The scheduler: the single owner of simulation state.
//!
//! A `Context` owns the event queue, the clock, the population, the
//! aggregator, the recovery delay channel and the random streams, and drives
//! the main loop. The loop repeatedly takes the earliest pending event,
//! advances the clock to its time, discards it if it went stale, and
//! otherwise hands it to the process logic of its subject.
//!
//! ```rust
//! use ixa_sir::prelude::*;
//!
//! let mut context = Context::new(Parameters::default()).unwrap();
//! context.run(10.0).unwrap();
//! context.run(20.0).unwrap();
//! let output = context.output();
//! assert_eq!(output.final_time, 20.0);
//! ```
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::aggregator::{self, Aggregator, Observation};
use crate::clock::Clock;
use crate::delay::DelayChannel;
use crate::error::SirError;
use crate::event::{Event, EventKind};
use crate::log::{debug, info, trace};
use crate::parameters::Parameters;
use crate::plan::{Plan, PlanId, Queue};
use crate::population::{InfectionStatus, PersonId, Population};
use crate::process;
use crate::random::RandomStreams;

/// One status change of one individual
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub time: f64,
    pub person_id: PersonId,
    pub from: InfectionStatus,
    pub to: InfectionStatus,
}

/// What a run produced
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutput {
    /// The step-function time series of S, I and R counts
    pub series: Vec<Observation>,
    pub transitions: Vec<TransitionRecord>,
    /// Events that were delivered and acted on
    pub events_processed: usize,
    /// Events that were delivered and discarded because their subject had
    /// changed status since they were scheduled
    pub stale_events: usize,
    /// Recovery delays still outstanding when the run stopped, including
    /// any drawn so long that they would never complete
    pub censored: usize,
    pub final_time: f64,
}

impl SimulationOutput {
    /// The counts in force at `time`, by "last value held"
    #[must_use]
    pub fn value_at(&self, time: f64) -> Option<Observation> {
        aggregator::value_at(&self.series, time)
    }

    /// The largest infected count in the series
    #[must_use]
    pub fn peak_infected(&self) -> usize {
        self.series
            .iter()
            .map(|observation| observation.infected)
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn final_observation(&self) -> Option<Observation> {
        self.series.last().copied()
    }

    /// Number of individuals infected during the run
    #[must_use]
    pub fn infections(&self) -> usize {
        self.transitions
            .iter()
            .filter(|record| record.to == InfectionStatus::Infected)
            .count()
    }
}

/// A simulation of one population under one set of parameters
pub struct Context {
    pub(crate) plan_queue: Queue<Event>,
    clock: Clock,
    pub(crate) population: Population,
    aggregator: Aggregator,
    pub(crate) recovery_channel: DelayChannel,
    pub(crate) random: RandomStreams,
    parameters: Parameters,
    /// Index of the next unrecorded entry of `parameters.observation_times`
    observation_cursor: usize,
    transitions: Vec<TransitionRecord>,
    events_processed: usize,
    stale_events: usize,
}

impl Context {
    /// Builds the population and schedules every individual's first event.
    ///
    /// Individuals `0..initial_infected` start infected, the next
    /// `initial_recovered` start recovered and the rest are susceptible.
    ///
    /// # Errors
    ///
    /// Returns `SirError::ConfigurationError` if `parameters` are invalid.
    pub fn new(parameters: Parameters) -> Result<Context, SirError> {
        parameters.validate()?;
        debug!(
            "building population of {} ({} infected, {} recovered), seed {}",
            parameters.population_size,
            parameters.initial_infected,
            parameters.initial_recovered,
            parameters.seed
        );

        let mut population = Population::new();
        let infected_end = parameters.initial_infected;
        let recovered_end = infected_end + parameters.initial_recovered;
        for index in 0..parameters.population_size {
            let status = if index < infected_end {
                InfectionStatus::Infected
            } else if index < recovered_end {
                InfectionStatus::Recovered
            } else {
                InfectionStatus::Susceptible
            };
            population.add_individual(status);
        }

        let mut context = Context {
            plan_queue: Queue::new(),
            clock: Clock::new(),
            aggregator: Aggregator::new(&population),
            population,
            recovery_channel: DelayChannel::new("recovery"),
            random: RandomStreams::new(parameters.seed),
            parameters,
            observation_cursor: 0,
            transitions: Vec::new(),
            events_processed: 0,
            stale_events: 0,
        };

        if context.samples_every_transition() {
            context.aggregator.record(0.0);
        }

        for index in 0..context.population.len() {
            let person_id = PersonId::new(index);
            match context.population.status(person_id) {
                InfectionStatus::Susceptible => {
                    process::schedule_contact_attempt(&mut context, person_id);
                }
                InfectionStatus::Infected => process::schedule_recovery(&mut context, person_id),
                InfectionStatus::Recovered => {}
            }
        }
        debug!("scheduled {} initial events", context.plan_queue.len());

        Ok(context)
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.clock.now()
    }

    #[must_use]
    pub fn get_parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn get_population(&self) -> &Population {
        &self.population
    }

    #[must_use]
    pub fn get_status(&self, person_id: PersonId) -> InfectionStatus {
        self.population.status(person_id)
    }

    #[must_use]
    pub fn get_aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    #[must_use]
    pub fn get_transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Number of events waiting in the queue
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.plan_queue.len()
    }

    /// Forces `person_id` into `status` at `time`. Only forward moves
    /// (S → I, S → R, I → R) take effect when the event fires.
    ///
    /// Returns a `PlanId` that can be passed to `cancel_intervention`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is earlier than the current time or not finite, or if
    /// `person_id` is not part of the population.
    pub fn add_intervention(
        &mut self,
        time: f64,
        person_id: PersonId,
        status: InfectionStatus,
    ) -> PlanId {
        if !time.is_finite() || time < self.get_current_time() {
            panic!(
                "scheduling invariant violated: intervention at {} but current time is {}",
                time,
                self.get_current_time()
            );
        }
        let event = Event::new(EventKind::Intervention(status), self.population.get(person_id));
        trace!("intervention on person {person_id} -> {status} planned at {time}");
        self.plan_queue.add_plan(time, event)
    }

    /// Returns `true` if the intervention was still pending.
    pub fn cancel_intervention(&mut self, plan_id: PlanId) -> bool {
        self.plan_queue.cancel_plan(&plan_id)
    }

    /// Processes every event due at or before `horizon`, then moves the clock
    /// to `horizon`. Events due later stay queued, so a run can be resumed by
    /// calling `run` again with a later horizon.
    ///
    /// # Errors
    ///
    /// Returns `SirError::ConfigurationError` if `horizon` is not finite or
    /// is earlier than the current time.
    pub fn run(&mut self, horizon: f64) -> Result<(), SirError> {
        if !horizon.is_finite() || horizon < self.get_current_time() {
            return Err(SirError::configuration(
                "horizon",
                format!(
                    "cannot run until {} from time {}",
                    horizon,
                    self.get_current_time()
                ),
            ));
        }
        info!(
            "running from t = {} to t = {} with {} pending events",
            self.get_current_time(),
            horizon,
            self.plan_queue.len()
        );
        let started = Instant::now();
        let processed_before = self.events_processed;

        while let Some(next_time) = self.plan_queue.next_time() {
            if next_time > horizon {
                break;
            }
            // Observation times strictly before the next event see the
            // state as it is now
            self.record_observations(|time| time < next_time);
            let Some(plan) = self.plan_queue.get_next_plan() else {
                break;
            };
            self.clock.advance_to(plan.time);
            self.dispatch(plan);
        }

        self.record_observations(|time| time <= horizon);
        self.clock.advance_to(horizon);
        if self.samples_every_transition()
            && self
                .aggregator
                .history()
                .last()
                .is_none_or(|last| last.time < horizon)
        {
            self.aggregator.record(horizon);
        }

        info!(
            "reached t = {} after {} events ({} stale) in {}",
            horizon,
            self.events_processed - processed_before,
            self.stale_events,
            humantime::format_duration(started.elapsed())
        );
        Ok(())
    }

    /// Runs until the horizon given in the parameters
    ///
    /// # Errors
    ///
    /// See [`Context::run`].
    pub fn execute(&mut self) -> Result<(), SirError> {
        self.run(self.parameters.horizon)
    }

    #[must_use]
    pub fn output(&self) -> SimulationOutput {
        SimulationOutput {
            series: self.aggregator.history().to_vec(),
            transitions: self.transitions.clone(),
            events_processed: self.events_processed,
            stale_events: self.stale_events,
            censored: self.recovery_channel.pending(),
            final_time: self.get_current_time(),
        }
    }

    /// Applies a status change and records it. Every status change in the
    /// simulation goes through here.
    pub(crate) fn transition(&mut self, person_id: PersonId, status: InfectionStatus) {
        let time = self.get_current_time();
        let previous = self.population.set_status(person_id, status);
        self.aggregator.on_transition(previous, status);
        self.transitions.push(TransitionRecord {
            time,
            person_id,
            from: previous,
            to: status,
        });
        trace!("t = {time}: person {person_id} {previous} -> {status}");
        if self.samples_every_transition() {
            self.aggregator.record(time);
        }
    }

    fn dispatch(&mut self, plan: Plan<Event>) {
        let Plan {
            time,
            sequence,
            data: event,
        } = plan;
        if event.kind == EventKind::DelayedCompletion {
            self.recovery_channel.complete(time, sequence);
        }
        let subject = self.population.get(event.subject);
        if event.is_stale(subject) {
            self.stale_events += 1;
            trace!(
                "t = {time}: discarding stale {:?} for person {}",
                event.kind,
                event.subject
            );
            return;
        }
        if event.kind.is_self_scheduled() {
            self.population.set_pending(event.subject, None);
        }
        self.events_processed += 1;
        process::resume(self, event);
    }

    fn samples_every_transition(&self) -> bool {
        self.parameters.observation_times.is_none()
    }

    /// Records the current counts at each remaining observation time
    /// accepted by `due`.
    fn record_observations(&mut self, due: impl Fn(f64) -> bool) {
        let Some(observation_times) = &self.parameters.observation_times else {
            return;
        };
        while let Some(&time) = observation_times.get(self.observation_cursor) {
            if !due(time) {
                break;
            }
            self.aggregator.record(time);
            self.observation_cursor += 1;
        }
    }
}

/// Builds a simulation from `parameters` and runs it to the configured horizon.
///
/// # Errors
///
/// Returns `SirError::ConfigurationError` if `parameters` are invalid.
pub fn simulate(parameters: Parameters) -> Result<SimulationOutput, SirError> {
    let mut context = Context::new(parameters)?;
    context.execute()?;
    Ok(context.output())
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::delay::InfectiousPeriod;
    use crate::parameters::Recovery;

    fn quiet(population_size: usize) -> Parameters {
        Parameters {
            population_size,
            initial_infected: 0,
            initial_recovered: 0,
            contact_rate: 0.0,
            transmission_probability: 0.0,
            recovery: Recovery::Markovian { rate: 1.0 },
            horizon: 5.0,
            seed: 1,
            observation_times: None,
        }
    }

    #[test]
    fn seeding_assigns_statuses_by_id() {
        let context = Context::new(Parameters {
            initial_infected: 2,
            initial_recovered: 1,
            ..quiet(5)
        })
        .unwrap();
        let statuses: Vec<InfectionStatus> = context
            .get_population()
            .iter()
            .map(crate::population::Individual::status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                InfectionStatus::Infected,
                InfectionStatus::Infected,
                InfectionStatus::Recovered,
                InfectionStatus::Susceptible,
                InfectionStatus::Susceptible,
            ]
        );
    }

    #[test]
    fn invalid_parameters_fail_construction() {
        let result = Context::new(Parameters {
            initial_infected: 6,
            ..quiet(5)
        });
        assert!(matches!(result, Err(SirError::ConfigurationError(_))));
    }

    #[test]
    fn empty_queue_advances_clock_to_horizon() {
        let mut context = Context::new(quiet(3)).unwrap();
        context.run(5.0).unwrap();
        assert_eq!(context.get_current_time(), 5.0);
        let output = context.output();
        assert_eq!(output.events_processed, 0);
        assert_eq!(output.series.len(), 2);
        assert_eq!(output.final_observation().unwrap().susceptible, 3);
    }

    #[test]
    fn run_rejects_going_backwards() {
        let mut context = Context::new(quiet(3)).unwrap();
        context.run(2.0).unwrap();
        assert!(context.run(1.0).is_err());
        assert!(context.run(f64::INFINITY).is_err());
    }

    #[test]
    fn zero_horizon_processes_time_zero_events() {
        let mut context = Context::new(quiet(2)).unwrap();
        context.add_intervention(0.0, PersonId::new(0), InfectionStatus::Recovered);
        context.run(0.0).unwrap();
        assert_eq!(context.get_status(PersonId::new(0)), InfectionStatus::Recovered);
        assert_eq!(context.get_current_time(), 0.0);
    }

    #[test]
    fn events_after_horizon_stay_queued() {
        let mut context = Context::new(quiet(2)).unwrap();
        context.add_intervention(3.0, PersonId::new(0), InfectionStatus::Recovered);
        context.run(2.0).unwrap();
        assert_eq!(context.pending_events(), 1);
        assert_eq!(context.get_status(PersonId::new(0)), InfectionStatus::Susceptible);
        context.run(4.0).unwrap();
        assert_eq!(context.pending_events(), 0);
        assert_eq!(context.get_status(PersonId::new(0)), InfectionStatus::Recovered);
    }

    #[test]
    fn cancelled_intervention_never_fires() {
        let mut context = Context::new(quiet(2)).unwrap();
        let plan_id = context.add_intervention(1.0, PersonId::new(1), InfectionStatus::Recovered);
        assert!(context.cancel_intervention(plan_id));
        assert!(!context.cancel_intervention(plan_id));
        context.run(5.0).unwrap();
        assert_eq!(context.get_status(PersonId::new(1)), InfectionStatus::Susceptible);
    }

    #[test]
    #[should_panic(expected = "scheduling invariant violated")]
    fn intervention_in_the_past_is_fatal() {
        let mut context = Context::new(quiet(2)).unwrap();
        context.run(2.0).unwrap();
        context.add_intervention(1.0, PersonId::new(0), InfectionStatus::Recovered);
    }

    #[test]
    fn superseded_recovery_is_discarded_as_stale() {
        let mut context = Context::new(Parameters {
            initial_infected: 1,
            recovery: Recovery::Delayed {
                infectious_period: InfectiousPeriod::Fixed { duration: 4.0 },
            },
            ..quiet(2)
        })
        .unwrap();
        context.add_intervention(1.0, PersonId::new(0), InfectionStatus::Recovered);
        context.run(5.0).unwrap();
        let output = context.output();
        assert_eq!(output.stale_events, 1);
        assert_eq!(output.censored, 0);
        assert_eq!(output.transitions.len(), 1);
        assert_eq!(output.transitions[0].time, 1.0);
    }

    #[test]
    fn observation_times_sample_right_continuous_state() {
        let mut context = Context::new(Parameters {
            observation_times: Some(vec![0.0, 1.0, 2.0, 5.0]),
            ..quiet(2)
        })
        .unwrap();
        context.add_intervention(1.0, PersonId::new(0), InfectionStatus::Recovered);
        context.run(5.0).unwrap();
        let series = context.output().series;
        let times: Vec<f64> = series.iter().map(|observation| observation.time).collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 5.0]);
        assert_eq!(series[0].recovered, 0);
        // The intervention at t = 1 is visible in the observation at t = 1
        assert_eq!(series[1].recovered, 1);
        assert_eq!(series[3].recovered, 1);
    }

    #[test]
    fn resumed_run_matches_single_run() {
        let parameters = Parameters::default();
        let mut resumed = Context::new(parameters.clone()).unwrap();
        resumed.run(15.0).unwrap();
        resumed.run(40.0).unwrap();
        let single = simulate(parameters).unwrap();
        assert_eq!(resumed.output().transitions, single.transitions);
    }
}
