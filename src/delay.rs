//! Non-Markovian durations.
//!
//! A `DelayChannel` holds completions whose time was fixed when the
//! triggering event fired (for example a recovery drawn from a fixed or Gamma
//! distributed infectious period), as opposed to Markovian transitions whose
//! time comes from a competing exponential clock. Completions are delivered
//! through the same event queue as everything else; the channel keeps its own
//! ordered record of what is outstanding so it can check delivery order and
//! report right-censored entries when a run ends.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rand_distr::{Gamma, LogNormal, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::SirError;
use crate::plan::{PlanId, Queue};
use crate::random::RandomStream;

/// Distribution of the time an individual stays infectious.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfectiousPeriod {
    /// A point mass: every infection lasts exactly `duration`
    Fixed { duration: f64 },
    Exponential { rate: f64 },
    Gamma { shape: f64, scale: f64 },
    LogNormal { mu: f64, sigma: f64 },
    /// Range is inclusive of min, exclusive of max: [min, max)
    Uniform { min: f64, max: f64 },
}

fn require_positive(parameter: &str, value: f64) -> Result<(), SirError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SirError::configuration(
            parameter,
            format!("must be finite and positive, got {value}"),
        ))
    }
}

fn require_non_negative(parameter: &str, value: f64) -> Result<(), SirError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SirError::configuration(
            parameter,
            format!("must be finite and non-negative, got {value}"),
        ))
    }
}

impl InfectiousPeriod {
    /// Checks that the distribution parameters describe a distribution of
    /// non-negative durations with a finite mean.
    ///
    /// # Errors
    ///
    /// Returns a `SirError::ConfigurationError` naming the offending parameter.
    pub fn validate(&self) -> Result<(), SirError> {
        self.validate_parameters()?;
        let mean = self.mean();
        if !mean.is_finite() {
            return Err(SirError::configuration(
                "infectious_period",
                format!("{self:?} has mean {mean}"),
            ));
        }
        Ok(())
    }

    fn validate_parameters(&self) -> Result<(), SirError> {
        match *self {
            InfectiousPeriod::Fixed { duration } => {
                require_non_negative("infectious_period.fixed.duration", duration)
            }
            InfectiousPeriod::Exponential { rate } => {
                require_positive("infectious_period.exponential.rate", rate)
            }
            InfectiousPeriod::Gamma { shape, scale } => {
                require_positive("infectious_period.gamma.shape", shape)?;
                require_positive("infectious_period.gamma.scale", scale)
            }
            InfectiousPeriod::LogNormal { mu, sigma } => {
                if !mu.is_finite() {
                    return Err(SirError::configuration(
                        "infectious_period.log_normal.mu",
                        format!("must be finite, got {mu}"),
                    ));
                }
                require_non_negative("infectious_period.log_normal.sigma", sigma)
            }
            InfectiousPeriod::Uniform { min, max } => {
                require_non_negative("infectious_period.uniform.min", min)?;
                require_non_negative("infectious_period.uniform.max", max)?;
                if min > max {
                    return Err(SirError::configuration(
                        "infectious_period.uniform",
                        format!("min ({min}) must not exceed max ({max})"),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Expected duration
    #[must_use]
    pub fn mean(&self) -> f64 {
        match *self {
            InfectiousPeriod::Fixed { duration } => duration,
            InfectiousPeriod::Exponential { rate } => 1.0 / rate,
            InfectiousPeriod::Gamma { shape, scale } => shape * scale,
            InfectiousPeriod::LogNormal { mu, sigma } => (mu + sigma * sigma / 2.0).exp(),
            InfectiousPeriod::Uniform { min, max } => (min + max) / 2.0,
        }
    }

    /// Draws a duration. A finite mean does not rule out an infinite draw from
    /// a heavy tail; see [`DelayChannel::schedule_completion`].
    ///
    /// # Panics
    ///
    /// Panics if the parameters were not validated and `rand_distr` rejects them.
    pub fn sample(&self, stream: &mut RandomStream) -> f64 {
        match *self {
            InfectiousPeriod::Fixed { duration } => duration,
            InfectiousPeriod::Exponential { rate } => stream.next_exponential(rate),
            InfectiousPeriod::Gamma { shape, scale } => match Gamma::new(shape, scale) {
                Ok(gamma) => stream.next_from(&gamma),
                Err(error) => panic!("invalid gamma infectious period: {error}"),
            },
            InfectiousPeriod::LogNormal { mu, sigma } => match LogNormal::new(mu, sigma) {
                Ok(log_normal) => stream.next_from(&log_normal),
                Err(error) => panic!("invalid log-normal infectious period: {error}"),
            },
            InfectiousPeriod::Uniform { min, max } if min == max => min,
            InfectiousPeriod::Uniform { min, max } => match Uniform::new(min, max) {
                Ok(uniform) => stream.next_from(&uniform),
                Err(error) => panic!("invalid uniform infectious period: {error}"),
            },
        }
    }
}

/// An outstanding completion, ordered by time and then insertion sequence
#[derive(Copy, Clone, Debug, PartialEq)]
struct Completion {
    time: f64,
    sequence: u64,
}

impl Eq for Completion {}

impl PartialOrd for Completion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Completion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// The outstanding completions of one delayed reaction.
///
/// Every entry is either completed when its time is reached or is still
/// pending when the run stops, in which case it counts as right-censored.
/// Entries are never cancelled through the queue: a completion that has been
/// overtaken by another transition is delivered and then discarded as stale.
/// A completion due at `+inf` is never queued and stays censored.
#[derive(Debug)]
pub struct DelayChannel {
    name: &'static str,
    pending: BTreeSet<Completion>,
    never_due: usize,
    completed: usize,
}

impl DelayChannel {
    #[must_use]
    pub fn new(name: &'static str) -> DelayChannel {
        DelayChannel {
            name,
            pending: BTreeSet::new(),
            never_due: 0,
            completed: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Inserts a completion due at `now + duration` and returns its handle,
    /// or `None` if that time is `+inf`: such a completion is counted as
    /// pending but never reaches the queue.
    ///
    /// # Panics
    ///
    /// Panics if `duration` is negative or NaN.
    pub fn schedule_completion<T>(
        &mut self,
        queue: &mut Queue<T>,
        now: f64,
        duration: f64,
        data: T,
    ) -> Option<PlanId> {
        if duration.is_nan() || duration < 0.0 {
            panic!(
                "scheduling invariant violated: delay channel {} given duration {}",
                self.name, duration
            );
        }
        let time = now + duration;
        if time == f64::INFINITY {
            self.never_due += 1;
            return None;
        }
        let id = queue.add_plan(time, data);
        self.pending.insert(Completion {
            time,
            sequence: id.sequence(),
        });
        Some(id)
    }

    /// Records delivery of the completion that was queued with the given time
    /// and sequence number.
    ///
    /// # Panics
    ///
    /// Panics if it is not the earliest outstanding completion of this
    /// channel, which would mean the queue delivered completions out of order.
    pub fn complete(&mut self, time: f64, sequence: u64) {
        let delivered = Completion { time, sequence };
        if self.pending.first() != Some(&delivered) {
            panic!(
                "scheduling invariant violated: delay channel {} delivered {:?} but expected {:?}",
                self.name,
                delivered,
                self.pending.first()
            );
        }
        self.pending.pop_first();
        self.completed += 1;
    }

    /// Time of the earliest outstanding completion
    #[must_use]
    pub fn next_completion(&self) -> Option<f64> {
        self.pending.first().map(|completion| completion.time)
    }

    /// Number of outstanding completions, including those never due. Once
    /// the run has stopped these are the right-censored entries.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len() + self.never_due
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn completions_pop_in_time_order_despite_insertion_order() {
        let mut queue = Queue::new();
        let mut channel = DelayChannel::new("recovery");

        // Triggered later with a short delay, inserted first
        channel.schedule_completion(&mut queue, 2.0, 1.0, "short");
        // Triggered earlier with a long delay, inserted second
        channel.schedule_completion(&mut queue, 1.0, 5.0, "long");
        assert_eq!(channel.next_completion(), Some(3.0));

        let first = queue.get_next_plan().unwrap();
        assert_eq!((first.time, first.data), (3.0, "short"));
        channel.complete(first.time, first.sequence);
        assert_eq!(channel.next_completion(), Some(6.0));

        let second = queue.get_next_plan().unwrap();
        assert_eq!((second.time, second.data), (6.0, "long"));
        channel.complete(second.time, second.sequence);

        assert_eq!(channel.pending(), 0);
        assert_eq!(channel.completed(), 2);
    }

    #[test]
    fn simultaneous_completions_keep_insertion_order() {
        let mut queue = Queue::new();
        let mut channel = DelayChannel::new("recovery");
        channel.schedule_completion(&mut queue, 0.0, 4.0, 1);
        channel.schedule_completion(&mut queue, 1.0, 3.0, 2);
        channel.schedule_completion(&mut queue, 2.0, 2.0, 3);

        let mut delivered = Vec::new();
        while let Some(plan) = queue.get_next_plan() {
            assert_eq!(plan.time, 4.0);
            channel.complete(plan.time, plan.sequence);
            delivered.push(plan.data);
        }
        assert_eq!(delivered, vec![1, 2, 3]);
    }

    #[test]
    fn undelivered_entries_remain_pending() {
        let mut queue = Queue::new();
        let mut channel = DelayChannel::new("recovery");
        channel.schedule_completion(&mut queue, 0.0, 1.0, ());
        channel.schedule_completion(&mut queue, 0.0, 10.0, ());
        let plan = queue.get_next_plan().unwrap();
        channel.complete(plan.time, plan.sequence);
        assert_eq!(channel.pending(), 1);
        assert_eq!(channel.completed(), 1);
    }

    #[test]
    #[should_panic(expected = "scheduling invariant violated")]
    fn out_of_order_delivery_is_fatal() {
        let mut queue = Queue::new();
        let mut channel = DelayChannel::new("recovery");
        channel.schedule_completion(&mut queue, 0.0, 1.0, ());
        let late = channel.schedule_completion(&mut queue, 0.0, 2.0, ()).unwrap();
        channel.complete(2.0, late.sequence());
    }

    #[test]
    #[should_panic(expected = "scheduling invariant violated")]
    fn negative_duration_is_fatal() {
        let mut queue = Queue::new();
        let mut channel = DelayChannel::new("recovery");
        channel.schedule_completion(&mut queue, 1.0, -0.5, ());
    }

    #[test]
    fn completion_at_infinity_stays_censored() {
        let mut queue = Queue::new();
        let mut channel = DelayChannel::new("recovery");
        assert!(channel
            .schedule_completion(&mut queue, 1.0, f64::INFINITY, ())
            .is_none());
        assert!(channel
            .schedule_completion(&mut queue, 1.0, 2.0, ())
            .is_some());
        assert_eq!(queue.len(), 1);
        assert_eq!(channel.next_completion(), Some(3.0));
        assert_eq!(channel.pending(), 2);

        let plan = queue.get_next_plan().unwrap();
        channel.complete(plan.time, plan.sequence);
        assert_eq!(channel.pending(), 1);
        assert_eq!(channel.next_completion(), None);
    }

    #[test]
    #[should_panic(expected = "scheduling invariant violated")]
    fn nan_duration_is_fatal() {
        let mut queue = Queue::new();
        let mut channel = DelayChannel::new("recovery");
        channel.schedule_completion(&mut queue, 1.0, f64::NAN, ());
    }

    #[test]
    fn degenerate_uniform_is_a_point_mass() {
        let mut stream = RandomStream::new(3);
        let period = InfectiousPeriod::Uniform { min: 3.0, max: 3.0 };
        assert!(period.validate().is_ok());
        for _ in 0..10 {
            assert_eq!(period.sample(&mut stream), 3.0);
        }
    }

    #[test]
    fn validation_rejects_infinite_means() {
        for period in [
            InfectiousPeriod::Exponential { rate: 1e-310 },
            InfectiousPeriod::LogNormal {
                mu: 800.0,
                sigma: 0.1,
            },
            InfectiousPeriod::Gamma {
                shape: 4.0,
                scale: 1e308,
            },
        ] {
            match period.validate() {
                Err(SirError::ConfigurationError(message)) => {
                    assert!(message.starts_with("infectious_period"), "{message}");
                }
                other => panic!("{period:?} validated: {other:?}"),
            }
        }
    }

    #[test]
    fn fixed_period_is_exact() {
        let mut stream = RandomStream::new(42);
        let period = InfectiousPeriod::Fixed { duration: 4.0 };
        assert_eq!(period.sample(&mut stream), 4.0);
        assert_eq!(period.mean(), 4.0);
    }

    #[test]
    fn sampled_periods_have_expected_means() {
        let mut stream = RandomStream::new(42);
        let n = 20_000;
        for period in [
            InfectiousPeriod::Exponential { rate: 0.25 },
            InfectiousPeriod::Gamma {
                shape: 2.0,
                scale: 2.0,
            },
            InfectiousPeriod::Uniform { min: 2.0, max: 6.0 },
        ] {
            let mean = (0..n).map(|_| period.sample(&mut stream)).sum::<f64>() / f64::from(n);
            assert!(
                (mean - period.mean()).abs() < 0.15,
                "{period:?} sample mean {mean}"
            );
        }
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        assert!(InfectiousPeriod::Fixed { duration: -1.0 }.validate().is_err());
        assert!(InfectiousPeriod::Exponential { rate: 0.0 }.validate().is_err());
        assert!(InfectiousPeriod::Gamma {
            shape: 2.0,
            scale: f64::NAN
        }
        .validate()
        .is_err());
        assert!(InfectiousPeriod::Uniform { min: 3.0, max: 1.0 }
            .validate()
            .is_err());
        assert!(InfectiousPeriod::LogNormal { mu: 1.0, sigma: 0.5 }
            .validate()
            .is_ok());
    }

    #[test]
    fn deserializes_from_snake_case_json() {
        let period: InfectiousPeriod =
            serde_json::from_str(r#"{"gamma": {"shape": 4.0, "scale": 1.0}}"#).unwrap();
        assert_eq!(
            period,
            InfectiousPeriod::Gamma {
                shape: 4.0,
                scale: 1.0
            }
        );
        let period: InfectiousPeriod =
            serde_json::from_str(r#"{"fixed": {"duration": 4.0}}"#).unwrap();
        assert_eq!(period, InfectiousPeriod::Fixed { duration: 4.0 });
    }
}
