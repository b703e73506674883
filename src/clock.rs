//! Simulation time. The clock only moves forward.

/// Holds the current simulation time
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    now: f64,
}

impl Clock {
    #[must_use]
    pub fn new() -> Clock {
        Clock { now: 0.0 }
    }

    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Moves the clock to `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` is earlier than the current time or is not finite.
    /// A backward step means an event was scheduled in the past, which is a
    /// bug in the event queue or the transition logic.
    pub fn advance_to(&mut self, time: f64) {
        if !time.is_finite() || time < self.now {
            panic!(
                "scheduling invariant violated: cannot move clock from {} to {}",
                self.now, time
            );
        }
        self.now = time;
    }
}
