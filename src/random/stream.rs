use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

/// A seedable source of uniform, exponential and categorical draws.
///
/// Given the same seed, a `RandomStream` produces the same sequence of
/// outputs on every run.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: SmallRng,
}

impl RandomStream {
    #[must_use]
    pub fn new(seed: u64) -> RandomStream {
        RandomStream {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// A uniform draw from `[0, 1)`
    pub fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// A waiting time drawn from `Exponential(rate)`.
    ///
    /// A rate of zero yields `f64::INFINITY`: the clock never rings, and the
    /// caller must treat that as "no event".
    ///
    /// # Panics
    ///
    /// Panics if `rate` is negative or NaN.
    pub fn next_exponential(&mut self, rate: f64) -> f64 {
        if rate == 0.0 {
            return f64::INFINITY;
        }
        match Exp::new(rate) {
            Ok(exp) => exp.sample(&mut self.rng),
            Err(error) => panic!("invalid exponential rate {rate}: {error}"),
        }
    }

    /// A uniform integer from `[1, n]`
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn next_uniform_int(&mut self, n: usize) -> usize {
        assert!(n > 0, "cannot draw from an empty range");
        self.rng.random_range(1..=n)
    }

    /// A Bernoulli trial that succeeds with probability `p`
    ///
    /// # Panics
    ///
    /// Panics if `p` is outside `[0, 1]`.
    pub fn next_bernoulli(&mut self, p: f64) -> bool {
        self.rng.random_bool(p)
    }

    /// A sample from an arbitrary distribution
    pub fn next_from<T, D: Distribution<T>>(&mut self, distribution: &D) -> T {
        distribution.sample(&mut self.rng)
    }
}
