use std::cell::RefMut;

use rand_distr::Distribution;

use crate::context::Context;
use crate::log::trace;
use crate::random::{RandomStream, RandomStreams, RngId};

// This is a trait extension on Context for
// random number generation functionality.
pub trait ContextRandomExt {
    fn random_streams(&self) -> &RandomStreams;

    fn random_streams_mut(&mut self) -> &mut RandomStreams;

    /// Resets the base seed. Streams are created lazily on first use, so every
    /// stream is re-seeded from the new base seed.
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module");
        self.random_streams_mut().reseed(base_seed);
    }

    /// Gets the stream associated with the given [`RngId`].
    fn get_rng<R: RngId>(&self, _rng_id: R) -> RefMut<'_, RandomStream> {
        self.random_streams().get::<R>()
    }

    /// Gets a random sample from the stream associated with the given
    /// [`RngId`] by applying the specified sampler function.
    fn sample<R: RngId, T>(&self, rng_id: R, sampler: impl FnOnce(&mut RandomStream) -> T) -> T {
        let mut stream = self.get_rng(rng_id);
        sampler(&mut stream)
    }

    /// A uniform draw from `[0, 1)`
    fn sample_uniform<R: RngId>(&self, rng_id: R) -> f64 {
        self.sample(rng_id, RandomStream::next_uniform)
    }

    /// A waiting time with the given rate. Infinite when `rate` is zero.
    fn sample_exponential<R: RngId>(&self, rng_id: R, rate: f64) -> f64 {
        self.sample(rng_id, |stream| stream.next_exponential(rate))
    }

    /// A uniform integer from `1..=n`
    fn sample_uniform_int<R: RngId>(&self, rng_id: R, n: usize) -> usize {
        self.sample(rng_id, |stream| stream.next_uniform_int(n))
    }

    /// A boolean value which is true with probability `p`
    fn sample_bool<R: RngId>(&self, rng_id: R, p: f64) -> bool {
        self.sample(rng_id, |stream| stream.next_bernoulli(p))
    }

    /// Gets a random sample from the specified distribution
    fn sample_distr<R: RngId, T>(&self, rng_id: R, distribution: impl Distribution<T>) -> T {
        self.sample(rng_id, |stream| stream.next_from(&distribution))
    }
}

impl ContextRandomExt for Context {
    fn random_streams(&self) -> &RandomStreams {
        &self.random
    }

    fn random_streams_mut(&mut self) -> &mut RandomStreams {
        &mut self.random
    }
}

#[cfg(test)]
mod test {
    use rand_distr::Exp1;

    use crate::context::Context;
    use crate::define_rng;
    use crate::parameters::Parameters;
    use crate::random::context_ext::ContextRandomExt;

    define_rng!(FirstRng);
    define_rng!(SecondRng);

    fn context() -> Context {
        Context::new(Parameters::default()).unwrap()
    }

    #[test]
    fn streams_advance() {
        let context = context();
        let first = context.sample_uniform(FirstRng);
        let second = context.sample_uniform(FirstRng);
        assert_ne!(first, second);
    }

    #[test]
    fn multiple_rng_types() {
        let context = context();
        let foo = context.sample_uniform(FirstRng);
        let bar = context.sample_uniform(SecondRng);
        assert_ne!(foo, bar);
    }

    #[test]
    fn reset_seed() {
        let mut context = context();
        context.init_random(42);

        let run_0 = context.sample_uniform(FirstRng);
        let run_1 = context.sample_uniform(FirstRng);

        // Reset with same seed, ensure we get the same values
        context.init_random(42);
        assert_eq!(run_0, context.sample_uniform(FirstRng));
        assert_eq!(run_1, context.sample_uniform(FirstRng));

        // Reset with different seed, ensure we get different values
        context.init_random(88);
        assert_ne!(run_0, context.sample_uniform(FirstRng));
        assert_ne!(run_1, context.sample_uniform(FirstRng));
    }

    #[test]
    fn sampler_helpers_respect_bounds() {
        let context = context();
        for _ in 0..100 {
            let k = context.sample_uniform_int(FirstRng, 5);
            assert!((1..=5).contains(&k));
            assert!(context.sample_exponential(SecondRng, 2.0) >= 0.0);
            let e: f64 = context.sample_distr(SecondRng, Exp1);
            assert!(e >= 0.0);
        }
        assert!(context.sample_bool(FirstRng, 1.0));
        assert!(!context.sample_bool(FirstRng, 0.0));
        assert_eq!(context.sample_exponential(FirstRng, 0.0), f64::INFINITY);
    }
}
