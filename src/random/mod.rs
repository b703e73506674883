mod context_ext;
mod macros;
mod stream;

use std::any::TypeId;
use std::cell::{RefCell, RefMut};

pub use context_ext::ContextRandomExt;
pub use macros::define_rng;
pub use stream::RandomStream;

use crate::hashing::{hash_str, HashMap};
use crate::log::trace;

pub trait RngId: Copy + Clone + 'static {
    fn get_name() -> &'static str;
}

/// The set of independent random streams used by one simulation run.
///
/// Stores:
/// * `base_seed`: A base seed for all streams
/// * `streams`: A map of streams, keyed by their `RngId`. Streams are created
///   lazily and seeded with `base_seed` offset by a hash of the `RngId` name,
///   so each purpose draws from its own reproducible sequence. The map is
///   stored in a `RefCell` to allow sampling through a shared borrow of the
///   `Context`.
#[derive(Debug)]
pub struct RandomStreams {
    base_seed: u64,
    streams: RefCell<HashMap<TypeId, RandomStream>>,
}

impl RandomStreams {
    #[must_use]
    pub fn new(base_seed: u64) -> RandomStreams {
        RandomStreams {
            base_seed,
            streams: RefCell::new(HashMap::default()),
        }
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Resets the base seed. Existing streams are dropped so they get
    /// re-seeded on next use.
    pub fn reseed(&mut self, base_seed: u64) {
        self.base_seed = base_seed;
        self.streams.get_mut().clear();
    }

    /// Gets a mutable reference to the stream associated with the given
    /// [`RngId`], creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics if the stream is already borrowed, i.e. when called re-entrantly
    /// from inside a sampler closure.
    pub fn get<R: RngId>(&self) -> RefMut<'_, RandomStream> {
        let base_seed = self.base_seed;
        let streams = self.streams.borrow_mut();
        RefMut::map(streams, |streams| {
            streams.entry(TypeId::of::<R>()).or_insert_with(|| {
                trace!(
                    "creating new random stream {} (seed={})",
                    R::get_name(),
                    base_seed
                );
                RandomStream::new(base_seed.wrapping_add(hash_str(R::get_name())))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::RandomStreams;
    use crate::define_rng;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_stream_basic() {
        let streams = RandomStreams::new(42);
        let a = streams.get::<FooRng>().next_uniform();
        let b = streams.get::<FooRng>().next_uniform();
        assert_ne!(a, b);
    }

    #[test]
    fn multiple_stream_types() {
        let streams = RandomStreams::new(42);
        let foo = streams.get::<FooRng>().next_uniform();
        let bar = streams.get::<BarRng>().next_uniform();
        assert_ne!(foo, bar);
    }

    #[test]
    fn reset_seed() {
        let mut streams = RandomStreams::new(42);
        let run_0 = streams.get::<FooRng>().next_uniform();
        let run_1 = streams.get::<FooRng>().next_uniform();

        // Reset with same seed, ensure we get the same values
        streams.reseed(42);
        assert_eq!(run_0, streams.get::<FooRng>().next_uniform());
        assert_eq!(run_1, streams.get::<FooRng>().next_uniform());

        // Reset with different seed, ensure we get different values
        streams.reseed(88);
        assert_ne!(run_0, streams.get::<FooRng>().next_uniform());
        assert_eq!(streams.base_seed(), 88);
    }

    #[test]
    fn streams_are_independent_of_use_order() {
        let interleaved = RandomStreams::new(7);
        let mut foo_interleaved = Vec::new();
        for _ in 0..5 {
            foo_interleaved.push(interleaved.get::<FooRng>().next_uniform());
            interleaved.get::<BarRng>().next_uniform();
        }

        let alone = RandomStreams::new(7);
        let foo_alone: Vec<f64> = (0..5).map(|_| alone.get::<FooRng>().next_uniform()).collect();
        assert_eq!(foo_interleaved, foo_alone);
    }
}
