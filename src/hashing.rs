//! Deterministic hashing. The hashing data structures in the standard library are randomly
//! seeded per process, which would make runs irreproducible wherever a hash feeds into
//! simulation state. Everything here is stable across processes and platforms.
//!
//! `HashMap` is the `rustc-hash` variant; `hash_str` is used by
//! `crate::random` to derive a per-stream seed offset from the stream's name.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::FxHashMap as HashMap;

/// A convenience method to compute the hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
