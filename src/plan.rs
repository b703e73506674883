//! A priority queue that stores arbitrary data sorted by time
//!
//! Defines a `Queue<T>` that is intended to store a queue of items of type
//! T - sorted by `f64` time and insertion sequence - called 'plans'.
//! This queue has methods for adding plans, cancelling plans, and retrieving
//! the earliest plan in the queue. Adding a plan is *O*(log(*n*)) while
//! cancellation is *O*(1) and retrieval is amortized *O*(log(*n*)).
//!
//! This queue is used by `Context` to store the pending events of every
//! individual in the simulation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::hashing::HashMap;

/// A priority queue that stores arbitrary data sorted by time
///
/// Items of type `T` are stored in order by `f64` time and called `Plan<T>`.
/// When plans are created they are sequentially assigned a sequence number
/// that is wrapped in a `PlanId`. If two plans are scheduled for the same
/// time then the plan that is scheduled first (i.e., that has the lowest
/// sequence number) is placed earlier.
///
/// The time and sequence number are stored in a binary heap of `Entry`
/// objects. The data payload of the plan is stored in a hash map by sequence
/// number. Plan cancellation occurs by removing the corresponding entry from
/// the data hash map; the heap entry is skipped when it eventually surfaces.
pub struct Queue<T> {
    queue: BinaryHeap<Entry>,
    data_map: HashMap<u64, T>,
    plan_counter: u64,
}

impl<T> Queue<T> {
    /// Create a new empty `Queue<T>`
    #[must_use]
    pub fn new() -> Queue<T> {
        Queue {
            queue: BinaryHeap::new(),
            data_map: HashMap::default(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified time
    ///
    /// Returns a `PlanId` for the newly-added plan that can be used to cancel
    /// it if needed.
    ///
    /// # Panics
    ///
    /// Panics if `time` is not finite. A plan that can never come due is the
    /// caller's to drop.
    pub fn add_plan(&mut self, time: f64, data: T) -> PlanId {
        assert!(time.is_finite(), "Plan time must be finite, got {time}");
        let sequence = self.plan_counter;
        self.queue.push(Entry { time, sequence });
        self.data_map.insert(sequence, data);
        self.plan_counter += 1;
        PlanId { sequence }
    }

    /// Cancel a plan that has been added to the queue
    ///
    /// Cancelling a plan which has already been cancelled or retrieved is a
    /// no-op. Returns `true` if a pending plan was cancelled.
    pub fn cancel_plan(&mut self, id: &PlanId) -> bool {
        // Delete the plan from the map, but leave in the queue
        // It will be skipped when the plan is popped from the queue
        self.data_map.remove(&id.sequence).is_some()
    }

    /// Returns true if the plan is still waiting in the queue
    #[must_use]
    pub fn is_pending(&self, id: &PlanId) -> bool {
        self.data_map.contains_key(&id.sequence)
    }

    /// Retrieve the earliest plan in the queue
    ///
    /// Returns the next plan if it exists or else `None` if the queue is empty
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        loop {
            // Pop from queue until we find a plan with data or queue is empty
            let entry = self.queue.pop()?;
            // Skip plans that have been cancelled and thus have no data
            if let Some(data) = self.data_map.remove(&entry.sequence) {
                return Some(Plan {
                    time: entry.time,
                    sequence: entry.sequence,
                    data,
                });
            }
        }
    }

    /// Returns the time of the earliest live plan without removing it
    pub fn next_time(&mut self) -> Option<f64> {
        // Discard cancelled entries sitting on top of the heap
        while let Some(entry) = self.queue.peek() {
            if self.data_map.contains_key(&entry.sequence) {
                return Some(entry.time);
            }
            self.queue.pop();
        }
        None
    }

    /// The number of live (not cancelled, not retrieved) plans
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_map.is_empty()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A time and sequence object used to order plans in the `Queue<T>`
#[derive(PartialEq, Debug)]
struct Entry {
    time: f64,
    sequence: u64,
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entry objects are ordered in increasing order by time and then sequence.
/// `BinaryHeap` is a max-heap, so the comparison is reversed.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
            .reverse()
    }
}

/// A unique identifier for a plan added to a `Queue<T>`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlanId {
    sequence: u64,
}

impl PlanId {
    /// The insertion sequence number used to break ties between plans at the same time
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// A plan that holds data of type `T` intended to be used at the specified time
#[derive(Debug)]
pub struct Plan<T> {
    pub time: f64,
    pub sequence: u64,
    pub data: T,
}
