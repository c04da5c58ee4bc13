use parking_lot::Mutex;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cumulative score for one laptop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

impl Rating {
    /// `sum / count`, or `0.0` before the first contribution.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Per-laptop rating aggregates.
///
/// Aggregates are created on first contribution and never removed. Laptop
/// existence is the caller's concern.
pub trait RatingStore: Send + Sync {
    /// Adds `score` to the aggregate for `laptop_id` and returns the updated
    /// value. Atomic per ID: concurrent calls never lose an update.
    fn add(&self, laptop_id: &str, score: f64) -> Rating;

    fn get(&self, laptop_id: &str) -> Option<Rating>;
}

/// A [`RatingStore`] guarded by one mutex across all IDs.
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    ratings: Mutex<HashMap<String, Rating>>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RatingStore for InMemoryRatingStore {
    fn add(&self, laptop_id: &str, score: f64) -> Rating {
        let mut ratings = self.ratings.lock();
        let rating = ratings.entry(laptop_id.to_string()).or_default();
        rating.count = rating.count.saturating_add(1);
        rating.sum += score;
        *rating
    }

    fn get(&self, laptop_id: &str) -> Option<Rating> {
        self.ratings.lock().get(laptop_id).copied()
    }
}
