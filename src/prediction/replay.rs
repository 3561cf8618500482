//! Replay rating engine: returns previously recorded rating snapshots in
//! order, one per forecast step.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{RatingEngine, RatingError};
use crate::types::{RatingSnapshot, WeatherConditions};

pub struct ReplayRatingEngine {
    snapshots: Vec<RatingSnapshot>,
    cursor: AtomicUsize,
}

impl ReplayRatingEngine {
    pub fn new(snapshots: Vec<RatingSnapshot>) -> Self {
        Self {
            snapshots,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load a JSON array of `{lines, summary}` snapshots.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshots: Vec<RatingSnapshot> = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self::new(snapshots))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl RatingEngine for ReplayRatingEngine {
    fn rate(&self, _conditions: &WeatherConditions) -> Result<RatingSnapshot, RatingError> {
        let step = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .get(step)
            .cloned()
            .ok_or(RatingError::ReplayExhausted {
                step,
                available: self.snapshots.len(),
            })
    }
}
