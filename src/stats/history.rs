//! Bounded Score History
//!
//! Every verification attempt that resolves a score appends one entry to
//! the owning track's history. Capacity is fixed and eviction is strictly
//! FIFO, so the buffer always holds the most recent entries in insertion
//! order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum entries retained per track
pub const HISTORY_CAPACITY: usize = 50;

/// Size of the recency window served in track snapshots
pub const RECENT_WINDOW: usize = 10;

/// One recorded verification outcome for a track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Trust score in [0, 1]
    pub score: f64,

    /// When the verification completed
    pub timestamp: DateTime<Utc>,

    /// Whether the score cleared the acceptance threshold
    pub verified: bool,
}

impl ScoreEntry {
    pub fn new(score: f64, verified: bool) -> Self {
        Self {
            score,
            timestamp: Utc::now(),
            verified,
        }
    }
}

/// Fixed-capacity FIFO buffer of score entries
///
/// The capacity bound is enforced on every push, so the length invariant
/// holds mid-burst as well as between requests.
#[derive(Debug, Clone)]
pub struct ScoreHistory {
    entries: VecDeque<ScoreEntry>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append an entry, evicting the oldest one once at capacity
    pub fn push(&mut self, entry: ScoreEntry) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All retained entries, oldest first
    pub fn to_vec(&self) -> Vec<ScoreEntry> {
        self.entries.iter().cloned().collect()
    }

    /// The last `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<ScoreEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Mean score over all retained entries, rounded to 3 decimal places
    ///
    /// Returns 0.0 when the history is empty.
    pub fn average(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.entries.iter().map(|e| e.score).sum();
        let mean = sum / self.entries.len() as f64;
        (mean * 1000.0).round() / 1000.0
    }
}

impl Default for ScoreHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: f64) -> ScoreEntry {
        ScoreEntry::new(score, score >= 0.5)
    }

    #[test]
    fn test_push_below_capacity() {
        let mut history = ScoreHistory::new();
        for _ in 0..10 {
            history.push(entry(0.9));
        }
        assert_eq!(history.len(), 10);
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut history = ScoreHistory::new();
        for i in 0..51 {
            history.push(entry(i as f64 / 100.0));
        }

        assert_eq!(history.len(), HISTORY_CAPACITY);

        // Entry #1 (score 0.00) was evicted; #2..#51 remain
        let entries = history.to_vec();
        assert!((entries[0].score - 0.01).abs() < 1e-9);
        assert!((entries[49].score - 0.50).abs() < 1e-9);
    }

    #[test]
    fn test_recent_window_keeps_order() {
        let mut history = ScoreHistory::new();
        for i in 0..15 {
            history.push(entry(i as f64 / 100.0));
        }

        let recent = history.recent(RECENT_WINDOW);
        assert_eq!(recent.len(), 10);
        assert!((recent[0].score - 0.05).abs() < 1e-9);
        assert!((recent[9].score - 0.14).abs() < 1e-9);
    }

    #[test]
    fn test_recent_window_on_short_history() {
        let mut history = ScoreHistory::new();
        history.push(entry(0.7));
        history.push(entry(0.8));

        let recent = history.recent(RECENT_WINDOW);
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_average_rounds_to_three_decimals() {
        let mut history = ScoreHistory::new();
        history.push(entry(0.1));
        history.push(entry(0.2));
        history.push(entry(0.2));

        // Mean is 0.1666... which rounds to 0.167
        assert!((history.average() - 0.167).abs() < 1e-9);
    }

    #[test]
    fn test_average_of_empty_history_is_zero() {
        let history = ScoreHistory::new();
        assert_eq!(history.average(), 0.0);
    }
}
