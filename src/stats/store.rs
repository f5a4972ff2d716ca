//! Play Statistics Store
//!
//! Owns every counter the verification workflow reports into: the global
//! attempt/verified/blocked totals and the per-track breakdowns with
//! bounded score histories. All mutation flows through [`StatsStore::record`],
//! which applies one completed attempt under a single write-lock
//! acquisition. Counters live for the process lifetime only.

use crate::stats::history::{ScoreEntry, ScoreHistory, RECENT_WINDOW};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

// ============================================================================
// Counters
// ============================================================================

/// Counters for a single track
#[derive(Debug, Clone, Default)]
pub struct TrackStats {
    pub total_attempts: u64,
    pub verified_plays: u64,
    pub blocked_plays: u64,
    pub score_history: ScoreHistory,
}

/// Process-wide play statistics
#[derive(Debug, Clone, Default)]
pub struct PlayStats {
    pub total_verifications: u64,
    pub verified_plays: u64,
    pub blocked_plays: u64,
    pub track_stats: HashMap<String, TrackStats>,
}

/// One completed verification attempt, as reported by the workflow
#[derive(Debug, Clone)]
pub enum AttemptRecord {
    /// A score was resolved and checked against the threshold
    Scored {
        track_id: String,
        score: f64,
        accepted: bool,
    },

    /// The attempt failed before any score was resolved. Counts toward
    /// the global totals only; no per-track entry is created.
    Failed,
}

// ============================================================================
// Snapshots
// ============================================================================

/// Serializable per-track statistics with recency projections
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStatsView {
    pub total_attempts: u64,
    pub verified_plays: u64,
    pub blocked_plays: u64,
    pub score_history: Vec<ScoreEntry>,
    /// Last 10 entries, oldest first
    pub recent_scores: Vec<ScoreEntry>,
    /// Mean over the retained history, 3 decimal places, 0 when empty
    pub average_score: f64,
}

impl From<&TrackStats> for TrackStatsView {
    fn from(stats: &TrackStats) -> Self {
        Self {
            total_attempts: stats.total_attempts,
            verified_plays: stats.verified_plays,
            blocked_plays: stats.blocked_plays,
            score_history: stats.score_history.to_vec(),
            recent_scores: stats.score_history.recent(RECENT_WINDOW),
            average_score: stats.score_history.average(),
        }
    }
}

/// Snapshot of the global counters plus every track's statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_verifications: u64,
    pub verified_plays: u64,
    pub blocked_plays: u64,
    pub track_stats: HashMap<String, TrackStatsView>,
    /// `verified / total * 100` as "NN.NN%", or "0%" before any attempt
    pub verification_rate: String,
}

/// Share of attempts that verified, formatted as a percentage string
pub fn verification_rate(verified: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.2}%", verified as f64 / total as f64 * 100.0)
}

// ============================================================================
// Store
// ============================================================================

/// Shared statistics container
///
/// Held as an `Arc<StatsStore>` by the workflow and the API layer. The
/// internal lock serializes writers; readers clone snapshots out.
#[derive(Debug)]
pub struct StatsStore {
    stats: RwLock<PlayStats>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self {
            stats: RwLock::new(PlayStats::default()),
        }
    }

    /// Apply one completed attempt. The single mutation entry point.
    pub async fn record(&self, record: AttemptRecord) {
        let mut stats = self.stats.write().await;
        stats.total_verifications += 1;

        match record {
            AttemptRecord::Scored {
                track_id,
                score,
                accepted,
            } => {
                {
                    let track = stats.track_stats.entry(track_id).or_default();
                    track.total_attempts += 1;
                    track.score_history.push(ScoreEntry::new(score, accepted));
                    if accepted {
                        track.verified_plays += 1;
                    } else {
                        track.blocked_plays += 1;
                    }
                }
                if accepted {
                    stats.verified_plays += 1;
                } else {
                    stats.blocked_plays += 1;
                }
            }
            AttemptRecord::Failed => {
                stats.blocked_plays += 1;
            }
        }

        debug!(
            total = stats.total_verifications,
            verified = stats.verified_plays,
            blocked = stats.blocked_plays,
            "Recorded verification attempt"
        );
    }

    /// Clone out the global counters and every track's statistics
    pub async fn global_snapshot(&self) -> GlobalStats {
        let stats = self.stats.read().await;
        GlobalStats {
            total_verifications: stats.total_verifications,
            verified_plays: stats.verified_plays,
            blocked_plays: stats.blocked_plays,
            track_stats: stats
                .track_stats
                .iter()
                .map(|(id, track)| (id.clone(), track.into()))
                .collect(),
            verification_rate: verification_rate(stats.verified_plays, stats.total_verifications),
        }
    }

    /// Statistics for one track, or `None` if it has no recorded attempts
    pub async fn track_snapshot(&self, track_id: &str) -> Option<TrackStatsView> {
        let stats = self.stats.read().await;
        stats.track_stats.get(track_id).map(TrackStatsView::from)
    }

    /// Drop every counter and history back to zero. Idempotent.
    pub async fn reset(&self) {
        let mut stats = self.stats.write().await;
        *stats = PlayStats::default();
        info!("Play statistics reset");
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}
