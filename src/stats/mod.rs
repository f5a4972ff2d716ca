//! Play Statistics
//!
//! In-memory counters for verification attempts, split into global totals
//! and per-track breakdowns with bounded score histories.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌─────────────────────┐
//! │ StatsStore   │─────►│ PlayStats (global)  │
//! │ (RwLock)     │      │  └─ TrackStats map  │
//! └──────────────┘      │      └─ ScoreHistory│
//!                       └─────────────────────┘
//! ```
//!
//! The verification workflow is the only writer; the API layer reads
//! snapshots. Nothing here survives a process restart.

mod history;
mod store;

pub use history::{HISTORY_CAPACITY, RECENT_WINDOW, ScoreEntry, ScoreHistory};
pub use store::{
    AttemptRecord, GlobalStats, PlayStats, StatsStore, TrackStats, TrackStatsView,
    verification_rate,
};
