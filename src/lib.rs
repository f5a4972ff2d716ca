//! Playgate
//!
//! Verification-gated audio playback. Every play attempt presents a
//! challenge token that an external trust oracle scores; only
//! attempts scored at or above the configured threshold are accepted,
//! and every attempt is tallied for operators.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs      - Crate root with re-exports
//! ├── main.rs     - Server entrypoint
//! ├── config.rs   - Configuration management
//! ├── catalog.rs  - Track discovery & catalog
//! ├── playback.rs - Verification-gated playback trigger
//! ├── verify/     - Play verification
//! │   ├── provider.rs - Oracle score bindings (direct & backend proxy)
//! │   ├── fallback.rs - Synthetic scores for unreachable oracles
//! │   └── workflow.rs - End-to-end attempt orchestration
//! ├── stats/      - Attempt statistics
//! │   ├── history.rs - Capped per-track score history
//! │   └── store.rs   - Global & per-track counters
//! └── api/        - HTTP API endpoints
//!     ├── play.rs - Play verification endpoint
//!     └── web.rs  - Stats, catalog & health endpoints
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod playback;
pub mod stats;
pub mod verify;

// Re-export main types for convenience
pub use config::{GateConfig, VerifyBinding};

// Re-export verification types
pub use verify::{
    BackendProvider, FailureReason, OracleFailurePolicy, ScoreProvider, ScoreReport,
    SiteVerifyProvider, VerificationOutcome, VerificationWorkflow,
};

// Re-export statistics types
pub use stats::{AttemptRecord, GlobalStats, ScoreEntry, StatsStore, TrackStatsView};

// Re-export catalog types
pub use catalog::{Track, TrackCatalog};

// Re-export playback types
pub use playback::{AudioSink, Notice, NoticeKind, Notifier, PlaybackTrigger, TriggerResult};

// Re-export API types
pub use api::{PlayApiState, WebApiState, create_play_router, create_web_router};
