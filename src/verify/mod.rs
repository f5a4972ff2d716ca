//! Play Verification
//!
//! Decides, for each play attempt, whether a human or a bot triggered it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌─────────────────────┐
//! │ VerificationWorkflow │────►│ ScoreProvider trait │
//! │ (threshold + policy) │     │  ├─ SiteVerify      │
//! └──────────┬───────────┘     │  └─ Backend proxy   │
//!            │                 └─────────────────────┘
//!            ▼
//!    ┌───────────────┐         fallback_score()
//!    │ StatsStore    │         (oracle unreachable,
//!    └───────────────┘          fail-open only)
//! ```
//!
//! The provider makes exactly one oracle attempt per play request. An
//! unreachable oracle resolves per the configured [`OracleFailurePolicy`]:
//! either the synthetic fallback score or a blocked attempt.

mod fallback;
mod provider;
mod workflow;

pub use fallback::{FALLBACK_FLOOR, fallback_score};
pub use provider::{
    BackendProvider, DEFAULT_SCORE, ProviderError, ScoreProvider, ScoreReport, SiteVerifyProvider,
    SiteVerifyReply,
};
pub use workflow::{
    FailureReason, OracleFailurePolicy, ParsePolicyError, VerificationOutcome,
    VerificationWorkflow,
};
