//! Verification Workflow
//!
//! Orchestrates one play-verification attempt end to end: validate the
//! request, resolve a trust score through the configured provider (or the
//! fallback scorer under fail-open policy), apply the acceptance
//! threshold, and report the completed attempt into the statistics store.
//! Every path returns a structured outcome; nothing here is fatal.

use crate::stats::{AttemptRecord, StatsStore};
use crate::verify::fallback::fallback_score;
use crate::verify::provider::{ProviderError, ScoreProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// Outcomes
// ============================================================================

/// Why an attempt produced no accepted play
///
/// Display strings are the client-visible error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// The request lacked the token, the track id, or the action label
    #[error("Missing required parameters")]
    MissingParameters,

    /// The oracle rejected the presented token
    #[error("Verification failed")]
    OracleReportedFailure,

    /// The oracle attested a different action than the one expected
    #[error("Action mismatch")]
    ActionMismatch,

    /// The oracle could not be reached under fail-closed policy
    #[error("Network error")]
    NetworkError,

    /// Unexpected failure while handling the attempt
    #[error("Internal server error")]
    Internal,
}

impl From<&ProviderError> for FailureReason {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::OracleReportedFailure { .. } => FailureReason::OracleReportedFailure,
            ProviderError::ActionMismatch { .. } => FailureReason::ActionMismatch,
            ProviderError::Network(_) => FailureReason::NetworkError,
        }
    }
}

/// Decision for one play-verification attempt
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// The score met the threshold; playback may start
    Accepted { score: f64 },

    /// A score was resolved but fell below the threshold
    Rejected { score: f64 },

    /// The attempt failed before a score could be resolved
    Errored { reason: FailureReason },
}

impl VerificationOutcome {
    pub fn accepted(score: f64) -> Self {
        Self::Accepted { score }
    }

    pub fn rejected(score: f64) -> Self {
        Self::Rejected { score }
    }

    pub fn errored(reason: FailureReason) -> Self {
        Self::Errored { reason }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The resolved score, or 0 when the attempt never resolved one
    pub fn score(&self) -> f64 {
        match self {
            Self::Accepted { score } | Self::Rejected { score } => *score,
            Self::Errored { .. } => 0.0,
        }
    }
}

// ============================================================================
// Failure policy
// ============================================================================

/// How an unreachable oracle is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleFailurePolicy {
    /// Substitute a synthetic fallback score and continue
    FailOpen,
    /// Treat the attempt as blocked
    FailClosed,
}

/// Error for unrecognized policy names
#[derive(Debug, thiserror::Error)]
#[error("unknown oracle failure policy: {0}")]
pub struct ParsePolicyError(String);

impl std::str::FromStr for OracleFailurePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail_open" | "fail-open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "fail-closed" | "closed" => Ok(Self::FailClosed),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

// ============================================================================
// Workflow
// ============================================================================

/// Gate between play requests and the statistics they produce
///
/// Shared as one instance across all API handlers. The provider decides
/// where scores come from; the policy decides what an unreachable oracle
/// means; the store receives exactly one record per counted attempt.
pub struct VerificationWorkflow {
    provider: Arc<dyn ScoreProvider>,
    stats: Arc<StatsStore>,
    threshold: f64,
    failure_policy: OracleFailurePolicy,
}

impl VerificationWorkflow {
    pub fn new(
        provider: Arc<dyn ScoreProvider>,
        stats: Arc<StatsStore>,
        threshold: f64,
        failure_policy: OracleFailurePolicy,
    ) -> Self {
        Self {
            provider,
            stats,
            threshold,
            failure_policy,
        }
    }

    /// The acceptance threshold scores are measured against
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run one verification attempt.
    ///
    /// Missing parameters reject up front without touching statistics.
    /// Every other path counts the attempt: scored outcomes update the
    /// track's counters and history, failures update the global blocked
    /// total only.
    pub async fn verify_play(
        &self,
        token: &str,
        track_id: &str,
        action: &str,
    ) -> VerificationOutcome {
        if token.is_empty() || track_id.is_empty() || action.is_empty() {
            return VerificationOutcome::errored(FailureReason::MissingParameters);
        }

        let score = match self.provider.request_score(token, track_id, action).await {
            Ok(report) => report.score,
            Err(ProviderError::Network(detail))
                if self.failure_policy == OracleFailurePolicy::FailOpen =>
            {
                let score = fallback_score();
                warn!(
                    track_id = %track_id,
                    detail = %detail,
                    score = score,
                    "Oracle unreachable, continuing with fallback score"
                );
                score
            }
            Err(err) => {
                warn!(track_id = %track_id, error = %err, "Verification attempt failed");
                self.stats.record(AttemptRecord::Failed).await;
                return VerificationOutcome::errored(FailureReason::from(&err));
            }
        };

        let accepted = score >= self.threshold;
        self.stats
            .record(AttemptRecord::Scored {
                track_id: track_id.to_string(),
                score,
                accepted,
            })
            .await;

        if accepted {
            info!("Verified play for track {} - Score: {}", track_id, score);
            VerificationOutcome::accepted(score)
        } else {
            warn!(
                "Blocked potential bot play for track {} - Score: {}",
                track_id, score
            );
            VerificationOutcome::rejected(score)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::provider::ScoreReport;
    use async_trait::async_trait;

    struct StubProvider {
        result: Result<ScoreReport, ProviderError>,
    }

    #[async_trait]
    impl ScoreProvider for StubProvider {
        async fn request_score(
            &self,
            _token: &str,
            _track_id: &str,
            _action: &str,
        ) -> Result<ScoreReport, ProviderError> {
            self.result.clone()
        }
    }

    fn workflow_with(
        result: Result<ScoreReport, ProviderError>,
        threshold: f64,
        policy: OracleFailurePolicy,
    ) -> (VerificationWorkflow, Arc<StatsStore>) {
        let stats = Arc::new(StatsStore::new());
        let workflow = VerificationWorkflow::new(
            Arc::new(StubProvider { result }),
            stats.clone(),
            threshold,
            policy,
        );
        (workflow, stats)
    }

    #[tokio::test]
    async fn test_high_score_is_accepted() {
        let (workflow, stats) = workflow_with(
            Ok(ScoreReport { score: 0.8 }),
            0.5,
            OracleFailurePolicy::FailClosed,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert_eq!(outcome, VerificationOutcome::accepted(0.8));

        let global = stats.global_snapshot().await;
        assert_eq!(global.total_verifications, 1);
        assert_eq!(global.verified_plays, 1);

        let track = stats.track_snapshot("1").await.unwrap();
        assert_eq!(track.verified_plays, 1);
    }

    #[tokio::test]
    async fn test_low_score_is_rejected() {
        let (workflow, stats) = workflow_with(
            Ok(ScoreReport { score: 0.2 }),
            0.5,
            OracleFailurePolicy::FailClosed,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert_eq!(outcome, VerificationOutcome::rejected(0.2));

        let global = stats.global_snapshot().await;
        assert_eq!(global.blocked_plays, 1);

        let track = stats.track_snapshot("1").await.unwrap();
        assert_eq!(track.blocked_plays, 1);
        assert_eq!(track.score_history.len(), 1);
    }

    #[tokio::test]
    async fn test_score_equal_to_threshold_is_accepted() {
        let (workflow, _) = workflow_with(
            Ok(ScoreReport { score: 0.5 }),
            0.5,
            OracleFailurePolicy::FailClosed,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_oracle_failure_blocks_without_track_entry() {
        let (workflow, stats) = workflow_with(
            Err(ProviderError::OracleReportedFailure {
                codes: vec!["timeout-or-duplicate".to_string()],
            }),
            0.5,
            OracleFailurePolicy::FailClosed,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert_eq!(
            outcome,
            VerificationOutcome::errored(FailureReason::OracleReportedFailure)
        );

        let global = stats.global_snapshot().await;
        assert_eq!(global.total_verifications, 1);
        assert_eq!(global.blocked_plays, 1);
        assert!(global.track_stats.is_empty());
    }

    #[tokio::test]
    async fn test_action_mismatch_blocks() {
        let (workflow, stats) = workflow_with(
            Err(ProviderError::ActionMismatch {
                expected: "play_music".to_string(),
                actual: "login".to_string(),
            }),
            0.5,
            OracleFailurePolicy::FailClosed,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert_eq!(
            outcome,
            VerificationOutcome::errored(FailureReason::ActionMismatch)
        );
        assert_eq!(stats.global_snapshot().await.blocked_plays, 1);
    }

    #[tokio::test]
    async fn test_missing_parameters_touch_nothing() {
        let (workflow, stats) = workflow_with(
            Ok(ScoreReport { score: 0.9 }),
            0.5,
            OracleFailurePolicy::FailClosed,
        );

        let outcome = workflow.verify_play("", "1", "play_music").await;
        assert_eq!(
            outcome,
            VerificationOutcome::errored(FailureReason::MissingParameters)
        );

        let outcome = workflow.verify_play("token", "", "play_music").await;
        assert_eq!(
            outcome,
            VerificationOutcome::errored(FailureReason::MissingParameters)
        );

        let outcome = workflow.verify_play("token", "1", "").await;
        assert_eq!(
            outcome,
            VerificationOutcome::errored(FailureReason::MissingParameters)
        );

        let global = stats.global_snapshot().await;
        assert_eq!(global.total_verifications, 0);
        assert_eq!(global.blocked_plays, 0);
    }

    #[tokio::test]
    async fn test_network_failure_closed_blocks() {
        let (workflow, stats) = workflow_with(
            Err(ProviderError::Network("connection refused".to_string())),
            0.5,
            OracleFailurePolicy::FailClosed,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert_eq!(
            outcome,
            VerificationOutcome::errored(FailureReason::NetworkError)
        );

        let global = stats.global_snapshot().await;
        assert_eq!(global.blocked_plays, 1);
        assert!(global.track_stats.is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_open_falls_back_to_synthetic_score() {
        let (workflow, stats) = workflow_with(
            Err(ProviderError::Network("connection refused".to_string())),
            0.0,
            OracleFailurePolicy::FailOpen,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert!(outcome.is_accepted());
        assert!((0.4..1.0).contains(&outcome.score()));

        // Fallback scores flow through the normal recording path
        let track = stats.track_snapshot("1").await.unwrap();
        assert_eq!(track.total_attempts, 1);
        assert_eq!(track.score_history.len(), 1);
    }

    #[tokio::test]
    async fn test_fail_open_does_not_mask_oracle_rejections() {
        let (workflow, _) = workflow_with(
            Err(ProviderError::OracleReportedFailure { codes: vec![] }),
            0.5,
            OracleFailurePolicy::FailOpen,
        );

        let outcome = workflow.verify_play("token", "1", "play_music").await;
        assert_eq!(
            outcome,
            VerificationOutcome::errored(FailureReason::OracleReportedFailure)
        );
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!(
            "fail_open".parse::<OracleFailurePolicy>().unwrap(),
            OracleFailurePolicy::FailOpen
        );
        assert_eq!(
            "FAIL_CLOSED".parse::<OracleFailurePolicy>().unwrap(),
            OracleFailurePolicy::FailClosed
        );
        assert!("sometimes".parse::<OracleFailurePolicy>().is_err());
    }

    #[test]
    fn test_errored_outcome_reports_zero_score() {
        let outcome = VerificationOutcome::errored(FailureReason::NetworkError);
        assert_eq!(outcome.score(), 0.0);
    }
}
