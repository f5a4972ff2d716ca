//! Play Verification API
//!
//! Endpoints:
//!   POST /verify-play -> Verify one play attempt and record it
//!
//! Every reply carries the structured verify-play body. Missing
//! parameters map to 400, unexpected failures to 500; oracle rejections
//! and below-threshold scores are ordinary 200 replies with
//! `success: false`.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::verify::{FailureReason, VerificationOutcome, VerificationWorkflow};

// ============================================================================
// State
// ============================================================================

/// Play API state
#[derive(Clone)]
pub struct PlayApiState {
    pub workflow: Arc<VerificationWorkflow>,
}

impl PlayApiState {
    pub fn new(workflow: Arc<VerificationWorkflow>) -> Self {
        Self { workflow }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Track id as presented by clients, numeric or string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TrackKey {
    Num(u64),
    Text(String),
}

impl TrackKey {
    fn into_string(self) -> String {
        match self {
            TrackKey::Num(n) => n.to_string(),
            TrackKey::Text(s) => s,
        }
    }
}

/// Play verification request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPlayRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub track_id: Option<TrackKey>,
    #[serde(default)]
    pub action: Option<String>,
}

/// Play verification response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPlayResponse {
    pub success: bool,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<VerificationOutcome> for VerifyPlayResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Accepted { score } => Self {
                success: true,
                score,
                message: Some("Play verified as human".to_string()),
                error: None,
            },
            VerificationOutcome::Rejected { score } => Self {
                success: false,
                score,
                message: Some(format!("Play blocked - bot score too low ({})", score)),
                error: None,
            },
            VerificationOutcome::Errored { reason } => Self {
                success: false,
                score: 0.0,
                message: None,
                error: Some(reason.to_string()),
            },
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// Verify a single play attempt
pub async fn verify_play(
    State(state): State<PlayApiState>,
    Json(request): Json<VerifyPlayRequest>,
) -> (StatusCode, Json<VerifyPlayResponse>) {
    let token = request.token.unwrap_or_default();
    let track_id = request
        .track_id
        .map(TrackKey::into_string)
        .unwrap_or_default();
    let action = request.action.unwrap_or_default();

    let outcome = state.workflow.verify_play(&token, &track_id, &action).await;

    let status = match &outcome {
        VerificationOutcome::Errored {
            reason: FailureReason::MissingParameters,
        } => StatusCode::BAD_REQUEST,
        VerificationOutcome::Errored {
            reason: FailureReason::Internal,
        } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };

    (status, Json(outcome.into()))
}

// ============================================================================
// Router
// ============================================================================

/// Create the play verification router
pub fn create_router(state: PlayApiState) -> Router {
    Router::new()
        .route("/verify-play", post(verify_play))
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_outcome_response() {
        let response: VerifyPlayResponse = VerificationOutcome::accepted(0.8).into();

        assert!(response.success);
        assert_eq!(response.score, 0.8);
        assert_eq!(response.message.as_deref(), Some("Play verified as human"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_rejected_outcome_response_carries_score() {
        let response: VerifyPlayResponse = VerificationOutcome::rejected(0.2).into();

        assert!(!response.success);
        assert_eq!(response.score, 0.2);
        assert_eq!(
            response.message.as_deref(),
            Some("Play blocked - bot score too low (0.2)")
        );
    }

    #[test]
    fn test_errored_outcome_response_has_error_field() {
        let response: VerifyPlayResponse =
            VerificationOutcome::errored(FailureReason::NetworkError).into();

        assert!(!response.success);
        assert_eq!(response.score, 0.0);
        assert!(response.message.is_none());
        assert_eq!(response.error.as_deref(), Some("Network error"));
    }

    #[test]
    fn test_request_accepts_numeric_and_string_track_ids() {
        let numeric: VerifyPlayRequest =
            serde_json::from_str(r#"{"token":"t","trackId":3,"action":"play_music"}"#).unwrap();
        assert_eq!(numeric.track_id.map(TrackKey::into_string).unwrap(), "3");

        let text: VerifyPlayRequest =
            serde_json::from_str(r#"{"token":"t","trackId":"3","action":"play_music"}"#).unwrap();
        assert_eq!(text.track_id.map(TrackKey::into_string).unwrap(), "3");
    }

    #[test]
    fn test_request_tolerates_missing_fields() {
        let request: VerifyPlayRequest = serde_json::from_str(r#"{"token":"t"}"#).unwrap();
        assert!(request.track_id.is_none());
        assert!(request.action.is_none());
    }

    #[test]
    fn test_response_wire_format() {
        let response: VerifyPlayResponse = VerificationOutcome::accepted(0.9).into();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["score"], 0.9);
        assert!(json.get("error").is_none());
    }
}
