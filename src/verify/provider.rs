//! Score Provider Bindings
//!
//! A score provider exchanges a client-presented challenge token for a
//! trust score by consulting the external trust oracle. Two bindings
//! share the [`ScoreProvider`] contract:
//! - [`SiteVerifyProvider`]: speaks the siteverify wire directly and holds
//!   the oracle secret
//! - [`BackendProvider`]: forwards the attempt to another deployment of
//!   this service, for frontends that must not hold the secret

use crate::config::OracleConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Score substituted when a successful oracle reply carries no score field
/// (v2-compatible replies omit it)
pub const DEFAULT_SCORE: f64 = 0.5;

const USER_AGENT: &str = "playgate/0.1 (play verification)";

// ============================================================================
// Contract
// ============================================================================

/// A successfully resolved trust score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreReport {
    /// Trust score in [0, 1]
    pub score: f64,
}

/// Why a trust score could not be obtained
///
/// Display strings are the client-visible error messages; the structured
/// detail goes to logs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// The oracle answered but rejected the token
    #[error("Verification failed")]
    OracleReportedFailure { codes: Vec<String> },

    /// The oracle attested a different action than the one expected
    #[error("Action mismatch")]
    ActionMismatch { expected: String, actual: String },

    /// The oracle could not be reached or returned an unusable reply
    #[error("Network error")]
    Network(String),
}

/// Capability to resolve a trust score for a presented token
///
/// Implementations make exactly one attempt; there is no retry policy at
/// this layer. The track id is part of the contract because the proxied
/// binding forwards it; the direct binding ignores it.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Exchange a challenge token for a trust score.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the oracle rejects the token,
    /// attests a different action, or cannot be reached.
    async fn request_score(
        &self,
        token: &str,
        track_id: &str,
        expected_action: &str,
    ) -> Result<ScoreReport, ProviderError>;
}

// ============================================================================
// Direct binding (siteverify wire)
// ============================================================================

/// Reply shape of the siteverify wire
#[derive(Debug, Clone, Deserialize)]
pub struct SiteVerifyReply {
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Direct oracle binding holding the shared secret
pub struct SiteVerifyProvider {
    client: Client,
    endpoint: Url,
    secret: String,
}

impl SiteVerifyProvider {
    /// Build the direct binding from the oracle configuration section
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.url).context("Invalid oracle URL")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create oracle HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            secret: config.secret.clone(),
        })
    }
}

#[async_trait]
impl ScoreProvider for SiteVerifyProvider {
    async fn request_score(
        &self,
        token: &str,
        _track_id: &str,
        expected_action: &str,
    ) -> Result<ScoreReport, ProviderError> {
        debug!(endpoint = %self.endpoint, "Requesting trust score from oracle");

        let response = self
            .client
            .post(self.endpoint.as_str())
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Network(format!(
                "oracle returned status {}",
                status.as_u16()
            )));
        }

        let reply: SiteVerifyReply = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        interpret_reply(reply, expected_action)
    }
}

/// Classify a siteverify reply against the expected action label
fn interpret_reply(
    reply: SiteVerifyReply,
    expected_action: &str,
) -> Result<ScoreReport, ProviderError> {
    if !reply.success {
        return Err(ProviderError::OracleReportedFailure {
            codes: reply.error_codes,
        });
    }

    if reply.action.as_deref() != Some(expected_action) {
        return Err(ProviderError::ActionMismatch {
            expected: expected_action.to_string(),
            actual: reply.action.unwrap_or_default(),
        });
    }

    Ok(ScoreReport {
        score: reply.score.unwrap_or(DEFAULT_SCORE),
    })
}

// ============================================================================
// Proxied binding (verify-play wire)
// ============================================================================

/// Request body sent to the remote deployment's verify endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackendVerifyRequest<'a> {
    token: &'a str,
    track_id: &'a str,
    action: &'a str,
}

/// Reply shape of the verify-play wire served by this service
#[derive(Debug, Clone, Deserialize)]
struct BackendVerifyReply {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

/// Verification proxied through another deployment of this service
///
/// The remote end holds the oracle secret and runs its own workflow; this
/// binding maps its decision back into the provider contract.
pub struct BackendProvider {
    client: Client,
    endpoint: Url,
}

impl BackendProvider {
    /// Build the proxied binding from the oracle configuration section
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.backend_url).context("Invalid backend verify URL")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create backend HTTP client")?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ScoreProvider for BackendProvider {
    async fn request_score(
        &self,
        token: &str,
        track_id: &str,
        expected_action: &str,
    ) -> Result<ScoreReport, ProviderError> {
        debug!(endpoint = %self.endpoint, "Forwarding verification to backend");

        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&BackendVerifyRequest {
                token,
                track_id,
                action: expected_action,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Network(format!(
                "backend returned status {}",
                status.as_u16()
            )));
        }

        let reply: BackendVerifyReply = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !reply.success {
            return Err(ProviderError::OracleReportedFailure {
                codes: reply.error.into_iter().collect(),
            });
        }

        Ok(ScoreReport {
            score: reply.score.unwrap_or(DEFAULT_SCORE),
        })
    }
}
