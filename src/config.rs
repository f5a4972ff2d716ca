use crate::verify::OracleFailurePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Default siteverify-compatible oracle endpoint
pub const DEFAULT_ORACLE_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Configuration for the playgate service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Oracle configuration
    pub oracle: OracleConfig,
    /// Verification policy configuration
    pub verification: VerificationConfig,
    /// Track catalog configuration
    pub catalog: CatalogConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Enable permissive CORS for browser clients
    pub enable_cors: bool,
}

/// Which transport the score provider uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyBinding {
    /// Call the oracle's siteverify endpoint directly
    Direct,
    /// Forward attempts to another deployment's verify endpoint
    Backend,
}

/// Error for unrecognized binding names
#[derive(Debug, thiserror::Error)]
#[error("unknown verify binding: {0}")]
pub struct ParseBindingError(String);

impl std::str::FromStr for VerifyBinding {
    type Err = ParseBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "backend" => Ok(Self::Backend),
            other => Err(ParseBindingError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Siteverify-compatible endpoint for the direct binding
    pub url: String,
    /// Shared secret presented to the oracle - MUST be from environment
    pub secret: String,
    /// Oracle call timeout in seconds
    pub timeout_secs: u64,
    /// Which transport binding resolves scores
    pub binding: VerifyBinding,
    /// Remote verify endpoint for the backend binding
    pub backend_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Score at or above which a play is accepted
    pub score_threshold: f64,
    /// What an unreachable oracle means
    pub on_oracle_failure: OracleFailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory scanned for playable files
    pub media_dir: String,
    /// Optional static catalog file; takes precedence over the scan
    pub catalog_file: Option<String>,
    /// URL prefix clients fetch audio from
    pub media_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,
    /// Enable request/response logging
    pub log_requests: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                enable_cors: true,
            },
            oracle: OracleConfig {
                url: DEFAULT_ORACLE_URL.to_string(),
                secret: String::new(), // MUST be configured for the direct binding
                timeout_secs: 10,
                binding: VerifyBinding::Direct,
                backend_url: String::new(),
            },
            verification: VerificationConfig {
                score_threshold: 0.5,
                on_oracle_failure: OracleFailurePolicy::FailClosed,
            },
            catalog: CatalogConfig {
                media_dir: "media".to_string(),
                catalog_file: None,
                media_base_url: "/media".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: false,
            },
        }
    }
}

impl GateConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = env::var("PLAYGATE_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("PLAYGATE_PORT") {
            config.server.port = port.parse().context("Invalid PLAYGATE_PORT value")?;
        }

        if let Ok(enable_cors) = env::var("PLAYGATE_ENABLE_CORS") {
            config.server.enable_cors = enable_cors
                .parse()
                .context("Invalid PLAYGATE_ENABLE_CORS value")?;
        }

        // Oracle configuration
        if let Ok(url) = env::var("PLAYGATE_ORACLE_URL") {
            config.oracle.url = url;
        }

        if let Ok(secret) = env::var("PLAYGATE_ORACLE_SECRET") {
            config.oracle.secret = secret;
        }

        if let Ok(timeout) = env::var("PLAYGATE_ORACLE_TIMEOUT_SECS") {
            config.oracle.timeout_secs = timeout
                .parse()
                .context("Invalid PLAYGATE_ORACLE_TIMEOUT_SECS value")?;
        }

        if let Ok(binding) = env::var("PLAYGATE_VERIFY_BINDING") {
            config.oracle.binding = binding
                .parse()
                .context("Invalid PLAYGATE_VERIFY_BINDING value")?;
        }

        if let Ok(url) = env::var("PLAYGATE_BACKEND_VERIFY_URL") {
            config.oracle.backend_url = url;
        }

        // Verification configuration
        if let Ok(threshold) = env::var("PLAYGATE_SCORE_THRESHOLD") {
            config.verification.score_threshold = threshold
                .parse()
                .context("Invalid PLAYGATE_SCORE_THRESHOLD value")?;
        }

        if let Ok(policy) = env::var("PLAYGATE_ON_ORACLE_FAILURE") {
            config.verification.on_oracle_failure = policy
                .parse()
                .context("Invalid PLAYGATE_ON_ORACLE_FAILURE value")?;
        }

        // Catalog configuration
        if let Ok(dir) = env::var("PLAYGATE_MEDIA_DIR") {
            config.catalog.media_dir = dir;
        }

        if let Ok(file) = env::var("PLAYGATE_CATALOG_FILE") {
            config.catalog.catalog_file = Some(file);
        }

        if let Ok(base_url) = env::var("PLAYGATE_MEDIA_BASE_URL") {
            config.catalog.media_base_url = base_url;
        }

        // Logging configuration
        if let Ok(level) = env::var("PLAYGATE_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(log_requests) = env::var("PLAYGATE_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid PLAYGATE_LOG_REQUESTS value")?;
        }

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for consistency
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if !(0.0..=1.0).contains(&self.verification.score_threshold) {
            return Err(anyhow::anyhow!(
                "Score threshold must be within [0, 1], got {}",
                self.verification.score_threshold
            ));
        }

        if self.oracle.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Oracle timeout must be non-zero"));
        }

        match self.oracle.binding {
            VerifyBinding::Direct => {
                Url::parse(&self.oracle.url).context("Invalid oracle URL")?;

                if self.oracle.secret.is_empty() {
                    return Err(anyhow::anyhow!(
                        "PLAYGATE_ORACLE_SECRET is required for the direct binding"
                    ));
                }
            }
            VerifyBinding::Backend => {
                if self.oracle.backend_url.is_empty() {
                    return Err(anyhow::anyhow!(
                        "PLAYGATE_BACKEND_VERIFY_URL is required for the backend binding"
                    ));
                }

                Url::parse(&self.oracle.backend_url).context("Invalid backend verify URL")?;
            }
        }

        Ok(())
    }
}
