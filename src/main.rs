use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::fmt::format::FmtSpan;

use playgate::{
    api::web::health_check,
    api::{PlayApiState, WebApiState, create_play_router, create_web_router},
    catalog::TrackCatalog,
    config::{GateConfig, VerifyBinding},
    stats::StatsStore,
    verify::{BackendProvider, ScoreProvider, SiteVerifyProvider, VerificationWorkflow},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first - this validates binding requirements
    let config = Arc::new(GateConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        eprintln!("Please check PLAYGATE_* environment variables.");
        e
    })?);

    // Initialize logging based on configuration
    init_logging(&config)?;

    info!("Starting Playgate play-verification server");
    info!(
        "Verification settings: threshold={}, binding={:?}, on_oracle_failure={:?}",
        config.verification.score_threshold,
        config.oracle.binding,
        config.verification.on_oracle_failure
    );

    // Load the track catalog (a static catalog file wins over the scan)
    let catalog = Arc::new(load_catalog(&config).await?);
    info!("Track catalog ready: {} track(s)", catalog.len());

    // Initialize the statistics store
    let stats = Arc::new(StatsStore::new());

    // Pick the score provider for the configured binding
    let provider = create_provider(&config)?;

    let workflow = Arc::new(VerificationWorkflow::new(
        provider,
        stats.clone(),
        config.verification.score_threshold,
        config.verification.on_oracle_failure,
    ));

    // Build the application with routes
    let mut app = Router::new()
        // Play verification + stats/catalog routes
        .nest(
            "/api",
            create_play_router(PlayApiState::new(workflow.clone())).merge(create_web_router(
                WebApiState::new(
                    stats.clone(),
                    catalog.clone(),
                    config.verification.score_threshold,
                ),
            )),
        )
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http());

    if config.server.enable_cors {
        app = app.layer(CorsLayer::permissive());
        info!("Permissive CORS enabled for browser clients");
    }

    // Start the server on configured host/port
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("Playgate server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging based on configuration
fn init_logging(config: &GateConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(if config.logging.log_requests {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

/// Load the track catalog from the configured source
async fn load_catalog(config: &GateConfig) -> Result<TrackCatalog> {
    if let Some(path) = &config.catalog.catalog_file {
        return TrackCatalog::from_file(Path::new(path))
            .await
            .with_context(|| format!("Failed to load catalog file {}", path));
    }

    Ok(TrackCatalog::scan_dir(
        Path::new(&config.catalog.media_dir),
        &config.catalog.media_base_url,
    )
    .await)
}

/// Build the score provider for the configured binding
fn create_provider(config: &GateConfig) -> Result<Arc<dyn ScoreProvider>> {
    let provider: Arc<dyn ScoreProvider> = match config.oracle.binding {
        VerifyBinding::Direct => {
            info!("Score provider: direct siteverify binding");
            Arc::new(SiteVerifyProvider::new(&config.oracle)?)
        }
        VerifyBinding::Backend => {
            info!(
                "Score provider: backend proxy binding ({})",
                config.oracle.backend_url
            );
            Arc::new(BackendProvider::new(&config.oracle)?)
        }
    };

    Ok(provider)
}
