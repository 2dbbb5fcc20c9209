//! Startup helpers for the session notes server.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::llm::OpenAiSessionSummarizer;
use crate::server::{self, AppState};
use crate::sessions::open_store;

/// Run the server until Ctrl-C, then flush the store.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Session Notes v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Read and validate the configuration from the environment.
///
/// # Errors
/// Returns an error if a variable cannot be parsed or a value is invalid.
pub fn load_config() -> Result<ServiceConfig, Box<dyn std::error::Error + Send + Sync>> {
    let config = ServiceConfig::from_env()?;
    config.validate()?;
    Ok(config)
}

/// Open the store and build the generation client.
///
/// # Errors
/// Returns an error if the store cannot be opened or the HTTP client cannot be built.
pub async fn initialize(
    config: &ServiceConfig,
) -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    let store = open_store(&config.store)
        .await
        .map_err(|e| format!("Failed to open session store: {e}"))?;

    let summarizer = OpenAiSessionSummarizer::new(&config.llm)
        .map_err(|e| format!("Failed to create completion client: {e}"))?;
    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; summary generation will fail");
    }
    tracing::info!(
        "Completion endpoint: {} (model {})",
        config.llm.base_url,
        summarizer.model()
    );

    Ok(AppState::new(store, Arc::new(summarizer)))
}

/// Serve until `shutdown` completes, then flush the store.
///
/// # Errors
/// Returns an error if startup, serving or the final flush fails.
pub async fn serve<F>(
    config: ServiceConfig,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = initialize(&config).await?;
    let store = Arc::clone(&state.store);

    server::run_server_with_shutdown(state, &config.server, shutdown).await?;

    store.flush().await?;
    tracing::info!("Session store flushed, exiting");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
