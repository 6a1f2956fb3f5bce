//! Startup for the terminal chat client.

use std::process::ExitCode;

use crate::cli;
use crate::core::config::ChatConfig;
use crate::providers;
use crate::session::ChatSession;
use crate::storage;

/// Run the client until `/quit` or end of input.
///
/// # Returns
/// `ExitCode::SUCCESS` on a clean exit, `1` on startup or terminal failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    tracing::info!("Starting Galaxy Chat v{}", env!("CARGO_PKG_VERSION"));

    let config = match ChatConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!(
        "Backends: auth={:?}, chat={:?}, api={}",
        config.auth_backend,
        config.chat_backend,
        config.api_base_url
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(run_client(&config)) {
        tracing::error!("{e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Build the session described by `config`, resume it and run the terminal loop.
///
/// # Errors
/// Returns an error if storage or providers cannot be set up, or the terminal fails.
pub async fn run_client(config: &ChatConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let slots = storage::open_storage(&config.storage)
        .await
        .map_err(|e| format!("Failed to open storage: {e}"))?;
    let providers = providers::build_providers(config)
        .map_err(|e| format!("Failed to set up providers: {e}"))?;

    let session = ChatSession::new(slots, providers, config);
    if session.bootstrap().await.is_none() {
        tracing::debug!("Starting signed out");
    }

    cli::run_terminal(&session).await?;
    Ok(())
}
