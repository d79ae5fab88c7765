//! Web server startup and lifecycle.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use hookmill::config::BotConfig;
use hookmill::entities::GitHubApp;
use hookmill::routing::EventRouter;

use crate::{build_app, AppState};

/// Start the webhook server and block until shutdown.
///
/// Logs the App identity banner, enumerates installations best-effort,
/// binds the configured address, and serves until interrupted.
pub async fn run_server(
    config: Arc<BotConfig>,
    event_routers: Vec<Arc<dyn EventRouter>>,
) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let github_app = Arc::new(GitHubApp::new(
        &config.github,
        config.runtime.user_agent(),
        http,
        event_routers,
    )?);

    info!("Starting the following GitHub App:");
    info!("* app id: {}", github_app.app_id());
    info!(
        "* private key SHA-1 fingerprint: {}",
        github_app.private_key().fingerprint()
    );
    info!("* user agent: {}", github_app.user_agent());
    github_app.log_installs_list().await;

    let state = AppState {
        github_app,
        config: Arc::clone(&config),
    };

    let listener =
        TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!(
        "{}",
        format!(
            " Serving on http://{}:{}/ ",
            config.server.host, config.server.port
        )
    );

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(" Stopping the server ");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(signal_error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %signal_error, "Failed to listen for the shutdown signal");
    }
}
