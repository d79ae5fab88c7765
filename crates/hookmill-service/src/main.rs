//! Binary entry point: mode detection and process wiring.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hookmill::config::{BotConfig, RunMode};
use hookmill::routing::{EventRouter, NonBlockingConcurrentRouter};

use hookmill_service::{action::run_action, server::run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Development convenience; absent .env files are fine.
    dotenvy::dotenv().ok();

    let config = Arc::new(BotConfig::from_env()?);

    let default_level = if config.runtime.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _sentry_guard = config.runtime.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    // The stock process ships one non-blocking router; embedders bind
    // their own handlers to it (or bring their own router set) before
    // starting the server.
    let event_routers: Vec<Arc<dyn EventRouter>> =
        vec![Arc::new(NonBlockingConcurrentRouter::new())];

    match config.runtime.mode {
        RunMode::App => {
            run_server(config, event_routers).await?;
            Ok(())
        }
        RunMode::Action => {
            let exit_code = run_action(config, event_routers).await;
            std::process::exit(exit_code);
        }
    }
}
