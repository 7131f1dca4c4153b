//! Workout-logging Telegram bot
//!
//! A conversational assistant for recording sets (weight × reps) and
//! reviewing training history, backed by an embedded `SQLite` store.

mod config;
mod db;
mod dispatch;
mod flows;
mod runtime;
mod session;
mod telegram;

use config::Config;
use db::Database;
use dispatch::Dispatcher;
use runtime::BotRuntime;
use telegram::BotApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftlog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    // Initialize database
    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    // Register the command menu; a failure here is cosmetic
    let api = BotApi::new(&config.bot_token);
    if let Err(e) = api.set_my_commands(&dispatch::BOT_COMMANDS).await {
        tracing::warn!(error = %e, "failed to register command menu");
    }

    let dispatcher = Dispatcher::new(db);
    let mut runtime = BotRuntime::new(
        api,
        dispatcher,
        config.poll_timeout_secs,
        chrono::Duration::minutes(config.session_ttl_minutes),
    );

    tracing::info!("Bot started");
    tokio::select! {
        result = runtime.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "poll loop aborted");
                std::process::exit(1);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
