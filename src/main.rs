use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

use feedcast::{
    source, summary, Config, Database, Fetcher, Notifier, Result, RssSourceProvider, Shutdown,
    TelegramPublisher,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let mut config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = feedcast::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedcast::logging::init_console_only(&config.logging.level);
    }

    info!("feedcast {}", env!("CARGO_PKG_VERSION"));

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let db = Arc::new(Database::open(&config.database.path).await?);
    let publisher = Arc::new(TelegramPublisher::new(&config.telegram)?);
    let verified = publisher.verify().await?;
    info!(
        "Connected to Telegram as {}, publishing to {} ({})",
        verified.bot.username.as_deref().unwrap_or("(unnamed bot)"),
        verified
            .chat
            .title
            .as_deref()
            .unwrap_or(&config.telegram.channel_id),
        verified.chat.kind
    );

    let seeded = source::seed_sources(&db, &config.sources).await?;
    if seeded > 0 {
        info!("Registered {} new source(s) from configuration", seeded);
    }

    let fetcher = Fetcher::new(
        db.clone(),
        db.clone(),
        Arc::new(RssSourceProvider::new(&config.fetcher)?),
        &config.fetcher,
    );
    let notifier = Notifier::new(
        db.clone(),
        summary::from_config(&config.summarizer)?,
        publisher,
        &config,
    );

    let shutdown = Shutdown::new();
    let fetch_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { fetcher.run(shutdown).await })
    };
    let notify_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { notifier.run(shutdown).await })
    };

    shutdown_signal().await;
    info!("Shutdown signal received, stopping loops");
    shutdown.trigger();

    for (name, task) in [("fetch", fetch_task), ("notification", notify_task)] {
        if let Err(e) = task.await {
            warn!("The {} loop ended abnormally: {}", name, e);
        }
    }

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
