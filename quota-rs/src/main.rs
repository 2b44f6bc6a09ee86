//! quota-rs: Quota admission server
//!
//! Serves the quota API and runs the replenishment and user sync loops until
//! interrupted.

use clap::Parser;
use quota_rs::admission::Admission;
use quota_rs::api::ApiServer;
use quota_rs::directory::{Directory, HttpDirectory};
use quota_rs::ledger::LedgerStore;
use quota_rs::replenish::Replenisher;
use quota_rs::supervisor::Supervisor;
use quota_rs::sync::UserSync;
use quota_rs::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "quota-rs", version, about = "Per-user quota admission server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server listen address (overrides the config file)
    #[arg(long)]
    listen_addr: Option<String>,

    /// User service address (overrides the config file)
    #[arg(long)]
    directory_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(addr) = args.listen_addr {
        config.server.listen_addr = addr;
    }
    if let Some(url) = args.directory_url {
        config.directory.url = url;
    }
    config.validate()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting quota-rs v{}", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", config.server.listen_addr);
    info!("  Database: {}", config.storage.database_url);
    info!("  User directory: {}", config.directory.url);

    // The only fatal failure: without a ledger there is nothing to serve
    let store = LedgerStore::open(&config.storage.database_url).await?;

    let directory: Arc<dyn Directory> = Arc::new(HttpDirectory::new(
        &config.directory.url,
        config.directory_timeout(),
    )?);

    // Bulk-initialize from the current directory snapshot; the sync loop
    // catches up on anything missed here
    match directory.all_ids().await {
        Ok(ids) => match store.initialize(&ids, config.quota.default_quota).await {
            Ok(created) => info!("Ledger initialized: {} new of {} users", created, ids.len()),
            Err(e) => warn!("Quota database initialization error: {}", e),
        },
        Err(e) => warn!("User directory unavailable at startup: {}", e),
    }

    let listener = TcpListener::bind(&config.server.listen_addr).await?;

    let shutdown = CancellationToken::new();
    let mut supervisor = Supervisor::new(shutdown.clone());

    let replenisher = Replenisher::new(
        store.clone(),
        config.replenish_policy(),
        config.replenish_interval(),
    );
    let token = supervisor.token();
    supervisor.spawn("replenisher", replenisher.run(token));

    let user_sync = UserSync::new(
        store.clone(),
        directory,
        config.quota.default_quota,
        config.sync_schedule(),
    );
    let token = supervisor.token();
    supervisor.spawn("user sync", user_sync.run(token));

    let server = ApiServer::new(Admission::new(store));
    let token = supervisor.token();
    supervisor.spawn("api server", server.run(listener, token));

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    info!("Quota server started");

    if let Err(e) = supervisor.wait().await {
        error!("Quota server error: {}", e);
        return Err(e.into());
    }

    info!("Quota server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
