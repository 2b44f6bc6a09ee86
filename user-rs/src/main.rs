//! user-rs: User directory server

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_rs::signal::shutdown_signal;
use user_rs::{api, Config, UserStore};

#[derive(Parser, Debug)]
#[command(name = "user-rs", version, about = "User directory server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server listen address (overrides the config file)
    #[arg(long)]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(addr) = args.listen_addr {
        config.server.listen_addr = addr;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting user-rs v{}", env!("CARGO_PKG_VERSION"));

    let store = UserStore::open(&config.storage.database_url).await?;
    let added = store.seed(&config.directory.users).await?;
    info!("User directory ready ({} users added)", added);

    let listener = TcpListener::bind(&config.server.listen_addr).await?;

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });

    api::serve(store, listener, shutdown).await?;

    info!("User server stopped");
    Ok(())
}
