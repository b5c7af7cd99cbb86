use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use uptime_service::config::Config;
use uptime_service::events::BroadcastRegistry;
use uptime_service::orchestrator::Engine;

#[derive(Parser, Debug)]
#[command(name = "uptime-service", version)]
#[command(about = "Headless uptime monitoring engine")]
struct Args {
    /// Config file, defaults to $XDG_CONFIG_HOME/uptime/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file, overrides `database.path` from the config
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logger::init_tracing();

    let args = Args::parse();
    let mut config = Config::from_config(args.config.as_ref())?;
    if let Some(path) = args.database {
        config.database.path = path;
    }
    info!("{}", config);

    let engine = Engine::open(&config, Arc::new(BroadcastRegistry::default())).await?;
    engine.start().await;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    engine.stop().await;

    Ok(())
}
