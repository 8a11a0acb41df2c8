use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

mod api;
mod broker;
mod cli;
mod config;

use api::AppState;
use broker::{SuspensionContextHandler, UpdateEndpoint};
use cli::Args;
use config::Config;
use keb_process::storage::{Instances, MemoryStorage, Operations, PostgresStorage};

fn initialize_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,keb_server=debug,keb_process=debug,sqlx::query=warn".into()
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    initialize_tracing();

    let config = Config::load()?;
    let port = args.port.unwrap_or(config.server_port);

    let (instances, operations): (Arc<dyn Instances>, Arc<dyn Operations>) =
        match &config.database_url {
            Some(url) => {
                let storage = PostgresStorage::connect(url).await?;
                tracing::info!("using postgres storage");
                (storage.instances(), storage.operations())
            }
            None => {
                let storage = MemoryStorage::new();
                tracing::warn!("DATABASE_URL not set, using in-memory storage");
                (storage.instances(), storage.operations())
            }
        };

    let handler = Arc::new(SuspensionContextHandler::new(operations.clone()));
    let update = Arc::new(UpdateEndpoint::new(
        instances,
        operations.clone(),
        handler,
        !args.disable_update_processing,
    ));

    let state = AppState { update, operations };
    api::start_server(&config.server_host, port, state).await
}
