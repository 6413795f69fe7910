//! SheetSync Server Binary
//!
//! Loads configuration, restores the last snapshot, schedules periodic
//! syncs and serves the record store API.

use std::sync::Arc;

use sheetsync_core::{
    GoogleSheetsSource, JsonFilePersistence, SheetSource, SheetSyncConfig, SnapshotPersistence,
};
use sheetsync_server::{serve, start};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging, `RUST_LOG` overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match std::env::var("SHEETSYNC_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            SheetSyncConfig::load(&path)?
        }
        Err(_) => SheetSyncConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;

    let persistence: Arc<dyn SnapshotPersistence> =
        Arc::new(JsonFilePersistence::new(&config.storage.snapshot_path));
    let source = GoogleSheetsSource::from_config(&config.source)
        .map(|source| Arc::new(source) as Arc<dyn SheetSource>);
    let addr = config.server.addr.clone();

    let service = start(config, source, Some(persistence)).await;
    serve(&addr, service.state).await
}
