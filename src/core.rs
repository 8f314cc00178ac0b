use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::client::{RowSource, StackbyClient};
use crate::config::AppConfig;
use crate::poller::{event_bus, PollerManager};
use crate::trigger::TablePoller;
use crate::types::PollMode;
use crate::watermark::{MemoryWatermarkStore, SqliteWatermarkStore, WatermarkStore};

/// Wire everything and run until interrupted.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let watermarks: Arc<dyn WatermarkStore> =
        Arc::new(SqliteWatermarkStore::new(&config.state.db_path).await?);
    let source: Arc<dyn RowSource> =
        Arc::new(StackbyClient::new(&config.api.base_url, &config.api.api_key));

    let (sender, mut receiver) = event_bus(config.poll.event_capacity);

    // Emit each batch as one JSON line on stdout.
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event consumer lagged, batches dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let manager = Arc::new(PollerManager::new(
        config.triggers.clone(),
        source,
        watermarks,
        sender,
        &config.poll,
    ));
    manager.spawn();

    info!(
        triggers = config.triggers.len(),
        interval_secs = config.poll.interval_secs,
        "stackwatch running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}

/// Run one manual-mode poll for a single configured trigger and print the
/// rows. Uses an in-memory watermark store, so a test run never disturbs the
/// persisted state.
pub async fn test_trigger(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let trigger = config
        .triggers
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| anyhow::anyhow!("No trigger named '{}' in config", name))?;

    let watermarks: Arc<dyn WatermarkStore> = Arc::new(MemoryWatermarkStore::new());
    let source: Arc<dyn RowSource> =
        Arc::new(StackbyClient::new(&config.api.base_url, &config.api.api_key));
    let poller = TablePoller::new(trigger.clone(), source, watermarks);

    match poller.poll(PollMode::Manual).await? {
        Some(records) => {
            for record in &records {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
        }
        None => println!("No rows returned. The table appears to be empty."),
    }
    Ok(())
}
