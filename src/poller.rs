use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::client::RowSource;
use crate::config::{PollConfig, TriggerConfig};
use crate::trigger::TablePoller;
use crate::types::{PollMode, RowEvent};
use crate::watermark::WatermarkStore;

pub type EventSender = broadcast::Sender<RowEvent>;
pub type EventReceiver = broadcast::Receiver<RowEvent>;

/// Create a new event bus (broadcast channel).
pub fn event_bus(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}

pub struct PollerManager {
    triggers: Vec<TriggerConfig>,
    source: Arc<dyn RowSource>,
    watermarks: Arc<dyn WatermarkStore>,
    sender: EventSender,
    interval: Duration,
}

impl PollerManager {
    pub fn new(
        triggers: Vec<TriggerConfig>,
        source: Arc<dyn RowSource>,
        watermarks: Arc<dyn WatermarkStore>,
        sender: EventSender,
        poll: &PollConfig,
    ) -> Self {
        Self {
            triggers,
            source,
            watermarks,
            sender,
            interval: Duration::from_secs(poll.interval_secs),
        }
    }

    /// Spawn one polling loop per configured trigger.
    ///
    /// Each loop is sequential, so a trigger never observes overlapping
    /// polls. A failed cycle is logged and left to the next tick: the
    /// watermark did not advance, so the same window is re-queried.
    pub fn spawn(self: Arc<Self>) {
        for trigger in &self.triggers {
            let poller = TablePoller::new(
                trigger.clone(),
                self.source.clone(),
                self.watermarks.clone(),
            );
            let sender = self.sender.clone();
            let interval = self.interval;

            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    match poller.poll(PollMode::Scheduled).await {
                        Ok(Some(records)) => {
                            info!(trigger = %poller.name(), count = records.len(), "New rows");
                            let event = RowEvent {
                                trigger: poller.name().to_string(),
                                records,
                            };
                            if sender.send(event).is_err() {
                                warn!("No event receivers active");
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(trigger = %poller.name(), "Poll cycle failed: {}", e);
                        }
                    }
                }
            });

            info!(trigger = %trigger.name, "Poller spawned");
        }
    }
}
