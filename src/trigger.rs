use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::RowSource;
use crate::config::TriggerConfig;
use crate::query::{build_row_query, row_endpoint};
use crate::types::{PollMode, Record};
use crate::watermark::WatermarkStore;

/// Polls one table for rows whose trigger field moved past the stored
/// watermark.
pub struct TablePoller {
    config: TriggerConfig,
    source: Arc<dyn RowSource>,
    watermarks: Arc<dyn WatermarkStore>,
}

impl TablePoller {
    pub fn new(
        config: TriggerConfig,
        source: Arc<dyn RowSource>,
        watermarks: Arc<dyn WatermarkStore>,
    ) -> Self {
        Self {
            config,
            source,
            watermarks,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Run one poll cycle. Returns the batch of new rows, or None when this
    /// cycle found nothing.
    pub async fn poll(&self, mode: PollMode) -> anyhow::Result<Option<Vec<Record>>> {
        self.poll_at(Utc::now(), mode).await
    }

    /// Poll with an explicit "now", captured once at invocation start.
    ///
    /// On success the watermark becomes this captured instant, not the newest
    /// row seen: rows created while the fetch was in flight land after the
    /// lower bound and are picked up next cycle. A row whose server-side
    /// timestamp runs ahead of this process's clock can still be skipped;
    /// that clock-skew window is the known trade-off of the scheme.
    pub async fn poll_at(
        &self,
        now: DateTime<Utc>,
        mode: PollMode,
    ) -> anyhow::Result<Option<Vec<Record>>> {
        let key = self.config.watermark_key();

        // First poll: no stored watermark, filter from the captured now.
        let start = self.watermarks.get(&key).await?.unwrap_or(now);
        let end = now;

        let endpoint = row_endpoint(&self.config);
        let query = build_row_query(&self.config, start, mode);

        debug!(trigger = %self.config.name, %endpoint, "Polling for new rows");
        let list = self.source.fetch_all("GET", &endpoint, &query).await?;

        // Manual test runs validate the configuration before anything is
        // persisted: a returned row without the trigger field means the
        // field name is wrong, not that there is no data.
        if mode == PollMode::Manual {
            if let Some(first) = list.records.first() {
                if !first.fields.contains_key(&self.config.trigger_field) {
                    anyhow::bail!(
                        "The field \"{}\" does not exist",
                        self.config.trigger_field
                    );
                }
            }
        }

        // Lower bound for the next cycle. Advanced even when nothing matched,
        // so an idle table does not re-scan the same window forever.
        self.watermarks.set(&key, end).await?;

        if list.records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(list.records))
        }
    }
}
