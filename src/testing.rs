//! Test infrastructure: a scripted row source and a poll harness.
//!
//! Exercises the real poll logic against scripted API responses and an
//! in-memory watermark store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::client::{RowList, RowSource};
use crate::config::TriggerConfig;
use crate::query::QueryPairs;
use crate::trigger::TablePoller;
use crate::types::Record;
use crate::watermark::MemoryWatermarkStore;

/// A recorded call to `ScriptedRowSource::fetch_all()`.
#[derive(Debug, Clone)]
pub struct FetchCall {
    pub method: String,
    pub endpoint: String,
    pub query: QueryPairs,
}

impl FetchCall {
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Row source that returns scripted responses and records every call.
pub struct ScriptedRowSource {
    responses: Mutex<Vec<anyhow::Result<RowList>>>,
    pub call_log: Mutex<Vec<FetchCall>>,
}

impl ScriptedRowSource {
    /// A source whose every fetch returns an empty list.
    pub fn empty() -> Self {
        Self::with_responses(Vec::new())
    }

    /// FIFO queue of scripted responses; once drained, fetches return empty
    /// lists.
    pub fn with_responses(responses: Vec<anyhow::Result<RowList>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_log: Mutex::new(Vec::new()),
        }
    }

    pub async fn last_call(&self) -> FetchCall {
        self.call_log
            .lock()
            .await
            .last()
            .expect("no fetch calls recorded")
            .clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_log.lock().await.len()
    }
}

#[async_trait]
impl RowSource for ScriptedRowSource {
    async fn fetch_all(
        &self,
        method: &str,
        endpoint: &str,
        query: &QueryPairs,
    ) -> anyhow::Result<RowList> {
        self.call_log.lock().await.push(FetchCall {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            query: query.clone(),
        });

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            Ok(RowList::default())
        } else {
            responses.remove(0)
        }
    }
}

/// Build a `Record` from literal JSON.
pub fn record(value: Value) -> Record {
    serde_json::from_value(value).expect("record JSON should deserialize")
}

/// A successful response carrying the given records.
pub fn row_list(records: Vec<Record>) -> anyhow::Result<RowList> {
    Ok(RowList { records })
}

/// Trigger config shared by the poll-cycle tests.
pub fn tasks_trigger() -> TriggerConfig {
    TriggerConfig {
        name: "tasks".to_string(),
        stack_id: "stkX".to_string(),
        table: "Tasks".to_string(),
        trigger_field: "Created".to_string(),
        fields: None,
        view_id: None,
        formula: None,
    }
}

/// Everything needed to exercise poll cycles against scripted data.
pub struct PollHarness {
    pub poller: TablePoller,
    pub source: Arc<ScriptedRowSource>,
    pub watermarks: Arc<MemoryWatermarkStore>,
}

pub fn setup_poller(config: TriggerConfig, source: ScriptedRowSource) -> PollHarness {
    let source = Arc::new(source);
    let watermarks = Arc::new(MemoryWatermarkStore::new());
    let poller = TablePoller::new(config, source.clone(), watermarks.clone());
    PollHarness {
        poller,
        source,
        watermarks,
    }
}
