//! Builds the endpoint path and query string for one rowlist call.

use chrono::{DateTime, Utc};

use crate::config::TriggerConfig;
use crate::formula::Formula;
use crate::types::PollMode;

/// Query-string pairs for one list call. `fields[]` repeats per column.
pub type QueryPairs = Vec<(String, String)>;

/// Endpoint path for the list call.
pub fn row_endpoint(config: &TriggerConfig) -> String {
    format!("rowlist/{}/{}", config.stack_id, config.table)
}

/// Render a watermark for embedding into `DATETIME_PARSE`. UTC, formatted to
/// match [`crate::formula::DATETIME_PATTERN`].
pub fn format_filter_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Build the query for one poll.
///
/// Scheduled polls filter on rows whose trigger field moved past `start`.
/// Manual test runs drop the filter and cap the response at a single row, so
/// a user can preview the trigger without needing historical data to match.
pub fn build_row_query(config: &TriggerConfig, start: DateTime<Utc>, mode: PollMode) -> QueryPairs {
    let mut query: QueryPairs = Vec::new();

    if let Some(view) = config.view_id.as_deref().filter(|v| !v.is_empty()) {
        query.push(("view".to_string(), view.to_string()));
    }

    if let Some(fields) = config.field_list() {
        for field in fields {
            query.push(("fields[]".to_string(), field));
        }
    }

    if mode == PollMode::Manual {
        query.push(("maxRecords".to_string(), "1".to_string()));
        return query;
    }

    let mut filter = Formula::is_after(&config.trigger_field, &format_filter_timestamp(start));
    if let Some(extra) = config.formula.as_deref().filter(|f| !f.is_empty()) {
        filter = filter.and(Formula::raw(extra));
    }
    query.push(("filterByFormula".to_string(), filter.render()));

    query
}
