use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::query::QueryPairs;
use crate::types::Record;

/// Rows fetched per page when aggregating.
const PAGE_SIZE: usize = 100;

/// HTTP timeout for a single page request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Aggregated response of a fetch-all call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowList {
    #[serde(default)]
    pub records: Vec<Record>,
}

/// The fetch-all seam: one logical call, every page aggregated.
///
/// Implementations do not retry. A failed page fails the whole call and the
/// caller decides what happens next.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_all(
        &self,
        method: &str,
        endpoint: &str,
        query: &QueryPairs,
    ) -> anyhow::Result<RowList>;
}

/// Stackby HTTP client.
pub struct StackbyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StackbyClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn request_page(
        &self,
        method: &str,
        endpoint: &str,
        query: QueryPairs,
    ) -> anyhow::Result<RowList> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let method: reqwest::Method = method.parse()?;

        debug!(%url, "Stackby API request");
        let resp = self
            .http
            .request(method, &url)
            .header("api-key", &self.api_key)
            .query(&query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Stackby API error: HTTP {} on {}: {}", status, url, body);
        }

        Ok(resp.json().await?)
    }
}

/// Whether the caller already capped the row count (manual test runs).
fn has_max_records(query: &QueryPairs) -> bool {
    query.iter().any(|(k, _)| k == "maxRecords")
}

/// Query for one page of an aggregating fetch.
fn page_query(query: &QueryPairs, offset: usize) -> QueryPairs {
    let mut page = query.clone();
    page.push(("maxRecords".to_string(), PAGE_SIZE.to_string()));
    page.push(("offset".to_string(), offset.to_string()));
    page
}

/// Drive `fetch_page` until the table is exhausted, concatenating pages.
///
/// A caller-supplied `maxRecords` cap (manual test runs) means exactly one
/// request, with the query passed through untouched. Otherwise pages are
/// requested at increasing offsets until a short page.
async fn fetch_pages<F, Fut>(query: &QueryPairs, mut fetch_page: F) -> anyhow::Result<RowList>
where
    F: FnMut(QueryPairs) -> Fut,
    Fut: Future<Output = anyhow::Result<RowList>>,
{
    if has_max_records(query) {
        return fetch_page(query.clone()).await;
    }

    let mut all = RowList::default();
    let mut offset = 0usize;
    loop {
        let page = fetch_page(page_query(query, offset)).await?;
        let count = page.records.len();
        all.records.extend(page.records);

        // A short page means the table is exhausted.
        if count < PAGE_SIZE {
            break;
        }
        offset += count;
    }
    Ok(all)
}

#[async_trait]
impl RowSource for StackbyClient {
    async fn fetch_all(
        &self,
        method: &str,
        endpoint: &str,
        query: &QueryPairs,
    ) -> anyhow::Result<RowList> {
        fetch_pages(query, |page| self.request_page(method, endpoint, page)).await
    }
}
