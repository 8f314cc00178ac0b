use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://stackby.com/api/betav1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "stackwatch.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}
fn default_event_capacity() -> usize {
    64
}

/// One polling trigger: which table to watch and how to filter it.
///
/// `trigger_field` must be a Created Time or Last Modified Time column;
/// without one the watermark filter cannot match new rows. Only presence is
/// validated here; a bad value surfaces as an API error on the first poll.
#[derive(Debug, Deserialize, Clone)]
pub struct TriggerConfig {
    pub name: String,
    pub stack_id: String,
    pub table: String,
    pub trigger_field: String,
    /// Comma-separated column names to include in the response.
    /// By default the API returns every column.
    #[serde(default)]
    pub fields: Option<String>,
    /// A view id; if set, only rows in that view are returned.
    #[serde(default)]
    pub view_id: Option<String>,
    /// Extra filter formula, ANDed with the watermark filter.
    #[serde(default)]
    pub formula: Option<String>,
}

impl TriggerConfig {
    /// Column projection as an ordered list. Substrings are kept raw, no
    /// trimming, matching how the API itself treats the parameter.
    pub fn field_list(&self) -> Option<Vec<String>> {
        self.fields
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(|f| f.split(',').map(str::to_string).collect())
    }

    /// Watermark key: one watermark per (stack, table, trigger field).
    pub fn watermark_key(&self) -> String {
        format!("{}/{}/{}", self.stack_id, self.table, self.trigger_field)
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
