use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Bind address for the Prometheus scrape listener
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,

    /// Number of concurrent worker loops draining the queue
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Base URL of the translation service
    pub translation_api_url: String,

    /// Optional API key for the translation service
    #[serde(default)]
    pub translation_api_key: Option<String>,

    /// Base URL of the currency rate service
    pub rates_api_url: String,

    /// Base URL of the product catalog of record
    pub catalog_api_url: String,

    /// Workflow rows still "running" after this many minutes are force-completed
    #[serde(default = "default_stale_workflow_minutes")]
    pub stale_workflow_minutes: i64,

    /// Interval between maintenance sweeps, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9091".to_string()
}

fn default_worker_count() -> usize {
    1
}

fn default_stale_workflow_minutes() -> i64 {
    5
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
