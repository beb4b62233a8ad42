use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Top-level application configuration. Every section and field has a serde
/// default, so a config file only sets what it cares about and running
/// without one is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        info!(
            api_base = %self.github.api_base,
            model = %self.analyzer.model,
            max_depth = self.pipeline.max_depth,
            max_files = self.pipeline.max_files,
            concurrency = self.worker.concurrency,
            "Loaded AppConfig"
        );
        debug!(?self, "AppConfig loaded (full debug)");
    }
}

/// Repository-hosting API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Optional bearer token, injected from the environment by load_config.
    #[serde(skip)]
    pub token: Option<String>,
    #[serde(default = "default_github_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            timeout_secs: default_github_timeout_secs(),
        }
    }
}

/// Language-model service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_analyzer_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_analyzer_timeout_secs")]
    pub timeout_secs: u64,
    /// API key, injected from the environment by load_config. Never read
    /// from the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            base_url: default_analyzer_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_analyzer_timeout_secs(),
            api_key: None,
        }
    }
}

/// Resource bounds for one job. The caps are a capacity decision, not a
/// failure mode: files beyond them are skipped, never errored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum directory depth the crawler descends to.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Maximum number of files analyzed per job, first-N in crawl order.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Maximum file size, in characters of decoded text, that is still sent
    /// to the analyzer.
    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,
    /// Recognized source-file extensions.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_files: default_max_files(),
            max_file_chars: default_max_file_chars(),
            extensions: default_extensions(),
        }
    }
}

/// Worker-pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_github_timeout_secs() -> u64 {
    30
}

fn default_analyzer_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_analyzer_timeout_secs() -> u64 {
    60
}

fn default_max_depth() -> usize {
    3
}

fn default_max_files() -> usize {
    10
}

fn default_max_file_chars() -> usize {
    10_000
}

fn default_extensions() -> Vec<String> {
    vec![
        ".js".to_string(),
        ".ts".to_string(),
        ".jsx".to_string(),
        ".tsx".to_string(),
    ]
}

fn default_concurrency() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    64
}
