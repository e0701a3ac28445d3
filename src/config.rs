//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.workbalance.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".workbalance.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Issue tracker settings.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Maximum number of work items scored concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "workload_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Which hosted or local model service to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Ollama chat API (default)
    #[default]
    Ollama,
    /// Google Gemini generateContent API
    Gemini,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model service to use.
    #[serde(default)]
    pub provider: ModelProvider,

    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Gemini API base URL.
    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,

    /// API key for hosted providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            name: default_model(),
            ollama_url: default_ollama_url(),
            gemini_url: default_gemini_url(),
            api_key: None,
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    300
}

/// Azure DevOps settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Azure DevOps base URL.
    #[serde(default = "default_tracker_url")]
    pub base_url: String,

    /// Organization name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    /// Project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Only items created within this many days are fetched.
    #[serde(default = "default_days")]
    pub days: u32,

    /// Work item type to query.
    #[serde(default = "default_work_item_type")]
    pub work_item_type: String,

    /// REST API version.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: default_tracker_url(),
            organization: None,
            project: None,
            days: default_days(),
            work_item_type: default_work_item_type(),
            api_version: default_api_version(),
        }
    }
}

fn default_tracker_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_days() -> u32 {
    15
}

fn default_work_item_type() -> String {
    "Task".to_string()
}

fn default_api_version() -> String {
    "7.0".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the unparsed model output for each task.
    #[serde(default)]
    pub include_raw_responses: bool,

    /// Include normalized comments for each task.
    #[serde(default)]
    pub include_comments: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.workbalance.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually supplied are applied.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(provider) = args.provider {
            self.model.provider = provider;
        }
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(ref key) = args.api_key {
            self.model.api_key = Some(key.clone());
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref org) = args.org {
            self.tracker.organization = Some(org.clone());
        }
        if let Some(ref project) = args.project {
            self.tracker.project = Some(project.clone());
        }
        if let Some(days) = args.days {
            self.tracker.days = days;
        }

        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
        if args.include_raw {
            self.report.include_raw_responses = true;
        }
    }

    /// Check settings that only make sense once file and CLI are merged.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            anyhow::bail!("Concurrency must be at least 1");
        }
        if self.model.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be at least 1 second");
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            anyhow::bail!("Temperature must be between 0.0 and 1.0");
        }
        let url = match self.model.provider {
            ModelProvider::Ollama => &self.model.ollama_url,
            ModelProvider::Gemini => &self.model.gemini_url,
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("Model URL must start with 'http://' or 'https://'");
        }
        if self.model.provider == ModelProvider::Gemini
            && self.model.api_key.as_deref().map_or(true, str::is_empty)
        {
            anyhow::bail!("The gemini provider needs an API key (--api-key or GEMINI_API_KEY)");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
