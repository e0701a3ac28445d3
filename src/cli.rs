//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ModelProvider;
use clap::Parser;
use std::path::PathBuf;

/// WorkBalance - LLM-powered workload balancing for Azure DevOps teams
///
/// Scores every recent work item for workload intensity using a language
/// model, aggregates the scores per assignee and asks the model which
/// members are overloaded, underutilized or most efficient.
///
/// Examples:
///   workbalance --org contoso --project Fabrikam --pat $PAT
///   workbalance --org contoso --project Fabrikam --days 7 --format json
///   workbalance --input workitems.json --provider gemini
///   workbalance --org contoso --project Fabrikam --dry-run
///   workbalance --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Azure DevOps organization
    #[arg(long, value_name = "ORG", requires = "project", conflicts_with = "input")]
    pub org: Option<String>,

    /// Azure DevOps project
    #[arg(long, value_name = "PROJECT", requires = "org", conflicts_with = "input")]
    pub project: Option<String>,

    /// Personal access token for Azure DevOps
    #[arg(long, value_name = "TOKEN", env = "AZURE_DEVOPS_PAT", hide_env_values = true)]
    pub pat: Option<String>,

    /// Only analyze work items created within this many days
    #[arg(long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Read work items from a JSON file instead of Azure DevOps
    ///
    /// Accepts either an array of work items or {"workItems": [...]}.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Model service to use
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<ModelProvider>,

    /// Model to use for scoring and summarization
    ///
    /// Can also be set via WORKBALANCE_MODEL env var or .workbalance.toml config.
    #[arg(short, long, env = "WORKBALANCE_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// API key for hosted model providers
    #[arg(long, value_name = "KEY", env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds for each model call
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of work items scored concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Include the raw model output for every task in the report
    #[arg(long)]
    pub include_raw: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .workbalance.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: fetch and list work items without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .workbalance.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// Tracker coordinates may also come from the config file, so their
    /// absence is only checked after merging.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.days == Some(0) {
            return Err("Days must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_by_default` is the config file's `general.verbose`; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, verbose_by_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_by_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            org: Some("contoso".to_string()),
            project: Some("Fabrikam".to_string()),
            pat: Some("pat".to_string()),
            days: None,
            input: None,
            provider: None,
            model: None,
            ollama_url: None,
            api_key: None,
            temperature: None,
            timeout: None,
            concurrency: None,
            output: None,
            format: OutputFormat::Markdown,
            include_raw: false,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.temperature = Some(1.5);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.days = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input_file() {
        let mut args = make_args();
        args.org = None;
        args.project = None;
        args.input = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_tracker_args() {
        let args = Args::try_parse_from([
            "workbalance",
            "--org",
            "contoso",
            "--project",
            "Fabrikam",
            "--days",
            "7",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.org.as_deref(), Some("contoso"));
        assert_eq!(args.days, Some(7));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_org_and_input_conflict() {
        let result = Args::try_parse_from([
            "workbalance",
            "--org",
            "contoso",
            "--project",
            "Fabrikam",
            "--input",
            "items.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_log_level_from_config() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
