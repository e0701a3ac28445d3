//! WorkBalance - LLM-powered workload balancing for development teams
//!
//! A CLI tool that scores recent work items for workload intensity with a
//! language model, aggregates the scores per assignee and asks the model
//! which team members are overloaded, underutilized or most efficient.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (tracker access, config, unreadable input, etc.)

mod analysis;
mod cli;
mod config;
mod llm;
mod models;
mod report;
mod tracker;

use analysis::comments::normalize_comments;
use analysis::Pipeline;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{WorkItem, WorkloadReport};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracker::{AzureDevOpsSource, FileSource, WorkItemSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first so its verbosity setting applies to logging
    let (mut config, config_warning) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("WorkBalance v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = config_warning {
        warn!("Failed to load config, using defaults: {:#}", e);
    }
    debug!("Effective config: {:?}", config.general);

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Workload analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .workbalance.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set your organization, project, model and report options.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so a broken default config file is
/// handed back as a warning instead of being logged here.
fn load_config(args: &Args) -> Result<(Config, Option<anyhow::Error>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, None));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, None)),
        Ok(None) => Ok((Config::default(), None)),
        Err(e) => Ok((Config::default(), Some(e))),
    }
}

/// Run the complete workflow: fetch, score, summarize, report.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Fetch work items
    let source = build_source(&args, &config)?;
    println!("📥 Fetching work items from {}", source.describe());
    let work_items = source.fetch_items().await?;
    info!("Fetched {} work items", work_items.len());

    // Handle --dry-run: list items and exit
    if args.dry_run {
        handle_dry_run(&work_items);
        return Ok(());
    }

    config.validate()?;

    // Step 2: Initialize the model client
    let model = llm::build_model_client(&config.model)?;

    println!("🤖 Initializing model client...");
    println!("   Provider: {:?}", config.model.provider);
    println!("   Model: {}", model.model_name());
    println!("   Concurrency: {}", config.general.concurrency);
    println!("   Timeout: {}s", config.model.timeout_seconds);

    // Step 3: Score, aggregate and summarize
    println!("\n🔬 Scoring {} work items...", work_items.len());

    let mut pipeline = Pipeline::new(model.clone()).with_concurrency(config.general.concurrency);
    if !args.quiet {
        pipeline = pipeline.with_progress(progress_bar("Scoring"));
    }

    let output = pipeline.run(work_items).await;

    // Step 4: Build and save the report
    println!("\n📝 Generating report...");

    let duration = start_time.elapsed().as_secs_f64();
    let report = WorkloadReport::new(
        source.describe(),
        model.model_name().to_string(),
        output,
        duration,
    );

    let content = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &content)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    print_summary(&report);
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    Ok(())
}

/// Pick the work item source: an input file, or the configured tracker project.
fn build_source(args: &Args, config: &Config) -> Result<Box<dyn WorkItemSource>> {
    if let Some(ref input) = args.input {
        info!("Reading work items from: {}", input.display());
        return Ok(Box::new(FileSource::new(input.clone())));
    }

    let mut source = AzureDevOpsSource::new(&config.tracker, args.pat.clone())?;
    if !args.quiet {
        source = source.with_progress(progress_bar("Fetching"));
    }
    Ok(Box::new(source))
}

/// Progress bar used for both fetching and scoring.
fn progress_bar(prefix: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{prefix:>9.cyan.bold} [{bar:30}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix);
    pb
}

/// Handle --dry-run: print what would be scored, without any model call.
fn handle_dry_run(work_items: &[WorkItem]) {
    println!("\n🔍 Dry run: listing work items (no LLM call)...\n");

    if work_items.is_empty() {
        println!("   No matching work items found.");
    } else {
        println!("   Found {} work items that would be scored:\n", work_items.len());
        for item in work_items {
            let comments = normalize_comments(item.comments.as_ref());
            println!(
                "     📋 #{} [{}] {} ({} comments)",
                item.id_label(),
                item.assignee_or_unassigned(),
                item.title_or_default(),
                comments.len()
            );
        }
        println!("\n   Total: {} work items", work_items.len());
    }

    println!("\n✅ Dry run complete. No LLM calls were made.");
}

/// Print the console summary of a finished report.
fn print_summary(report: &WorkloadReport) {
    println!("\n📊 Workload Summary:");
    println!("   Work items scored: {}", report.metadata.items_analyzed);
    if report.metadata.items_failed > 0 {
        println!("   ⚠️  Items not scored: {}", report.metadata.items_failed);
    }
    println!(
        "   Team total: {} points across {} members",
        analysis::team_total(&report.workload),
        report.metadata.members
    );

    for (bucket, members) in report.team_summary.buckets() {
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        if names.is_empty() {
            println!("   {} {}: -", bucket.emoji(), bucket);
        } else {
            println!("   {} {}: {}", bucket.emoji(), bucket, names.join(", "));
        }
    }
    if report.team_summary.is_degraded() {
        println!("   ⚠️  The team summary is incomplete; see the report for details.");
    }
}
