//! CLI command definitions for puzzle-forge.
//!
//! Each subcommand builds a [`PipelineConfig`] (environment first, flags on
//! top), wires the library pieces together and prints either a human summary
//! or, with `--json`, a pretty-printed JSON document.

use crate::catalog::{CatalogApi, CatalogClient, Job};
use crate::concepts::{ConceptSource, ConceptSourceConfig, LlmConceptSource, StaticConceptSource};
use crate::dataset::DatasetSource;
use crate::keys;
use crate::llm::{LiteLlmClient, LlmProvider, OpenRouterProvider, DEFAULT_CONCEPT_MODEL};
use crate::maintenance::{RetagReport, TagMigration};
use crate::pipeline::{
    cancel_on_ctrl_c, BatchOrchestrator, BatchReport, BulkImporter, ImportReport, PipelineConfig,
    Termination, ERROR_PREVIEW_LIMIT,
};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default directory holding the `arc-{year}` dataset folders.
const DEFAULT_DATA_DIR: &str = "./data";

/// Default poll interval for `job-status --wait`, in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default overall wait for `job-status --wait`, in seconds.
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 600;

/// Populate and maintain a remote puzzle catalog.
#[derive(Parser)]
#[command(name = "puzzle-forge")]
#[command(about = "Batch puzzle generation, dataset import and catalog maintenance")]
#[command(version)]
#[command(
    long_about = "puzzle-forge sources transformation concepts, drives the catalog's job → puzzle protocol with rate limiting, imports local ARC datasets and repairs legacy tags.\n\nExample usage:\n  ADMIN_KEY=... puzzle-forge generate --count 10 --delay 2\n  ADMIN_KEY=... puzzle-forge import --source arc-2024-training --limit 10\n  ADMIN_KEY=... puzzle-forge fix-tags --dry-run"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Catalog server URL (overrides PUZZLE_SERVER_URL).
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Print results as JSON instead of a human summary.
    #[arg(short = 'j', long, global = true)]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Source concepts and create one job and puzzle per concept.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Bulk import a local ARC dataset through the admin API.
    Import(ImportArgs),

    /// Rewrite legacy tags (["arc","2024","training"] → ["ARC-AGI 2024","training"]).
    FixTags(FixTagsArgs),

    /// Read a job's status once, or wait for it to finish.
    JobStatus(JobStatusArgs),

    /// Generate a new admin key and the hash the server stores.
    Keygen,
}

/// Arguments for the generate command.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Number of concepts to source (overrides PUZZLE_BATCH_SIZE).
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Seconds to wait between remote calls (overrides PUZZLE_DELAY_SECS).
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Model recorded on created jobs (overrides PUZZLE_MODEL).
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Model used to brainstorm concepts (OpenRouter format).
    #[arg(long)]
    pub concept_model: Option<String>,

    /// OpenRouter API key for concept generation.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Admin key for job creation (overrides ADMIN_KEY).
    #[arg(long)]
    pub admin_key: Option<String>,

    /// Key forwarded to the server for puzzle generation (overrides PUZZLE_API_KEY).
    #[arg(long)]
    pub puzzle_api_key: Option<String>,

    /// Use the built-in concept list instead of a generative service.
    #[arg(long, conflicts_with = "concepts_file")]
    pub offline: bool,

    /// Read concepts from a file (JSON array, or one per line).
    #[arg(long)]
    pub concepts_file: Option<PathBuf>,
}

/// Arguments for the import command.
#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// Dataset source, e.g. arc-2024-training or arc-2025-evaluation.
    #[arg(long, value_parser = parse_dataset_source)]
    pub source: DatasetSource,

    /// Directory containing the arc-{year} dataset folders.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Import only the first N puzzles (by id).
    #[arg(long)]
    pub limit: Option<usize>,

    /// Admin key (overrides ADMIN_KEY).
    #[arg(long)]
    pub admin_key: Option<String>,
}

/// Arguments for the fix-tags command.
#[derive(Parser, Debug)]
pub struct FixTagsArgs {
    /// Show the changes without applying them.
    #[arg(long)]
    pub dry_run: bool,

    /// Admin key (overrides ADMIN_KEY).
    #[arg(long)]
    pub admin_key: Option<String>,
}

/// Arguments for the job-status command.
#[derive(Parser, Debug)]
pub struct JobStatusArgs {
    /// Job identifier.
    pub job_id: String,

    /// Poll until the job reaches a terminal status.
    #[arg(short, long)]
    pub wait: bool,

    /// Seconds between polls.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub interval: u64,

    /// Give up waiting after this many seconds.
    #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT_SECS)]
    pub timeout: u64,
}

fn parse_dataset_source(value: &str) -> Result<DatasetSource, String> {
    DatasetSource::parse(value).map_err(|e| e.to_string())
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let output = OutputMode { json: cli.json };
    let server = cli.server;

    match cli.command {
        Commands::Generate(args) => run_generate_command(args, server, output).await,
        Commands::Import(args) => run_import_command(args, server, output).await,
        Commands::FixTags(args) => run_fix_tags_command(args, server, output).await,
        Commands::JobStatus(args) => run_job_status_command(args, server, output).await,
        Commands::Keygen => run_keygen_command(output),
    }
}

#[derive(Debug, Clone, Copy)]
struct OutputMode {
    json: bool,
}

impl OutputMode {
    fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let json_output = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
        Ok(())
    }
}

/// Environment config with the server override applied.
fn load_config(server: Option<String>, admin_key: Option<String>) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env().context("Invalid environment configuration")?;
    if let Some(server) = server {
        config = config.with_server_url(server);
    }
    if let Some(admin_key) = admin_key {
        config = config.with_admin_key(admin_key);
    }
    Ok(config)
}

fn build_catalog(config: &PipelineConfig) -> Arc<dyn CatalogApi> {
    Arc::new(
        CatalogClient::new(config.server_url.clone())
            .with_admin_key(config.admin_key.clone())
            .with_timeouts(config.timeouts()),
    )
}

// ============================================================================
// Generate Command Implementation
// ============================================================================

async fn run_generate_command(
    args: GenerateArgs,
    server: Option<String>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let mut config = load_config(server, args.admin_key.clone())?;
    if let Some(count) = args.count {
        config = config.with_batch_size(count);
    }
    if let Some(delay) = args.delay {
        config = config.with_delay_secs(delay)?;
    }
    if let Some(model) = &args.model {
        config = config.with_puzzle_model(model.clone());
    }
    if let Some(key) = &args.puzzle_api_key {
        config = config.with_puzzle_api_key(key.clone());
    }
    config.validate()?;
    config
        .require_admin_key()
        .context("Job creation requires the admin key; export ADMIN_KEY=your_secret_key")?;

    let source = build_concept_source(&args)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());

    let orchestrator =
        BatchOrchestrator::from_config(build_catalog(&config), &config).with_cancellation(cancel);
    let result = orchestrator
        .source_and_run(source.as_ref(), config.batch_size)
        .await;
    ctrl_c.abort();

    let report = result.context(
        "Could not source concepts. Check OPENROUTER_API_KEY / LITELLM_API_BASE, or use --offline",
    )?;

    if output.json {
        output.print_json(&report)?;
    } else {
        print_batch_report(&report);
    }

    report.ensure_authorized()?;
    Ok(())
}

fn build_concept_source(args: &GenerateArgs) -> anyhow::Result<Box<dyn ConceptSource>> {
    if let Some(path) = &args.concepts_file {
        info!(path = %path.display(), "Using concepts from file");
        let source = StaticConceptSource::from_file(path)?;
        return Ok(Box::new(source));
    }

    if args.offline {
        info!("Using built-in concept list");
        return Ok(Box::new(StaticConceptSource::builtin()));
    }

    let (llm_client, model): (Arc<dyn LlmProvider>, String) = if let Some(key) = &args.api_key {
        let model = args
            .concept_model
            .clone()
            .unwrap_or_else(|| DEFAULT_CONCEPT_MODEL.to_string());
        info!(model = %model, "Using OpenRouter for concept generation");
        (
            Arc::new(OpenRouterProvider::with_model(key.clone(), model.clone())),
            model,
        )
    } else {
        info!("Using LiteLLM client from environment");
        let client = LiteLlmClient::from_env().map_err(|e| {
            anyhow::anyhow!(
                "Failed to initialize LLM client: {}. Please provide --api-key, set \
                 OPENROUTER_API_KEY/LITELLM_API_BASE, or run with --offline.",
                e
            )
        })?;
        (Arc::new(client), args.concept_model.clone().unwrap_or_default())
    };

    let config = ConceptSourceConfig::new().with_model(model);
    Ok(Box::new(LlmConceptSource::new(llm_client, config)))
}

fn print_batch_report(report: &BatchReport) {
    println!();
    match &report.termination {
        Termination::Completed => println!("Batch complete"),
        Termination::Interrupted => println!("Batch interrupted (partial results)"),
        Termination::Unauthorized { status, .. } => {
            println!("Batch stopped: credentials rejected (status {status})")
        }
    }
    println!("   Requested:        {}", report.requested);
    if report.shortfall() > 0 {
        println!(
            "   Sourced:          {} (short by {})",
            report.sourced,
            report.shortfall()
        );
    }
    println!("   Attempted:        {}", report.attempted);
    println!("   Jobs created:     {}", report.jobs_created);
    println!("   Puzzles created:  {}", report.created);
    println!("   Already existing: {}", report.already_existing);
    println!("   Failed:           {}", report.failed);
    match report.success_rate() {
        Some(rate) => println!("   Success rate:     {:.1}%", rate * 100.0),
        None => println!("   Success rate:     N/A"),
    }

    if !report.failures.is_empty() {
        println!("\nFailures:");
        for failure in &report.failures {
            println!(
                "   - [{}] {}: {} ({})",
                failure.index + 1,
                failure.concept.preview(50),
                failure.reason,
                failure.stage
            );
        }
    }
}

// ============================================================================
// Import Command Implementation
// ============================================================================

async fn run_import_command(
    args: ImportArgs,
    server: Option<String>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let config = load_config(server, args.admin_key.clone())?;
    config.validate()?;
    config
        .require_admin_key()
        .context("Import requires the admin key; export ADMIN_KEY=your_secret_key")?;

    let importer = BulkImporter::new(build_catalog(&config), &args.data_dir).with_limit(args.limit);
    let report = importer.run(&args.source).await.with_context(|| {
        format!(
            "Failed to import {} from {}",
            args.source,
            args.data_dir.display()
        )
    })?;

    if output.json {
        output.print_json(&report)?;
    } else {
        print_import_report(&report);
    }
    Ok(())
}

fn print_import_report(report: &ImportReport) {
    println!("\nImport complete: {}", report.source);
    println!("   Loaded:                  {}", report.loaded);
    println!("   Submitted:               {}", report.submitted);
    println!("   Imported:                {}", report.summary.imported);
    println!("   Skipped (already exist): {}", report.summary.skipped);
    println!("   Failed:                  {}", report.summary.failed);

    let (shown, hidden) = report.error_preview(ERROR_PREVIEW_LIMIT);
    if !shown.is_empty() {
        println!("\nErrors encountered:");
        for error in shown {
            println!("   - {}", error);
        }
        if hidden > 0 {
            println!("   ... and {} more", hidden);
        }
    }
}

// ============================================================================
// Fix-Tags Command Implementation
// ============================================================================

async fn run_fix_tags_command(
    args: FixTagsArgs,
    server: Option<String>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let config = load_config(server, args.admin_key.clone())?;
    config.validate()?;
    if !args.dry_run {
        config
            .require_admin_key()
            .context("Tag updates require the admin key; export ADMIN_KEY=your_secret_key")?;
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());

    let migration = TagMigration::new(build_catalog(&config))
        .with_dry_run(args.dry_run)
        .with_cancellation(cancel);
    let result = migration.run().await;
    ctrl_c.abort();

    let report = result.context("Failed to list catalog puzzles")?;

    if output.json {
        output.print_json(&report)?;
    } else {
        print_retag_report(&report);
    }

    report.ensure_authorized()?;
    Ok(())
}

fn print_retag_report(report: &RetagReport) {
    for change in &report.changes {
        println!(
            "{}{}: {:?} → {:?}",
            if report.dry_run { "[dry run] " } else { "" },
            change.puzzle_id,
            change.old_tags,
            change.new_tags
        );
    }

    println!("\nDone ({} puzzles)", report.total);
    if report.dry_run {
        println!("   Would fix: {}", report.changes.len());
    } else {
        println!("   Fixed:     {}", report.fixed);
    }
    println!("   Skipped:   {}", report.skipped);
    println!("   Failed:    {}", report.failed);
    for failure in &report.failures {
        println!("   - {}: {}", failure.puzzle_id, failure.reason);
    }
    if report.termination == Termination::Interrupted {
        println!("   (interrupted before all puzzles were checked)");
    }
}

// ============================================================================
// Job-Status Command Implementation
// ============================================================================

async fn run_job_status_command(
    args: JobStatusArgs,
    server: Option<String>,
    output: OutputMode,
) -> anyhow::Result<()> {
    let config = load_config(server, None)?;
    config.validate()?;
    let catalog = build_catalog(&config);

    let result = if args.wait {
        catalog
            .wait_for_job(
                &args.job_id,
                Duration::from_secs(args.interval.max(1)),
                Duration::from_secs(args.timeout),
            )
            .await
    } else {
        catalog.get_job(&args.job_id).await
    };
    let job = result.with_context(|| format!("Failed to read job {}", args.job_id))?;

    if output.json {
        output.print_json(&job)?;
    } else {
        print_job(&job);
    }
    Ok(())
}

fn print_job(job: &Job) {
    println!("Job {}", job.id);
    println!("   Status:  {}", job.status);
    println!("   Concept: {}", job.concept);
    if let Some(model) = &job.model {
        println!("   Model:   {}", model);
    }
    if let Some(puzzle_id) = &job.puzzle_id {
        println!("   Puzzle:  {}", puzzle_id);
    }
    if let Some(error) = &job.error_message {
        println!("   Error:   {}", error);
    }
}

// ============================================================================
// Keygen Command Implementation
// ============================================================================

fn run_keygen_command(output: OutputMode) -> anyhow::Result<()> {
    let pair = keys::generate_key_pair();

    if output.json {
        return output.print_json(&pair);
    }

    println!("Secret admin key (keep this private):");
    println!("   {}", pair.admin_key);
    println!("\nHash for the server (set as ADMIN_SECRET_HASH):");
    println!("   {}", pair.admin_hash);
    println!("\nLocally, run commands with:");
    println!("   export ADMIN_KEY='{}'", pair.admin_key);
    Ok(())
}
