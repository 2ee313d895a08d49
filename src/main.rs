// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! retitle: rename every file in a directory after its content
//!
//! Text documents, spreadsheets and images are summarised by Gemini into a
//! short title which becomes the new file name.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use retitle::config::{resolve_target_dir, AppConfig};
use retitle::gemini::GeminiClient;
use retitle::inference::TokioSleeper;
use retitle::{RenameOrchestrator, RunContext, RunStats};

/// retitle CLI - AI-assisted file renamer
#[derive(Parser, Debug)]
#[command(name = "retitle")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Rename files after their content using Gemini", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "retitle.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format for the run summary
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Directory whose files get renamed (overrides config)
    #[arg(short, long, env = "RETITLE_DIR")]
    dir: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model identifier (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum characters of extracted text sent to the model
    #[arg(long)]
    max_chars: Option<usize>,

    /// Dry run mode (show proposed names without renaming)
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rename the files of the target directory (default)
    Run {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "retitle.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Variables from .env feed the clap `env` fallbacks below
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    match cli.command {
        Some(Commands::Run { args }) => run(config, args, cli.quiet, &cli.format).await,
        Some(Commands::Config { action }) => run_config_command(config, action),
        None => run(config, cli.run, cli.quiet, &cli.format).await,
    }
}

/// Fold command-line overrides into the loaded configuration
fn apply_overrides(config: &mut AppConfig, args: &RunArgs) -> anyhow::Result<()> {
    if let Some(model) = &args.model {
        config.gemini.model = model.clone();
    }
    if let Some(max_chars) = args.max_chars {
        config.extraction.max_chars = max_chars;
    }
    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// Environment variable read by earlier releases for the target directory
const LEGACY_DIR_VAR: &str = "CARTELLA_DA_ESAMINARE";

/// `--dir`/`RETITLE_DIR`, falling back to the legacy variable
fn dir_override(args: &RunArgs, env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    args.dir
        .clone()
        .or_else(|| env(LEGACY_DIR_VAR).filter(|d| !d.trim().is_empty()).map(PathBuf::from))
}

/// Rename every supported file of the target directory
async fn run(mut config: AppConfig, args: RunArgs, quiet: bool, format: &str) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args)?;

    let api_key = match args.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => bail!("Missing Gemini API key: pass --api-key or set GEMINI_API_KEY"),
    };

    let target_dir = resolve_target_dir(dir_override(&args, |name| std::env::var(name).ok()), &config)?;

    let client = GeminiClient::new(&api_key, &config.gemini)
        .context("Failed to initialise the Gemini HTTP client")?;

    if !quiet {
        info!("retitle v{}", env!("CARGO_PKG_VERSION"));
        info!("Directory: {:?}", target_dir);
        info!("Model: {}", client.model());
    }
    if args.dry_run {
        warn!("DRY RUN MODE - files will not be renamed");
    }

    let orchestrator = RenameOrchestrator::new(&config, client, TokioSleeper);
    let mut ctx = RunContext::new(config, target_dir, args.dry_run);
    let stats = orchestrator
        .run(&mut ctx)
        .await
        .with_context(|| format!("Cannot list {:?}", ctx.target_dir))?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(&ctx.target_dir, &stats, args.dry_run);
    }
    Ok(())
}

fn print_summary(dir: &Path, stats: &RunStats, dry_run: bool) {
    println!();
    println!("{}", "=".repeat(40));
    println!("Finished: {}", dir.display());
    println!("Files analyzed: {}", stats.analyzed);
    println!("Files renamed:  {}", stats.renamed);
    println!("Skipped:        {}", stats.skipped);
    println!("Failed:         {}", stats.failed);
    if dry_run {
        println!("(dry run, nothing was renamed)");
    }
    println!("{}", "=".repeat(40));
}

fn run_config_command(config: AppConfig, action: ConfigCommands) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default()
                .save(&output)
                .with_context(|| format!("Failed to write {:?}", output))?;
            println!("Generated config at {:?}", output);
        }
    }

    Ok(())
}
