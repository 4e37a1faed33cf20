// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SnapKeeper: AI screenshot renamer

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use snapkeeper::config::{AppConfig, ProviderKind};
use snapkeeper::history::History;
use snapkeeper::pipeline::{BatchReport, FileOutcome, RenameOptions, Renamer};
use snapkeeper::providers::{build_describer, Language};
use snapkeeper::{Result, SnapKeeperError};

/// SnapKeeper CLI - rename screenshots with AI descriptions
#[derive(Parser, Debug)]
#[command(name = "snapkeeper")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "3.0.0")]
#[command(about = "Rename screenshots to YYYYMMDD-description.ext using a vision model", long_about = None)]
struct Cli {
    /// Target directory
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "snapkeeper.json")]
    config: PathBuf,

    /// Output language for descriptions
    #[arg(long, value_enum, env = "RENAME_LANG")]
    lang: Option<Language>,

    /// Vision provider
    #[arg(long, value_enum)]
    api: Option<ProviderKind>,

    /// Override the provider's model
    #[arg(long)]
    model: Option<String>,

    /// Enable verbose diagnostic output
    #[arg(long)]
    debug: bool,

    /// Only show warnings and errors
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,

    /// Show the new names without renaming anything
    #[arg(long)]
    dry_run: bool,

    /// Do not descend into subdirectories
    #[arg(long)]
    no_recursive: bool,

    /// Only rename files whose names carry a screenshot date
    #[arg(long)]
    screenshots_only: bool,

    /// Do not write the rename journal
    #[arg(long)]
    no_history: bool,

    /// Skip the provider reachability check
    #[arg(long)]
    skip_health_check: bool,

    /// Output format for the batch report
    #[arg(long, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(lang) = self.lang {
            config.language = lang;
        }
        if let Some(api) = self.api {
            config.provider = api;
        }
        if self.no_recursive {
            config.rules.recursive = false;
        }
        if self.screenshots_only {
            config.rules.screenshots_only = true;
        }
        if self.no_history {
            config.history.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
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

    info!("SnapKeeper v3.0.0 - AI Screenshot Renamer");

    let mut config = AppConfig::load(&cli.config)?;
    cli.apply_to(&mut config);

    if !cli.path.is_dir() {
        return Err(SnapKeeperError::Config(format!(
            "Invalid directory - {}",
            cli.path.display()
        )));
    }

    // Credentials are checked here, before any file is touched
    let describer = build_describer(&config, config.provider, cli.model.as_deref())?;
    info!("Provider: {} | Language: {}", describer.name(), config.language);

    if cli.skip_health_check {
        warn!("Skipping provider health check");
    } else {
        describer.health_check().await?;
    }

    if cli.dry_run {
        warn!("DRY RUN MODE - files will not be renamed");
    }

    let mut options = RenameOptions::from_config(&config);
    options.dry_run = cli.dry_run;

    let history = History::new(PathBuf::from(&config.history.path));
    let mut renamer = Renamer::new(describer.as_ref(), options);
    if config.history.enabled && !cli.dry_run {
        renamer = renamer.with_history(&history);
    }

    info!("Starting processing: {}", cli.path.display());
    let report = renamer.run(&cli.path).await?;

    print_report(&report, &cli.format)?;

    Ok(())
}

fn print_report(report: &BatchReport, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        "jsonl" => {
            for file in &report.files {
                println!("{}", serde_json::to_string(file)?);
            }
        }
        _ => {
            for file in &report.files {
                match &file.outcome {
                    FileOutcome::Renamed { to, .. } => {
                        println!("{} -> {}", file.path.display(), to.display())
                    }
                    FileOutcome::Planned { to, .. } => {
                        println!("{} => {} (dry run)", file.path.display(), to.display())
                    }
                    FileOutcome::Unchanged => println!("{} (unchanged)", file.path.display()),
                    FileOutcome::Failed { error } => {
                        eprintln!("{}: {}", file.path.display(), error)
                    }
                }
            }
            println!(
                "\nProcessing completed: {} renamed, {} planned, {} unchanged, {} failed",
                report.renamed(),
                report.planned(),
                report.unchanged(),
                report.failed()
            );
        }
    }

    Ok(())
}
