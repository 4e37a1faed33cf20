// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SnapKeeper Undo Utility
//!
//! Reverses renames recorded in the history journal.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use snapkeeper::history::{undo, History, UndoOutcome};

#[derive(Parser, Debug)]
#[command(name = "snapkeeper-undo")]
#[command(version = "3.0.0")]
#[command(about = "Undo SnapKeeper renames")]
struct Args {
    /// Path to history file
    #[arg(short = 'f', long, default_value = "snapkeeper_history.jsonl")]
    history_file: PathBuf,

    /// Number of renames to undo (default: 1, use 0 for all)
    #[arg(short, long, default_value = "1")]
    count: usize,

    /// Show what would be undone without doing it
    #[arg(long)]
    dry_run: bool,

    /// List all entries in history
    #[arg(long)]
    list: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if args.verbose { "debug" } else { "warn" })
        .with_target(false)
        .init();

    let history = History::new(args.history_file.clone());

    if args.list {
        let entries = history
            .get_recent(usize::MAX)
            .with_context(|| format!("reading {}", args.history_file.display()))?;

        println!("Rename History ({} entries):", entries.len());
        println!("{:-<80}", "");
        for (i, entry) in entries.iter().enumerate() {
            println!(
                "{:3}. [{}] {} -> {}{}",
                i + 1,
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.original_path.display(),
                entry.new_path.display(),
                if entry.undone { " [UNDONE]" } else { "" }
            );
            println!("     {} ({}): {}", entry.provider, entry.language, entry.label);
        }
        return Ok(());
    }

    let results = undo(&history, args.count, args.dry_run)
        .with_context(|| format!("undoing renames from {}", args.history_file.display()))?;

    if results.is_empty() {
        println!("No renames to undo.");
        return Ok(());
    }

    println!(
        "{}Undoing {} rename(s)...",
        if args.dry_run { "[DRY RUN] " } else { "" },
        results.len()
    );

    let mut undone = 0;
    let mut skipped = 0;

    for (entry, outcome) in &results {
        let from = entry.new_path.display();
        let to = entry.original_path.display();
        match outcome {
            UndoOutcome::Restored => {
                println!("  Undone: {} -> {}", from, to);
                undone += 1;
            }
            UndoOutcome::WouldRestore => {
                println!("  Would rename: {} -> {}", from, to);
                undone += 1;
            }
            UndoOutcome::MissingRenamed => {
                eprintln!("  Skip: {} (file not found, may have been moved/deleted)", from);
                skipped += 1;
            }
            UndoOutcome::OriginalOccupied => {
                eprintln!("  Skip: {} (original path already exists)", to);
                skipped += 1;
            }
            UndoOutcome::ContentChanged => {
                eprintln!("  Skip: {} (contents changed since rename)", from);
                skipped += 1;
            }
            UndoOutcome::Failed(e) => {
                eprintln!("  Failed: {} ({})", from, e);
                skipped += 1;
            }
        }
    }

    println!();
    if args.dry_run {
        println!("Dry run complete. {} rename(s) would be undone.", undone);
    } else {
        println!("Done. {} undone, {} failed/skipped.", undone, skipped);
    }

    Ok(())
}
