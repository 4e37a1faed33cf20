// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rename journal with undo support

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::capture::DateSource;
use crate::providers::Language;
use crate::Result;

/// A single rename in the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    /// Label as returned by the provider, before normalization
    pub label: String,
    pub language: Language,
    pub provider: String,
    pub capture_date: NaiveDate,
    pub date_source: DateSource,
    /// blake3 of the file contents at rename time
    pub file_hash: String,
    #[serde(default)]
    pub undone: bool,
}

impl HistoryEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        original_path: PathBuf,
        new_path: PathBuf,
        label: String,
        language: Language,
        provider: &str,
        capture_date: NaiveDate,
        date_source: DateSource,
        file_hash: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            original_path,
            new_path,
            label,
            language,
            provider: provider.to_string(),
            capture_date,
            date_source,
            file_hash,
            undone: false,
        }
    }
}

/// JSONL journal of renames
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the journal
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all entries, oldest first; unparseable lines are skipped
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Failed to parse history entry: {}", e),
            }
        }

        Ok(entries)
    }

    /// The most recent `count` entries, newest first
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Entries not yet undone, oldest first
    pub fn get_undoable(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().filter(|e| !e.undone).collect())
    }

    /// Mark an entry as undone, rewriting the journal
    pub fn mark_undone(&self, id: &str) -> Result<()> {
        let entries = self.read_all()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for mut entry in entries {
                if entry.id == id {
                    entry.undone = true;
                }
                writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// blake3 of a file's contents
pub fn file_hash(path: &Path) -> Result<String> {
    let data = fs::read(path)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

/// What happened to one journal entry during undo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Restored,
    WouldRestore,
    MissingRenamed,
    OriginalOccupied,
    ContentChanged,
    Failed(String),
}

/// Revert the newest `count` undoable renames (0 = all)
pub fn undo(history: &History, count: usize, dry_run: bool) -> Result<Vec<(HistoryEntry, UndoOutcome)>> {
    let mut entries = history.get_undoable()?;
    entries.reverse();

    let count = if count == 0 { entries.len() } else { count.min(entries.len()) };

    let mut results = Vec::with_capacity(count);
    for entry in entries.into_iter().take(count) {
        let outcome = undo_entry(history, &entry, dry_run);
        results.push((entry, outcome));
    }

    Ok(results)
}

fn undo_entry(history: &History, entry: &HistoryEntry, dry_run: bool) -> UndoOutcome {
    if !entry.new_path.exists() {
        return UndoOutcome::MissingRenamed;
    }
    if entry.original_path.exists() {
        return UndoOutcome::OriginalOccupied;
    }

    match file_hash(&entry.new_path) {
        Ok(hash) if hash == entry.file_hash => {}
        Ok(_) => return UndoOutcome::ContentChanged,
        Err(e) => return UndoOutcome::Failed(e.to_string()),
    }

    if dry_run {
        return UndoOutcome::WouldRestore;
    }

    if let Err(e) = fs::rename(&entry.new_path, &entry.original_path) {
        return UndoOutcome::Failed(e.to_string());
    }
    info!("Undone: {:?} -> {:?}", entry.new_path, entry.original_path);

    match history.mark_undone(&entry.id) {
        Ok(()) => UndoOutcome::Restored,
        Err(e) => UndoOutcome::Failed(format!("restored but journal not updated: {}", e)),
    }
}
