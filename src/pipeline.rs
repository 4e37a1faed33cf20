// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Batch rename pipeline
//!
//! Files are handled one at a time in scan order: capture date, image
//! preparation, description, name resolution, rename, journal. A failure
//! only affects the file it happened on.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::capture::{capture_date, DateSource};
use crate::config::AppConfig;
use crate::history::{file_hash, History, HistoryEntry};
use crate::image_prep::prepare_image;
use crate::providers::{clean_label, describe_with_retry, Describer, Language};
use crate::resolver::{Extension, FilenameResolver, Namespace};
use crate::scanner::{collect_images, ScanOptions};
use crate::{Result, SnapKeeperError};

/// Knobs for one batch run
#[derive(Debug, Clone)]
pub struct RenameOptions {
    pub language: Language,
    pub retries: u32,
    pub dry_run: bool,
    pub max_file_bytes: u64,
    pub max_dimension: u32,
    pub max_label_chars: usize,
    pub scan: ScanOptions,
}

impl RenameOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            language: config.language,
            retries: config.retries,
            dry_run: false,
            max_file_bytes: config.rules.max_file_bytes(),
            max_dimension: config.rules.max_dimension,
            max_label_chars: config.rules.max_label_chars,
            scan: ScanOptions::from(&config.rules),
        }
    }
}

/// Result for a single file
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Renamed {
        to: PathBuf,
        label: String,
        capture_date: NaiveDate,
        date_source: DateSource,
    },
    /// Dry run: the name that would have been used
    Planned {
        to: PathBuf,
        label: String,
        capture_date: NaiveDate,
        date_source: DateSource,
    },
    /// The file already carries the name it resolved to
    Unchanged,
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    pub fn renamed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Renamed { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Planned { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Unchanged))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }
}

/// Drives a batch of renames through a [`Describer`]
pub struct Renamer<'a> {
    describer: &'a dyn Describer,
    history: Option<&'a History>,
    resolver: FilenameResolver,
    options: RenameOptions,
    namespaces: HashMap<PathBuf, Namespace>,
}

impl<'a> Renamer<'a> {
    pub fn new(describer: &'a dyn Describer, options: RenameOptions) -> Self {
        Self {
            describer,
            history: None,
            resolver: FilenameResolver::new().with_max_label_chars(Some(options.max_label_chars)),
            options,
            namespaces: HashMap::new(),
        }
    }

    /// Journal every rename to `history`
    pub fn with_history(mut self, history: &'a History) -> Self {
        self.history = Some(history);
        self
    }

    /// Replace the resolver built from the options
    pub fn with_resolver(mut self, resolver: FilenameResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Process every candidate image under `root`
    pub async fn run(&mut self, root: &Path) -> Result<BatchReport> {
        let files = collect_images(root, &self.options.scan)?;
        let total = files.len();
        info!("Found {} files to process", total);

        let mut report = BatchReport::default();

        for (idx, path) in files.into_iter().enumerate() {
            info!(
                "Processing ({}/{}): {}",
                idx + 1,
                total,
                path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            );

            let outcome = match self.process_file(&path).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed to process {:?}: {}", path, e);
                    FileOutcome::Failed { error: e.to_string() }
                }
            };

            report.files.push(FileReport { path, outcome });
        }

        Ok(report)
    }

    /// Describe, resolve and rename a single file
    pub async fn process_file(&mut self, path: &Path) -> Result<FileOutcome> {
        let ext = Extension::from_path(path)
            .ok_or_else(|| SnapKeeperError::UnsupportedFileType(path.display().to_string()))?;
        let capture = capture_date(path)?;
        let hash = match self.history {
            Some(_) if !self.options.dry_run => Some(file_hash(path)?),
            _ => None,
        };

        let image = prepare_image(path, self.options.max_file_bytes, self.options.max_dimension)?;
        let raw = describe_with_retry(self.describer, &image, self.options.language, self.options.retries).await?;
        debug!("{} said: {:?}", self.describer.name(), raw);
        let label = clean_label(&raw);

        let dir = path
            .parent()
            .ok_or_else(|| SnapKeeperError::Config("Cannot determine parent directory".to_string()))?
            .to_path_buf();
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let namespace = match self.namespaces.entry(dir.clone()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(Namespace::from_dir(&dir)?),
        };

        // The source frees its own name when it moves, so it may keep it.
        let held = namespace.release(&source_name);
        let name = match self.resolver.resolve(capture.date, &label, ext.as_str(), namespace) {
            Ok(name) => name,
            Err(e) => {
                if held {
                    namespace.insert(&source_name);
                }
                return Err(e.into());
            }
        };

        if name == source_name {
            debug!("{:?} already has its resolved name", path);
            return Ok(FileOutcome::Unchanged);
        }

        let target = dir.join(&name);

        if self.options.dry_run {
            info!("DRY RUN: Would rename {:?} to {}", path, name);
            return Ok(FileOutcome::Planned {
                to: target,
                label,
                capture_date: capture.date,
                date_source: capture.source,
            });
        }

        if target.exists() {
            // Created behind our back since the directory snapshot
            namespace.insert(&source_name);
            return Err(SnapKeeperError::FileSystem(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} appeared while processing", target.display()),
            )));
        }

        if let Err(e) = std::fs::rename(path, &target) {
            namespace.release(&name);
            namespace.insert(&source_name);
            return Err(e.into());
        }
        info!("   → Renamed to: {}", name);

        if let (Some(history), Some(hash)) = (self.history, hash) {
            let entry = HistoryEntry::new(
                path.to_path_buf(),
                target.clone(),
                raw.trim().to_string(),
                self.options.language,
                self.describer.name(),
                capture.date,
                capture.source,
                hash,
            );
            if let Err(e) = history.append(&entry) {
                warn!("Renamed {:?} but could not write history: {}", path, e);
            }
        }

        Ok(FileOutcome::Renamed {
            to: target,
            label,
            capture_date: capture.date,
            date_source: capture.source,
        })
    }
}
