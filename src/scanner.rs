// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Directory scanning for rename candidates

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::capture::parse_filename_date;
use crate::config::RuleConfig;
use crate::resolver::Extension;
use crate::Result;

/// Which files a scan picks up
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub recursive: bool,
    pub screenshots_only: bool,
    pub skip_renamed: bool,
}

impl From<&RuleConfig> for ScanOptions {
    fn from(rules: &RuleConfig) -> Self {
        Self {
            recursive: rules.recursive,
            screenshots_only: rules.screenshots_only,
            skip_renamed: rules.skip_renamed,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&RuleConfig::default())
    }
}

fn renamed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{8}-.+\.(?i:png|jpe?g)$").expect("renamed pattern is valid")
    })
}

/// Whether a filename already has the `YYYYMMDD-label[-n].ext` form
pub fn is_renamed_name(filename: &str) -> bool {
    renamed_pattern().is_match(filename)
}

/// Skip hidden, temporary and system files
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    if filename.starts_with('.') {
        return false;
    }

    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    if temp_extensions.iter().any(|ext| filename.ends_with(ext)) {
        return false;
    }

    let skip_names = ["desktop.ini", "thumbs.db", ".ds_store"];
    !skip_names.iter().any(|n| filename.eq_ignore_ascii_case(n))
}

fn is_candidate(path: &Path, options: &ScanOptions) -> bool {
    if !should_process(path) || Extension::from_path(path).is_none() {
        return false;
    }

    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    if options.skip_renamed && is_renamed_name(filename) {
        debug!("Already renamed, skipping: {:?}", path);
        return false;
    }

    if options.screenshots_only && parse_filename_date(filename).is_none() {
        return false;
    }

    true
}

/// Collect candidate images under `root` in sorted traversal order
pub fn collect_images(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, options, &mut files, true)?;
    Ok(files)
}

fn walk(dir: &Path, options: &ScanOptions, files: &mut Vec<PathBuf>, is_root: bool) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if !is_root => {
            warn!("Cannot read directory {:?}: {}", dir, e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // file_type() does not follow symlinks, so linked directories are never
    // entered and a link back to an ancestor cannot loop
    let mut paths: Vec<(PathBuf, std::fs::FileType)> = entries
        .flatten()
        .filter_map(|e| e.file_type().ok().map(|ft| (e.path(), ft)))
        .collect();
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in paths {
        if file_type.is_dir() {
            if options.recursive && should_process(&path) {
                walk(&path, options, files, false)?;
            }
        } else if file_type.is_symlink() && path.is_dir() {
            debug!("Not following directory link {:?}", path);
        } else if path.is_file() && is_candidate(&path, options) {
            files.push(path);
        }
    }

    Ok(())
}
