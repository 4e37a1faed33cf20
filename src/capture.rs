// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Capture date detection

use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use crate::Result;

/// Where a capture date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Parsed from the screenshot filename
    Filename,
    /// File modification time (fallback)
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDate {
    pub date: NaiveDate,
    pub source: DateSource,
}

fn screenshot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:Screen ?[Ss]hot|SCR)[ _-](\d{4})-?(\d{2})-?(\d{2})")
            .expect("screenshot pattern is valid")
    })
}

/// Extract a date from screenshot-style names
///
/// Recognises `Screen Shot 2024-06-01 at …`, `Screenshot 2024-06-01 …`
/// and `SCR-20240601-…`. Calendar-invalid dates yield `None`.
pub fn parse_filename_date(filename: &str) -> Option<NaiveDate> {
    let caps = screenshot_pattern().captures(filename)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Capture date of a file: filename first, then modification time
pub fn capture_date(path: &Path) -> Result<CaptureDate> {
    if let Some(date) = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_filename_date)
    {
        return Ok(CaptureDate {
            date,
            source: DateSource::Filename,
        });
    }

    let modified = std::fs::metadata(path)?.modified()?;
    let date = DateTime::<Local>::from(modified).date_naive();
    debug!("No date in filename {:?}, using mtime {}", path, date);

    Ok(CaptureDate {
        date,
        source: DateSource::Modified,
    })
}
