// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Collision-safe target filename construction
//!
//! Names have the form `YYYYMMDD-label[-n].ext`. The set of names already
//! taken in a directory is owned by the caller ([`Namespace`]) and is the
//! only thing a resolve call mutates, so the resolver never touches the
//! filesystem itself.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Errors raised while building a target filename
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("label is empty after normalization")]
    EmptyLabel,

    #[error("unsupported extension {0:?} (expected png, jpg or jpeg)")]
    UnsupportedExtension(String),

    #[error("no free collision suffix left for {0}")]
    NamespaceExhausted(String),
}

/// Image extensions eligible for renaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Png,
    Jpg,
    Jpeg,
}

impl Extension {
    pub const ALL: [Extension; 3] = [Extension::Png, Extension::Jpg, Extension::Jpeg];

    /// Canonical lowercase spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
        }
    }

    /// Extension of a path, if it is one we handle
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for Extension {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix('.').unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|ext| ext.as_str().eq_ignore_ascii_case(bare))
            .ok_or_else(|| NameError::UnsupportedExtension(s.to_string()))
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the host filesystem usually compares names case-insensitively
fn host_case_insensitive() -> bool {
    cfg!(any(target_os = "macos", target_os = "windows"))
}

/// The set of filenames already taken in one destination directory
#[derive(Debug, Clone)]
pub struct Namespace {
    names: HashSet<String>,
    case_insensitive: bool,
}

impl Namespace {
    /// Empty namespace using the host's case sensitivity
    pub fn new() -> Self {
        Self::with_case_sensitivity(host_case_insensitive())
    }

    pub fn with_case_sensitivity(case_insensitive: bool) -> Self {
        Self {
            names: HashSet::new(),
            case_insensitive,
        }
    }

    /// Snapshot the entries of a directory
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut ns = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            ns.insert(&entry.file_name().to_string_lossy());
        }
        Ok(ns)
    }

    fn key(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&self.key(name))
    }

    /// Reserve a name. Returns false if it was already taken.
    pub fn insert(&mut self, name: &str) -> bool {
        let key = self.key(name);
        self.names.insert(key)
    }

    /// Free a name, e.g. after the file holding it was renamed away
    pub fn release(&mut self, name: &str) -> bool {
        let key = self.key(name);
        self.names.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

/// Namespace shared between concurrent resolvers
pub type SharedNamespace = Arc<Mutex<Namespace>>;

fn is_forbidden(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Normalize a label into a filename-safe component
///
/// Trims the label, drops characters that are illegal in filenames, turns
/// whitespace runs into a single `_` and collapses repeated `_` / `-`.
pub fn normalize_label(raw: &str, max_chars: Option<usize>) -> Result<String, NameError> {
    let mut spaced = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.trim().chars() {
        if c.is_whitespace() {
            pending_sep = true;
            continue;
        }
        if is_forbidden(c) {
            continue;
        }
        if pending_sep && !spaced.is_empty() {
            spaced.push('_');
        }
        pending_sep = false;
        spaced.push(c);
    }

    let mut label = String::with_capacity(spaced.len());
    let mut prev = None;
    for c in spaced.chars() {
        if (c == '_' || c == '-') && prev == Some(c) {
            continue;
        }
        label.push(c);
        prev = Some(c);
    }

    let edges: &[char] = &['.', '_', '-'];
    let mut label = label.trim_matches(edges).to_string();

    if let Some(max) = max_chars {
        if label.chars().count() > max {
            label = label.chars().take(max).collect::<String>();
            label = label.trim_end_matches(edges).to_string();
        }
    }

    if label.is_empty() {
        return Err(NameError::EmptyLabel);
    }

    Ok(label)
}

/// Builds unique `YYYYMMDD-label[-n].ext` filenames
#[derive(Debug, Clone)]
pub struct FilenameResolver {
    max_label_chars: Option<usize>,
    suffix_limit: u64,
}

impl Default for FilenameResolver {
    fn default() -> Self {
        Self {
            max_label_chars: Some(50),
            suffix_limit: u64::MAX,
        }
    }
}

impl FilenameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the label length in characters (`None` for no cap)
    pub fn with_max_label_chars(mut self, max: Option<usize>) -> Self {
        self.max_label_chars = max;
        self
    }

    /// Highest collision suffix that may be handed out
    pub fn with_suffix_limit(mut self, limit: u64) -> Self {
        self.suffix_limit = limit;
        self
    }

    /// Resolve a unique filename and reserve it in `existing`
    ///
    /// On error `existing` is left untouched.
    pub fn resolve(
        &self,
        date: NaiveDate,
        label: &str,
        ext: &str,
        existing: &mut Namespace,
    ) -> Result<String, NameError> {
        let label = normalize_label(label, self.max_label_chars)?;
        let ext: Extension = ext.parse()?;

        let stem = format!("{}-{}", date.format("%Y%m%d"), label);
        let name = self.first_free(&stem, ext, existing)?;

        existing.insert(&name);
        Ok(name)
    }

    /// [`resolve`](Self::resolve) against a namespace behind a lock
    ///
    /// The lock is held across probe and reservation.
    pub fn resolve_shared(
        &self,
        date: NaiveDate,
        label: &str,
        ext: &str,
        shared: &SharedNamespace,
    ) -> Result<String, NameError> {
        // Reservations only happen after a successful probe, so a poisoned
        // namespace is still consistent.
        let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
        self.resolve(date, label, ext, &mut guard)
    }

    fn first_free(&self, stem: &str, ext: Extension, existing: &Namespace) -> Result<String, NameError> {
        let base = format!("{}.{}", stem, ext);
        if !existing.contains(&base) {
            return Ok(base);
        }

        let mut n: u64 = 1;
        loop {
            if n > self.suffix_limit {
                return Err(NameError::NamespaceExhausted(base));
            }

            let candidate = format!("{}-{}.{}", stem, n, ext);
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }

            n = match n.checked_add(1) {
                Some(next) => next,
                None => return Err(NameError::NamespaceExhausted(base)),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn sensitive(names: &[&str]) -> Namespace {
        let mut ns = Namespace::with_case_sensitivity(false);
        for n in names {
            ns.insert(n);
        }
        ns
    }

    #[test]
    fn test_empty_namespace_gives_unsuffixed_name() {
        let mut ns = sensitive(&[]);
        let name = FilenameResolver::new()
            .resolve(june_first(), "足球賽", "png", &mut ns)
            .unwrap();
        assert_eq!(name, "20240601-足球賽.png");
        assert!(ns.contains("20240601-足球賽.png"));
    }

    #[test]
    fn test_taken_base_gets_first_suffix() {
        let mut ns = sensitive(&["20240601-足球賽.png"]);
        let name = FilenameResolver::new()
            .resolve(june_first(), "足球賽", "png", &mut ns)
            .unwrap();
        assert_eq!(name, "20240601-足球賽-1.png");
    }

    #[test]
    fn test_smallest_unused_suffix_is_chosen() {
        let mut ns = sensitive(&["20240601-cat.jpg", "20240601-cat-1.jpg", "20240601-cat-3.jpg"]);
        let name = FilenameResolver::new()
            .resolve(june_first(), "cat", "jpg", &mut ns)
            .unwrap();
        assert_eq!(name, "20240601-cat-2.jpg");
    }

    #[test]
    fn test_repeated_calls_never_collide() {
        let resolver = FilenameResolver::new();
        let mut ns = sensitive(&[]);
        let names: Vec<String> = (0..5)
            .map(|_| resolver.resolve(june_first(), "dog", "jpeg", &mut ns).unwrap())
            .collect();

        assert_eq!(
            names,
            vec![
                "20240601-dog.jpeg",
                "20240601-dog-1.jpeg",
                "20240601-dog-2.jpeg",
                "20240601-dog-3.jpeg",
                "20240601-dog-4.jpeg",
            ]
        );
        assert_eq!(ns.len(), 5);
    }

    #[test]
    fn test_whitespace_label_fails_without_touching_namespace() {
        let mut ns = sensitive(&["keep.png"]);
        for label in ["", " ", "\t\n  ", "///", "..."] {
            let err = FilenameResolver::new()
                .resolve(june_first(), label, "png", &mut ns)
                .unwrap_err();
            assert_eq!(err, NameError::EmptyLabel);
        }
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let mut ns = sensitive(&[]);
        for ext in ["gif", "webp", "", "png.exe"] {
            let err = FilenameResolver::new()
                .resolve(june_first(), "cat", ext, &mut ns)
                .unwrap_err();
            assert!(matches!(err, NameError::UnsupportedExtension(_)));
        }
        assert!(ns.is_empty());
    }

    #[test]
    fn test_extension_is_case_insensitive_and_canonical() {
        let mut ns = sensitive(&[]);
        let name = FilenameResolver::new()
            .resolve(june_first(), "cat", ".JPG", &mut ns)
            .unwrap();
        assert_eq!(name, "20240601-cat.jpg");
    }

    #[test]
    fn test_extension_allows_one_leading_dot_only() {
        assert_eq!(".png".parse::<Extension>().unwrap(), Extension::Png);
        for ext in ["..png", " .PNG ", "png ", ". png"] {
            assert_eq!(
                ext.parse::<Extension>(),
                Err(NameError::UnsupportedExtension(ext.to_string()))
            );
        }
    }

    #[test]
    fn test_namespace_exhausted() {
        let mut ns = sensitive(&["20240601-cat.png", "20240601-cat-1.png", "20240601-cat-2.png"]);
        let err = FilenameResolver::new()
            .with_suffix_limit(2)
            .resolve(june_first(), "cat", "png", &mut ns)
            .unwrap_err();
        assert_eq!(err, NameError::NamespaceExhausted("20240601-cat.png".into()));
        assert_eq!(ns.len(), 3);
    }

    #[test]
    fn test_normalize_strips_illegal_and_collapses_whitespace() {
        assert_eq!(normalize_label("  a/b\\c\0d  ", None).unwrap(), "abcd");
        assert_eq!(normalize_label("red   car\tparked", None).unwrap(), "red_car_parked");
        assert_eq!(normalize_label("what? <yes>: \"no\"|", None).unwrap(), "what_yes_no");
        assert_eq!(normalize_label("a__b--c", None).unwrap(), "a_b-c");
        assert_eq!(normalize_label(".hidden.", None).unwrap(), "hidden");
    }

    #[test]
    fn test_normalize_truncates_on_char_boundary() {
        assert_eq!(normalize_label("足球賽比賽現場", Some(3)).unwrap(), "足球賽");
        assert_eq!(normalize_label("abc def", Some(4)).unwrap(), "abc");
    }

    #[test]
    fn test_case_insensitive_namespace() {
        let mut ns = Namespace::with_case_sensitivity(true);
        ns.insert("20240601-Cat.PNG");
        let name = FilenameResolver::new()
            .resolve(june_first(), "cat", "png", &mut ns)
            .unwrap();
        assert_eq!(name, "20240601-cat-1.png");
    }

    #[test]
    fn test_release_frees_name() {
        let mut ns = sensitive(&["20240601-cat.png"]);
        assert!(ns.release("20240601-cat.png"));
        let name = FilenameResolver::new()
            .resolve(june_first(), "cat", "png", &mut ns)
            .unwrap();
        assert_eq!(name, "20240601-cat.png");
    }

    #[test]
    fn test_from_dir_snapshots_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("20240601-cat.png"), b"x").unwrap();
        let ns = Namespace::from_dir(dir.path()).unwrap();
        assert!(ns.contains("20240601-cat.png"));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_shared_namespace_across_threads() {
        let shared: SharedNamespace = Arc::new(Mutex::new(Namespace::with_case_sensitivity(false)));
        let resolver = FilenameResolver::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let resolver = resolver.clone();
                std::thread::spawn(move || {
                    resolver
                        .resolve_shared(june_first(), "cat", "png", &shared)
                        .unwrap()
                })
            })
            .collect();

        let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"20240601-cat.png".to_string()));
        assert!(names.contains(&"20240601-cat-7.png".to_string()));
    }
}
