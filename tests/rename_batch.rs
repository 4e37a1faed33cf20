// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

use snapkeeper::config::AppConfig;
use snapkeeper::history::{undo, History, UndoOutcome};
use snapkeeper::image_prep::PreparedImage;
use snapkeeper::pipeline::{FileOutcome, RenameOptions, Renamer};
use snapkeeper::providers::{Describer, Language};
use snapkeeper::{Result, SnapKeeperError};

/// Answers by looking up the base64 payload of each file
struct Scripted {
    answers: HashMap<String, std::result::Result<String, String>>,
}

impl Scripted {
    fn new(pairs: &[(&str, std::result::Result<&str, &str>)]) -> Self {
        use base64::Engine as _;
        let answers = pairs
            .iter()
            .map(|(bytes, answer)| {
                (
                    base64::engine::general_purpose::STANDARD.encode(bytes.as_bytes()),
                    (*answer).map(str::to_string).map_err(str::to_string),
                )
            })
            .collect();
        Self { answers }
    }
}

#[async_trait]
impl Describer for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn describe(&self, image: &PreparedImage, _language: Language) -> Result<String> {
        match self.answers.get(&image.base64) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(SnapKeeperError::Config(e.clone())),
            None => Err(SnapKeeperError::Config("no scripted answer".to_string())),
        }
    }
}

fn options() -> RenameOptions {
    RenameOptions {
        retries: 0,
        ..RenameOptions::from_config(&AppConfig::default())
    }
}

fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn batch_renames_with_collision_suffixes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("Screen Shot 2024-06-01 at 10.00.00.png"), b"one");
    write(&root.join("Screen Shot 2024-06-01 at 11.00.00.png"), b"two");
    write(&root.join("SCR-20240601-zz.png"), b"three");
    write(&root.join("20240601-足球賽.png"), b"existing");

    let describer = Scripted::new(&[
        ("one", Ok("足球賽")),
        ("two", Ok("足球賽。")),
        ("three", Ok("描述：足球賽")),
    ]);

    let mut renamer = Renamer::new(&describer, options());
    let report = renamer.run(root).await.unwrap();

    assert_eq!(report.renamed(), 3);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        listing(root),
        vec![
            "20240601-足球賽-1.png",
            "20240601-足球賽-2.png",
            "20240601-足球賽-3.png",
            "20240601-足球賽.png",
        ]
    );
    assert_eq!(std::fs::read(root.join("20240601-足球賽.png")).unwrap(), b"existing");

    let contract = Regex::new(r"^\d{8}-.+(-\d+)?\.(png|jpg|jpeg)$").unwrap();
    for name in listing(root) {
        assert!(contract.is_match(&name), "{} breaks the naming contract", name);
    }
}

#[tokio::test]
async fn per_file_errors_do_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("SCR-20240102-a.png"), b"fails");
    write(&root.join("SCR-20240102-b.jpg"), b"blank");
    write(&root.join("SCR-20240102-c.JPEG"), b"works");

    let describer = Scripted::new(&[
        ("fails", Err("provider down")),
        ("blank", Ok("   ")),
        ("works", Ok("A red car")),
    ]);

    let mut renamer = Renamer::new(&describer, options());
    let report = renamer.run(root).await.unwrap();

    assert_eq!(report.renamed(), 1);
    assert_eq!(report.failed(), 2);
    assert_eq!(
        listing(root),
        vec!["20240102-A_red_car.jpeg", "SCR-20240102-a.png", "SCR-20240102-b.jpg"]
    );

    match &report.files[1].outcome {
        FileOutcome::Failed { error } => assert!(error.contains("empty")),
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn dry_run_plans_unique_names_without_renaming() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("SCR-20240601-a.png"), b"a");
    write(&root.join("SCR-20240601-b.png"), b"b");

    let describer = Scripted::new(&[("a", Ok("cat")), ("b", Ok("cat"))]);

    let mut opts = options();
    opts.dry_run = true;
    let mut renamer = Renamer::new(&describer, opts);
    let report = renamer.run(root).await.unwrap();

    assert_eq!(report.planned(), 2);
    let planned: Vec<String> = report
        .files
        .iter()
        .map(|f| match &f.outcome {
            FileOutcome::Planned { to, .. } => to.file_name().unwrap().to_string_lossy().to_string(),
            other => panic!("Expected plan, got {:?}", other),
        })
        .collect();
    assert_eq!(planned, vec!["20240601-cat.png", "20240601-cat-1.png"]);
    assert_eq!(listing(root), vec!["SCR-20240601-a.png", "SCR-20240601-b.png"]);
}

#[tokio::test]
async fn subdirectories_have_their_own_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("SCR-20240601-a.png"), b"top");
    write(&root.join("nested/SCR-20240601-a.png"), b"nested");

    let describer = Scripted::new(&[("top", Ok("dog")), ("nested", Ok("dog"))]);

    let mut renamer = Renamer::new(&describer, options());
    renamer.run(root).await.unwrap();

    assert_eq!(listing(root), vec!["20240601-dog.png"]);
    assert_eq!(listing(&root.join("nested")), vec!["20240601-dog.png"]);
}

#[tokio::test]
async fn rerun_leaves_renamed_files_alone() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("SCR-20240601-a.png"), b"a");

    let describer = Scripted::new(&[("a", Ok("cat"))]);

    let mut first = Renamer::new(&describer, options());
    assert_eq!(first.run(root).await.unwrap().renamed(), 1);

    let mut second = Renamer::new(&describer, options());
    assert!(second.run(root).await.unwrap().files.is_empty());
    assert_eq!(listing(root), vec!["20240601-cat.png"]);
}

#[tokio::test]
async fn journal_supports_undo() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("shots");
    write(&root.join("SCR-20240601-a.png"), b"a");
    write(&root.join("SCR-20240601-b.png"), b"b");

    let history = History::new(dir.path().join("history.jsonl"));
    let describer = Scripted::new(&[("a", Ok("cat")), ("b", Ok("dog"))]);

    let mut renamer = Renamer::new(&describer, options()).with_history(&history);
    renamer.run(&root).await.unwrap();

    let entries = history.read_all().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].provider, "scripted");
    assert_eq!(entries[0].label, "cat");

    let results = undo(&history, 0, false).unwrap();
    assert!(results.iter().all(|(_, o)| *o == UndoOutcome::Restored));
    assert_eq!(listing(&root), vec!["SCR-20240601-a.png", "SCR-20240601-b.png"]);
    assert!(history.get_undoable().unwrap().is_empty());
}
