// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SnapKeeper: AI screenshot renamer
//!
//! Describes images with a vision model and renames them to
//! `YYYYMMDD-description[-n].ext`, using the capture date from the
//! screenshot filename or the file's modification time.

pub mod capture;
pub mod config;
pub mod error;
pub mod history;
pub mod image_prep;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod scanner;

pub use config::AppConfig;
pub use error::{Result, SnapKeeperError};
pub use resolver::{FilenameResolver, NameError, Namespace};
