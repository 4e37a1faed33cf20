// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use snapkeeper::{FilenameResolver, NameError, Namespace};

#[derive(Arbitrary, Debug)]
struct Input {
    label: String,
    ext: String,
    taken: Vec<String>,
    day: u16,
}

fuzz_target!(|input: Input| {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        + chrono::Duration::days(i64::from(input.day % 366));

    let mut ns = Namespace::with_case_sensitivity(false);
    for name in &input.taken {
        ns.insert(name);
    }
    let before = ns.len();

    match FilenameResolver::new().resolve(date, &input.label, &input.ext, &mut ns) {
        Ok(name) => {
            assert!(!name.contains('/') && !name.contains('\\') && !name.contains('\0'));
            assert!(name.starts_with(&date.format("%Y%m%d-").to_string()));
            assert!(!input.taken.contains(&name));
            assert_eq!(ns.len(), before + 1);
        }
        Err(NameError::EmptyLabel) | Err(NameError::UnsupportedExtension(_)) => {
            assert_eq!(ns.len(), before);
        }
        Err(NameError::NamespaceExhausted(_)) => unreachable!("suffix space cannot run out here"),
    }
});
