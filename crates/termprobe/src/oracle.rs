//! Ground-truth comparison for extracted output.
//!
//! The harness does not know what a command *should* print. Tests compute
//! that themselves, typically from the filesystem, and check that every
//! expected item was extracted from the child's output:
//!
//! ```no_run
//! use termprobe::oracle::{self, FileFilter};
//!
//! # fn demo(extracted: Vec<String>) -> termprobe::Result<()> {
//! let truth = oracle::list_directory(".", &FileFilter::extensions(["c"]))?;
//! oracle::compare(extracted, &truth).check()?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use regex::Regex;
use thiserror::Error;

use crate::error::{ExpectError, Result};

/// Every non-overlapping occurrence of `regex` in `text`, in order.
///
/// If the regex has a capture group, the first group is returned for each
/// occurrence (an empty string if it did not participate); otherwise the
/// whole match.
#[must_use]
pub fn extract_all(text: &str, regex: &Regex) -> Vec<String> {
    let has_group = regex.captures_len() > 1;
    regex
        .captures_iter(text)
        .map(|caps| {
            let group = if has_group { caps.get(1) } else { caps.get(0) };
            group.map_or_else(String::new, |m| m.as_str().to_string())
        })
        .collect()
}

/// Which directory entries count as ground truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFilter {
    /// Every entry.
    All,
    /// Entries whose extension is one of these (without the dot).
    Extensions(Vec<String>),
}

impl FileFilter {
    /// Filter by extension.
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Extensions(extensions.into_iter().map(Into::into).collect())
    }

    fn accepts(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Extensions(exts) => Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| exts.iter().any(|want| want == ext)),
        }
    }
}

/// Names of the entries of `dir` accepted by `filter`.
///
/// Hidden entries (leading dot) are skipped, matching what a shell glob
/// expands to. Names that are not valid UTF-8 are skipped.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_directory(dir: impl AsRef<Path>, filter: &FileFilter) -> Result<BTreeSet<String>> {
    let dir = dir.as_ref();
    let context = || format!("listing {}", dir.display());

    let mut names = BTreeSet::new();
    for entry in ExpectError::with_io_context(std::fs::read_dir(dir), context())? {
        let entry = ExpectError::with_io_context(entry, context())?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.starts_with('.') && filter.accepts(&name) {
            names.insert(name);
        }
    }
    Ok(names)
}

/// Result of comparing extracted items against ground truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleReport {
    extracted: BTreeSet<String>,
    missing: BTreeSet<String>,
}

impl OracleReport {
    /// Members of the ground truth that were not extracted.
    #[must_use]
    pub const fn missing(&self) -> &BTreeSet<String> {
        &self.missing
    }

    /// Everything that was extracted, deduplicated.
    #[must_use]
    pub const fn extracted(&self) -> &BTreeSet<String> {
        &self.extracted
    }

    /// Whether the extracted items cover the ground truth.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Fail if anything is missing.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleMismatch`] listing every missing item.
    pub fn check(&self) -> std::result::Result<(), OracleMismatch> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(OracleMismatch {
                missing: self.missing.iter().cloned().collect(),
            })
        }
    }
}

/// Compare `extracted` against `truth`.
///
/// Extra extracted items are allowed; only items of `truth` that were never
/// extracted are reported.
pub fn compare<I, S>(extracted: I, truth: &BTreeSet<String>) -> OracleReport
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let extracted: BTreeSet<String> = extracted.into_iter().map(Into::into).collect();
    let missing = truth.difference(&extracted).cloned().collect();
    OracleReport { extracted, missing }
}

/// Ground-truth items missing from the extracted output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct OracleMismatch {
    /// Missing items, sorted.
    pub missing: Vec<String>,
}

impl fmt::Display for OracleMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} expected item(s) not found in output:", self.missing.len())?;
        for item in &self.missing {
            writeln!(f, "  - {item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_all_prefers_first_group() {
        let re = Regex::new(r"(\S+)\.c").expect("regex");
        assert_eq!(extract_all("a.c b.c  x.h", &re), vec!["a", "b"]);

        let whole = Regex::new(r"\S+\.c").expect("regex");
        assert_eq!(extract_all("a.c b.c", &whole), vec!["a.c", "b.c"]);
    }

    #[test]
    fn extract_all_non_participating_group_is_empty() {
        let re = Regex::new(r"x(y)?").expect("regex");
        assert_eq!(extract_all("xy x", &re), vec!["y", ""]);
    }

    #[test]
    fn compare_reports_only_missing() {
        let truth: BTreeSet<String> = ["a.c", "b.c", "c.c"].map(String::from).into();
        let report = compare(["a.c", "c.c", "extra.c"], &truth);

        assert!(!report.is_complete());
        assert_eq!(report.missing().iter().collect::<Vec<_>>(), vec!["b.c"]);
        let err = report.check().expect_err("missing b.c");
        assert!(err.to_string().contains("- b.c"));
    }

    #[test]
    fn superset_passes() {
        let truth: BTreeSet<String> = ["a.c"].map(String::from).into();
        assert!(compare(["a.c", "b.c"], &truth).check().is_ok());
    }

    #[test]
    fn mismatch_converts_to_expect_error() {
        let truth: BTreeSet<String> = ["a.c"].map(String::from).into();
        let err: ExpectError = compare(Vec::<String>::new(), &truth)
            .check()
            .expect_err("missing")
            .into();
        assert!(matches!(err, ExpectError::Oracle(_)));
    }

    #[test]
    fn list_directory_filters_and_skips_hidden() {
        let dir = std::env::temp_dir().join(format!("termprobe-oracle-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        for name in ["one.c", "two.h", "three.txt", ".hidden.c"] {
            std::fs::write(dir.join(name), b"").expect("touch");
        }

        let c_and_h = list_directory(&dir, &FileFilter::extensions(["c", "h"])).expect("list");
        assert_eq!(c_and_h.iter().collect::<Vec<_>>(), vec!["one.c", "two.h"]);

        let all = list_directory(&dir, &FileFilter::All).expect("list");
        assert_eq!(all.len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(list_directory("/nonexistent/termprobe", &FileFilter::All).is_err());
    }
}
