//! Parallel, deterministic stylesheet discovery with directory pruning.
//!
//! Candidate files are filtered with the same include/exclude matchers the
//! cache applies to imports, so a scan never reports a stylesheet that an
//! import of it would skip.

use crate::settings::Settings;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never worth descending into.
const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "target", "dist", "build"];

/// Checks if a directory entry should be pruned (excluded from traversal).
#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &HashSet<&str>) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.contains(name))
}

/// Collects every stylesheet under `root` that `settings` would process.
///
/// A file `root` is returned as-is when it matches. Results are sorted.
pub fn gather_stylesheets(root: &Path, settings: &Settings) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(if settings.should_process(root) {
            vec![root.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let excludes: HashSet<&str> = EXCLUDED_DIRS.iter().copied().collect();

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e, &excludes))
        .par_bridge()
        .filter_map(|entry| match entry {
            Ok(e) => {
                let path = e.path();
                if e.file_type().is_file() && settings.should_process(path) {
                    Some(Ok(path.to_path_buf()))
                } else {
                    None
                }
            }
            Err(e) => Some(Err(e.into())),
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Failed to gather stylesheets from {}", root.display()))?;

    files.sort();
    Ok(files)
}
