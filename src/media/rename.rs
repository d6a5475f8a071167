use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

/// Target for `<prefix><date><ext>` next to `path`, adding `_1`, `_2`, ...
/// until the name is free.
pub fn unique_target(path: &Path, date: NaiveDate, prefix: &str) -> Result<PathBuf> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))?;
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stem = format!("{}{}", prefix, date.format("%Y-%m-%d"));

    let mut candidate = dir.join(format!("{}{}", stem, ext));
    let mut counter = 1;
    while candidate.exists() {
        if candidate == path {
            break;
        }
        candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        counter += 1;
    }
    Ok(candidate)
}

/// Renames `path` to its dated name and returns the new path.
pub fn rename_with_date(path: &Path, date: NaiveDate, prefix: &str) -> Result<PathBuf> {
    let target = unique_target(path, date, prefix)?;
    if target != path {
        fs::rename(path, &target).with_context(|| {
            format!("Failed to rename {} to {}", path.display(), target.display())
        })?;
    }
    Ok(target)
}
