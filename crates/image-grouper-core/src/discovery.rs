use log::{debug, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;

/// Expand files and directories into a sorted list of absolute file paths.
///
/// Directories are searched one level deep unless `search_subfolders` is set.
/// Roots that do not exist are skipped with a warning. Image type is not
/// checked here; undecodable files are dropped later during ingestion.
pub fn collect_files<P: AsRef<Path>>(roots: &[P], config: &Config) -> Vec<PathBuf> {
    let max_depth = if config.search_subfolders {
        usize::MAX
    } else {
        1
    };

    let mut files = BTreeSet::new();
    for root in roots {
        let root = absolutize(root.as_ref());
        if !root.exists() {
            warn!("Skipping missing path: {}", root.display());
            continue;
        }

        for entry in WalkDir::new(&root).max_depth(max_depth).into_iter() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    files.insert(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => debug!("Walk error under {}: {}", root.display(), e),
            }
        }
    }

    let mut files: Vec<PathBuf> = files.into_iter().collect();
    if let Some(limit) = config.max_files {
        if files.len() > limit {
            warn!(
                "Found {} files, only the first {} are used",
                files.len(),
                limit
            );
            files.truncate(limit);
        }
    }
    files
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

// -- Tests --
