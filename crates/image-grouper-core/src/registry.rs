//! Content identities for files on disk.
//!
//! Every path maps to the BLAKE3 digest of its bytes; byte-identical copies
//! therefore collapse onto one [`Identity`].

use log::{debug, info};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::logging::log_file_error;
use crate::processing::compute_identity;
use crate::processing::progress::batch_progress;
use crate::types::Identity;

/// Result of hashing a batch of files
#[derive(Debug, Default)]
pub struct IdentityScan {
    /// Known and newly computed identities for every readable input path
    pub identities: HashMap<PathBuf, Identity>,
    /// Paths that could not be read
    pub unreadable: Vec<PathBuf>,
}

/// Compute `path → Identity` for `paths`, reusing entries in `known`.
///
/// Runs on the current rayon pool. Unreadable files are listed in the scan
/// rather than failing the batch.
pub fn compute_identities(
    paths: &[PathBuf],
    known: &HashMap<PathBuf, Identity>,
    show_progress: bool,
) -> IdentityScan {
    let mut scan = IdentityScan::default();

    let mut pending = Vec::new();
    for path in paths {
        match known.get(path) {
            Some(identity) => {
                scan.identities.insert(path.clone(), *identity);
            }
            None => pending.push(path),
        }
    }
    debug!(
        "{} identities reused, {} files to hash",
        scan.identities.len(),
        pending.len()
    );

    let progress = batch_progress(pending.len(), "Hashing file contents...", show_progress);
    let results: Vec<_> = pending
        .par_iter()
        .map(|path| {
            let result = compute_identity(path);
            progress.inc(1);
            (*path, result)
        })
        .collect();
    progress.finish_and_clear();

    for (path, result) in results {
        match result {
            Ok(identity) => {
                scan.identities.insert(path.clone(), identity);
            }
            Err(e) => {
                log_file_error(path, "hash", &e);
                scan.unreadable.push(path.clone());
            }
        }
    }
    scan.unreadable.sort();

    // Also keep entries from `known` that this batch did not mention
    for (path, identity) in known {
        scan.identities.entry(path.clone()).or_insert(*identity);
    }

    info!(
        "Identified {} files ({} unreadable)",
        scan.identities.len(),
        scan.unreadable.len()
    );
    scan
}

/// Reverse index: every identity with its paths in sorted order
pub fn paths_by_identity(identities: &HashMap<PathBuf, Identity>) -> BTreeMap<Identity, Vec<PathBuf>> {
    let mut index: BTreeMap<Identity, Vec<PathBuf>> = BTreeMap::new();
    for (path, identity) in identities {
        index.entry(*identity).or_default().push(path.clone());
    }
    for paths in index.values_mut() {
        paths.sort();
    }
    index
}
