//! Core functionality for grouping similar images.
//!
//! This library provides the building blocks of the grouping engine:
//! - File discovery and content identities
//! - Per-image attributes (EXIF, dimensions, perceptual hashes)
//! - Pluggable similarity conditions with memoized match groups
//! - Merging of condition results into maximal groups

// -- External Dependencies --

use log::{info, warn};
use rayon::ThreadPool;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod attributes;
pub mod conditions;
pub mod config;
pub mod discovery;
pub mod logging;
pub mod merge;
pub mod persistence;
pub mod processing;
pub mod registry;
pub mod types;

// -- Test Modules --
#[cfg(test)]
pub mod test_utils;

use attributes::AttributeProvider;
use conditions::{Condition, ConditionSet};
use merge::Contribution;
use persistence::{HashCache, MemoryHashCache, SqliteHashCache};

/// Counts from one `load` or `add`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Files found under the given roots
    pub files: usize,
    /// Files accepted as images
    pub images: usize,
    /// Files that were unreadable or not images
    pub skipped: usize,
    /// Images that are byte-identical copies of another image in the batch
    pub duplicates: usize,
}

/// Result of a recomputation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// No condition is active: every visible identity, ordered by file name
    Unfiltered(Vec<Identity>),
    /// Maximal groups of two or more identities
    Groups(FinalGroups),
}

/// Main entry point: owns the images, the conditions and the worker pool
pub struct ImageGrouper {
    config: Config,
    pool: Arc<ThreadPool>,
    identities: HashMap<PathBuf, Identity>,
    provider: AttributeProvider,
    conditions: ConditionSet,
}

impl ImageGrouper {
    /// Create a grouper with the provided configuration.
    ///
    /// An unusable hash cache is not fatal: hashes are then kept in memory
    /// for the session.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads())
            .thread_name(|i| format!("grouper-worker-{}", i))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build thread pool: {}", e)))?;
        let pool = Arc::new(pool);

        let mut provider = AttributeProvider::new()
            .with_cache(open_cache(&config))
            .with_thread_pool(Arc::clone(&pool));
        provider.set_show_progress(config.show_progress);

        Ok(Self {
            config,
            pool,
            identities: HashMap::new(),
            provider,
            conditions: ConditionSet::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &AttributeProvider {
        &self.provider
    }

    /// Replace the current images with those found under `roots`
    pub fn load<P: AsRef<Path>>(&mut self, roots: &[P]) -> Result<LoadReport> {
        self.provider.clear();
        self.add(roots)
    }

    /// Add the images found under `roots` to the current ones
    pub fn add<P: AsRef<Path>>(&mut self, roots: &[P]) -> Result<LoadReport> {
        let files = discovery::collect_files(roots, &self.config);
        info!("Found {} files", files.len());

        let known = &self.identities;
        let show_progress = self.config.show_progress;
        let scan = self
            .pool
            .install(|| registry::compute_identities(&files, known, show_progress));

        let batch: HashMap<PathBuf, Identity> = files
            .iter()
            .filter_map(|path| scan.identities.get(path).map(|id| (path.clone(), *id)))
            .collect();
        let ingest = self.provider.ingest(&batch);
        self.identities = scan.identities;

        let duplicates = registry::paths_by_identity(&batch)
            .iter()
            .filter(|(identity, _)| self.provider.contains(identity))
            .map(|(_, paths)| paths.len() - 1)
            .sum();

        let report = LoadReport {
            files: files.len(),
            images: ingest.images,
            skipped: ingest.skipped + scan.unreadable.len(),
            duplicates,
        };
        info!(
            "Loaded {} images from {} files ({} skipped, {} exact copies)",
            report.images, report.files, report.skipped, report.duplicates
        );
        Ok(report)
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    /// Typed access to every condition's parameters
    pub fn conditions_mut(&mut self) -> &mut ConditionSet {
        &mut self.conditions
    }

    /// Condition by machine name, e.g. `"cameramodel"`
    pub fn condition_mut(&mut self, name: &str) -> Option<&mut dyn Condition> {
        self.conditions.get_mut(name)
    }

    /// Exclude every file of `identity` from grouping
    pub fn hide(&mut self, identity: &Identity) -> Result<()> {
        if self.provider.set_hidden(identity, true) {
            Ok(())
        } else {
            Err(Error::UnknownIdentity(*identity))
        }
    }

    /// Forget a file that was moved or deleted outside the grouper
    pub fn remove_path(&mut self, path: &Path) -> Option<Identity> {
        self.identities.remove(path);
        self.provider.remove_path(path)
    }

    /// Identities with at least one visible file
    pub fn active_identities(&self) -> BTreeSet<Identity> {
        self.provider.active_identities()
    }

    /// Run every active condition over the visible identities and merge
    pub fn recompute(&mut self) -> Result<Grouping> {
        let universe = self.provider.active_identities();

        if !self.conditions.any_active() {
            let mut unfiltered: Vec<Identity> = universe.into_iter().collect();
            unfiltered.sort_by(|a, b| {
                self.provider
                    .first_path(a)
                    .cmp(&self.provider.first_path(b))
            });
            return Ok(Grouping::Unfiltered(unfiltered));
        }

        let mut contributions = Vec::new();
        for condition in self.conditions.iter_mut() {
            if !condition.is_active() {
                continue;
            }
            let must_match = condition.must_match();
            let name = condition.name();
            let groups = condition.compute_match_groups(&universe, &mut self.provider)?;
            info!("{}: {} identities in match groups", name, groups.len());
            contributions.push(Contribution { groups, must_match });
        }

        Ok(Grouping::Groups(merge::merge_groups(&contributions)))
    }

    /// All file paths of one identity, sorted
    pub fn paths(&self, identity: &Identity) -> Vec<PathBuf> {
        self.provider
            .records(identity)
            .iter()
            .map(|record| record.path().to_path_buf())
            .collect()
    }

    /// Groups as file paths in display order: each group sorted, groups
    /// ordered by their first path
    pub fn group_paths(&self, groups: &FinalGroups) -> Vec<Vec<PathBuf>> {
        let mut listed: Vec<Vec<PathBuf>> = groups
            .values()
            .map(|members| {
                let mut paths: Vec<PathBuf> =
                    members.iter().flat_map(|id| self.paths(id)).collect();
                paths.sort();
                paths
            })
            .filter(|paths| !paths.is_empty())
            .collect();
        listed.sort();
        listed
    }
}

fn open_cache(config: &Config) -> Box<dyn HashCache> {
    match (&config.cache_path, config.use_cache) {
        (Some(path), true) => match SqliteHashCache::open(path) {
            Ok(cache) => Box::new(cache),
            Err(e) => {
                warn!(
                    "Hash cache at {} unavailable, keeping hashes in memory: {}",
                    path.display(),
                    e
                );
                Box::new(MemoryHashCache::new())
            }
        },
        _ => Box::new(MemoryHashCache::new()),
    }
}
