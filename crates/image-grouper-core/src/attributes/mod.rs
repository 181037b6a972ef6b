//! Per-identity attributes consumed by the grouping conditions.
//!
//! Dimensions are read at ingest. EXIF is read lazily per record, or up front
//! in a batch when a metadata condition prepares. Perceptual
//! hashes are computed in batches on the rayon pool, consulting the optional
//! persistent [`HashCache`] first. Conditions only ever read through the
//! accessors here; the provider is the sole writer of its records.

mod exif;
mod record;

pub use exif::{read_exif, ExifInfo};
pub use record::ImageRecord;

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::logging::log_hash_error;
use crate::persistence::HashCache;
use crate::processing::progress::batch_progress;
use crate::processing::{hash_from_file, HashMethod, HashValue};
use crate::types::{CaptureTime, Dimensions, Identity};

/// Dimensions of a decodable image, `None` for anything else
pub fn read_dimensions(path: &Path) -> Option<Dimensions> {
    match image::image_dimensions(path) {
        Ok((width, height)) => Some(Dimensions::new(width, height)),
        Err(e) => {
            debug!("Not an image: {} ({})", path.display(), e);
            None
        }
    }
}

/// Whether `path` can be opened as an image
pub fn is_image(path: &Path) -> bool {
    read_dimensions(path).is_some()
}

/// Outcome of adding files to the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Files accepted as images
    pub images: usize,
    /// Files that could not be decoded
    pub skipped: usize,
}

/// Where the values of one `ensure_hashes` call came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashBatchReport {
    /// Already held in memory
    pub cached: usize,
    /// Loaded from the persistent cache
    pub from_store: usize,
    /// Computed from the image files
    pub computed: usize,
    /// Could not be computed (now or in an earlier batch)
    pub failed: usize,
}

/// Owner of every image record, keyed by identity
#[derive(Default)]
pub struct AttributeProvider {
    records: BTreeMap<Identity, Vec<ImageRecord>>,
    cache: Option<Box<dyn HashCache>>,
    failed: BTreeSet<(Identity, HashMethod)>,
    pool: Option<Arc<ThreadPool>>,
    show_progress: bool,
}

impl AttributeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult and fill `cache` when hashes are computed
    pub fn with_cache(mut self, cache: Box<dyn HashCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Run batch work on `pool` instead of the global rayon pool
    pub fn with_thread_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn set_show_progress(&mut self, show: bool) {
        self.show_progress = show;
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    fn run_batch<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Add a record for every new path in `identities` that decodes as an image
    pub fn ingest(&mut self, identities: &HashMap<PathBuf, Identity>) -> IngestReport {
        let known: HashSet<&Path> = self
            .records
            .values()
            .flatten()
            .map(|record| record.path())
            .collect();

        let candidates: Vec<(&PathBuf, &Identity)> = identities
            .iter()
            .filter(|(path, _)| !known.contains(path.as_path()))
            .collect();

        let progress = batch_progress(candidates.len(), "Reading images...", self.show_progress);
        let mut scanned: Vec<(PathBuf, Identity, Option<Dimensions>)> = self.run_batch(|| {
            candidates
                .par_iter()
                .map(|(path, identity)| {
                    let dims = read_dimensions(path);
                    progress.inc(1);
                    ((*path).clone(), **identity, dims)
                })
                .collect()
        });
        progress.finish_and_clear();
        drop(known);

        // Keep record order independent of thread scheduling
        scanned.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = IngestReport::default();
        for (path, identity, dims) in scanned {
            match dims {
                Some(dims) => {
                    self.insert(identity, ImageRecord::new(path, dims));
                    report.images += 1;
                }
                None => report.skipped += 1,
            }
        }

        info!(
            "Ingested {} images ({} files skipped as unreadable)",
            report.images, report.skipped
        );
        report
    }

    /// Add one record under `identity`
    pub fn insert(&mut self, identity: Identity, record: ImageRecord) {
        let records = self.records.entry(identity).or_default();
        // A late copy inherits hashes already known for this content
        let mut record = record;
        if let Some(first) = records.first() {
            for method in HashMethod::ALL {
                if let Some(value) = first.hash(method) {
                    record.set_hash(method, value.clone());
                }
            }
        }
        records.push(record);
        records.sort_by(|a, b| a.path().cmp(b.path()));
    }

    /// Forget every record; the cache and the pool stay
    pub fn clear(&mut self) {
        self.records.clear();
        self.failed.clear();
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.records.contains_key(identity)
    }

    /// Number of distinct identities
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.records.keys()
    }

    /// All records of an identity, sorted by path
    pub fn records(&self, identity: &Identity) -> &[ImageRecord] {
        self.records
            .get(identity)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    fn first(&self, identity: &Identity) -> Option<&ImageRecord> {
        self.records.get(identity).and_then(|records| records.first())
    }

    pub fn first_path(&self, identity: &Identity) -> Option<&Path> {
        self.first(identity).map(|record| record.path())
    }

    /// Identities with at least one visible record
    pub fn active_identities(&self) -> BTreeSet<Identity> {
        self.records
            .iter()
            .filter(|(_, records)| records.iter().any(|record| record.is_active()))
            .map(|(identity, _)| *identity)
            .collect()
    }

    /// Hide or show every file of an identity; false if the identity is unknown
    pub fn set_hidden(&mut self, identity: &Identity, hidden: bool) -> bool {
        match self.records.get_mut(identity) {
            Some(records) => {
                for record in records.iter_mut() {
                    record.set_active(!hidden);
                }
                true
            }
            None => false,
        }
    }

    /// Forget the record for `path` (the file was moved or deleted)
    pub fn remove_path(&mut self, path: &Path) -> Option<Identity> {
        let identity = self
            .records
            .iter()
            .find(|(_, records)| records.iter().any(|record| record.path() == path))
            .map(|(identity, _)| *identity)?;

        if let Some(records) = self.records.get_mut(&identity) {
            records.retain(|record| record.path() != path);
            if records.is_empty() {
                self.records.remove(&identity);
            }
        }
        Some(identity)
    }

    /// Camera model, empty when there is no camera metadata
    pub fn camera_model(&self, identity: &Identity) -> &str {
        self.first(identity)
            .map(|record| record.camera_model())
            .unwrap_or("")
    }

    pub fn capture_time(&self, identity: &Identity) -> CaptureTime {
        self.first(identity)
            .map(|record| record.exif().capture_time)
            .unwrap_or(CaptureTime::Missing)
    }

    pub fn dimensions(&self, identity: &Identity) -> Option<Dimensions> {
        self.first(identity).map(|record| record.dimensions())
    }

    /// See [`Dimensions::shape_ratio`]
    pub fn shape_ratio(&self, identity: &Identity) -> f64 {
        self.dimensions(identity)
            .map(|dims| dims.shape_ratio())
            .unwrap_or(0.0)
    }

    /// Hash value if it has been computed; call [`ensure_hashes`] first
    ///
    /// [`ensure_hashes`]: AttributeProvider::ensure_hashes
    pub fn hash_value(&self, identity: &Identity, method: HashMethod) -> Option<&HashValue> {
        self.first(identity).and_then(|record| record.hash(method))
    }

    /// Store a hash value on every record of `identity`
    pub fn set_hash(&mut self, identity: &Identity, method: HashMethod, value: HashValue) {
        if let Some(records) = self.records.get_mut(identity) {
            for record in records.iter_mut() {
                record.set_hash(method, value.clone());
            }
        }
    }

    /// Read the EXIF metadata of every record that has not been read yet.
    ///
    /// The reads run on the worker pool, so that conditions comparing
    /// capture times or camera models never touch the disk while judging.
    pub fn ensure_exif(&self) -> usize {
        let pending: Vec<&ImageRecord> = self
            .records
            .values()
            .flatten()
            .filter(|record| !record.has_exif())
            .collect();
        if pending.is_empty() {
            return 0;
        }

        let progress = batch_progress(pending.len(), "Reading metadata...", self.show_progress);
        self.run_batch(|| {
            pending.par_iter().for_each(|record| {
                record.exif();
                progress.inc(1);
            })
        });
        progress.finish_and_clear();

        debug!("Read EXIF metadata for {} files", pending.len());
        pending.len()
    }

    /// Make sure every identity has a value for `method`.
    ///
    /// Values come from memory, then the persistent cache, then a parallel
    /// batch over the image files. Files that fail to hash are logged and
    /// left without a value; they are not retried on later calls.
    pub fn ensure_hashes(&mut self, method: HashMethod) -> HashBatchReport {
        let mut report = HashBatchReport::default();

        let mut missing: Vec<(Identity, PathBuf)> = Vec::new();
        for (identity, records) in &self.records {
            let Some(first) = records.first() else {
                continue;
            };
            if first.hash(method).is_some() {
                report.cached += 1;
            } else if self.failed.contains(&(*identity, method)) {
                report.failed += 1;
            } else {
                missing.push((*identity, first.path().to_path_buf()));
            }
        }

        let mut found: Vec<(Identity, HashValue)> = Vec::new();
        if let Some(cache) = &self.cache {
            missing.retain(|(identity, _)| match cache.get(identity, method) {
                Some(value) => {
                    found.push((*identity, value));
                    false
                }
                None => true,
            });
        }
        report.from_store = found.len();

        if !missing.is_empty() {
            info!("Computing {} hashes for {} images", method, missing.len());
            let progress =
                batch_progress(missing.len(), "Computing image hashes...", self.show_progress);
            let results: Vec<_> = self.run_batch(|| {
                missing
                    .par_iter()
                    .map(|(identity, path)| {
                        let result = hash_from_file(path, method);
                        progress.inc(1);
                        (*identity, path, result)
                    })
                    .collect()
            });
            progress.finish_and_clear();

            let mut computed = Vec::with_capacity(results.len());
            for (identity, path, result) in results {
                match result {
                    Ok(value) => computed.push((identity, value)),
                    Err(e) => {
                        log_hash_error(path, method.name(), &e);
                        self.failed.insert((identity, method));
                        report.failed += 1;
                    }
                }
            }
            report.computed = computed.len();

            if let Some(cache) = self.cache.as_mut() {
                if let Err(e) = cache.set_many(&computed, method) {
                    warn!("Hash cache unavailable, continuing in memory: {}", e);
                    self.cache = None;
                }
            }
            found.extend(computed);
        }

        for (identity, value) in found {
            self.set_hash(&identity, method, value);
        }

        debug!("{} hashes: {:?}", method, report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryHashCache, PersistenceError, PersistenceResult};
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn record(name: &str, model: &str) -> ImageRecord {
        ImageRecord::with_exif(
            format!("/photos/{}", name),
            Dimensions::new(300, 200),
            ExifInfo {
                camera_model: model.to_string(),
                ..ExifInfo::default()
            },
        )
    }

    #[test]
    fn test_duplicates_share_one_identity() {
        let mut provider = AttributeProvider::new();
        let id = Identity::of_bytes(b"same bytes");
        provider.insert(id, record("b.jpg", "X"));
        provider.insert(id, record("a.jpg", "X"));

        assert_eq!(provider.len(), 1);
        assert_eq!(provider.records(&id).len(), 2);
        assert_eq!(provider.first_path(&id), Some(Path::new("/photos/a.jpg")));
    }

    #[test]
    fn test_hidden_identities_leave_the_universe() {
        let mut provider = AttributeProvider::new();
        let a = Identity::of_bytes(b"a");
        let b = Identity::of_bytes(b"b");
        provider.insert(a, record("a.jpg", ""));
        provider.insert(b, record("b.jpg", ""));

        assert!(provider.set_hidden(&a, true));
        assert_eq!(provider.active_identities(), BTreeSet::from([b]));
        assert!(provider.set_hidden(&a, false));
        assert_eq!(provider.active_identities().len(), 2);
        assert!(!provider.set_hidden(&Identity::of_bytes(b"c"), true));
    }

    #[test]
    fn test_remove_path() {
        let mut provider = AttributeProvider::new();
        let id = Identity::of_bytes(b"dup");
        provider.insert(id, record("a.jpg", ""));
        provider.insert(id, record("b.jpg", ""));

        assert_eq!(provider.remove_path(Path::new("/photos/a.jpg")), Some(id));
        assert!(provider.contains(&id));
        assert_eq!(provider.remove_path(Path::new("/photos/b.jpg")), Some(id));
        assert!(!provider.contains(&id));
        assert_eq!(provider.remove_path(Path::new("/photos/b.jpg")), None);
    }

    #[test]
    fn test_accessor_defaults_for_unknown_identity() {
        let provider = AttributeProvider::new();
        let id = Identity::of_bytes(b"nobody");
        assert_eq!(provider.camera_model(&id), "");
        assert!(provider.capture_time(&id).is_missing());
        assert_eq!(provider.shape_ratio(&id), 0.0);
        assert!(provider.hash_value(&id, HashMethod::Horizontal).is_none());
    }

    #[test]
    fn test_ensure_hashes_computes_caches_and_skips_failures() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbImage::from_pixel(40, 30, Rgb([200, 10, 10]))
            .save(&good)
            .unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not really a png").unwrap();

        let good_id = Identity::of_bytes(b"good");
        let broken_id = Identity::of_bytes(b"broken");
        let mut provider = AttributeProvider::new().with_cache(Box::new(MemoryHashCache::new()));
        provider.insert(good_id, ImageRecord::new(&good, Dimensions::new(40, 30)));
        provider.insert(broken_id, ImageRecord::new(&broken, Dimensions::new(40, 30)));

        let report = provider.ensure_hashes(HashMethod::Rgb);
        assert_eq!(report.computed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(
            provider.hash_value(&good_id, HashMethod::Rgb),
            Some(&HashValue::Vector(vec![200, 0, 10, 0, 10, 0]))
        );
        assert!(provider.hash_value(&broken_id, HashMethod::Rgb).is_none());

        // Second call finds everything settled
        let report = provider.ensure_hashes(HashMethod::Rgb);
        assert_eq!(report.cached, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.computed, 0);
    }

    #[test]
    fn test_ensure_hashes_prefers_the_store() {
        let mut store = MemoryHashCache::new();
        let id = Identity::of_bytes(b"stored");
        store
            .set_many(&[(id, HashValue::Bits(99))], HashMethod::Vertical)
            .unwrap();

        // The path does not exist: only the store can supply the value
        let mut provider = AttributeProvider::new().with_cache(Box::new(store));
        provider.insert(id, ImageRecord::new("/nowhere/x.png", Dimensions::new(1, 1)));

        let report = provider.ensure_hashes(HashMethod::Vertical);
        assert_eq!(report.from_store, 1);
        assert_eq!(report.computed, 0);
        assert_eq!(
            provider.hash_value(&id, HashMethod::Vertical),
            Some(&HashValue::Bits(99))
        );
    }

    /// Accepts reads but refuses every write
    struct ReadOnlyCache;

    impl HashCache for ReadOnlyCache {
        fn get(&self, _identity: &Identity, _method: HashMethod) -> Option<HashValue> {
            None
        }

        fn set_many(
            &mut self,
            _entries: &[(Identity, HashValue)],
            _method: HashMethod,
        ) -> PersistenceResult<()> {
            Err(PersistenceError::Initialization("database is read-only".to_string()))
        }
    }

    #[test]
    fn test_unwritable_cache_is_dropped_for_the_session() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flat.png");
        RgbImage::from_pixel(16, 16, Rgb([90, 90, 90]))
            .save(&path)
            .unwrap();

        let id = Identity::of_bytes(b"flat");
        let mut provider = AttributeProvider::new().with_cache(Box::new(ReadOnlyCache));
        provider.insert(id, ImageRecord::new(&path, Dimensions::new(16, 16)));
        assert!(provider.has_cache());

        let report = provider.ensure_hashes(HashMethod::Horizontal);
        assert_eq!(report.computed, 1);
        assert_eq!(report.failed, 0);
        assert!(!provider.has_cache());
        assert_eq!(
            provider.hash_value(&id, HashMethod::Horizontal),
            Some(&HashValue::Bits(0))
        );
    }

    /// Minimal TIFF container whose only EXIF field is the camera model
    fn write_exif_file(path: &Path, model: &str) {
        use ::exif::experimental::Writer;
        use ::exif::{Field, In, Tag, Value};

        let field = Field {
            tag: Tag::Model,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![model.as_bytes().to_vec()]),
        };
        let mut writer = Writer::new();
        writer.push_field(&field);
        let mut buffer = std::io::Cursor::new(Vec::new());
        writer.write(&mut buffer, false).unwrap();
        std::fs::write(path, buffer.into_inner()).unwrap();
    }

    #[test]
    fn test_ensure_exif_reads_metadata_up_front() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("camera.tif");
        write_exif_file(&path, "X100");

        let id = Identity::of_bytes(b"camera");
        let mut provider = AttributeProvider::new();
        provider.insert(id, ImageRecord::new(&path, Dimensions::new(8, 8)));

        assert_eq!(provider.ensure_exif(), 1);
        // Later lookups are served from memory
        std::fs::remove_file(&path).unwrap();
        assert_eq!(provider.camera_model(&id), "X100");
        assert_eq!(provider.ensure_exif(), 0);
    }

    #[test]
    fn test_ingest_skips_non_images() {
        let dir = tempdir().unwrap();
        let png = dir.path().join("pic.png");
        RgbImage::from_pixel(20, 10, Rgb([1, 2, 3])).save(&png).unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"hello").unwrap();

        let identities = HashMap::from([
            (png.clone(), Identity::of_bytes(b"png")),
            (txt.clone(), Identity::of_bytes(b"txt")),
        ]);

        let mut provider = AttributeProvider::new();
        let report = provider.ingest(&identities);
        assert_eq!(report, IngestReport { images: 1, skipped: 1 });
        assert_eq!(
            provider.dimensions(&Identity::of_bytes(b"png")),
            Some(Dimensions::new(20, 10))
        );

        // Already-known paths are not read again
        let report = provider.ingest(&identities);
        assert_eq!(report, IngestReport { images: 0, skipped: 1 });
    }
}
