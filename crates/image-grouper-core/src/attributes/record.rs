use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::exif::{read_exif, ExifInfo};
use crate::processing::{HashMethod, HashValue};
use crate::types::Dimensions;

/// One image file on disk. Several records share an identity when their
/// files are byte-identical.
#[derive(Debug)]
pub struct ImageRecord {
    path: PathBuf,
    dimensions: Dimensions,
    exif: OnceCell<ExifInfo>,
    hashes: HashMap<HashMethod, HashValue>,
    active: bool,
}

impl ImageRecord {
    /// Record whose EXIF metadata is read from `path` on first access
    pub fn new(path: impl Into<PathBuf>, dimensions: Dimensions) -> Self {
        Self {
            path: path.into(),
            dimensions,
            exif: OnceCell::new(),
            hashes: HashMap::new(),
            active: true,
        }
    }

    /// Record with metadata supplied up front
    pub fn with_exif(path: impl Into<PathBuf>, dimensions: Dimensions, exif: ExifInfo) -> Self {
        let record = Self::new(path, dimensions);
        // A fresh cell is always empty
        let _ = record.exif.set(exif);
        record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn exif(&self) -> &ExifInfo {
        self.exif.get_or_init(|| read_exif(&self.path))
    }

    /// Whether the EXIF metadata has been read (or supplied)
    pub fn has_exif(&self) -> bool {
        self.exif.get().is_some()
    }

    pub fn camera_model(&self) -> &str {
        &self.exif().camera_model
    }

    pub fn hash(&self, method: HashMethod) -> Option<&HashValue> {
        self.hashes.get(&method)
    }

    pub(crate) fn set_hash(&mut self, method: HashMethod, value: HashValue) {
        self.hashes.insert(method, value);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
