//! Fixtures shared by the unit tests.

use crate::attributes::{AttributeProvider, ExifInfo, ImageRecord};
use crate::types::{CaptureTime, Dimensions, Identity};

/// Identity whose ordering follows `n`
pub fn identity(n: u8) -> Identity {
    Identity::from_bytes([n; 32])
}

/// One image description: identity number, EXIF and pixel size
#[derive(Debug)]
pub struct Photo {
    pub id: u8,
    pub exif: ExifInfo,
    pub dimensions: Dimensions,
}

impl Photo {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            exif: ExifInfo::default(),
            dimensions: Dimensions::new(300, 200),
        }
    }

    pub fn model(mut self, model: &str) -> Self {
        self.exif.camera_model = model.to_string();
        self
    }

    pub fn taken(mut self, time: &str) -> Self {
        self.exif.capture_time = CaptureTime::from_exif(time);
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Dimensions::new(width, height);
        self
    }
}

/// Provider holding one record per photo, no files on disk
pub fn provider_with(photos: Vec<Photo>) -> AttributeProvider {
    let mut provider = AttributeProvider::new();
    for photo in photos {
        let record = ImageRecord::with_exif(
            format!("/photos/{:03}.jpg", photo.id),
            photo.dimensions,
            photo.exif,
        );
        provider.insert(identity(photo.id), record);
    }
    provider
}
