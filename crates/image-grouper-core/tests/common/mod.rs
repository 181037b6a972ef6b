//! Synthetic test images written into temporary directories.
#![allow(dead_code)]

use image::{Rgb, RgbImage};
use image_grouper_core::Config;
use std::path::{Path, PathBuf};

/// Left-to-right luminance ramp (right-to-left when `reversed`)
pub fn ramp(width: u32, height: u32, reversed: bool) -> RgbImage {
    RgbImage::from_fn(width, height, |x, _| {
        let pos = if reversed { width - 1 - x } else { x };
        let level = (pos * 255 / (width - 1)) as u8;
        Rgb([level, level, level])
    })
}

/// Single-colour image
pub fn flat(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}

/// Save `img` as PNG under `dir`
pub fn save(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// Config without a disk cache, safe to run in parallel tests
pub fn test_config() -> Config {
    Config {
        use_cache: false,
        cache_path: None,
        threads: 2,
        ..Config::default()
    }
}

/// Config with the hash cache at `db`
pub fn cached_config(db: &Path) -> Config {
    Config {
        use_cache: true,
        cache_path: Some(db.to_path_buf()),
        threads: 2,
        ..Config::default()
    }
}
