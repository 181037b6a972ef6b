//! # Perceptual Hashing Module
//!
//! Fingerprints that stay close for visually similar images. Two families:
//!
//! 1. Gradient hashes (dHash): the image is shrunk to a 9x8 luminance grid and
//!    each bit records whether a pixel is brighter than its left neighbour.
//!    `Vertical` does the same on the image rotated a quarter turn. The result
//!    is one 64-bit value; similarity is the Hamming distance.
//! 2. Colour hashes: the image is resampled to 100x100, converted to HSV, RGB
//!    or luminosity, and for one whole-image region (or five overlapping
//!    regions) each channel is summarised by its median and inter-quartile
//!    range. The result is a short vector of 0-255 values.
//!
//! ## Hamming Distance Interpretation (gradient hashes)
//!
//! - 0-5: Nearly identical images
//! - 6-14: Same scene, some edits or re-encoding
//! - >20: Different images

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use std::path::Path;

use super::types::{ColorSpace, HashMethod, HashValue};
use crate::error::Result;

/// Region covering the whole image, as fractions (left, top, right, bottom)
const ONE_BOX: [(f64, f64, f64, f64); 1] = [(0.0, 0.0, 1.0, 1.0)];

/// Side of the five sampling squares; picked so overlap and unsampled area
/// are roughly equal
const FIVE_BOX_SIZE: f64 = 0.46;

const FIVE_BOXES: [(f64, f64, f64, f64); 5] = [
    (0.0, 0.0, FIVE_BOX_SIZE, FIVE_BOX_SIZE),
    (0.0, 1.0 - FIVE_BOX_SIZE, FIVE_BOX_SIZE, 1.0),
    (1.0 - FIVE_BOX_SIZE, 0.0, 1.0, FIVE_BOX_SIZE),
    (1.0 - FIVE_BOX_SIZE, 1.0 - FIVE_BOX_SIZE, 1.0, 1.0),
    (
        0.5 - FIVE_BOX_SIZE / 2.0,
        0.5 - FIVE_BOX_SIZE / 2.0,
        0.5 + FIVE_BOX_SIZE / 2.0,
        0.5 + FIVE_BOX_SIZE / 2.0,
    ),
];

const COLOR_SAMPLE_SIZE: u32 = 100;

/// Compute the hash of `method` for a decoded image
pub fn compute_hash(img: &DynamicImage, method: HashMethod) -> HashValue {
    match method {
        HashMethod::Horizontal => HashValue::Bits(dhash(img, false)),
        HashMethod::Vertical => HashValue::Bits(dhash(img, true)),
        _ => {
            let (space, regions) = method.color_layout().unwrap_or((ColorSpace::Hsv, 1));
            HashValue::Vector(color_hash(img, space, regions))
        }
    }
}

/// Decode an image file and compute the hash of `method`
pub fn hash_from_file<P: AsRef<Path>>(
    path: P,
    method: HashMethod,
) -> Result<HashValue> {
    let img = image::open(path)?;
    Ok(compute_hash(&img, method))
}

/// Difference hash: bit `x` of row `y` is set when pixel `x + 1` is brighter than pixel `x`
fn dhash(img: &DynamicImage, vertical: bool) -> u64 {
    let gray = img.to_luma8();
    let grid: GrayImage = if vertical {
        let tall = imageops::resize(&gray, 8, 9, FilterType::Triangle);
        imageops::rotate270(&tall)
    } else {
        imageops::resize(&gray, 9, 8, FilterType::Triangle)
    };

    let mut hash: u64 = 0;
    for y in 0..8u32 {
        for x in 0..8u32 {
            let left = grid.get_pixel(x, y)[0];
            let right = grid.get_pixel(x + 1, y)[0];
            if right > left {
                hash |= 1u64 << (y * 8 + x);
            }
        }
    }
    hash
}

/// Median and spread per channel per region
fn color_hash(img: &DynamicImage, space: ColorSpace, regions: usize) -> Vec<u8> {
    let sample = img.resize_exact(COLOR_SAMPLE_SIZE, COLOR_SAMPLE_SIZE, FilterType::Triangle);
    let channels = split_channels(&sample, space);
    let (width, height) = (sample.width(), sample.height());

    let boxes: &[(f64, f64, f64, f64)] = if regions == 5 { &FIVE_BOXES } else { &ONE_BOX };

    let mut values = Vec::with_capacity(boxes.len() * channels.len() * 2);
    for &frac_box in boxes {
        for (idx, channel) in channels.iter().enumerate() {
            let data = sub_region(channel, width, height, frac_box);
            if data.is_empty() {
                values.extend_from_slice(&[0, 0]);
                continue;
            }
            if space == ColorSpace::Hsv && idx == 0 {
                // Hue is cyclic: measure the spread after centring on the median
                let median = quantile(&data, 0.5);
                let rotated: Vec<u8> = data
                    .iter()
                    .map(|&h| ((h as i32 - median as i32 + 128).rem_euclid(256)) as u8)
                    .collect();
                values.push(median);
                values.push(quantile(&rotated, 0.75) - quantile(&rotated, 0.25));
            } else {
                values.push(quantile(&data, 0.5));
                values.push(quantile(&data, 0.75) - quantile(&data, 0.25));
            }
        }
    }
    values
}

/// One `width * height` plane of 0-255 values per channel
fn split_channels(img: &DynamicImage, space: ColorSpace) -> Vec<Vec<u8>> {
    match space {
        ColorSpace::Luminosity => vec![img.to_luma8().into_raw()],
        ColorSpace::Rgb | ColorSpace::Hsv => {
            let rgb = img.to_rgb8();
            let mut planes = vec![Vec::with_capacity(rgb.len() / 3); 3];
            for pixel in rgb.pixels() {
                let [r, g, b] = pixel.0;
                let out = if space == ColorSpace::Hsv {
                    rgb_to_hsv(r, g, b)
                } else {
                    [r, g, b]
                };
                for (plane, value) in planes.iter_mut().zip(out) {
                    plane.push(value);
                }
            }
            planes
        }
    }
}

/// RGB to HSV with every component scaled to 0-255
pub(crate) fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max * 255.0 };
    let h = if delta == 0.0 {
        0.0
    } else {
        let sector = if max == rf {
            ((gf - bf) / delta).rem_euclid(6.0)
        } else if max == gf {
            (bf - rf) / delta + 2.0
        } else {
            (rf - gf) / delta + 4.0
        };
        sector / 6.0 * 256.0
    };

    [
        (h.round() as i32).rem_euclid(256) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    ]
}

/// Values of a plane inside a fractional box
fn sub_region(plane: &[u8], width: u32, height: u32, frac_box: (f64, f64, f64, f64)) -> Vec<u8> {
    let (w, h) = (width as f64, height as f64);
    let left = (w * frac_box.0).round() as u32;
    let top = (h * frac_box.1).round() as u32;
    let right = ((w * frac_box.2).round() as u32).min(width);
    let bottom = ((h * frac_box.3).round() as u32).min(height);

    let mut out = Vec::with_capacity(((right - left) * (bottom - top)) as usize);
    for y in top..bottom {
        let row = (y * width) as usize;
        out.extend_from_slice(&plane[row + left as usize..row + right as usize]);
    }
    out
}

/// Quick nearest-rank quantile; `data` must be non-empty
fn quantile(data: &[u8], q: f64) -> u8 {
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let idx = ((sorted.len() as f64) * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
