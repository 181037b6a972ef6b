use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Content-derived identity of an image file (BLAKE3 digest of its bytes).
///
/// Byte-identical files share an identity; the ordering is the byte order of
/// the digest and is what every deterministic tie-break in the crate uses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Identity of an in-memory buffer
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::from(blake3::hash(data))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl From<blake3::Hash> for Identity {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first 12 digits are plenty to tell identities apart in logs
        write!(f, "Identity({})", &self.to_hex()[..12])
    }
}

impl FromStr for Identity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hash = blake3::Hash::from_hex(s).map_err(|e| format!("invalid identity '{}': {}", s, e))?;
        Ok(Self::from(hash))
    }
}

/// Capture timestamp of an image, with an explicit marker for "unknown"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureTime {
    At(NaiveDateTime),
    /// No usable EXIF date, or one that failed to parse
    Missing,
}

impl CaptureTime {
    /// Parse an EXIF date string (`YYYY:MM:DD HH:MM:SS`)
    pub fn from_exif(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return Self::Missing;
        }
        match NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S") {
            Ok(dt) => Self::At(dt),
            Err(_) => Self::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Absolute distance in seconds, `None` if either side is missing
    pub fn seconds_between(&self, other: &CaptureTime) -> Option<i64> {
        match (self, other) {
            (Self::At(a), Self::At(b)) => Some((*a - *b).num_seconds().abs()),
            _ => None,
        }
    }
}

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `(w - h) / (w + h) * 100`: positive for landscape, negative for
    /// portrait, zero for square (and for a degenerate 0x0 image).
    pub fn shape_ratio(&self) -> f64 {
        let total = self.width as f64 + self.height as f64;
        if total == 0.0 {
            return 0.0;
        }
        (self.width as f64 - self.height as f64) / total * 100.0
    }

    /// Dimensions as an unordered pair, so a rotated copy compares equal
    pub fn unordered(&self) -> (u32, u32) {
        (self.width.min(self.height), self.width.max(self.height))
    }
}

/// Per-condition result: each identity maps to everything it is grouped with.
pub type MatchGroupMap = BTreeMap<Identity, BTreeSet<Identity>>;

/// Output of the merge engine: maximal groups of two or more identities,
/// keyed by an arbitrary member.
pub type FinalGroups = BTreeMap<Identity, BTreeSet<Identity>>;
