// Batch-computed attributes: content identities and perceptual hashes
mod cryptographic;
pub mod perceptual;
pub mod progress;
pub mod types;

// Expose identity computation
pub use cryptographic::compute_identity;

// Expose perceptual hash
pub use perceptual::{compute_hash, hash_from_file};
pub use types::{hue_distance, ColorSpace, HashMethod, HashShape, HashValue};
