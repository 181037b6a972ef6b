/// Content hashing that turns a file into its `Identity`
use crate::error::Result;
use crate::types::Identity;

use std::{fs::File, io::Read, path::Path};

/// Compute the content identity of a file using the Blake3 algorithm
pub fn compute_identity<P: AsRef<Path>>(path: P) -> Result<Identity> {
    // Open the file with explicit scope to ensure it's closed promptly
    let hash = {
        let mut file = File::open(&path)?;

        let mut hasher = blake3::Hasher::new();

        // Read the file in chunks and update the hasher
        let mut buffer = [0; 8192]; // 8KB buffer
        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        hasher.finalize()
    };

    Ok(Identity::from(hash))
}
