//! Persistent store for perceptual hash values, keyed by
//! `(content identity, hash method)`. A cache miss is never an error.

mod db;
mod error;
mod memory;

pub use db::SqliteHashCache;
pub use error::{PersistenceError, PersistenceResult};
pub use memory::MemoryHashCache;

use crate::processing::{HashMethod, HashValue};
use crate::types::Identity;

/// Key-value store consulted before computing a hash and written after
pub trait HashCache: Send {
    /// Stored value, or `None` when absent or unreadable
    fn get(&self, identity: &Identity, method: HashMethod) -> Option<HashValue>;

    /// Store many values for one method
    fn set_many(
        &mut self,
        entries: &[(Identity, HashValue)],
        method: HashMethod,
    ) -> PersistenceResult<()>;
}
