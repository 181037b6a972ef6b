use std::collections::HashMap;

use super::error::PersistenceResult;
use super::HashCache;
use crate::processing::{HashMethod, HashValue};
use crate::types::Identity;

/// In-process hash cache
#[derive(Debug, Default, Clone)]
pub struct MemoryHashCache {
    entries: HashMap<(Identity, HashMethod), HashValue>,
}

impl MemoryHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HashCache for MemoryHashCache {
    fn get(&self, identity: &Identity, method: HashMethod) -> Option<HashValue> {
        self.entries.get(&(*identity, method)).cloned()
    }

    fn set_many(
        &mut self,
        entries: &[(Identity, HashValue)],
        method: HashMethod,
    ) -> PersistenceResult<()> {
        for (identity, value) in entries {
            self.entries.insert((*identity, method), value.clone());
        }
        Ok(())
    }
}
