use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::StorageError;

use super::backend::StorageBackend;

/// In-memory backend backed by `Arc<RwLock<HashMap>>`.
///
/// Clone-friendly (cloning shares the same underlying storage). An optional
/// quota caps the total bytes of keys plus values, the way browser storage
/// caps its origin.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    storage: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        InMemoryBackend {
            storage: Arc::new(RwLock::new(HashMap::new())),
            quota: Some(quota_bytes),
        }
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> Result<usize, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::LockPoisoned("usage read"))?;
        Ok(storage.iter().map(|(k, v)| k.len() + v.len()).sum())
    }
}

impl StorageBackend for InMemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StorageError::LockPoisoned("read"))?;
        Ok(storage.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StorageError::LockPoisoned("write"))?;

        if let Some(quota) = self.quota {
            let others: usize = storage
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{} bytes needed, quota is {}",
                    needed, quota
                )));
            }
        }

        storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StorageError::LockPoisoned("remove"))?;
        storage.remove(key);
        Ok(())
    }
}
