use crate::error::StorageError;

/// A string key-value persistence medium.
///
/// Only [`PersistenceStore`](crate::PersistenceStore) should write the
/// progress key; the store serialises its own writes.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store (or overwrite) the value under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<B> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}
