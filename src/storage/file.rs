use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::StorageError;

use super::backend::StorageBackend;

/// On-disk backend storing each key as `<root>/<key>.json`.
///
/// Writes go to a temporary sibling file that is synced and then renamed over
/// the target, so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    max_bytes: Option<u64>,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileBackend {
            root: root.into(),
            max_bytes: None,
        }
    }

    /// Backend rooted at the configured data directory, if one is set.
    pub fn from_config(config: &StoreConfig) -> Option<Self> {
        config.data_dir.clone().map(FileBackend::new)
    }

    /// Refuse values larger than `max_bytes` with a quota error.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", name))
    }
}

fn map_io(err: io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
            StorageError::QuotaExceeded(err.to_string())
        }
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
            StorageError::Unavailable(err.to_string())
        }
        _ => StorageError::Io(err.to_string()),
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(map_io(err)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(max_bytes) = self.max_bytes {
            if value.len() as u64 > max_bytes {
                return Err(StorageError::QuotaExceeded(format!(
                    "{} bytes exceeds the {} byte cap",
                    value.len(),
                    max_bytes
                )));
            }
        }

        fs::create_dir_all(&self.root).map_err(map_io)?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        };

        write().map_err(|err| {
            let _ = fs::remove_file(&tmp_path);
            map_io(err)
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(map_io(err)),
        }
    }
}
