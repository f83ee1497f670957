use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::record::DEFAULT_HISTORY_LIMIT;

pub const DEFAULT_STORAGE_KEY: &str = "movie_challenge_progress";
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(500);
/// History length kept when a write is retried after a quota failure.
pub const DEFAULT_QUOTA_HISTORY_LIMIT: usize = 50;

/// Settings for a [`PersistenceStore`](crate::PersistenceStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub storage_key: String,
    pub debounce: Duration,
    pub quota_history_limit: usize,
    pub history_limit: usize,
    /// Directory for the on-disk backend, when one is used.
    pub data_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            debounce: DEFAULT_SAVE_DEBOUNCE,
            quota_history_limit: DEFAULT_QUOTA_HISTORY_LIMIT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            data_dir: None,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `PROGRESS_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = StoreConfig::default();
        StoreConfig {
            storage_key: std::env::var("PROGRESS_STORAGE_KEY")
                .ok()
                .filter(|key| !key.is_empty())
                .unwrap_or(defaults.storage_key),
            debounce: env_parse::<u64>("PROGRESS_SAVE_DEBOUNCE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            quota_history_limit: env_parse("PROGRESS_HISTORY_TRIM")
                .unwrap_or(defaults.quota_history_limit),
            history_limit: env_parse("PROGRESS_HISTORY_LIMIT").unwrap_or(defaults.history_limit),
            data_dir: std::env::var_os("PROGRESS_DATA_DIR").map(PathBuf::from),
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_quota_history_limit(mut self, limit: usize) -> Self {
        self.quota_history_limit = limit;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.storage_key.is_empty() {
            return Err("storage key is empty".into());
        }
        if self.quota_history_limit == 0 {
            return Err("quota history limit must be at least 1".into());
        }
        if self.history_limit < self.quota_history_limit {
            return Err(format!(
                "history limit {} is smaller than quota history limit {}",
                self.history_limit, self.quota_history_limit
            ));
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
