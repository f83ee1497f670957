use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::record::{parse_stored, ProgressRecord};

use super::backend::StorageBackend;
use super::deferred::DeferredTask;

/// Counters describing what the store did with the records it was given.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PersistStats {
    /// Physical writes that reached the backend.
    pub writes: usize,
    /// Writes dropped after every attempt failed.
    pub failed_writes: usize,
    /// Retries made with a trimmed history after a quota failure.
    pub quota_retries: usize,
    /// Pending saves replaced by a newer save before they ran.
    pub superseded: usize,
    /// Deferred saves skipped because a newer record was already written.
    pub stale_skipped: usize,
}

struct PendingSave {
    record: ProgressRecord,
    generation: u64,
}

struct WriteGate {
    last_written: u64,
    stats: PersistStats,
}

struct StoreShared<B> {
    backend: B,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    generation: AtomicU64,
    superseded: AtomicUsize,
    gate: Mutex<WriteGate>,
}

impl<B: StorageBackend> StoreShared<B> {
    fn lock_gate(&self) -> MutexGuard<'_, WriteGate> {
        self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark `record` as written now and hold its history to the configured bound.
    fn stamp(&self, record: &mut ProgressRecord) {
        record.last_updated = Some(self.clock.now());
        record.trim_history(self.config.history_limit);
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Write `record` unless a newer generation has already been written.
    /// Writes are serialised by the gate.
    fn persist(&self, pending: PendingSave) {
        let mut gate = self.lock_gate();
        if pending.generation < gate.last_written {
            gate.stats.stale_skipped += 1;
            debug!(
                key = %self.config.storage_key,
                generation = pending.generation,
                "skipping stale deferred save"
            );
            return;
        }
        gate.last_written = pending.generation;
        self.write_with_fallback(pending.record, &mut gate.stats);
    }

    fn write_with_fallback(&self, mut record: ProgressRecord, stats: &mut PersistStats) {
        let key = &self.config.storage_key;
        let err = match self.write(&record) {
            Ok(()) => {
                stats.writes += 1;
                return;
            }
            Err(err) => err,
        };

        if !err.is_quota_exceeded() {
            error!(key = %key, error = %err, "failed to save progress");
            stats.failed_writes += 1;
            return;
        }

        let limit = self.config.quota_history_limit;
        warn!(
            key = %key,
            error = %err,
            history = record.history.len(),
            limit,
            "storage quota exceeded, retrying with trimmed history"
        );
        record.trim_history(limit);
        stats.quota_retries += 1;

        match self.write(&record) {
            Ok(()) => stats.writes += 1,
            Err(err) => {
                error!(key = %key, error = %err, "still cannot save progress after trimming history");
                stats.failed_writes += 1;
            }
        }
    }

    fn write(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set_item(&self.config.storage_key, &json)
    }
}

/// Owner of the persisted progress record.
///
/// `save` is fire-and-forget: the record is written by a background timer
/// after the configured debounce interval, and a newer `save` replaces a
/// pending one. `save_immediate` (or `flush`) writes synchronously and must
/// run at shutdown; dropping the store does this automatically.
///
/// Every storage failure is logged and swallowed.
pub struct PersistenceStore<B: StorageBackend + 'static> {
    shared: Arc<StoreShared<B>>,
    timer: DeferredTask<PendingSave>,
}

impl<B: StorageBackend + 'static> PersistenceStore<B> {
    pub fn new(backend: B, config: StoreConfig) -> Self {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: B, config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let debounce = config.debounce;
        let shared = Arc::new(StoreShared {
            backend,
            config,
            clock,
            generation: AtomicU64::new(0),
            superseded: AtomicUsize::new(0),
            gate: Mutex::new(WriteGate {
                last_written: 0,
                stats: PersistStats::default(),
            }),
        });

        let timer = DeferredTask::spawn(debounce, {
            let shared = shared.clone();
            move |pending: PendingSave| shared.persist(pending)
        });

        Self { shared, timer }
    }

    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Read the stored record. Missing, unreadable or invalid data yields a
    /// fresh default record. Records from an older schema are upgraded and
    /// written back.
    pub fn load(&self) -> ProgressRecord {
        let key = &self.shared.config.storage_key;
        let raw = match self.shared.backend.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ProgressRecord::default(),
            Err(err) => {
                error!(key = %key, error = %err, "failed to read progress");
                return ProgressRecord::default();
            }
        };

        let loaded = match parse_stored(&raw) {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(key = %key, error = %err, "failed to load progress");
                return ProgressRecord::default();
            }
        };

        if loaded.was_migrated() {
            info!(
                key = %key,
                from = loaded.stored_version,
                to = loaded.record.version,
                "upgraded stored progress schema"
            );
            let mut gate = self.shared.lock_gate();
            self.shared
                .write_with_fallback(loaded.record.clone(), &mut gate.stats);
        }

        loaded.record
    }

    /// Stamp `record` and schedule it to be written after the debounce
    /// interval. Returns immediately.
    pub fn save(&self, mut record: ProgressRecord) {
        self.shared.stamp(&mut record);
        let pending = PendingSave {
            record,
            generation: self.shared.next_generation(),
        };
        if self.timer.schedule(pending) {
            self.shared.superseded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Cancel any pending deferred write and write synchronously.
    ///
    /// With `None`, the pending record (if any) is written; with nothing
    /// pending this is a no-op. A deferred write already in progress is
    /// waited for, so the latest record is stored when this returns.
    pub fn save_immediate(&self, record: Option<ProgressRecord>) {
        let pending = self.timer.take();
        let Some(mut record) = record.or(pending.map(|p| p.record)) else {
            return;
        };

        self.shared.stamp(&mut record);
        let pending = PendingSave {
            record,
            generation: self.shared.next_generation(),
        };
        self.shared.persist(pending);
    }

    /// Write whatever is pending right now.
    pub fn flush(&self) {
        self.save_immediate(None);
    }

    pub fn has_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Clear the stored record and return a fresh default.
    ///
    /// A deferred save that is still pending is not cancelled and may write
    /// after the reset; sequence `flush` or `save_immediate` first when that
    /// matters.
    pub fn reset(&self) -> ProgressRecord {
        let key = &self.shared.config.storage_key;
        if let Err(err) = self.shared.backend.remove_item(key) {
            error!(key = %key, error = %err, "failed to reset progress");
        }
        ProgressRecord::default()
    }

    pub fn stats(&self) -> PersistStats {
        let mut stats = self.shared.lock_gate().stats.clone();
        stats.superseded = self.shared.superseded.load(Ordering::Relaxed);
        stats
    }

    /// Flush pending work and return the final counters.
    pub fn close(self) -> PersistStats {
        self.flush();
        self.stats()
    }
}

impl<B: StorageBackend + 'static> Drop for PersistenceStore<B> {
    fn drop(&mut self) {
        self.flush();
    }
}
