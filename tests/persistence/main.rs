
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use catalog_progress::{
    FileBackend, FixedClock, ItemId, PersistenceStore, ProgressRecord, StorageBackend,
    StorageError,
};
use chrono::{TimeZone, Utc};
use support::{config, record_with, wait_for, RecordingBackend, KEY};

#[test]
fn rapid_saves_coalesce_into_one_write_of_the_last_record() {
    let backend = RecordingBackend::new();
    let store = PersistenceStore::new(backend.clone(), config(50));

    store.save(record_with(1));
    store.save(record_with(2));
    assert!(backend.attempts().is_empty());

    assert!(wait_for(Duration::from_secs(5), || !backend.attempts().is_empty()));
    thread::sleep(Duration::from_millis(200));

    let written = backend.attempted_records();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].seen.len(), 2);

    let stats = store.stats();
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.superseded, 1);
}

#[test]
fn saves_in_separate_windows_write_separately() {
    let backend = RecordingBackend::new();
    let store = PersistenceStore::new(backend.clone(), config(20));

    store.save(record_with(1));
    assert!(wait_for(Duration::from_secs(5), || backend.attempts().len() == 1));
    store.save(record_with(2));
    assert!(wait_for(Duration::from_secs(5), || backend.attempts().len() == 2));

    assert_eq!(backend.stored_record().unwrap().seen.len(), 2);
}

#[test]
fn save_stamps_last_updated() {
    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let backend = RecordingBackend::new();
    let store =
        PersistenceStore::with_clock(backend.clone(), config(10), Arc::new(FixedClock(at)));

    store.save(record_with(1));
    assert!(wait_for(Duration::from_secs(5), || backend.stored_record().is_some()));

    let raw = backend.attempts().remove(0);
    assert!(raw.contains("\"lastUpdated\":\"2025-01-02T03:04:05Z\""));
}

#[test]
fn quota_failure_retries_once_with_last_fifty_history_entries() {
    let backend =
        RecordingBackend::failing_writes(vec![StorageError::QuotaExceeded("full".into())]);
    let store = PersistenceStore::new(backend.clone(), config(10_000));

    store.save_immediate(Some(record_with(80)));

    let attempts = backend.attempted_records();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].history.len(), 80);
    assert_eq!(attempts[1].history.len(), 50);
    assert_eq!(attempts[1].history[0].id, ItemId::from("movie-30"));
    assert_eq!(attempts[1].seen.len(), 80);

    let stored = backend.stored_record().unwrap();
    assert_eq!(stored.history.len(), 50);
    assert_eq!(store.stats().quota_retries, 1);
}

#[test]
fn quota_failure_on_deferred_write_is_retried_too() {
    let backend =
        RecordingBackend::failing_writes(vec![StorageError::QuotaExceeded("full".into())]);
    let store = PersistenceStore::new(backend.clone(), config(10));

    store.save(record_with(60));
    assert!(wait_for(Duration::from_secs(5), || backend.attempts().len() == 2));
    assert_eq!(backend.stored_record().unwrap().history.len(), 50);
}

#[test]
fn second_quota_failure_is_logged_and_dropped() {
    let backend = RecordingBackend::failing_writes(vec![
        StorageError::QuotaExceeded("full".into()),
        StorageError::QuotaExceeded("still full".into()),
    ]);
    let store = PersistenceStore::new(backend.clone(), config(10_000));

    store.save_immediate(Some(record_with(3)));

    assert_eq!(backend.attempts().len(), 2);
    assert!(backend.stored_record().is_none());
    let stats = store.stats();
    assert_eq!(stats.failed_writes, 1);
    assert_eq!(stats.writes, 0);
}

#[test]
fn other_write_failures_are_not_retried() {
    let backend = RecordingBackend::failing_writes(vec![StorageError::Io("disk gone".into())]);
    let store = PersistenceStore::new(backend.clone(), config(10_000));

    store.save_immediate(Some(record_with(3)));

    assert_eq!(backend.attempts().len(), 1);
    assert_eq!(store.stats().quota_retries, 0);
    assert_eq!(store.stats().failed_writes, 1);
}

#[test]
fn unreadable_storage_loads_defaults() {
    let backend = RecordingBackend::unreadable(StorageError::Unavailable("private mode".into()));
    let store = PersistenceStore::new(backend, config(10));
    assert_eq!(store.load(), ProgressRecord::default());
}

#[test]
fn save_immediate_cancels_the_pending_write() {
    let backend = RecordingBackend::new();
    let store = PersistenceStore::new(backend.clone(), config(100));

    store.save(record_with(1));
    store.save_immediate(None);
    assert_eq!(backend.attempts().len(), 1);

    thread::sleep(Duration::from_millis(300));
    assert_eq!(backend.attempts().len(), 1);
    assert_eq!(backend.stored_record().unwrap().seen.len(), 1);
}

#[test]
fn flush_waits_for_a_deferred_write_in_progress() {
    let backend = RecordingBackend::slow(Duration::from_millis(300));
    let store = PersistenceStore::new(backend.clone(), config(10));

    store.save(record_with(3));
    assert!(wait_for(Duration::from_secs(5), || !backend.attempts().is_empty()));

    store.flush();
    assert_eq!(backend.stored_record().unwrap().seen.len(), 3);
}

#[test]
fn close_counts_a_deferred_write_in_progress() {
    let backend = RecordingBackend::slow(Duration::from_millis(300));
    let store = PersistenceStore::new(backend.clone(), config(10));

    store.save(record_with(2));
    assert!(wait_for(Duration::from_secs(5), || !backend.attempts().is_empty()));

    let stats = store.close();
    assert_eq!(stats.writes, 1);
    assert!(backend.stored_record().is_some());
}

#[test]
fn configured_history_limit_bounds_saved_history() {
    let backend = RecordingBackend::new();
    let store = PersistenceStore::new(backend.clone(), config(10_000).with_history_limit(50));

    store.save_immediate(Some(record_with(200)));

    let stored = backend.stored_record().unwrap();
    assert_eq!(stored.history.len(), 50);
    assert_eq!(stored.history[0].id, ItemId::from("movie-150"));
    assert_eq!(store.load().history.len(), 50);
}

#[test]
fn save_immediate_is_idempotent() {
    let backend = RecordingBackend::new();
    let store = PersistenceStore::new(backend.clone(), config(10_000));

    store.save(record_with(2));
    store.save_immediate(None);
    store.save_immediate(None);
    store.flush();

    assert_eq!(backend.attempts().len(), 1);
}

#[test]
fn close_flushes_and_reports() {
    let backend = RecordingBackend::new();
    let store = PersistenceStore::new(backend.clone(), config(10_000));

    store.save(record_with(1));
    store.save(record_with(4));
    let stats = store.close();

    assert_eq!(stats.writes, 1);
    assert_eq!(stats.superseded, 1);
    assert_eq!(backend.stored_record().unwrap().seen.len(), 4);
}

#[test]
fn reset_returns_defaults_and_clears_storage() {
    let backend = RecordingBackend::new();
    let store = PersistenceStore::new(backend.clone(), config(10_000));

    store.save_immediate(Some(record_with(5)));
    let fresh = store.reset();

    assert_eq!(fresh, ProgressRecord::default());
    assert!(backend.inner().get_item(KEY).unwrap().is_none());
    assert_eq!(store.load(), ProgressRecord::default());
}

#[test]
fn progress_survives_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = PersistenceStore::new(FileBackend::new(dir.path()), config(10_000));
        let mut record = store.load();
        record.mark_seen(ItemId::from("tt0111161"), 100);
        record.mark_not_seen(ItemId::from("tt0068646"), 100);
        store.save(record);
    }

    let store = PersistenceStore::new(FileBackend::new(dir.path()), config(10_000));
    let record = store.load();
    assert_eq!(record.seen, vec![ItemId::from("tt0111161")]);
    assert_eq!(record.not_seen, vec![ItemId::from("tt0068646")]);
    assert_eq!(record.current_index, 2);
    assert_eq!(record.history.len(), 2);
    assert!(record.last_updated.is_some());
}

#[test]
fn unversioned_file_is_upgraded_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::new(dir.path());
    backend
        .set_item(KEY, r#"{"currentIndex":1,"seen":["a"],"notSeen":[]}"#)
        .unwrap();

    let store = PersistenceStore::new(backend.clone(), config(10_000));
    let record = store.load();
    assert_eq!(record.version, 1);

    let raw = backend.get_item(KEY).unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["version"], 1);
    assert_eq!(stored["seen"], serde_json::json!(["a"]));
}
