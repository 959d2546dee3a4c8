pub mod connection;
pub mod json_store;
pub mod repository;
pub mod watcher;

use crate::error::{AppError, Result};
use crate::models::log::TransactionLog;
use crate::models::transaction::{MAX_AMOUNT, timestamp_in_range};
use json_store::JsonStore;
use repository::SqliteStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::debug;

/// Where the transaction log lives. Implementations hand out complete
/// snapshots and replace the whole snapshot on save.
pub trait TransactionStore: Send {
    fn load(&self) -> Result<TransactionLog>;
    fn save(&self, log: &TransactionLog) -> Result<()>;
    fn path(&self) -> &Path;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Json,
    Sqlite,
}

impl StoreKind {
    pub fn default_file_name(self) -> &'static str {
        match self {
            StoreKind::Json => "data_cash.json",
            StoreKind::Sqlite => "data_cash.db",
        }
    }
}

pub fn open_store(kind: StoreKind, path: &Path) -> Result<Box<dyn TransactionStore>> {
    debug!(?kind, path = %path.display(), "opening store");
    Ok(match kind {
        StoreKind::Json => Box::new(JsonStore::open(path)?),
        StoreKind::Sqlite => Box::new(SqliteStore::open(path)?),
    })
}

/// Rejects snapshots that could not have come from validated input.
pub fn check_snapshot(log: TransactionLog) -> Result<TransactionLog> {
    for t in &log.transactions {
        if t.amount < Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Transaction {} has a negative amount ({})",
                t.id, t.amount
            )));
        }
        if t.amount > MAX_AMOUNT {
            return Err(AppError::Validation(format!(
                "Transaction {} has an amount above {} ({})",
                t.id, MAX_AMOUNT, t.amount
            )));
        }
        if !timestamp_in_range(t.timestamp) {
            return Err(AppError::Validation(format!(
                "Transaction {} has an out-of-range timestamp ({})",
                t.id, t.timestamp
            )));
        }
    }
    Ok(log)
}

pub(crate) fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

struct Guarded {
    store: Box<dyn TransactionStore>,
    last_written: Option<SystemTime>,
}

/// A store shared between the writer and the file watcher.
///
/// All access goes through one mutex, so a reload never observes a
/// half-finished save. After each save the file's modification time is
/// remembered, which lets [`watcher::FileWatcher`] skip our own writes.
pub struct SharedStore {
    inner: Mutex<Guarded>,
    path: PathBuf,
}

impl SharedStore {
    pub fn new(store: Box<dyn TransactionStore>) -> Self {
        let path = store.path().to_path_buf();
        Self {
            inner: Mutex::new(Guarded {
                store,
                last_written: None,
            }),
            path,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Guarded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TransactionLog> {
        let guard = self.lock();
        guard.store.load()
    }

    pub fn save(&self, log: &TransactionLog) -> Result<()> {
        let mut guard = self.lock();
        guard.store.save(log)?;
        guard.last_written = modified_time(&self.path);
        debug!(transactions = log.len(), "snapshot saved");
        Ok(())
    }

    /// Load, apply `change`, and save, all under one lock. Nothing is written
    /// when `change` fails.
    pub fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut TransactionLog) -> Result<T>,
    {
        let mut guard = self.lock();
        let mut log = guard.store.load()?;
        let out = change(&mut log)?;
        guard.store.save(&log)?;
        guard.last_written = modified_time(&self.path);
        debug!(transactions = log.len(), "snapshot updated");
        Ok(out)
    }

    pub fn last_written(&self) -> Option<SystemTime> {
        self.lock().last_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::TransactionKind;
    use tempfile::TempDir;

    fn shared_json(dir: &TempDir) -> SharedStore {
        let store = open_store(StoreKind::Json, &dir.path().join("data.json")).unwrap();
        SharedStore::new(store)
    }

    #[test]
    fn test_update_persists_change() {
        let dir = TempDir::new().unwrap();
        let shared = shared_json(&dir);

        let id = shared
            .update(|log| {
                Ok(log.push(
                    TransactionKind::Income,
                    Decimal::new(10, 0),
                    "Job".to_string(),
                    String::new(),
                    0,
                ))
            })
            .unwrap();

        let log = shared.load().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.transactions[0].id, id);
        assert!(shared.last_written().is_some());
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let shared = shared_json(&dir);

        let result: Result<()> = shared.update(|log| {
            log.push(TransactionKind::Expense, Decimal::ONE, String::new(), String::new(), 0);
            Err(AppError::Validation("nope".to_string()))
        });

        assert!(result.is_err());
        assert!(shared.load().unwrap().is_empty());
    }

    #[test]
    fn test_check_snapshot_rejects_negative_amount() {
        let mut log = TransactionLog::new();
        let id = log.push(TransactionKind::Expense, Decimal::new(-5, 0), String::new(), String::new(), 0);

        let err = check_snapshot(log).unwrap_err();
        assert!(err.to_string().contains(&format!("Transaction {}", id)));
    }

    #[test]
    fn test_check_snapshot_rejects_amount_above_ceiling() {
        let mut log = TransactionLog::new();
        log.push(TransactionKind::Income, Decimal::ONE, String::new(), String::new(), 0);
        let id = log.push(TransactionKind::Income, Decimal::MAX, String::new(), String::new(), 0);

        let err = check_snapshot(log).unwrap_err().to_string();
        assert!(err.contains(&format!("Transaction {} has an amount above", id)));
    }

    #[test]
    fn test_check_snapshot_rejects_unrepresentable_timestamp() {
        let mut log = TransactionLog::new();
        let id = log.push(TransactionKind::Expense, Decimal::ONE, String::new(), String::new(), i64::MAX);

        let err = check_snapshot(log).unwrap_err().to_string();
        assert!(err.contains(&format!("Transaction {} has an out-of-range timestamp", id)));
    }

    #[test]
    fn test_check_snapshot_accepts_valid_log() {
        let mut log = TransactionLog::new();
        log.push(TransactionKind::Expense, MAX_AMOUNT, "Rent".to_string(), String::new(), 1_700_000_000);
        assert_eq!(check_snapshot(log).unwrap().len(), 1);
    }

    #[test]
    fn test_open_store_sqlite_backend() {
        let dir = TempDir::new().unwrap();
        let store = open_store(StoreKind::Sqlite, &dir.path().join("data.db")).unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
