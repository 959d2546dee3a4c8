use super::{TransactionStore, check_snapshot};
use crate::error::Result;
use crate::models::log::TransactionLog;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// The whole log as one pretty-printed JSON document.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Opens `path`, writing an empty log first if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self {
            path: path.to_path_buf(),
        };
        if !store.path.exists() {
            info!(path = %store.path.display(), "creating empty data file");
            store.save(&TransactionLog::new())?;
        }
        Ok(store)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl TransactionStore for JsonStore {
    fn load(&self) -> Result<TransactionLog> {
        let data = fs::read_to_string(&self.path)?;
        let log: TransactionLog = serde_json::from_str(&data)?;
        check_snapshot(log)
    }

    // Written next to the target and renamed over it, so readers see either
    // the old or the new file.
    fn save(&self, log: &TransactionLog) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(self.directory())?;
        serde_json::to_writer_pretty(&mut tmp, log)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
