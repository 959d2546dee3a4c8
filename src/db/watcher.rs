use super::{SharedStore, modified_time};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, info};

/// Detects edits made to the data file by other processes.
///
/// Polled from the UI loop. A change whose modification time matches the
/// last save made through the [`SharedStore`] is our own write and is
/// swallowed.
pub struct FileWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(store: &SharedStore) -> Self {
        let path = store.path().to_path_buf();
        let last_seen = modified_time(&path);
        Self { path, last_seen }
    }

    /// True when the file changed since the previous poll and the change was
    /// not written by `store`.
    pub fn poll(&mut self, store: &SharedStore) -> bool {
        let stamp = modified_time(&self.path);
        if stamp == self.last_seen {
            return false;
        }
        self.last_seen = stamp;

        if stamp.is_some() && stamp == store.last_written() {
            debug!(path = %self.path.display(), "ignoring change from own save");
            return false;
        }
        info!(path = %self.path.display(), "data file changed externally");
        true
    }
}
