use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Entries are swept once the table grows past this many paths
const PRUNE_THRESHOLD: usize = 256;

/// Reader/writer locks keyed by request path.
///
/// GET and HEAD take the shared side, PUT the exclusive side, so a file is
/// never truncated or rewritten while another worker streams it, and two PUTs
/// to one path run one after the other.
#[derive(Default)]
pub struct PathLocks {
    table: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `path`, created on first use.
    ///
    /// Callers hold on to the returned `Arc` for as long as they hold the lock;
    /// entries nobody holds are dropped when the table is swept.
    pub fn lock_for(&self, path: &str) -> Arc<RwLock<()>> {
        let mut table = self.table.lock();

        if table.len() >= PRUNE_THRESHOLD {
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        table.entry(path.to_string()).or_default().clone()
    }

    /// Number of paths currently tracked
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
