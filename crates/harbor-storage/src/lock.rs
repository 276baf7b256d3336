//! Per-file locks
//!
//! Every storage handle for the same file shares one mutex, so reads, writes and
//! deletes against that file are totally ordered. Different files never contend.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) type FileLock = Arc<Mutex<()>>;

static FILE_LOCKS: Lazy<Mutex<HashMap<PathBuf, FileLock>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Lock shared by every caller asking for `path`
pub(crate) fn lock_for(path: &Path) -> FileLock {
    let mut locks = FILE_LOCKS.lock();
    Arc::clone(
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(()))),
    )
}
