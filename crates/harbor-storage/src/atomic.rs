//! Atomic file replacement
//!
//! New content is written to `<file>.new`, synced, then renamed over the target.
//! Readers only ever see the old file or the complete new one. A `.new` file
//! left behind by a crash is ignored and removed on the next access.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const NEW_FILE_SUFFIX: &str = "new";

#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
    new_path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut new_path = path.clone().into_os_string();
        new_path.push(".");
        new_path.push(NEW_FILE_SUFFIX);

        Self {
            path,
            new_path: PathBuf::from(new_path),
        }
    }

    /// Path of the committed file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the in-progress temporary file
    pub fn new_path(&self) -> &Path {
        &self.new_path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Open the temporary file for a new write, discarding any stale one
    pub fn start_write(&self) -> io::Result<File> {
        self.remove_stale_new_file();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        File::create(&self.new_path)
    }

    /// Make the written content durable and visible in one rename.
    ///
    /// Only a failed sync of the temp file or a failed rename is an error. Once
    /// the rename succeeded the new content is live, so a failed directory sync
    /// is logged and ignored.
    pub fn finish_write(&self, file: File) -> io::Result<()> {
        self.finish_write_with(file, sync_dir)
    }

    fn finish_write_with<F>(&self, file: File, sync_parent: F) -> io::Result<()>
    where
        F: FnOnce(&Path) -> io::Result<()>,
    {
        let result = file.sync_all().and_then(|_| {
            drop(file);
            fs::rename(&self.new_path, &self.path)
        });

        if let Err(e) = result {
            tracing::warn!(
                new_path = %self.new_path.display(),
                error = %e,
                "Commit failed, cleaning up temp file"
            );
            let _ = fs::remove_file(&self.new_path);
            return Err(e);
        }

        tracing::debug!(path = %self.path.display(), "Atomic rename completed");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = sync_parent(parent) {
                tracing::warn!(
                    dir = %parent.display(),
                    error = %e,
                    "Directory sync failed after commit"
                );
            }
        }

        Ok(())
    }

    /// Abandon a write, leaving the committed file untouched
    pub fn fail_write(&self, file: Option<File>) {
        drop(file);
        if let Err(e) = fs::remove_file(&self.new_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(new_path = %self.new_path.display(), error = %e, "Failed to remove temp file");
            }
        }
    }

    /// Replace the file's content with `bytes`
    pub fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut file = self.start_write()?;
        if let Err(e) = file.write_all(bytes) {
            self.fail_write(Some(file));
            return Err(e);
        }
        self.finish_write(file)
    }

    /// Read the committed content
    pub fn read(&self) -> io::Result<Vec<u8>> {
        self.remove_stale_new_file();
        fs::read(&self.path)
    }

    /// Delete the committed file and any temporary leftover. Missing files are fine.
    pub fn delete(&self) -> io::Result<()> {
        self.remove_stale_new_file();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn remove_stale_new_file(&self) {
        if self.new_path.exists() {
            tracing::warn!(path = %self.new_path.display(), "Removing stale temp file");
            let _ = fs::remove_file(&self.new_path);
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let file = AtomicFile::new(dir.path().join("state.json"));
        assert!(!file.exists());
        assert!(file.read().is_err());

        file.write(b"first").unwrap();
        assert_eq!(file.read().unwrap(), b"first");

        file.write(b"second").unwrap();
        assert_eq!(file.read().unwrap(), b"second");
        assert!(!file.new_path().exists());
    }

    #[test]
    fn test_interrupted_write_keeps_old_content() {
        let dir = TempDir::new().unwrap();
        let file = AtomicFile::new(dir.path().join("state.json"));
        file.write(b"committed").unwrap();

        // Crash after partial bytes, before commit
        let mut partial = file.start_write().unwrap();
        partial.write_all(b"{\"half").unwrap();
        drop(partial);
        assert!(file.new_path().exists());

        assert_eq!(file.read().unwrap(), b"committed");
        assert!(!file.new_path().exists());
    }

    #[test]
    fn test_failed_write_is_discarded() {
        let dir = TempDir::new().unwrap();
        let file = AtomicFile::new(dir.path().join("state.json"));

        let mut partial = file.start_write().unwrap();
        partial.write_all(b"junk").unwrap();
        file.fail_write(Some(partial));

        assert!(!file.exists());
        assert!(!file.new_path().exists());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = AtomicFile::new(dir.path().join("state.json"));

        file.delete().unwrap();
        file.write(b"data").unwrap();
        file.delete().unwrap();
        assert!(!file.exists());
        file.delete().unwrap();
    }

    #[test]
    fn test_directory_sync_failure_after_rename_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let file = AtomicFile::new(dir.path().join("state.json"));
        file.write(b"old").unwrap();

        let mut next = file.start_write().unwrap();
        next.write_all(b"new").unwrap();
        let result = file.finish_write_with(next, |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no read access"))
        });

        assert!(result.is_ok());
        assert_eq!(file.read().unwrap(), b"new");
        assert!(!file.new_path().exists());
    }

    #[test]
    fn test_failed_rename_keeps_old_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("state.json");
        let file = AtomicFile::new(&target);

        // A non-empty directory at the target path makes the rename fail
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let mut next = file.start_write().unwrap();
        next.write_all(b"new").unwrap();
        assert!(file.finish_write(next).is_err());
        assert!(!file.new_path().exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_new_path_naming() {
        let file = AtomicFile::new("/data/state.json");
        assert_eq!(file.new_path(), Path::new("/data/state.json.new"));
    }
}
