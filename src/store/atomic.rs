//! Atomic File Replacement
//!
//! Readers of a persisted store never observe a partially written file:
//! 1. Write to `<file>.tmp`
//! 2. fsync the temp file
//! 3. Rename over the original (atomic on POSIX)
//! 4. fsync the directory so the rename survives a crash

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::errors::{StoreError, StoreResult};

/// A file that is only ever replaced whole.
#[derive(Debug, Clone)]
pub struct AtomicFile {
    path: PathBuf,
    temp_path: PathBuf,
}

impl AtomicFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            temp_path: suffixed(&path, ".tmp"),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current content, `None` if the file does not exist.
    pub fn read(&self) -> StoreResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("failed to read", &self.path, e)),
        }
    }

    /// Replace the file content atomically.
    pub fn write(&self, content: &str) -> StoreResult<()> {
        if let Some(parent) = self.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::io("failed to create directory", parent, e))?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.temp_path)
            .map_err(|e| StoreError::io("failed to create", &self.temp_path, e))?;

        file.write_all(content.as_bytes())
            .map_err(|e| StoreError::io("failed to write", &self.temp_path, e))?;

        file.sync_all()
            .map_err(|e| StoreError::io("failed to fsync", &self.temp_path, e))?;

        if let Err(e) = fs::rename(&self.temp_path, &self.path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(StoreError::io("failed to replace", &self.path, e));
        }

        if let Some(parent) = self.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    /// Copy the current file to `<file>_<suffix>`. Returns the copy's path.
    pub fn backup(&self, suffix: &str) -> StoreResult<PathBuf> {
        let backup_path = suffixed(&self.path, &format!("_{}", suffix));
        fs::copy(&self.path, &backup_path)
            .map_err(|e| StoreError::io("failed to back up", &self.path, e))?;
        Ok(backup_path)
    }

    fn parent(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let file = AtomicFile::new(tmp.path().join("config").join("database.yml"));

        assert!(file.read().unwrap().is_none());
        file.write("production:\n  host: db1\n").unwrap();

        assert!(file.path().exists());
        assert_eq!(file.read().unwrap().as_deref(), Some("production:\n  host: db1\n"));
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("failover_databases.yml");
        let file = AtomicFile::new(&path);

        file.write("first").unwrap();
        file.write("second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!tmp.path().join("failover_databases.yml.tmp").exists());
    }

    #[test]
    fn test_backup_copies_current_content() {
        let tmp = TempDir::new().unwrap();
        let file = AtomicFile::new(tmp.path().join("database.yml"));
        file.write("old").unwrap();

        let backup = file.backup("17-October-2026_10.00.00").unwrap();
        file.write("new").unwrap();

        assert_eq!(
            backup.file_name().unwrap().to_str().unwrap(),
            "database.yml_17-October-2026_10.00.00"
        );
        assert_eq!(fs::read_to_string(backup).unwrap(), "old");
    }

    #[test]
    fn test_backup_of_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let file = AtomicFile::new(tmp.path().join("absent.yml"));
        assert!(matches!(file.backup("x"), Err(StoreError::Io { .. })));
    }
}
