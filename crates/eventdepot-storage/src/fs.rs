//! Directory-backed store: one file per record.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{LocalStore, Result, StorageError};

/// Stores each record as a file named after it inside `root`.
///
/// Saves go through a hidden temporary file and a rename, so a crash mid-write
/// leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StorageError::io(&root.display().to_string(), e))?;
        tracing::debug!(root = %root.display(), "Opened filesystem store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.starts_with('.')
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

impl LocalStore for FsStore {
    fn save(&self, name: &str, blob: &[u8]) -> Result<()> {
        let path = self.path_for(name)?;
        let tmp = self.root.join(format!(".{}.tmp", name));
        fs::write(&tmp, blob).map_err(|e| StorageError::io(name, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(name, e))
    }

    fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(name, e)),
        }
    }

    fn list_names(&self, prefix: &str) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root.display().to_string(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(prefix, e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                // Hidden names are in-flight temporary files
                if !name.starts_with('.') && name.starts_with(prefix) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}
