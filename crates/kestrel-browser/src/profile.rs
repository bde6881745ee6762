use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Chrome user-data directory for one session.
///
/// A temporary profile is deleted when dropped; a persistent one survives
/// across runs so cookies and saved sessions carry over.
pub struct ProfileManager {
    path: PathBuf,
    is_temporary: bool,
}

impl ProfileManager {
    /// Create a throwaway profile, removed on drop.
    pub fn temporary() -> Result<Self> {
        let temp_dir = tempfile::tempdir().map_err(|e| Error::Io(e.into()))?;

        Ok(Self {
            path: temp_dir.keep(),
            is_temporary: true,
        })
    }

    /// Create or reuse a persistent profile at the given path.
    pub fn persistent(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(Error::Io)?;
        }

        Ok(Self {
            path,
            is_temporary: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }
}

impl Drop for ProfileManager {
    fn drop(&mut self) {
        if self.is_temporary && self.path.exists() {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
