use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::{Error, Result};

/// Small battery-backed storage that survives standby
pub trait BackupStore {
    /// Reads the stored value, zero if nothing was ever stored
    fn load(&mut self) -> Result<u16>;

    /// Overwrites the stored value
    fn store(&mut self, value: u16) -> Result<()>;
}

/// Backup kept in memory, lost on restart
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackup {
    value: u16,
}

impl MemoryBackup {
    pub fn new(value: u16) -> Self {
        MemoryBackup { value }
    }
}

impl BackupStore for MemoryBackup {
    fn load(&mut self) -> Result<u16> {
        Ok(self.value)
    }

    fn store(&mut self, value: u16) -> Result<()> {
        self.value = value;
        Ok(())
    }
}

/// Backup persisted as two big-endian bytes in a file
#[derive(Debug, Clone)]
pub struct FileBackup {
    path: PathBuf,
}

impl FileBackup {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileBackup {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BackupStore for FileBackup {
    fn load(&mut self) -> Result<u16> {
        match fs::read(&self.path) {
            Ok(bytes) => match bytes.as_slice() {
                [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
                _ => Err(Error::storage(format!(
                    "Backup {} holds {} bytes, expected 2",
                    self.path.display(),
                    bytes.len()
                ))),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&mut self, value: u16) -> Result<()> {
        fs::write(&self.path, value.to_be_bytes())?;
        Ok(())
    }
}
