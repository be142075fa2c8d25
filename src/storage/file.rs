//! Shared data file access
//!
//! The database file is one handle shared by every caller. Each seek plus
//! read or write runs under a single mutex so no caller ever observes a torn
//! slot. This lock is held for one I/O call at a time and never while waiting
//! on a record lock.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{StoreError, StoreResult};

/// The database file behind its access lock
#[derive(Debug)]
pub struct DataFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl DataFile {
    /// Opens an existing database file for reading and writing.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| StoreError::io(format!("open {}", path.display()), e))?;
        Ok(Self::from_file(path, file))
    }

    /// Creates a new database file, failing if one already exists.
    pub fn create_new(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| StoreError::io(format!("create {}", path.display()), e))?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op` with exclusive access to the file handle.
    pub fn access<T, E>(&self, op: impl FnOnce(&mut File) -> Result<T, E>) -> Result<T, E> {
        let mut file = self.lock();
        op(&mut file)
    }

    /// Fills `buf` from `offset`. Fails with `UnexpectedEof` past end of file.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.access(|file| read_exact_at(file, offset, buf))
    }

    /// Writes `bytes` at `offset` and syncs file data.
    pub fn write_at(&self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        self.access(|file| write_all_at(file, offset, bytes))
    }
}

/// Seek then `read_exact`, for use inside `DataFile::access`.
pub fn read_exact_at(file: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}

/// Seek, `write_all` and `sync_data`, for use inside `DataFile::access`.
pub fn write_all_at(file: &mut File, offset: u64, bytes: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    file.sync_data()
}
