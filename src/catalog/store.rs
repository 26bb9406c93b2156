//! Flat-file collection store
//!
//! Each collection lives in one file which is the sole source of truth.
//! Every operation re-reads the file; writes replace it through a temp file
//! and an atomic rename. A per-store mutex serializes read-modify-write
//! cycles within the process. Separate processes sharing a file can still
//! lose updates (last writer wins).

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::format::StorageFormat;
use super::types::Record;
use crate::error::CatalogError;

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// One persisted collection of records
pub struct CatalogStore<R: Record> {
    path: PathBuf,
    format: StorageFormat,
    lock: Mutex<()>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> CatalogStore<R> {
    pub fn new(path: impl Into<PathBuf>, format: StorageFormat) -> Self {
        Self {
            path: path.into(),
            format,
            lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// Load all records in file order. A missing file is an empty collection.
    pub fn load(&self) -> CatalogResult<Vec<R>> {
        let _guard = self.lock.lock();
        self.read_all()
    }

    /// Look up one record by key
    pub fn find(&self, key: &str) -> CatalogResult<Option<R>> {
        Ok(self.load()?.into_iter().find(|r| r.matches_key(key)))
    }

    /// Insert a record, rejecting duplicate keys. Returns the new collection size.
    pub fn add(&self, record: R) -> CatalogResult<usize> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;

        if records.iter().any(|r| r.matches_key(record.key())) {
            tracing::warn!("{} '{}' already exists", R::KIND, record.key());
            return Err(CatalogError::DuplicateKey {
                kind: R::KIND,
                key: record.key().to_string(),
            });
        }

        if self.format.is_append_only() {
            self.append(&record)?;
        }
        tracing::info!("Added {} '{}'", R::KIND, record.key());
        records.push(record);
        if !self.format.is_append_only() {
            self.write_all(&records)?;
        }

        Ok(records.len())
    }

    /// Delete the record matching `key` and return it
    pub fn remove(&self, key: &str) -> CatalogResult<R> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;

        let position = records
            .iter()
            .position(|r| r.matches_key(key))
            .ok_or_else(|| CatalogError::NotFound {
                kind: R::KIND,
                key: key.to_string(),
            })?;

        let removed = records.remove(position);
        self.write_all(&records)?;
        tracing::info!("Removed {} '{}'", R::KIND, removed.key());

        Ok(removed)
    }

    /// Modify the record matching `key` in place and return the updated copy
    pub fn update<F>(&self, key: &str, f: F) -> CatalogResult<R>
    where
        F: FnOnce(&mut R),
    {
        self.try_update(key, |record| {
            f(record);
            Ok::<_, CatalogError>(())
        })
    }

    /// Like `update`, but `f` may reject the record. Nothing is written
    /// unless `f` succeeds, and the check and write share one lock.
    pub fn try_update<F, E>(&self, key: &str, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut R) -> Result<(), E>,
        E: From<CatalogError>,
    {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;

        let record = records
            .iter_mut()
            .find(|r| r.matches_key(key))
            .ok_or_else(|| CatalogError::NotFound {
                kind: R::KIND,
                key: key.to_string(),
            })?;
        f(record)?;
        let updated = record.clone();

        self.write_all(&records)?;
        tracing::debug!("Updated {} '{}'", R::KIND, updated.key());

        Ok(updated)
    }

    fn read_all(&self) -> CatalogResult<Vec<R>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(CatalogError::io(&self.path, e)),
        };

        let records = self.format.decode(&self.path, &data)?;
        tracing::debug!("Loaded {} {} records", records.len(), R::COLLECTION);
        Ok(records)
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn write_all(&self, records: &[R]) -> CatalogResult<()> {
        let data = self.format.encode(records)?;
        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|e| CatalogError::io(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CatalogError::io(dir, e))?;
        tmp.write_all(&data)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| CatalogError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| CatalogError::io(&self.path, e.error))?;

        tracing::debug!("Saved {} {} records", records.len(), R::COLLECTION);
        Ok(())
    }

    fn append(&self, record: &R) -> CatalogResult<()> {
        let line = self.format.encode_line(record)?;
        let dir = self.dir();
        fs::create_dir_all(dir).map_err(|e| CatalogError::io(dir, e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CatalogError::io(&self.path, e))?;

        // Hand-edited files may lack the final newline
        let mut data = Vec::with_capacity(line.len() + 1);
        if !ends_with_newline(&mut file).map_err(|e| CatalogError::io(&self.path, e))? {
            data.push(b'\n');
        }
        data.extend_from_slice(&line);
        file.write_all(&data)
            .map_err(|e| CatalogError::io(&self.path, e))
    }
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
