//! Snapshot file
//!
//! Single-file key space made of named buckets, with closure-scoped read and
//! write transactions. A write transaction that returns `Ok` replaces the
//! whole file atomically; one that returns `Err` leaves it untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Result, StashError};

use super::format;

/// How a snapshot file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// File must exist; shared lock; only `view` is allowed
    ReadOnly,

    /// File is created empty if missing; exclusive lock
    ReadWrite,
}

// =============================================================================
// Bucket
// =============================================================================

/// A named section of the snapshot file: raw key → raw value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Bucket {
    /// Get the value under `key`
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Insert or overwrite; returns the previous value
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove `key`; returns the removed value
    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_slice(), value.as_slice()))
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Read-only view of the committed image
pub struct ReadTxn<'a> {
    buckets: &'a BTreeMap<String, Bucket>,
}

impl<'a> ReadTxn<'a> {
    pub fn bucket(&self, name: &str) -> Option<&'a Bucket> {
        self.buckets.get(name)
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }
}

/// Pending changes on top of the committed image
///
/// Buckets are copied from the committed image only when first mutated, so
/// deleting and recreating a large bucket never clones it.
pub struct WriteTxn<'a> {
    base: &'a BTreeMap<String, Bucket>,
    /// `None` marks a deleted bucket
    changes: BTreeMap<String, Option<Bucket>>,
}

impl<'a> WriteTxn<'a> {
    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        match self.changes.get(name) {
            Some(change) => change.as_ref(),
            None => self.base.get(name),
        }
    }

    pub fn bucket_mut(&mut self, name: &str) -> Option<&mut Bucket> {
        if !self.changes.contains_key(name) {
            let committed = self.base.get(name)?.clone();
            self.changes.insert(name.to_string(), Some(committed));
        }
        self.changes.get_mut(name).and_then(Option::as_mut)
    }

    /// Create an empty bucket; fails with `BucketExists` if present
    pub fn create_bucket(&mut self, name: &str) -> Result<&mut Bucket> {
        validate_bucket_name(name)?;
        if self.bucket(name).is_some() {
            return Err(StashError::BucketExists(name.to_string()));
        }
        let slot = self.changes.entry(name.to_string()).or_insert(None);
        Ok(slot.insert(Bucket::default()))
    }

    /// Delete a bucket; fails with `MissingBucket` if absent
    pub fn delete_bucket(&mut self, name: &str) -> Result<()> {
        if self.bucket(name).is_none() {
            return Err(StashError::MissingBucket(name.to_string()));
        }
        self.changes.insert(name.to_string(), None);
        Ok(())
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.image().into_iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Buckets as they would be committed, ordered by name
    fn image(&self) -> Vec<(&str, &Bucket)> {
        let mut names: BTreeSet<&str> = self.base.keys().map(String::as_str).collect();
        names.extend(self.changes.keys().map(String::as_str));
        names
            .into_iter()
            .filter_map(|name| self.bucket(name).map(|bucket| (name, bucket)))
            .collect()
    }
}

fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StashError::InvalidBucketName("empty name".to_string()));
    }
    if name.len() > u16::MAX as usize {
        return Err(StashError::InvalidBucketName(format!(
            "{} bytes long",
            name.len()
        )));
    }
    Ok(())
}

// =============================================================================
// SnapshotFile
// =============================================================================

/// Open handle on a snapshot file
///
/// The committed image is held in memory for the lifetime of the handle.
/// The lock on `{path}.lock` is released when the handle is dropped. A
/// read-only handle in a directory it cannot write holds no lock unless the
/// lock file already exists.
pub struct SnapshotFile {
    path: PathBuf,
    mode: OpenMode,
    buckets: BTreeMap<String, Bucket>,
    _lock: Option<File>,
}

impl SnapshotFile {
    /// Open a snapshot file
    ///
    /// - `ReadOnly`: missing file is an I/O error (`NotFound`)
    /// - `ReadWrite`: missing file is created with no buckets
    ///
    /// A malformed file yields `Corrupt` in both modes.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Report a missing file before leaving a lock file behind
        if mode == OpenMode::ReadOnly {
            fs::metadata(&path)?;
        }

        let lock = acquire_lock(&path, mode)?;

        let buckets = if mode == OpenMode::ReadWrite && !path.exists() {
            let buckets = BTreeMap::new();
            persist(&path, &[])?;
            tracing::debug!("Created empty snapshot file {}", path.display());
            buckets
        } else {
            let data = fs::read(&path)?;
            format::parse_image(&data)?
        };

        Ok(Self {
            path,
            mode,
            buckets,
            _lock: lock,
        })
    }

    /// Run a read transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T>,
    {
        f(&ReadTxn {
            buckets: &self.buckets,
        })
    }

    /// Run a write transaction
    ///
    /// The file is rewritten only if `f` returns `Ok`; the returned value is
    /// passed through after the commit is durable.
    pub fn update<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    {
        if self.mode == OpenMode::ReadOnly {
            return Err(StashError::ReadOnly);
        }

        let (value, changes) = {
            let mut txn = WriteTxn {
                base: &self.buckets,
                changes: BTreeMap::new(),
            };
            let value = f(&mut txn)?;

            let image = txn.image();
            let written = persist(&self.path, &image)?;
            tracing::debug!(
                "Committed snapshot {} ({} buckets, {} bytes)",
                self.path.display(),
                image.len(),
                written
            );
            drop(image);

            (value, txn.changes)
        };

        for (name, change) in changes {
            match change {
                Some(bucket) => {
                    self.buckets.insert(name, bucket);
                }
                None => {
                    self.buckets.remove(&name);
                }
            }
        }

        Ok(value)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

/// `{path}{suffix}`, e.g. `stashkv.db` → `stashkv.db.lock`
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn acquire_lock(path: &Path, mode: OpenMode) -> Result<Option<File>> {
    let lock_path = sidecar_path(path, ".lock");
    let lock_file = match OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
    {
        Ok(file) => file,
        Err(e) if mode == OpenMode::ReadOnly => match File::open(&lock_path) {
            Ok(file) => file,
            Err(fallback) if fallback.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(
                    "Lock file {} cannot be created ({}), reading {} unlocked",
                    lock_path.display(),
                    e,
                    path.display()
                );
                return Ok(None);
            }
            Err(_) => return Err(e.into()),
        },
        Err(e) => return Err(e.into()),
    };

    let locked = match mode {
        OpenMode::ReadOnly => FileExt::try_lock_shared(&lock_file).is_ok(),
        OpenMode::ReadWrite => FileExt::try_lock_exclusive(&lock_file).is_ok(),
    };
    if !locked {
        return Err(StashError::SnapshotLocked(path.to_path_buf()));
    }

    Ok(Some(lock_file))
}

/// Atomically replace the file at `path` with a new image
///
/// 1. Write the image to `{path}.tmp`
/// 2. Fsync the temporary file
/// 3. Rename it over `path`
/// 4. Fsync the parent directory so the rename is durable
fn persist(path: &Path, buckets: &[(&str, &Bucket)]) -> Result<u64> {
    let temp_path = sidecar_path(path, ".tmp");

    let written = write_temp(&temp_path, buckets).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        e
    })?;

    fs::rename(&temp_path, path)?;
    sync_parent_dir(path)?;

    Ok(written)
}

fn write_temp(temp_path: &Path, buckets: &[(&str, &Bucket)]) -> Result<u64> {
    let mut writer = BufWriter::new(File::create(temp_path)?);
    let written = format::write_image(&mut writer, buckets)?;
    writer.flush()?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(written)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
