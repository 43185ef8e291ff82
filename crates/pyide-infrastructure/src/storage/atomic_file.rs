//! Whole-document files with crash-safe replacement.
//!
//! A document is always replaced as a unit: the new bytes go to a sibling
//! temp file, are synced, then renamed over the target. Readers observe the
//! old document or the new one, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Encoding of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    fn decode<T: DeserializeOwned>(self, text: &str) -> Result<T, AtomicFileError> {
        Ok(match self {
            FileFormat::Json => serde_json::from_str(text)?,
            FileFormat::Toml => toml::from_str(text)?,
        })
    }

    fn encode<T: Serialize>(self, value: &T) -> Result<String, AtomicFileError> {
        Ok(match self {
            FileFormat::Json => serde_json::to_string_pretty(value)?,
            FileFormat::Toml => toml::to_string_pretty(value)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum AtomicFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("cannot lock {path:?}: {source}")]
    Lock { path: PathBuf, source: io::Error },
}

impl From<AtomicFileError> for pyide_core::PyideError {
    fn from(err: AtomicFileError) -> Self {
        match err {
            AtomicFileError::Io(e) => e.into(),
            AtomicFileError::Json(e) => e.into(),
            AtomicFileError::TomlDe(e) => e.into(),
            AtomicFileError::TomlSer(e) => e.into(),
            lock @ AtomicFileError::Lock { .. } => pyide_core::PyideError::io(lock.to_string()),
        }
    }
}

/// Typed handle to one document file.
pub struct AtomicFile<T> {
    path: PathBuf,
    format: FileFormat,
    _document: PhantomData<fn() -> T>,
}

impl<T> AtomicFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf, format: FileFormat) -> Self {
        Self {
            path,
            format,
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. A missing or blank file is `Ok(None)`; anything
    /// that does not decode as `T` is an error.
    pub fn load(&self) -> Result<Option<T>, AtomicFileError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.format.decode(&text).map(Some)
    }

    /// Encodes `document` in this file's format.
    pub fn render(&self, document: &T) -> Result<String, AtomicFileError> {
        self.format.encode(document)
    }

    /// Replaces the document without taking the writer lock.
    pub fn save(&self, document: &T) -> Result<(), AtomicFileError> {
        let encoded = self.render(document)?;
        if let Some(dir) = self.parent_dir() {
            fs::create_dir_all(dir)?;
        }

        let staging = self.staging_path()?;
        let written = write_synced(&staging, encoded.as_bytes())
            .and_then(|()| fs::rename(&staging, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        sync_dir(self.parent_dir());
        Ok(())
    }

    /// Replaces the document while holding the cross-process writer lock.
    pub fn replace(&self, document: &T) -> Result<(), AtomicFileError> {
        let _guard = WriterLock::acquire(&self.path)?;
        self.save(document)
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Temp file next to the target, unique per process.
    fn staging_path(&self) -> Result<PathBuf, AtomicFileError> {
        let name = self.path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "document path has no file name")
        })?;
        Ok(self.path.with_file_name(format!(
            ".{}.{}.tmp",
            name.to_string_lossy(),
            std::process::id()
        )))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Persists the rename itself. Failures are ignored.
#[cfg(unix)]
fn sync_dir(dir: Option<&Path>) {
    if let Some(handle) = dir.and_then(|dir| File::open(dir).ok()) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: Option<&Path>) {}

/// Exclusive advisory lock on `<document>.lock`, released on drop.
struct WriterLock {
    file: File,
    path: PathBuf,
}

impl WriterLock {
    fn acquire(document: &Path) -> Result<Self, AtomicFileError> {
        let path = document.with_extension("lock");
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        fs2::FileExt::lock_exclusive(&file).map_err(|source| AtomicFileError::Lock {
            path: path.clone(),
            source,
        })?;
        Ok(Self { file, path })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = fs::remove_file(&self.path);
    }
}
