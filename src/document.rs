//! Loading documents for the executor.

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Why a single document could not be used.
///
/// Never fatal to a query: the executor logs it, counts the file as failed
/// and moves on.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed XML in {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

impl LoadError {
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => LoadError::PermissionDenied(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    pub fn malformed(path: &Path, err: impl std::fmt::Display) -> Self {
        LoadError::Malformed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Source of raw document text.
///
/// Shared by every worker thread, so implementations must be `Sync`.
pub trait DocumentProvider: Sync {
    fn fetch(&self, path: &Path) -> Result<String, LoadError>;
}

/// Reads documents from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl DocumentProvider for FileSystem {
    fn fetch(&self, path: &Path) -> Result<String, LoadError> {
        std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))
    }
}

/// Parses document text, mapping failures to [`LoadError::Malformed`].
pub fn parse_document<'a>(
    path: &Path,
    text: &'a str,
) -> Result<roxmltree::Document<'a>, LoadError> {
    roxmltree::Document::parse(text).map_err(|e| LoadError::malformed(path, e))
}

/// Name shown for `FILE_NAME`: the final path component.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
