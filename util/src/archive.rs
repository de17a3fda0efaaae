//! CSV archiving functionality
//!
//! An [`Archiver`] appends timestamped records to a CSV file in the session's
//! archive directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::{Path, PathBuf};
use std::fs::{self, File};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    path: PathBuf,
    writer: Writer<File>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file {0:?}: {1}")]
    CreateError(PathBuf, std::io::Error),

    #[error("Cannot write to the archive: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {

    /// Create a new archiver at the given path, relative to the session's
    /// archive root.
    pub fn from_session<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        Self::from_path(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given file, creating any parent
    /// directories and truncating an existing file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;
        }

        let file = File::create(&path)
            .map_err(|e| ArchiveError::CreateError(path.clone(), e))?;

        Ok(Self {
            path,
            writer: WriterBuilder::new()
                .has_headers(true)
                .from_writer(file)
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer.serialize(record).map_err(ArchiveError::WriteError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
