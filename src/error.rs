//! Error types for folder merging

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a failed merge run
#[derive(Error, Debug)]
pub enum Error {
    /// The input directory holds no `.pdf` entries
    #[error("No PDF files found in the '{}' folder.", .0.display())]
    NoInputFiles(PathBuf),

    /// Any failure while creating, listing, appending or writing
    #[error("{cause}")]
    MergeFailure {
        #[from]
        cause: FailureCause,
    },
}

impl Error {
    /// The underlying cause when this is a merge failure
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            Error::MergeFailure { cause } => Some(cause),
            Error::NoInputFiles(_) => None,
        }
    }
}

/// What went wrong inside a merge run, one variant per step
#[derive(Error, Debug)]
pub enum FailureCause {
    /// Output directory could not be created
    #[error("cannot create output folder '{}': {source}", path.display())]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input directory could not be listed
    #[error("cannot read input folder '{}': {source}", path.display())]
    ReadInputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A candidate file could not be loaded as a PDF
    #[error("cannot append '{}': {source}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// A loaded PDF has a page tree lopdf cannot walk
    #[error("cannot append '{}': {reason}", path.display())]
    Structure { path: PathBuf, reason: String },

    /// Serializing the merged document failed
    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FailureCause {
    pub(crate) fn write(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        FailureCause::Write {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Path of the file or folder the failing step was working on
    pub fn path(&self) -> &std::path::Path {
        match self {
            FailureCause::CreateOutputDir { path, .. }
            | FailureCause::ReadInputDir { path, .. }
            | FailureCause::Append { path, .. }
            | FailureCause::Structure { path, .. }
            | FailureCause::Write { path, .. } => path,
        }
    }
}
