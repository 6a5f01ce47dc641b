//! Error types for the export pipeline
//!
//! Every collaborator call site classifies its own failure into one of these
//! types; the export engine is the only place that decides whether a failure
//! skips an item, stops the loop, or aborts the run.

use std::io;
use std::path::PathBuf;

/// Failure reported by the mailbox collaborator
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("property {name} unavailable: {reason}")]
    Property { name: &'static str, reason: String },

    #[error("failed to fetch item {position}: {reason}")]
    Fetch { position: usize, reason: String },

    #[error("item {position} is not a message handle")]
    UnexpectedKind { position: usize },

    #[error("failed to open sub-folder {position}: {reason}")]
    Subfolder { position: usize, reason: String },

    #[error("item collection unavailable: {0}")]
    Collection(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SourceError {
    pub fn property(name: &'static str, reason: impl ToString) -> Self {
        Self::Property {
            name,
            reason: reason.to_string(),
        }
    }
}

/// Failure reported by the conversion collaborator
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("conversion failed: {0}")]
    Failed(String),

    #[error("{0} is not supported by this converter")]
    Unsupported(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reason a single item could not be extracted
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("conversion stream: {0}")]
    Stream(#[source] io::Error),

    #[error("converter reported {size} bytes but the stream holds {available}")]
    Truncated { size: u64, available: usize },
}

/// Failure writing an archive file
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open archive {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to write archive {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to finish archive {}: {source}", path.display())]
    Finish { path: PathBuf, source: io::Error },

    #[error("failed to read archive {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("unrecognised archive extension: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("malformed frame at byte {offset}")]
    Frame { offset: usize },
}

/// Fatal run-level failure
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("folder {0} not found")]
    FolderNotFound(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir { path: PathBuf, source: io::Error },

    #[error("{source} ({saved} messages saved before the failure)")]
    Archive {
        #[source]
        source: ArchiveError,
        saved: usize,
    },
}
