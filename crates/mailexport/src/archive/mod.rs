//! Compressed MMDF month archives
//!
//! Directory structure produced for a folder named `Inbox`:
//! ```text
//! out/
//!   Inbox_202301.mmdf.gz     # every message created in January 2023
//!   Inbox_202302.mmdf.gz
//! ```

pub mod frame;
mod writer;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

pub use frame::{POSTMARK, split_frames, write_frame};
pub use writer::{ArchiveMonth, ArchiveWriter, archive_file_name};

/// Compression applied to archive files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Gzip,
    Zstd,
}

impl Compression {
    /// File extension for archives using this compression
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Gzip => "mmdf.gz",
            Compression::Zstd => "mmdf.zst",
        }
    }

    /// Detect the compression of an archive from its file name
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "gz" => Some(Compression::Gzip),
            "zst" => Some(Compression::Zstd),
            _ => None,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::Gzip => f.write_str("gzip"),
            Compression::Zstd => f.write_str("zstd"),
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Compression::Gzip),
            "zstd" | "zst" => Ok(Compression::Zstd),
            other => Err(format!("unknown compression '{}', expected gzip or zstd", other)),
        }
    }
}

/// Decompress an archive file
///
/// Concatenated compressed members are read as one stream.
pub fn decompress_archive(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    let compression = Compression::from_path(path)
        .ok_or_else(|| ArchiveError::UnknownFormat(path.to_path_buf()))?;
    let read_error = |source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = BufReader::new(File::open(path).map_err(read_error)?);
    let mut decompressed = Vec::new();
    let read = match compression {
        Compression::Gzip => MultiGzDecoder::new(file).read_to_end(&mut decompressed),
        Compression::Zstd => zstd::Decoder::with_buffer(file)
            .and_then(|mut decoder| decoder.read_to_end(&mut decompressed)),
    };
    read.map_err(read_error)?;

    Ok(decompressed)
}

/// Read every message payload from an archive file, in write order
pub fn read_archive(path: &Path) -> Result<Vec<Vec<u8>>, ArchiveError> {
    let decompressed = decompress_archive(path)?;
    Ok(split_frames(&decompressed)?
        .into_iter()
        .map(<[u8]>::to_vec)
        .collect())
}
