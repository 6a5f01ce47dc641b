//! Month-rotating archive writer

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use flate2::write::GzEncoder;
use log::{info, warn};

use super::frame::write_frame;
use super::Compression;
use crate::error::ArchiveError;

/// Calendar month an archive file covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveMonth {
    pub year: i32,
    pub month: u32,
}

impl ArchiveMonth {
    pub fn of(timestamp: DateTime<Utc>) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }
}

/// File name for one month of a folder: `{folder}_{YYYYMM}.{ext}`
pub fn archive_file_name(folder: &str, month: ArchiveMonth, compression: Compression) -> String {
    format!(
        "{}_{:04}{:02}.{}",
        sanitize(folder),
        month.year,
        month.month,
        compression.extension()
    )
}

/// Replace characters that cannot appear in a file name
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

enum Encoder {
    Gzip(GzEncoder<BufWriter<File>>),
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
}

impl Encoder {
    fn new(file: File, compression: Compression) -> io::Result<Self> {
        let out = BufWriter::new(file);
        Ok(match compression {
            Compression::Gzip => Encoder::Gzip(GzEncoder::new(out, flate2::Compression::default())),
            Compression::Zstd => Encoder::Zstd(zstd::Encoder::new(out, 3)?),
        })
    }

    fn finish(self) -> io::Result<()> {
        let mut out = match self {
            Encoder::Gzip(encoder) => encoder.finish()?,
            Encoder::Zstd(encoder) => encoder.finish()?,
        };
        out.flush()
    }
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Gzip(encoder) => encoder.write(buf),
            Encoder::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Gzip(encoder) => encoder.flush(),
            Encoder::Zstd(encoder) => encoder.flush(),
        }
    }
}

struct OpenArchive {
    month: ArchiveMonth,
    path: PathBuf,
    encoder: Encoder,
}

/// Writes framed messages into one compressed file per calendar month
///
/// At most one file is open at a time. Submitting a message from a different
/// month finalizes the open file before the next one is created, so a
/// chronologically sorted stream produces each month's file exactly once.
pub struct ArchiveWriter {
    dir: PathBuf,
    folder: String,
    compression: Compression,
    current: Option<OpenArchive>,
    written: Vec<PathBuf>,
    opened: HashSet<ArchiveMonth>,
}

impl ArchiveWriter {
    pub fn new(dir: impl AsRef<Path>, folder: impl Into<String>, compression: Compression) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            folder: folder.into(),
            compression,
            current: None,
            written: Vec::new(),
            opened: HashSet::new(),
        }
    }

    /// Write one message dated `timestamp`
    ///
    /// Returns `true` when a previously open file was closed to make room for
    /// a new month.
    pub fn submit(
        &mut self,
        payload: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<bool, ArchiveError> {
        let month = ArchiveMonth::of(timestamp);

        let rotated = self
            .current
            .as_ref()
            .is_some_and(|open| open.month != month);
        if rotated {
            self.finalize()?;
        }

        if self.current.is_none() {
            self.current = Some(self.open(month)?);
        }

        if let Some(open) = self.current.as_mut() {
            write_frame(&mut open.encoder, payload).map_err(|source| ArchiveError::Write {
                path: open.path.clone(),
                source,
            })?;
        }

        Ok(rotated)
    }

    /// Flush and close the open file, if any
    pub fn finalize(&mut self) -> Result<(), ArchiveError> {
        let Some(open) = self.current.take() else {
            return Ok(());
        };
        open.encoder
            .finish()
            .map_err(|source| ArchiveError::Finish {
                path: open.path.clone(),
                source,
            })?;
        info!("Closed archive {}", open.path.display());
        Ok(())
    }

    /// Every archive file opened so far, in order of first use
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Whether a file is currently open
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    fn open(&mut self, month: ArchiveMonth) -> Result<OpenArchive, ArchiveError> {
        let path = self
            .dir
            .join(archive_file_name(&self.folder, month, self.compression));

        // Reopening a month later in the same run appends a new compressed
        // member; the first open of a month replaces any older file.
        let reopen = self.opened.contains(&month);
        let file = if reopen {
            OpenOptions::new().append(true).create(true).open(&path)
        } else {
            File::create(&path)
        };
        let encoder = file
            .and_then(|file| Encoder::new(file, self.compression))
            .map_err(|source| ArchiveError::Open {
                path: path.clone(),
                source,
            })?;
        self.opened.insert(month);

        if reopen {
            info!("Reopening file {}", path.display());
        } else {
            info!("Opening file {}", path.display());
            self.written.push(path.clone());
        }

        Ok(OpenArchive {
            month,
            path,
            encoder,
        })
    }
}

impl Drop for ArchiveWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::read_archive;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_file_name() {
        let month = ArchiveMonth::of(at(2023, 1, 5));
        assert_eq!(
            archive_file_name("Inbox", month, Compression::Gzip),
            "Inbox_202301.mmdf.gz"
        );
        assert_eq!(
            archive_file_name("Inbox", month, Compression::Zstd),
            "Inbox_202301.mmdf.zst"
        );
        assert_eq!(
            archive_file_name("A/B:C", month, Compression::Gzip),
            "A_B_C_202301.mmdf.gz"
        );
    }

    #[test]
    fn test_rotation_one_file_per_month() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::new(dir.path(), "Inbox", Compression::Gzip);

        assert!(!writer.submit(b"jan-1", at(2023, 1, 5)).unwrap());
        assert!(!writer.submit(b"jan-2", at(2023, 1, 20)).unwrap());
        assert!(writer.submit(b"feb-1", at(2023, 2, 2)).unwrap());
        assert!(writer.submit(b"apr-1", at(2023, 4, 1)).unwrap());
        assert!(writer.submit(b"jan-24", at(2024, 1, 1)).unwrap());
        writer.finalize().unwrap();

        let names: Vec<String> = writer
            .written()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "Inbox_202301.mmdf.gz",
                "Inbox_202302.mmdf.gz",
                "Inbox_202304.mmdf.gz",
                "Inbox_202401.mmdf.gz",
            ]
        );

        let january = read_archive(&writer.written()[0]).unwrap();
        assert_eq!(january, vec![b"jan-1".to_vec(), b"jan-2".to_vec()]);
        let april = read_archive(&writer.written()[2]).unwrap();
        assert_eq!(april, vec![b"apr-1".to_vec()]);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::new(dir.path(), "Inbox", Compression::Zstd);

        writer.finalize().unwrap();
        writer.submit(b"x", at(2023, 5, 1)).unwrap();
        assert!(writer.is_open());
        writer.finalize().unwrap();
        writer.finalize().unwrap();
        assert!(!writer.is_open());

        assert_eq!(read_archive(&writer.written()[0]).unwrap(), vec![b"x".to_vec()]);
    }

    #[test]
    fn test_same_month_revisited_appends() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::new(dir.path(), "Inbox", Compression::Gzip);

        writer.submit(b"first", at(2023, 1, 5)).unwrap();
        writer.submit(b"second", at(2023, 2, 5)).unwrap();
        writer.submit(b"late", at(2023, 1, 31)).unwrap();
        writer.finalize().unwrap();

        assert_eq!(writer.written().len(), 2);
        let january = read_archive(&writer.written()[0]).unwrap();
        assert_eq!(january, vec![b"first".to_vec(), b"late".to_vec()]);
    }

    #[test]
    fn test_existing_file_is_replaced() {
        let dir = tempdir().unwrap();
        let stale = dir.path().join("Inbox_202301.mmdf.gz");
        std::fs::write(&stale, vec![0xffu8; 4096]).unwrap();

        let mut writer = ArchiveWriter::new(dir.path(), "Inbox", Compression::Gzip);
        writer.submit(b"fresh", at(2023, 1, 5)).unwrap();
        writer.finalize().unwrap();

        assert_eq!(read_archive(&stale).unwrap(), vec![b"fresh".to_vec()]);
    }

    #[test]
    fn test_open_failure_reports_path() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::new(dir.path().join("missing"), "Inbox", Compression::Gzip);

        let err = writer.submit(b"x", at(2023, 1, 5)).unwrap_err();
        assert!(matches!(err, ArchiveError::Open { .. }));
        assert!(writer.written().is_empty());
    }

    #[test]
    fn test_month_usable_after_failed_open() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("late");
        let mut writer = ArchiveWriter::new(&target, "Inbox", Compression::Gzip);

        assert!(writer.submit(b"lost", at(2023, 1, 5)).is_err());
        assert!(!writer.is_open());

        std::fs::create_dir(&target).unwrap();
        assert!(!writer.submit(b"kept", at(2023, 1, 6)).unwrap());
        writer.finalize().unwrap();

        assert_eq!(writer.written(), [target.join("Inbox_202301.mmdf.gz")]);
        assert_eq!(read_archive(&writer.written()[0]).unwrap(), vec![b"kept".to_vec()]);
    }
}
