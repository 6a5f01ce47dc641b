//! Message conversion seam
//!
//! The conversion collaborator turns a native message object into MIME bytes,
//! writing them into a [`ConversionStream`]. One stream is acquired per run
//! and reused for every item; it is reset before each conversion.

mod raw;

use std::io::{self, Cursor, Write};

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

pub use raw::RawConverter;

/// Capacity kept by [`MemoryStream::trim`]
const RETAINED_CAPACITY: usize = 64 * 1024;

/// Reusable byte stream the converter writes into
///
/// Like a stream over global memory, resetting only rewinds the position; bytes
/// from earlier, longer conversions stay behind the new write position. Readers
/// must copy exactly [`ConversionStream::position`] bytes.
pub trait ConversionStream: Write {
    /// Rewind to the start
    fn reset(&mut self) -> io::Result<()>;

    /// Current write position, which is the byte count of the last conversion
    fn position(&self) -> u64;

    /// The stream's backing memory, valid until the next reset
    fn contents(&self) -> io::Result<&[u8]>;

    /// Release retained memory beyond a working size
    fn trim(&mut self) {}
}

/// In-process [`ConversionStream`] over a growable buffer
#[derive(Debug, Default)]
pub struct MemoryStream {
    cursor: Cursor<Vec<u8>>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ConversionStream for MemoryStream {
    fn reset(&mut self) -> io::Result<()> {
        self.cursor.set_position(0);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn contents(&self) -> io::Result<&[u8]> {
        Ok(self.cursor.get_ref())
    }

    fn trim(&mut self) {
        let buf = self.cursor.get_mut();
        buf.clear();
        buf.shrink_to(RETAINED_CAPACITY);
        self.cursor.set_position(0);
    }
}

/// MIME layout requested from the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    Rfc822,
    Rfc1521,
}

/// Transfer encoding for message bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyEncoding {
    SevenBit,
    QuotedPrintable,
    Base64,
}

/// Options applied to the converter once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub save_format: SaveFormat,
    pub encoding: BodyEncoding,
    /// Wrap plain-text bodies at this column; `None` disables wrapping
    pub wrap_width: Option<u32>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            save_format: SaveFormat::Rfc1521,
            encoding: BodyEncoding::QuotedPrintable,
            wrap_width: Some(74),
        }
    }
}

/// Converts native messages of type `N` into MIME bytes
pub trait MessageConverter<N> {
    /// Apply run-wide options
    fn configure(&mut self, _options: &ConversionOptions) -> Result<(), ConvertError> {
        Ok(())
    }

    /// Resolve addresses through the session's address book
    fn attach_address_book(&mut self) -> Result<(), ConvertError> {
        Err(ConvertError::Unsupported("address book resolution"))
    }

    /// Write `message` as MIME into `stream`, starting at its current position
    fn to_mime(
        &mut self,
        message: &N,
        stream: &mut dyn ConversionStream,
    ) -> Result<(), ConvertError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_stale_bytes() {
        let mut stream = MemoryStream::new();
        stream.write_all(b"a long first message").unwrap();
        stream.reset().unwrap();
        stream.write_all(b"short").unwrap();

        assert_eq!(stream.position(), 5);
        let contents = stream.contents().unwrap();
        assert_eq!(&contents[..5], b"short");
        assert!(contents.len() > 5);
    }

    #[test]
    fn test_trim_releases_memory() {
        let mut stream = MemoryStream::new();
        stream.write_all(&vec![0u8; RETAINED_CAPACITY * 4]).unwrap();
        stream.trim();

        assert_eq!(stream.position(), 0);
        assert!(stream.contents().unwrap().is_empty());
        assert!(stream.cursor.get_ref().capacity() < RETAINED_CAPACITY * 4);
    }

    #[test]
    fn test_default_options() {
        let options = ConversionOptions::default();
        assert_eq!(options.save_format, SaveFormat::Rfc1521);
        assert_eq!(options.encoding, BodyEncoding::QuotedPrintable);
        assert_eq!(options.wrap_width, Some(74));
    }

    #[test]
    fn test_options_from_json() {
        let options: ConversionOptions =
            serde_json::from_str(r#"{ "encoding": "base64", "wrap_width": null }"#).unwrap();
        assert_eq!(options.encoding, BodyEncoding::Base64);
        assert_eq!(options.save_format, SaveFormat::Rfc1521);
        assert_eq!(options.wrap_width, None);
    }
}
