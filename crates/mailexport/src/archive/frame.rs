//! MMDF message framing
//!
//! Each message is written between two copies of [`POSTMARK`]:
//!
//! ```text
//! \x01\x01\x01\x01\n
//! <message bytes>
//! \x01\x01\x01\x01\n
//! ```
//!
//! Frames are concatenated with no other separator. The postmark is not
//! escaped inside message bytes; a message containing it verbatim will split
//! when read back.

use std::io::{self, Write};

use crate::error::ArchiveError;

/// Delimiter written before and after every message
pub const POSTMARK: &[u8; 5] = b"\x01\x01\x01\x01\n";

/// Write one framed message
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    writer.write_all(POSTMARK)?;
    writer.write_all(payload)?;
    writer.write_all(POSTMARK)
}

/// Split a decompressed archive back into message payloads, in order
pub fn split_frames(bytes: &[u8]) -> Result<Vec<&[u8]>, ArchiveError> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if !rest.starts_with(POSTMARK) {
            return Err(ArchiveError::Frame { offset });
        }
        let body_start = offset + POSTMARK.len();
        let body_len = find(&bytes[body_start..], POSTMARK)
            .ok_or(ArchiveError::Frame { offset })?;
        frames.push(&bytes[body_start..body_start + body_len]);
        offset = body_start + body_len + POSTMARK.len();
    }

    Ok(frames)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
