//! Pass-through converter for messages that are already MIME

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;

use super::{ConversionStream, MessageConverter};
use crate::error::ConvertError;

/// Copies message bytes into the stream unchanged
///
/// Used with the in-memory mailbox (native handle is the message bytes) and the
/// directory mailbox (native handle is the message file).
#[derive(Debug, Default)]
pub struct RawConverter;

impl RawConverter {
    pub fn new() -> Self {
        Self
    }
}

impl MessageConverter<Rc<[u8]>> for RawConverter {
    fn to_mime(
        &mut self,
        message: &Rc<[u8]>,
        stream: &mut dyn ConversionStream,
    ) -> Result<(), ConvertError> {
        stream.write_all(message)?;
        Ok(())
    }
}

impl MessageConverter<PathBuf> for RawConverter {
    fn to_mime(
        &mut self,
        message: &PathBuf,
        stream: &mut dyn ConversionStream,
    ) -> Result<(), ConvertError> {
        let mut file = File::open(message)?;
        io::copy(&mut file, stream)?;
        Ok(())
    }
}
