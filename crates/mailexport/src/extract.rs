//! Per-item message extraction
//!
//! Translates one item handle into converted message bytes plus the item's
//! creation time, classifying every failure so the export loop can decide
//! whether to skip the item or stop.

use chrono::{DateTime, Utc};
use log::debug;

use crate::convert::{ConversionStream, MessageConverter};
use crate::error::ExtractError;
use crate::source::MailItem;

/// Message classes with this prefix are scheduling responses and are not exported
pub const MEETING_RESPONSE_PREFIX: &str = "IPM.Schedule.Meeting.Resp.";

/// Converted message bytes owned by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub data: Vec<u8>,
    pub created: DateTime<Utc>,
}

/// Outcome of extracting one item
#[derive(Debug)]
pub enum Extraction {
    /// Converted bytes ready to archive
    Message(ExtractedMessage),
    /// Nothing to write: a filtered class or an empty conversion
    Empty,
    /// This item failed; later items may still succeed
    Failed(ExtractError),
    /// The item's backing object is unreadable; no further items should be tried
    Stop(ExtractError),
}

/// Extract one item through the conversion collaborator
///
/// The stream is reset first and reused; the converted bytes are copied out
/// before returning since the stream memory is overwritten by the next item.
pub fn extract_message<I, V>(
    item: &I,
    converter: &mut V,
    stream: &mut dyn ConversionStream,
) -> Extraction
where
    I: MailItem,
    V: MessageConverter<I::Native> + ?Sized,
{
    if let Err(e) = stream.reset() {
        return Extraction::Failed(ExtractError::Stream(e));
    }

    match item.message_class() {
        Ok(class) if class.starts_with(MEETING_RESPONSE_PREFIX) => {
            debug!("Skipping {}", class);
            return Extraction::Empty;
        }
        Ok(_) => {}
        Err(e) => debug!("Message class unreadable: {}", e),
    }

    let created = item.creation_time();

    let native = match item.native() {
        Ok(native) => native,
        Err(e) => return Extraction::Stop(e.into()),
    };

    let created = match created {
        Ok(created) => created,
        Err(e) => return Extraction::Failed(e.into()),
    };

    if let Err(e) = converter.to_mime(&native, stream) {
        return Extraction::Failed(e.into());
    }

    let size = stream.position();
    if size == 0 {
        return Extraction::Empty;
    }

    let contents = match stream.contents() {
        Ok(contents) => contents,
        Err(e) => return Extraction::Failed(ExtractError::Stream(e)),
    };
    let Some(bytes) = usize::try_from(size).ok().and_then(|n| contents.get(..n)) else {
        return Extraction::Failed(ExtractError::Truncated {
            size,
            available: contents.len(),
        });
    };

    Extraction::Message(ExtractedMessage {
        data: bytes.to_vec(),
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{MemoryStream, RawConverter};
    use crate::error::{ConvertError, SourceError};
    use crate::source::memory::MemoryItem;
    use chrono::TimeZone;
    use std::io::{self, Write};
    use std::rc::Rc;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 5, 9, 0, 0).unwrap()
    }

    fn note(body: &[u8]) -> MemoryItem {
        MemoryItem::new("Hello", "IPM.Note", created(), body.to_vec())
    }

    struct FailingConverter;

    impl MessageConverter<Rc<[u8]>> for FailingConverter {
        fn to_mime(
            &mut self,
            _message: &Rc<[u8]>,
            _stream: &mut dyn ConversionStream,
        ) -> Result<(), ConvertError> {
            Err(ConvertError::Failed("MAPI_E_NO_SUPPORT".to_string()))
        }
    }

    /// Reports a byte count larger than the memory it exposes
    struct LyingStream;

    impl Write for LyingStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ConversionStream for LyingStream {
        fn reset(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn position(&self) -> u64 {
            10
        }

        fn contents(&self) -> io::Result<&[u8]> {
            Ok(&b"short"[..])
        }
    }

    #[test]
    fn test_message_extracted() {
        let mut stream = MemoryStream::new();
        let item = note(b"Subject: Hello\r\n\r\nhi");
        let outcome = extract_message(&item, &mut RawConverter, &mut stream);

        match outcome {
            Extraction::Message(message) => {
                assert_eq!(message.data, b"Subject: Hello\r\n\r\nhi");
                assert_eq!(message.created, created());
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_reused_stream_copies_exact_length() {
        let mut stream = MemoryStream::new();
        let long = note(b"a much longer first message body");
        let short = note(b"tiny");

        assert!(matches!(
            extract_message(&long, &mut RawConverter, &mut stream),
            Extraction::Message(_)
        ));
        match extract_message(&short, &mut RawConverter, &mut stream) {
            Extraction::Message(message) => assert_eq!(message.data, b"tiny"),
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_meeting_response_is_filtered() {
        let mut stream = MemoryStream::new();
        let item = MemoryItem::new(
            "Accepted: Sync",
            "IPM.Schedule.Meeting.Resp.Pos",
            created(),
            b"body".to_vec(),
        );

        let outcome = extract_message(&item, &mut FailingConverter, &mut stream);
        assert!(matches!(outcome, Extraction::Empty));
    }

    #[test]
    fn test_meeting_request_is_not_filtered() {
        let mut stream = MemoryStream::new();
        let item = MemoryItem::new(
            "Sync",
            "IPM.Schedule.Meeting.Request",
            created(),
            b"x".to_vec(),
        );
        assert!(matches!(
            extract_message(&item, &mut RawConverter, &mut stream),
            Extraction::Message(_)
        ));
    }

    #[test]
    fn test_unreadable_native_stops() {
        let mut stream = MemoryStream::new();
        let item = note(b"x").unreadable_native();

        let outcome = extract_message(&item, &mut RawConverter, &mut stream);
        assert!(matches!(
            outcome,
            Extraction::Stop(ExtractError::Source(SourceError::Property { name: "MAPIOBJECT", .. }))
        ));
    }

    #[test]
    fn test_unreadable_native_wins_over_missing_time() {
        let mut stream = MemoryStream::new();
        let item = note(b"x").without_creation_time().unreadable_native();
        assert!(matches!(
            extract_message(&item, &mut RawConverter, &mut stream),
            Extraction::Stop(_)
        ));
    }

    #[test]
    fn test_missing_creation_time_fails_softly() {
        let mut stream = MemoryStream::new();
        let item = note(b"x").without_creation_time();
        assert!(matches!(
            extract_message(&item, &mut RawConverter, &mut stream),
            Extraction::Failed(ExtractError::Source(_))
        ));
    }

    #[test]
    fn test_conversion_failure_is_soft() {
        let mut stream = MemoryStream::new();
        let outcome = extract_message(&note(b"x"), &mut FailingConverter, &mut stream);
        assert!(matches!(outcome, Extraction::Failed(ExtractError::Convert(_))));
    }

    #[test]
    fn test_empty_conversion_writes_nothing() {
        let mut stream = MemoryStream::new();
        assert!(matches!(
            extract_message(&note(b""), &mut RawConverter, &mut stream),
            Extraction::Empty
        ));
    }

    #[test]
    fn test_short_stream_memory_fails() {
        let outcome = extract_message(&note(b"x"), &mut RawConverter, &mut LyingStream);
        assert!(matches!(
            outcome,
            Extraction::Failed(ExtractError::Truncated { size: 10, available: 5 })
        ));
    }
}
