//! The per-item export loop

use std::time::Instant;

use log::{debug, info, warn};

use super::{ExportOptions, ExportStats, StopReason};
use crate::archive::ArchiveWriter;
use crate::convert::{ConversionStream, MessageConverter};
use crate::error::ExportError;
use crate::extract::{Extraction, extract_message};
use crate::range::ExportWindow;
use crate::source::{ItemSource, MailItem};

/// Export every item of `window` into `writer`
///
/// `items` must be sorted ascending by creation time so each month's archive
/// is produced once. Per-item failures are counted and skipped; an unreadable
/// item or repeated fetch failures end the loop early with the output written
/// so far kept. The writer is finalized before returning.
pub fn export_window<S, V>(
    items: &S,
    total: usize,
    window: ExportWindow,
    converter: &mut V,
    stream: &mut dyn ConversionStream,
    writer: &mut ArchiveWriter,
    options: &ExportOptions,
) -> Result<ExportStats, ExportError>
where
    S: ItemSource,
    V: MessageConverter<<S::Item as MailItem>::Native> + ?Sized,
{
    let started = Instant::now();
    let mut stats = ExportStats {
        window,
        ..Default::default()
    };

    let mut cursor = window.start;
    let mut failures = 0u32;

    let stop = loop {
        if cursor >= window.end || cursor >= total {
            break StopReason::Exhausted;
        }
        let position = cursor + 1;

        let item = match items.fetch(position) {
            Ok(item) => {
                failures = 0;
                item
            }
            Err(e) => {
                failures += 1;
                if failures > options.max_fetch_retries {
                    warn!("Giving up on item {} after {} attempts: {}", position, failures, e);
                    break StopReason::FetchFailed {
                        position,
                        attempts: failures,
                        reason: e.to_string(),
                    };
                }
                warn!("Failed to fetch item {}, retrying: {}", position, e);
                stats.fetch_retries += 1;
                continue;
            }
        };

        match extract_message(&item, converter, stream) {
            Extraction::Message(message) => {
                drop(item);
                match writer.submit(&message.data, message.created) {
                    Ok(rotated) => {
                        stats.saved += 1;
                        if rotated {
                            stream.trim();
                        }
                    }
                    Err(source) => {
                        if let Err(e) = writer.finalize() {
                            warn!("{}", e);
                        }
                        info!("{} emails saved", stats.saved);
                        return Err(ExportError::Archive {
                            source,
                            saved: stats.saved,
                        });
                    }
                }
            }
            Extraction::Empty => {
                debug!("Nothing to write for item {}", position);
                stats.skipped += 1;
            }
            Extraction::Failed(e) => {
                warn!("Skipping item {}{}: {}", position, describe(&item), e);
                stats.failed += 1;
            }
            Extraction::Stop(e) => {
                warn!("Item {} is unreadable, stopping{}: {}", position, describe(&item), e);
                break StopReason::Unreadable {
                    position,
                    reason: e.to_string(),
                };
            }
        }

        cursor += 1;
    };

    let finished = writer.finalize();
    info!("{} emails saved", stats.saved);
    finished.map_err(|source| ExportError::Archive {
        source,
        saved: stats.saved,
    })?;

    stats.archives = writer.written().to_vec();
    stats.stop = stop;
    stats.duration_ms = started.elapsed().as_millis() as u64;
    Ok(stats)
}

/// Subject and class of an item for log lines, when readable
fn describe<I: MailItem>(item: &I) -> String {
    match (item.subject(), item.message_class()) {
        (Ok(subject), Ok(class)) => format!(" \"{}\" ({})", subject, class),
        (Ok(subject), Err(_)) => format!(" \"{}\"", subject),
        (Err(_), Ok(class)) => format!(" ({})", class),
        (Err(_), Err(_)) => String::new(),
    }
}
