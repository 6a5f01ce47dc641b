//! Date range resolution over a sorted item collection
//!
//! Item collections are index-addressed and every property read is a round
//! trip to the mail client, so date bounds are located by binary search rather
//! than by scanning.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use log::{debug, info};

use crate::source::{ItemSource, MailItem};

/// Half-open index range `[start, end)` of items to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportWindow {
    pub start: usize,
    pub end: usize,
}

impl ExportWindow {
    /// Create a window; an `end` before `start` yields an empty window
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of items in the window; zero when `end` is before `start`
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Midnight UTC at the start of `day`
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Find the first item created strictly after `target`
///
/// `items` must already be sorted ascending by creation time. Returns a 0-based
/// index in `[0, count]`; `count` means no item is after `target`.
///
/// An item whose creation time cannot be read counts as not after the target,
/// so unreadable items sort as if they were early.
pub fn find_first_item_after<S: ItemSource>(
    items: &S,
    count: usize,
    target: DateTime<Utc>,
) -> usize {
    let is_after = |index: usize| -> bool {
        let position = index + 1;
        let item = match items.fetch(position) {
            Ok(item) => item,
            Err(e) => {
                debug!("Lookup at {} failed: {}", position, e);
                return false;
            }
        };
        match item.creation_time() {
            Ok(created) => {
                debug!("Lookup at {}: {}", position, created);
                created > target
            }
            Err(e) => {
                debug!("Lookup at {} has no creation time: {}", position, e);
                false
            }
        }
    };

    let mut low = 0;
    let mut high = count;
    while low < high {
        let mid = low + (high - low) / 2;
        if is_after(mid) {
            high = mid;
        } else {
            low = mid + 1;
        }
    }

    if low < count {
        debug!("Found item {} after {}", low, target);
    }
    low
}

/// Compute the export window for a sorted collection of `total` items
///
/// The start bound is inclusive of `start_day`; the end bound stops before the
/// first item created after midnight of `end_day`. The window never exceeds
/// `max_count` items or the collection size.
pub fn resolve_window<S: ItemSource>(
    items: &S,
    total: usize,
    start_day: Option<NaiveDate>,
    end_day: Option<NaiveDate>,
    max_count: usize,
) -> ExportWindow {
    let start = match start_day {
        Some(day) => {
            let position = find_first_item_after(items, total, day_start(day));
            info!("Starting from {} for {}", position, day.format("%Y%m%d"));
            position
        }
        None => 0,
    };

    let mut end = start.saturating_add(max_count);
    if let Some(day) = end_day {
        let position = find_first_item_after(items, total, day_start(day));
        info!("Stopping by {} for {}", position, day.format("%Y%m%d"));
        end = end.min(position);
    }

    ExportWindow::new(start, end.min(total))
}
