//! # Time Window
//!
//! The range of finding timestamps a fetch covers, plus the short list of
//! recently used ranges offered next to the date picker.
//!
//! Bounds are inclusive at both ends. A range whose start and end are the
//! same instant is taken to mean "from then until now", so its end falls
//! back to the current time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CorrelationError, CorrelationResult};

/// Recently used ranges kept for quick selection.
pub const MAX_RECENT_WINDOWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window from explicit bounds. `start == end` means open-ended up to
    /// `now`; `start` after the resolved end is rejected.
    pub fn from_bounds(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CorrelationResult<Self> {
        let end = if start == end { now } else { end };
        if start > end {
            return Err(CorrelationError::InvalidWindow(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Every representable instant.
    pub fn unbounded() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Window check for an optional timestamp. Findings without one cannot
    /// be placed in time and are kept.
    pub fn admits(&self, ts: Option<DateTime<Utc>>) -> bool {
        ts.map_or(true, |ts| self.contains(ts))
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Most recent first, no duplicates, at most [`MAX_RECENT_WINDOWS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentWindows {
    windows: Vec<TimeWindow>,
}

impl RecentWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `window` to the front, dropping the oldest past the cap.
    pub fn record(&mut self, window: TimeWindow) {
        self.windows.retain(|w| *w != window);
        self.windows.insert(0, window);
        self.windows.truncate(MAX_RECENT_WINDOWS);
    }

    pub fn as_slice(&self) -> &[TimeWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
