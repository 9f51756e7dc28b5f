use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local, LocalResult, TimeZone, Utc};
use saffron::Cron;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::fs::file_metadata;

/// Decides from a file's path whether it must be rotated before `buf` is
/// appended to it.
pub trait FileTrigger: Send {
    /// Returns `true` if the file at `path` must be rotated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected or the policy
    /// rejects the write.
    fn trigger(&mut self, path: &Path, buf: &[u8]) -> Result<bool>;
}

impl<T: FileTrigger + ?Sized> FileTrigger for Box<T> {
    fn trigger(&mut self, path: &Path, buf: &[u8]) -> Result<bool> {
        (**self).trigger(path, buf)
    }
}

/// Rotates once the file would reach `max_size` bytes.
///
/// The boundary is inclusive: a write that would bring the file to exactly
/// `max_size` rotates first, so the writer never lets a file reach the
/// maximum. A single write longer than `max_size` is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeTrigger {
    max_size: u64,
}

impl SizeTrigger {
    /// Creates a trigger for files of at most `max_size` bytes.
    #[must_use]
    pub const fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    /// The configured maximum.
    #[must_use]
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }
}

impl FileTrigger for SizeTrigger {
    fn trigger(&mut self, path: &Path, buf: &[u8]) -> Result<bool> {
        let len = buf.len() as u64;
        if len > self.max_size {
            return Err(Error::WriteTooLarge {
                len,
                max: self.max_size,
            });
        }

        let size = file_metadata(path)?.len();
        Ok(size.saturating_add(len) >= self.max_size)
    }
}

/// Rotates whenever a cron boundary has passed.
///
/// The first boundary is computed lazily from the file's modification time,
/// so a file left over from an earlier run rotates on the first write if a
/// boundary passed since it was last written. When several boundaries
/// elapsed between two writes the trigger fires once and skips ahead to the
/// first boundary still in the future.
///
/// Boundaries are wall-clock times in the trigger's time zone, local time
/// by default, matching the timestamps in rotated file names. A boundary
/// that falls in a daylight-saving gap is skipped; one that occurs twice
/// fires at its first occurrence.
pub struct ScheduleTrigger<C = SystemClock, Z = Local> {
    expression: String,
    clock: C,
    zone: Z,
    state: Option<Schedule>,
}

struct Schedule {
    cron: Cron,
    rotate_at: DateTime<Utc>,
}

impl<C, Z> fmt::Debug for ScheduleTrigger<C, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleTrigger")
            .field("expression", &self.expression)
            .field("rotate_at", &self.state.as_ref().map(|s| s.rotate_at))
            .finish_non_exhaustive()
    }
}

impl ScheduleTrigger {
    /// Creates a trigger for a five-field cron `expression` using the
    /// system clock. The expression is validated on first use.
    pub fn new(expression: impl Into<String>) -> Self {
        Self::with_clock(expression, SystemClock)
    }
}

impl<C: Clock> ScheduleTrigger<C> {
    /// Creates a trigger reading the current time from `clock`.
    pub fn with_clock(expression: impl Into<String>, clock: C) -> Self {
        Self {
            expression: expression.into(),
            clock,
            zone: Local,
            state: None,
        }
    }
}

impl<C: Clock, Z: TimeZone + Send> ScheduleTrigger<C, Z> {
    /// Evaluates the expression in `zone` instead of local time.
    #[must_use]
    pub fn in_time_zone<T: TimeZone + Send>(self, zone: T) -> ScheduleTrigger<C, T> {
        ScheduleTrigger {
            expression: self.expression,
            clock: self.clock,
            zone,
            state: None,
        }
    }

    /// The cron expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The next rotation instant, once anchored.
    #[must_use]
    pub fn rotate_at(&self) -> Option<DateTime<Utc>> {
        self.state.as_ref().map(|schedule| schedule.rotate_at)
    }

    fn anchor(&self, path: &Path) -> Result<Schedule> {
        let cron = parse_cron(&self.expression)?;
        let modified = file_metadata(path)?
            .modified()
            .map_err(|e| Error::Io("error reading modification time", e))?;
        let rotate_at = self.next_after(&cron, DateTime::<Utc>::from(modified))?;

        debug!(path = %path.display(), %rotate_at, "anchored rotation schedule");
        Ok(Schedule { cron, rotate_at })
    }

    /// First boundary strictly after `instant`.
    ///
    /// The cron is matched against wall-clock readings of `zone`, expressed
    /// as naive UTC values, and the match is mapped back to an instant.
    fn next_after(&self, cron: &Cron, instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut wall = instant.with_timezone(&self.zone).naive_local();
        loop {
            let next = cron
                .next_after(wall.and_utc())
                .ok_or_else(|| Error::ScheduleExhausted(self.expression.clone()))?
                .naive_utc();
            match self.zone.from_local_datetime(&next) {
                LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => {
                    return Ok(at.with_timezone(&Utc));
                }
                LocalResult::None => wall = next,
            }
        }
    }
}

impl<C: Clock, Z: TimeZone + Send> FileTrigger for ScheduleTrigger<C, Z> {
    fn trigger(&mut self, path: &Path, _buf: &[u8]) -> Result<bool> {
        let mut schedule = match self.state.take() {
            Some(schedule) => schedule,
            None => self.anchor(path)?,
        };

        let now = self.clock.now();
        let mut fire = false;
        while now > schedule.rotate_at {
            fire = true;
            schedule.rotate_at = self.next_after(&schedule.cron, schedule.rotate_at)?;
        }

        self.state = Some(schedule);
        Ok(fire)
    }
}

/// Parses a five-field cron expression.
pub(crate) fn parse_cron(expression: &str) -> Result<Cron> {
    expression
        .parse::<Cron>()
        .map_err(|e| Error::Schedule {
            expression: expression.to_string(),
            reason: format!("{e:?}"),
        })
}
