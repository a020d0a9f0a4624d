//! Period math: the coverage window and boundary-corrected period dates.
//!
//! All arithmetic is on calendar dates (`NaiveDate`) taken in UTC, so there
//! are no daylight-saving discontinuities and no time-of-day to discard.

use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::PeriodReference;

/// Default length of the trailing window a background check must account for.
pub const DEFAULT_COVERAGE_YEARS: u32 = 5;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "today".
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Current UTC calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

// ---------------------------------------------------------------------------
// CoverageWindow
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` range the applicant's history must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CoverageWindow {
    /// Window of `years` years ending on `today`.
    #[must_use]
    pub fn ending(today: NaiveDate, years: u32) -> Self {
        Self {
            start: shift_years(today, -i64::from(years)),
            end: today,
        }
    }

    /// Five-year window ending on `today`.
    #[must_use]
    pub fn default_ending(today: NaiveDate) -> Self {
        Self::ending(today, DEFAULT_COVERAGE_YEARS)
    }

    #[must_use]
    pub fn days(&self) -> i64 {
        inclusive_days(self.start, self.end)
    }
}

/// Move `date` by whole years, keeping month and day. A day that does not
/// exist in the target month (29 February) is clamped to the month's last day.
#[must_use]
pub fn shift_years(date: NaiveDate, years: i64) -> NaiveDate {
    let months = u32::try_from(years.unsigned_abs().saturating_mul(12)).unwrap_or(u32::MAX);
    let shifted = if years >= 0 {
        date.checked_add_months(Months::new(months))
    } else {
        date.checked_sub_months(Months::new(months))
    };
    shifted.unwrap_or(if years >= 0 {
        NaiveDate::MAX
    } else {
        NaiveDate::MIN
    })
}

/// Add (or subtract) days, saturating at the representable range.
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(chrono::Duration::days(days))
        .unwrap_or(if days >= 0 {
            NaiveDate::MAX
        } else {
            NaiveDate::MIN
        })
}

/// Day count of `[start, end]` counting both ends. Zero or negative when
/// `end` precedes `start`.
#[must_use]
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Parse the leading `YYYY-MM-DD` of a date or datetime string.
///
/// `"2023-07-01T03:00:00+03:00"` yields 2023-07-01; the offset is ignored
/// the same way the form's date inputs ignore it.
#[must_use]
pub fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.trim().get(..10)?;
    let shaped = prefix.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// `YYYY-MM-DD`, zero padded.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

// ---------------------------------------------------------------------------
// Effective boundaries
// ---------------------------------------------------------------------------

/// Start date used for ordering and gap math.
///
/// Users sometimes type the end date into the start field because the form
/// runs newest-first. When both dates are present and inverted, the earlier
/// one is taken as the start. This only keeps gap math sane; the inversion is
/// still reported by input validation elsewhere.
#[must_use]
pub fn effective_start(period: &PeriodReference, window: &CoverageWindow) -> NaiveDate {
    match (period.start_date, period.end_date) {
        (None, _) => window.start,
        (Some(start), Some(end)) if end < start => end,
        (Some(start), _) => start,
    }
}

/// End date used for gap math. An open-ended period runs until today.
#[must_use]
pub fn effective_end(period: &PeriodReference, window: &CoverageWindow) -> NaiveDate {
    match (period.start_date, period.end_date) {
        (_, None) => window.end,
        (Some(start), Some(end)) if start > end => start,
        (_, Some(end)) => end,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
