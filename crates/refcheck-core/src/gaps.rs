//! Coverage-gap derivation.
//!
//! Occupation periods are ordered newest-first by effective start. The
//! uncovered stretches between consecutive periods, before the earliest one
//! and after the latest one, are candidate gaps. Candidates shorter than
//! [`MIN_REPORTED_GAP_DAYS`] are not worth asking about and are dropped.
//!
//! ```text
//!  window.start                                              today
//!      |--- before[2] ---[ p2 ]-- before[1] --[ p1 ]-[ p0 ]-- leading --|
//! ```
//!
//! The window start is fixed by `today`; a period that starts before it
//! never moves it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::dates::{CoverageWindow, add_days, inclusive_days};
use crate::identity::Handle;
use crate::model::{GapDetails, PeriodKind, PeriodReference};

/// Shortest uncovered stretch, in days counting both ends, that is reported.
pub const MIN_REPORTED_GAP_DAYS: i64 = 28;

/// Where a gap sits relative to the ordered occupation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapPosition {
    /// Between the most recent period (or the window start, if there are no
    /// periods) and today.
    Leading,
    /// Immediately before the period at `index` in the ordered list.
    Before { index: usize },
}

/// An uncovered inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub position: GapPosition,
}

impl Gap {
    #[must_use]
    pub fn days(&self) -> i64 {
        inclusive_days(self.start, self.end)
    }

    /// A new, unsaved Gap reference spanning exactly this range.
    #[must_use]
    pub fn to_reference(&self, handle: Handle) -> PeriodReference {
        PeriodReference::unsaved(
            handle,
            PeriodKind::Gap(GapDetails {
                gap_reason: String::new(),
                gap_activities: None,
                gap_support: None,
            }),
        )
        .with_dates(Some(self.start), Some(self.end))
    }
}

/// Occupations sorted by effective start, most recent first.
///
/// The sort is stable, so periods with equal effective starts keep their
/// input order.
#[must_use]
pub fn order_occupations(
    occupations: &[Arc<PeriodReference>],
    window: &CoverageWindow,
) -> Vec<Arc<PeriodReference>> {
    let mut keyed: Vec<(NaiveDate, Arc<PeriodReference>)> = occupations
        .iter()
        .map(|o| (o.effective_start(window), Arc::clone(o)))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, o)| o).collect()
}

/// Gap between the most recent activity and today.
#[must_use]
pub fn leading_gap(ordered: &[Arc<PeriodReference>], window: &CoverageWindow) -> Gap {
    let start = ordered
        .first()
        .map_or(window.start, |latest| add_days(latest.effective_end(window), 1));
    Gap {
        start,
        end: window.end,
        position: GapPosition::Leading,
    }
}

/// Gap immediately before `ordered[index]`, or `None` past the end.
///
/// The lower bound is the day after the next older period's end. For the
/// oldest period it is the day after the window start.
#[must_use]
pub fn preceding_gap(
    ordered: &[Arc<PeriodReference>],
    index: usize,
    window: &CoverageWindow,
) -> Option<Gap> {
    let period = ordered.get(index)?;
    let floor = ordered
        .get(index + 1)
        .map_or(window.start, |older| older.effective_end(window));
    Some(Gap {
        start: add_days(floor, 1),
        end: add_days(period.effective_start(window), -1),
        position: GapPosition::Before { index },
    })
}

/// All candidate gaps, leading first and then newest to oldest, keeping only
/// those at least `min_days` long.
#[must_use]
pub fn derive_gaps(
    ordered: &[Arc<PeriodReference>],
    window: &CoverageWindow,
    min_days: i64,
) -> Vec<Gap> {
    let candidates = std::iter::once(leading_gap(ordered, window))
        .chain((0..ordered.len()).filter_map(|i| preceding_gap(ordered, i, window)));

    let gaps: Vec<Gap> = candidates.filter(|gap| gap.days() >= min_days).collect();
    tracing::debug!(
        periods = ordered.len(),
        reported = gaps.len(),
        window_start = %window.start,
        window_end = %window.end,
        "derived coverage gaps"
    );
    gaps
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
