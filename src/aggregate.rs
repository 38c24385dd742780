//! Period aggregation: combine a row's monthly (target, achieved) pairs over
//! a time window and compare against the preceding window.

use serde::Serialize;

use crate::row::{Classification, MonthCell, Row};
use crate::window::TimeWindow;

/// Combined target/achieved for one window, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub target: f64,
    pub achieved: f64,
}

impl Totals {
    /// Both sides zero: the measure has not started in this window.
    pub fn is_inactive(&self) -> bool {
        self.target == 0.0 && self.achieved == 0.0
    }
}

/// Aggregated numbers for one row over one window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Aggregate {
    pub value: f64,
    pub target: f64,
    pub trend: f64,
}

/// Aggregate a row over a window: normalized value/target plus the trend
/// against the preceding comparable window.
pub fn aggregate(row: &Row, window: &TimeWindow) -> Aggregate {
    let classification = row.classification;
    let current = combine(row, &window.month_indices(), classification);
    let previous = window
        .previous()
        .map(|prev| combine(row, &prev.month_indices(), classification))
        .unwrap_or_default();

    let trend = trend(current, previous, classification.is_less_better());
    let (value, target) = normalize(current.achieved, current.target);

    log::trace!(
        "row {} '{}' [{}] over {window}: current={current:?} previous={previous:?} trend={trend}",
        row.index,
        row.name,
        classification.as_str(),
    );

    Aggregate {
        value,
        target,
        trend,
    }
}

/// Combine the months at `indices` (sorted ascending) under a classification.
/// Only months with a positive target contribute.
pub fn combine(row: &Row, indices: &[usize], classification: Classification) -> Totals {
    let active: Vec<MonthCell> = indices
        .iter()
        .map(|&i| row.month(i))
        .filter(MonthCell::is_active)
        .collect();

    match classification {
        Classification::Fixed => match active.last() {
            Some(last) => Totals {
                target: last.target,
                achieved: last.achieved,
            },
            None => carry_forward(row, indices.first().copied().unwrap_or(0)),
        },
        c if c.averages() && !active.is_empty() => {
            let n = active.len() as f64;
            Totals {
                target: active.iter().map(|m| m.target).sum::<f64>() / n,
                achieved: active.iter().map(|m| m.achieved).sum::<f64>() / n,
            }
        }
        _ => Totals {
            target: active.iter().map(|m| m.target).sum(),
            achieved: active.iter().map(|m| m.achieved).sum(),
        },
    }
}

/// Nearest earlier non-zero target and, separately, nearest earlier non-zero
/// achieved value before month `first`.
fn carry_forward(row: &Row, first: usize) -> Totals {
    let earlier: Vec<MonthCell> = (0..first).rev().map(|i| row.month(i)).collect();
    Totals {
        target: earlier
            .iter()
            .map(|m| m.target)
            .find(|t| *t != 0.0)
            .unwrap_or(0.0),
        achieved: earlier
            .iter()
            .map(|m| m.achieved)
            .find(|a| *a != 0.0)
            .unwrap_or(0.0),
    }
}

/// Achievement rate in percent. Less-is-better rows invert the ratio.
pub fn rate(totals: Totals, less_is_better: bool) -> f64 {
    if totals.target <= 0.0 {
        return 0.0;
    }
    if less_is_better {
        if totals.achieved == 0.0 {
            0.0
        } else {
            totals.target / totals.achieved * 100.0
        }
    } else {
        totals.achieved / totals.target * 100.0
    }
}

/// Percentage-point change in achievement rate between two windows.
/// Zero when either window is inactive or there is no baseline rate.
pub fn trend(current: Totals, previous: Totals, less_is_better: bool) -> f64 {
    if current.is_inactive() || previous.is_inactive() {
        return 0.0;
    }
    let previous_rate = rate(previous, less_is_better);
    if previous_rate == 0.0 {
        return 0.0;
    }
    round2(rate(current, less_is_better) - previous_rate)
}

/// Round to two decimals, halves toward positive infinity.
pub fn round2(x: f64) -> f64 {
    (x * 100.0 + 0.5).floor() / 100.0
}

/// Normalize a (value, target) pair for display.
///
/// No target and no value is "Not Yet" (0, 0); no target with a positive
/// value is "Over Target" (value, 0).
pub fn normalize(value: f64, target: f64) -> (f64, f64) {
    let no_target = target == 0.0 || target.is_nan();
    if no_target && (value == 0.0 || value.is_nan()) {
        (0.0, 0.0)
    } else if no_target && value > 0.0 {
        (value, 0.0)
    } else {
        (value, target)
    }
}
