use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::date_util::{quarter_months, quarter_of, MONTHS_PER_YEAR};
use crate::error::{Error, Result};

static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap());
static RE_QUARTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d{4})-)?[Qq]([1-4])$").unwrap());
static RE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{1,2})\s*\.\.\s*(\d{4}-\d{1,2})$").unwrap());

/// A calendar month selection (`YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    /// 1-12.
    pub month: u8,
}

impl MonthKey {
    pub fn new(year: i32, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(d: NaiveDate) -> Self {
        Self {
            year: d.year(),
            month: d.month() as u8,
        }
    }

    /// Parse `YYYY-MM`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let caps = RE_MONTH
            .captures(s)
            .ok_or_else(|| Error::WindowParse(format!("invalid month: {s}")))?;
        let year: i32 = caps[1].parse().unwrap();
        let month: u8 = caps[2].parse().unwrap();
        Self::new(year, month).ok_or_else(|| Error::WindowParse(format!("invalid month: {s}")))
    }

    /// 0-based column index of this month in a plan row.
    pub fn index(&self) -> usize {
        self.month as usize - 1
    }

    pub fn to_key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// The kind of window, without its selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Monthly,
    Quarterly,
    Cumulative,
    All,
}

impl WindowKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(WindowKind::Monthly),
            "quarterly" | "quarter" => Ok(WindowKind::Quarterly),
            "cumulative" | "range" => Ok(WindowKind::Cumulative),
            "all" => Ok(WindowKind::All),
            other => Err(Error::WindowParse(format!("unknown period kind: {other}"))),
        }
    }
}

/// The time range a row's monthly values are combined over.
///
/// Only one kind is active at a time; moving to another kind drops the
/// previous kind's selections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimeWindow {
    /// One or more explicit months.
    Monthly(Vec<MonthKey>),
    /// One or more quarters (1-4).
    Quarterly(Vec<u8>),
    /// Inclusive month range.
    Cumulative { start: MonthKey, end: MonthKey },
    /// All twelve months.
    #[default]
    All,
}

impl TimeWindow {
    /// Parse a window string.
    ///
    /// Supported formats:
    /// - `all` (or empty): all twelve months
    /// - `2025-03` / `2025-01,2025-02`: monthly
    /// - `Q1` / `2025-Q2` / `Q1,Q2`: quarterly
    /// - `2025-01..2025-06`: cumulative range
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(TimeWindow::All);
        }

        if let Some(caps) = RE_RANGE.captures(s) {
            let start = MonthKey::parse(&caps[1])?;
            let end = MonthKey::parse(&caps[2])?;
            return Ok(TimeWindow::Cumulative { start, end });
        }

        let parts: Vec<&str> = s.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();

        if parts.iter().all(|p| RE_QUARTER.is_match(p)) {
            let quarters = parts
                .iter()
                .filter_map(|p| RE_QUARTER.captures(p))
                .map(|caps| caps[2].parse::<u8>().unwrap())
                .collect();
            return Ok(TimeWindow::Quarterly(quarters));
        }

        if parts.iter().all(|p| RE_MONTH.is_match(p)) {
            let months = parts
                .iter()
                .map(|p| MonthKey::parse(p))
                .collect::<Result<Vec<_>>>()?;
            return Ok(TimeWindow::Monthly(months));
        }

        Err(Error::WindowParse(format!("unrecognized window: {s}")))
    }

    /// Default selection for a window kind as of `today`: the current month,
    /// the current quarter, or January through the current month.
    pub fn default_for(kind: WindowKind, today: NaiveDate) -> Self {
        match kind {
            WindowKind::Monthly => TimeWindow::Monthly(vec![MonthKey::of(today)]),
            WindowKind::Quarterly => TimeWindow::Quarterly(vec![quarter_of(today)]),
            WindowKind::Cumulative => TimeWindow::Cumulative {
                start: MonthKey {
                    year: today.year(),
                    month: 1,
                },
                end: MonthKey::of(today),
            },
            WindowKind::All => TimeWindow::All,
        }
    }

    pub fn kind(&self) -> WindowKind {
        match self {
            TimeWindow::Monthly(_) => WindowKind::Monthly,
            TimeWindow::Quarterly(_) => WindowKind::Quarterly,
            TimeWindow::Cumulative { .. } => WindowKind::Cumulative,
            TimeWindow::All => WindowKind::All,
        }
    }

    /// Sorted, de-duplicated 0-based month indices covered by the window.
    ///
    /// An empty monthly or quarterly selection covers the whole year; an
    /// inverted cumulative range covers nothing.
    pub fn month_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            TimeWindow::Monthly(months) if !months.is_empty() => {
                months.iter().map(MonthKey::index).collect()
            }
            TimeWindow::Quarterly(quarters) if !quarters.is_empty() => quarters
                .iter()
                .flat_map(|q| quarter_months(*q))
                .collect(),
            TimeWindow::Cumulative { start, end } => (start.index()..=end.index()).collect(),
            _ => (0..MONTHS_PER_YEAR).collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The immediately preceding comparable window, if any.
    ///
    /// Monthly and quarterly windows step back from their first selection;
    /// January and Q1 have no predecessor. A cumulative range maps to the
    /// block of equal length before it, clipped at January. `All` has none.
    pub fn previous(&self) -> Option<TimeWindow> {
        match self {
            TimeWindow::Monthly(months) => {
                let first = months.first()?;
                let prev = MonthKey::new(first.year, first.month.checked_sub(1)?)?;
                Some(TimeWindow::Monthly(vec![prev]))
            }
            TimeWindow::Quarterly(quarters) => {
                let first = *quarters.first()?;
                (first > 1).then(|| TimeWindow::Quarterly(vec![first - 1]))
            }
            TimeWindow::Cumulative { start, end } => {
                let len = end.month as i32 - start.month as i32 + 1;
                let prev_start = (start.month as i32 - len).max(1);
                let prev_end = start.month as i32 - 1;
                if prev_end < prev_start {
                    return None;
                }
                Some(TimeWindow::Cumulative {
                    start: MonthKey::new(start.year, prev_start as u8)?,
                    end: MonthKey::new(start.year, prev_end as u8)?,
                })
            }
            TimeWindow::All => None,
        }
    }

    /// Canonical string form, accepted back by `parse`.
    pub fn to_key(&self) -> String {
        match self {
            TimeWindow::Monthly(months) => months
                .iter()
                .map(MonthKey::to_key)
                .collect::<Vec<_>>()
                .join(","),
            TimeWindow::Quarterly(quarters) => quarters
                .iter()
                .map(|q| format!("Q{q}"))
                .collect::<Vec<_>>()
                .join(","),
            TimeWindow::Cumulative { start, end } => {
                format!("{}..{}", start.to_key(), end.to_key())
            }
            TimeWindow::All => "all".to_string(),
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}
