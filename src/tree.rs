//! Group plan rows into LAG → LEAD → indicator structure.
//!
//! A single forward pass over the rows: each LAG head takes the run of
//! blank-marker rows after it as indicators, then every LEAD group up to the
//! next LAG head. Groups reference rows by their position in the slice.

use serde::Serialize;

use crate::row::{Row, RowRole};

/// A LEAD head and its trailing indicator rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadGroup {
    /// 1-based display number within the owning LAG.
    pub number: usize,
    pub head: usize,
    /// Blank-marker rows following the head (the head itself not included).
    pub indicators: Vec<usize>,
}

/// A LAG head, its trailing indicator rows and its LEAD groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LagGroup {
    /// 1-based display number across the sheet.
    pub number: usize,
    pub head: usize,
    pub indicators: Vec<usize>,
    pub leads: Vec<LeadGroup>,
}

/// Shared by LAG and LEAD groups: a head row plus its indicator run.
pub trait IndicatorGroup {
    fn head(&self) -> usize;
    fn indicator_run(&self) -> &[usize];

    fn has_indicators(&self) -> bool {
        !self.indicator_run().is_empty()
    }

    /// All indicator rows: the head row first, then the run.
    fn indicator_rows(&self) -> Vec<usize> {
        std::iter::once(self.head())
            .chain(self.indicator_run().iter().copied())
            .collect()
    }
}

impl IndicatorGroup for LagGroup {
    fn head(&self) -> usize {
        self.head
    }

    fn indicator_run(&self) -> &[usize] {
        &self.indicators
    }
}

impl IndicatorGroup for LeadGroup {
    fn head(&self) -> usize {
        self.head
    }

    fn indicator_run(&self) -> &[usize] {
        &self.indicators
    }
}

/// Collect the contiguous blank-marker rows starting at `start`.
fn indicator_run(roles: &[RowRole], start: usize) -> Vec<usize> {
    (start..roles.len())
        .take_while(|&i| roles[i] == RowRole::Indicator)
        .collect()
}

/// Build the LAG forest from an ordered slice of rows.
pub fn build_tree(rows: &[Row]) -> Vec<LagGroup> {
    let roles: Vec<RowRole> = rows.iter().map(Row::role).collect();
    let mut groups = Vec::new();
    let mut i = 0;

    while i < roles.len() {
        if roles[i] != RowRole::LagHead {
            i += 1;
            continue;
        }

        let head = i;
        let indicators = indicator_run(&roles, head + 1);
        let mut cursor = head + 1 + indicators.len();

        let mut leads = Vec::new();
        while cursor < roles.len() {
            match roles[cursor] {
                RowRole::LagHead => break,
                RowRole::LeadHead => {
                    let lead_indicators = indicator_run(&roles, cursor + 1);
                    let next = cursor + 1 + lead_indicators.len();
                    leads.push(LeadGroup {
                        number: leads.len() + 1,
                        head: cursor,
                        indicators: lead_indicators,
                    });
                    cursor = next;
                }
                _ => cursor += 1,
            }
        }

        log::debug!(
            "LAG #{} '{}' at row {}: {} indicator(s), {} lead(s)",
            groups.len() + 1,
            rows[head].name,
            rows[head].index,
            indicators.len(),
            leads.len()
        );

        groups.push(LagGroup {
            number: groups.len() + 1,
            head,
            indicators,
            leads,
        });
        i = cursor;
    }

    groups
}
