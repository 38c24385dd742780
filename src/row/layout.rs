use serde::{Deserialize, Serialize};

use super::{Classification, RawRow, Row};
use crate::date_util::MONTHS_PER_YEAR;

/// Header text of the indicators column.
pub const DEFAULT_INDICATOR_HEADER: &str = "المؤشرات";

/// Column positions of a plan sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub type_column: usize,
    pub name_column: usize,
    pub indicator_column: usize,
    pub classification_column: usize,
    /// First monthly cell (January target).
    pub first_month_column: usize,
    /// Header used to locate the indicators column in the first row.
    pub indicator_header: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            type_column: 0,
            name_column: 1,
            indicator_column: 2,
            classification_column: 4,
            first_month_column: 12,
            indicator_header: DEFAULT_INDICATOR_HEADER.to_string(),
        }
    }
}

/// Header comparison ignores whitespace and case.
fn normalize_header(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn cell(raw: &[String], column: usize) -> &str {
    raw.get(column).map(|s| s.trim()).unwrap_or("")
}

impl SheetLayout {
    /// Locate the indicators column in a header row. Falls back to the
    /// configured column when the header is absent.
    pub fn indicator_column_for(&self, header: &[String]) -> usize {
        let wanted = normalize_header(&self.indicator_header);
        header
            .iter()
            .rposition(|h| normalize_header(h) == wanted)
            .unwrap_or(self.indicator_column)
    }

    /// Convert raw sheet rows to `Row`s. The first row is treated as a
    /// header for column detection but is still converted (it never
    /// classifies as a LAG or LEAD head).
    pub fn rows(&self, raw: &[RawRow]) -> Vec<Row> {
        let indicator_column = raw
            .first()
            .map(|header| self.indicator_column_for(header))
            .unwrap_or(self.indicator_column);
        log::debug!("indicator column resolved to {indicator_column}");

        raw.iter()
            .enumerate()
            .map(|(index, data)| self.row(index, data, indicator_column))
            .collect()
    }

    fn row(&self, index: usize, data: &[String], indicator_column: usize) -> Row {
        let end = (self.first_month_column + MONTHS_PER_YEAR * 2).min(data.len());
        let cells = data
            .get(self.first_month_column..end)
            .map(|s| s.to_vec())
            .unwrap_or_default();
        Row::new(
            index,
            cell(data, self.type_column),
            cell(data, self.name_column),
            Classification::parse(cell(data, self.classification_column)),
            cells,
        )
        .with_indicator_name(cell(data, indicator_column))
    }
}
