pub mod layout;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::date_util::MONTHS_PER_YEAR;

pub use layout::SheetLayout;

static RE_NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap()
});

/// A raw sheet row as delivered by a row source: one string per cell.
pub type RawRow = Vec<String>;

/// Parse a sheet cell as a number.
///
/// Thousands separators are stripped and the longest leading numeric prefix
/// is used, so `"1,250"` is 1250 and `"85%"` is 85. Blank or unparseable
/// cells are 0.
pub fn parse_cell(cell: &str) -> f64 {
    let cleaned: String = cell.trim().chars().filter(|c| *c != ',').collect();
    RE_NUMBER_PREFIX
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// How multiple months of a row are combined ("التمييز" column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Sum across months.
    #[default]
    Normal,
    /// Mean across months.
    Percentage,
    /// Mean across months with an inverted achievement rate.
    LessIsBetter,
    /// Latest value carried forward.
    Fixed,
}

impl Classification {
    /// Parse a classification tag. Unknown tags fall back to `Normal`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "نسبة" => Classification::Percentage,
            "عدد يقل" => Classification::LessIsBetter,
            "ثابت" => Classification::Fixed,
            other => match other.to_lowercase().as_str() {
                "percentage" => Classification::Percentage,
                "less-is-better" => Classification::LessIsBetter,
                "fixed" => Classification::Fixed,
                _ => Classification::Normal,
            },
        }
    }

    pub fn is_less_better(self) -> bool {
        self == Classification::LessIsBetter
    }

    /// Whether multiple months are averaged rather than summed.
    pub fn averages(self) -> bool {
        matches!(
            self,
            Classification::Percentage | Classification::LessIsBetter
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Normal => "normal",
            Classification::Percentage => "percentage",
            Classification::LessIsBetter => "less-is-better",
            Classification::Fixed => "fixed",
        }
    }
}

/// Structural role of a row in the plan sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRole {
    /// `LAG` marker with a name.
    LagHead,
    /// `LEAD` marker with a name.
    LeadHead,
    /// Blank marker: an indicator of the group above it.
    Indicator,
    /// Anything else (unnamed heads, headers, unknown markers).
    Other,
}

/// One target/achieved pair for a month.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonthCell {
    pub target: f64,
    pub achieved: f64,
}

impl MonthCell {
    /// A month is active once it has a positive target.
    pub fn is_active(&self) -> bool {
        self.target > 0.0
    }
}

/// One plan row. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// Position of the row in its source sheet.
    pub index: usize,
    pub type_marker: String,
    pub name: String,
    /// Label from the indicators column, used for indicator nodes.
    pub indicator_name: String,
    pub classification: Classification,
    /// Monthly cells: target and achieved for January through December.
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(
        index: usize,
        type_marker: impl Into<String>,
        name: impl Into<String>,
        classification: Classification,
        cells: Vec<String>,
    ) -> Self {
        Self {
            index,
            type_marker: type_marker.into(),
            name: name.into().trim().to_string(),
            indicator_name: String::new(),
            classification,
            cells,
        }
    }

    pub fn with_indicator_name(mut self, indicator_name: impl Into<String>) -> Self {
        self.indicator_name = indicator_name.into().trim().to_string();
        self
    }

    pub fn role(&self) -> RowRole {
        let marker = self.type_marker.trim();
        if marker.is_empty() {
            return RowRole::Indicator;
        }
        if self.name.is_empty() {
            return RowRole::Other;
        }
        if marker.eq_ignore_ascii_case("LAG") {
            RowRole::LagHead
        } else if marker.eq_ignore_ascii_case("LEAD") {
            RowRole::LeadHead
        } else {
            RowRole::Other
        }
    }

    /// Raw cell at a flat position (target of month i is `2i`, achieved `2i+1`).
    pub fn cell(&self, position: usize) -> &str {
        self.cells.get(position).map(String::as_str).unwrap_or("")
    }

    /// Parsed target/achieved pair for a 0-based month index.
    pub fn month(&self, index: usize) -> MonthCell {
        if index >= MONTHS_PER_YEAR {
            return MonthCell::default();
        }
        MonthCell {
            target: parse_cell(self.cell(index * 2)),
            achieved: parse_cell(self.cell(index * 2 + 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(marker: &str, name: &str) -> Row {
        Row::new(0, marker, name, Classification::Normal, vec![])
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("42"), 42.0);
        assert_eq!(parse_cell(" 3.5 "), 3.5);
        assert_eq!(parse_cell("1,250"), 1250.0);
        assert_eq!(parse_cell("85%"), 85.0);
        assert_eq!(parse_cell("-4"), -4.0);
        assert_eq!(parse_cell(".5"), 0.5);
        assert_eq!(parse_cell("1e3"), 1000.0);
    }

    #[test]
    fn test_parse_cell_garbage_is_zero() {
        assert_eq!(parse_cell(""), 0.0);
        assert_eq!(parse_cell("   "), 0.0);
        assert_eq!(parse_cell("n/a"), 0.0);
        assert_eq!(parse_cell("-"), 0.0);
    }

    #[test]
    fn test_classification_parse() {
        assert_eq!(Classification::parse("نسبة"), Classification::Percentage);
        assert_eq!(
            Classification::parse(" عدد يقل "),
            Classification::LessIsBetter
        );
        assert_eq!(Classification::parse("ثابت"), Classification::Fixed);
        assert_eq!(
            Classification::parse("Less-Is-Better"),
            Classification::LessIsBetter
        );
        assert_eq!(Classification::parse("fixed"), Classification::Fixed);
        assert_eq!(Classification::parse(""), Classification::Normal);
        assert_eq!(Classification::parse("عدد"), Classification::Normal);
    }

    #[test]
    fn test_row_role() {
        assert_eq!(row("LAG", "Revenue").role(), RowRole::LagHead);
        assert_eq!(row(" lag ", "Revenue").role(), RowRole::LagHead);
        assert_eq!(row("LEAD", "Calls").role(), RowRole::LeadHead);
        assert_eq!(row("", "Calls").role(), RowRole::Indicator);
        assert_eq!(row("  ", "").role(), RowRole::Indicator);
        assert_eq!(row("LAG", "  ").role(), RowRole::Other);
        assert_eq!(row("Header", "Name").role(), RowRole::Other);
    }

    #[test]
    fn test_month_reads_pairs() {
        let cells = vec!["10".into(), "8".into(), "".into(), "3".into()];
        let r = Row::new(0, "LAG", "X", Classification::Normal, cells);
        assert_eq!(r.month(0), MonthCell { target: 10.0, achieved: 8.0 });
        assert_eq!(r.month(1), MonthCell { target: 0.0, achieved: 3.0 });
        assert!(!r.month(1).is_active());
        // Missing trailing cells read as zero.
        assert_eq!(r.month(5), MonthCell::default());
        assert_eq!(r.month(12), MonthCell::default());
    }
}
