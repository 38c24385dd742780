use serde::Serialize;

/// What a measure node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A LAG row without indicators.
    Lag,
    /// A LEAD row without indicators.
    Lead,
    /// Rollup synthesized from a LAG or LEAD and its indicator rows.
    Average,
    /// One row of an indicator group (the head row is the first one).
    Indicator,
}

/// One measure card: aggregated numbers for a window plus its LEADs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// Achieved value.
    pub value: f64,
    pub target: f64,
    /// Percentage-point change in achievement rate vs the previous window.
    pub trend: f64,
    pub is_less_better: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_number: Option<usize>,
    /// LEAD cards of a LAG; an average LEAD is followed by its indicators.
    pub leads: Vec<MeasureNode>,
}

impl MeasureNode {
    pub fn is_average(&self) -> bool {
        self.kind == NodeKind::Average
    }

    pub fn has_leads(&self) -> bool {
        !self.leads.is_empty()
    }
}
