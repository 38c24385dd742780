use serde::Serialize;

use super::types::{MeasureNode, NodeKind};

/// Achievement percentage shown on a card.
///
/// A node without a target ("Not Yet") counts as 100. Less-is-better nodes
/// invert the ratio.
pub fn achievement_rate(node: &MeasureNode) -> f64 {
    if node.target == 0.0 {
        return 100.0;
    }
    if node.is_less_better {
        if node.value == 0.0 {
            0.0
        } else {
            node.target / node.value * 100.0
        }
    } else {
        node.value / node.target * 100.0
    }
}

/// Status badge for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    NotInPeriod,
    Perfect,
    OverTarget,
    OnTrack,
    OffTrack,
    AtRisk,
}

impl Status {
    pub fn of(node: &MeasureNode) -> Self {
        if node.target == 0.0 {
            return Status::NotInPeriod;
        }
        Self::from_rate(achievement_rate(node))
    }

    pub fn from_rate(rate: f64) -> Self {
        if rate == 100.0 {
            Status::Perfect
        } else if rate > 100.0 {
            Status::OverTarget
        } else if rate >= 75.0 {
            Status::OnTrack
        } else if rate >= 50.0 {
            Status::OffTrack
        } else {
            Status::AtRisk
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::NotInPeriod => "Not in this period",
            Status::Perfect => "Perfect",
            Status::OverTarget => "Over Target",
            Status::OnTrack => "On Track",
            Status::OffTrack => "Off Track",
            Status::AtRisk => "At Risk",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A card as laid out on the dashboard: an average with the indicators that
/// follow it, or a single plain node.
#[derive(Debug, Clone, Serialize)]
pub struct CardGroup {
    pub average: MeasureNode,
    pub indicators: Vec<MeasureNode>,
    /// Mean of per-indicator achievement, `None` without indicators.
    pub avg_indicator_percentage: Option<f64>,
}

/// Regroup a flat card list: each average node absorbs the indicator nodes
/// directly after it.
pub fn group_cards(nodes: &[MeasureNode]) -> Vec<CardGroup> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < nodes.len() {
        let node = &nodes[i];
        i += 1;
        if !node.is_average() {
            groups.push(CardGroup {
                average: node.clone(),
                indicators: Vec::new(),
                avg_indicator_percentage: None,
            });
            continue;
        }

        let indicators: Vec<MeasureNode> = nodes[i..]
            .iter()
            .take_while(|n| n.kind == NodeKind::Indicator)
            .cloned()
            .collect();
        i += indicators.len();

        let avg_indicator_percentage = (!indicators.is_empty()).then(|| {
            let total: f64 = indicators
                .iter()
                .map(|n| {
                    if n.target == 0.0 {
                        100.0
                    } else {
                        n.value / n.target * 100.0
                    }
                })
                .sum();
            total / indicators.len() as f64
        });

        groups.push(CardGroup {
            average: node.clone(),
            indicators,
            avg_indicator_percentage,
        });
    }
    groups
}

/// Overall health of a department's cards: the mean of per-card achievement
/// capped at 100, rounded. Zero for an empty list.
pub fn department_health(nodes: &[MeasureNode]) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }
    let total: f64 = nodes
        .iter()
        .map(|n| achievement_rate(n).min(100.0))
        .sum();
    (total / nodes.len() as f64).round().min(100.0)
}

/// Find a node by id among top-level nodes and their leads.
pub fn find_node<'a>(nodes: &'a [MeasureNode], id: &str) -> Option<&'a MeasureNode> {
    nodes.iter().find_map(|n| {
        if n.id == id {
            Some(n)
        } else {
            n.leads.iter().find(|l| l.id == id)
        }
    })
}
