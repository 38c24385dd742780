pub mod display;
pub mod types;

pub use types::*;

use serde::Serialize;

use crate::aggregate::{aggregate, round2};
use crate::row::Row;
use crate::tree::{build_tree, IndicatorGroup, LagGroup, LeadGroup};
use crate::window::TimeWindow;

/// Build the measure cards for a sheet over a window.
///
/// Top-level output holds one node per LAG; a LAG with indicators is emitted
/// as its average node followed by the indicator nodes. Everything is
/// recomputed from the rows on each call.
pub fn assemble(rows: &[Row], window: &TimeWindow) -> Vec<MeasureNode> {
    let tree = build_tree(rows);
    assemble_tree(rows, &tree, window)
}

/// Like `assemble`, for a tree that was already built from `rows`.
pub fn assemble_tree(rows: &[Row], tree: &[LagGroup], window: &TimeWindow) -> Vec<MeasureNode> {
    let mut nodes = Vec::new();
    for group in tree {
        let leads: Vec<MeasureNode> = group
            .leads
            .iter()
            .flat_map(|lead| lead_nodes(rows, lead, window))
            .collect();

        let head = &rows[group.head];
        if group.has_indicators() {
            let indicators = indicator_nodes(rows, group, "lag", window);
            let mut average = average_node(head, "lag", &indicators);
            average.lag_number = Some(group.number);
            average.leads = leads;
            nodes.push(average);
            nodes.extend(indicators);
        } else {
            let mut node = row_node(
                head,
                format!("lag_{}", head.index),
                head.name.clone(),
                NodeKind::Lag,
                window,
            );
            node.lag_number = Some(group.number);
            node.leads = leads;
            nodes.push(node);
        }
    }
    nodes
}

/// Cards contributed by one LEAD group: the plain LEAD, or its average
/// followed by its indicators.
fn lead_nodes(rows: &[Row], lead: &LeadGroup, window: &TimeWindow) -> Vec<MeasureNode> {
    let head = &rows[lead.head];
    if lead.has_indicators() {
        let indicators = indicator_nodes(rows, lead, "lead", window);
        let mut average = average_node(head, "lead", &indicators);
        average.lead_number = Some(lead.number);
        std::iter::once(average).chain(indicators).collect()
    } else {
        let mut node = row_node(
            head,
            format!("lead_{}", head.index),
            head.name.clone(),
            NodeKind::Lead,
            window,
        );
        node.lead_number = Some(lead.number);
        vec![node]
    }
}

fn indicator_nodes(
    rows: &[Row],
    group: &impl IndicatorGroup,
    prefix: &str,
    window: &TimeWindow,
) -> Vec<MeasureNode> {
    group
        .indicator_rows()
        .into_iter()
        .enumerate()
        .map(|(n, idx)| {
            let row = &rows[idx];
            let name = if row.indicator_name.is_empty() {
                format!("Indicator {}", n + 1)
            } else {
                row.indicator_name.clone()
            };
            row_node(
                row,
                format!("{prefix}_{}_indicator", row.index),
                name,
                NodeKind::Indicator,
                window,
            )
        })
        .collect()
}

fn row_node(row: &Row, id: String, name: String, kind: NodeKind, window: &TimeWindow) -> MeasureNode {
    let agg = aggregate(row, window);
    MeasureNode {
        id,
        name,
        kind,
        value: agg.value,
        target: agg.target,
        trend: agg.trend,
        is_less_better: row.classification.is_less_better(),
        lag_number: None,
        lead_number: None,
        leads: Vec::new(),
    }
}

/// Fold already-aggregated indicator nodes into the group's average card.
/// Value and target are sums, trend is the mean of indicator trends, and the
/// less-is-better flag comes from the head row.
fn average_node(head: &Row, prefix: &str, indicators: &[MeasureNode]) -> MeasureNode {
    let value: f64 = indicators.iter().map(|n| n.value).sum();
    let target: f64 = indicators.iter().map(|n| n.target).sum();
    let trend = if indicators.is_empty() {
        0.0
    } else {
        round2(indicators.iter().map(|n| n.trend).sum::<f64>() / indicators.len() as f64)
    };
    MeasureNode {
        id: format!("{prefix}_{}_average", head.index),
        name: format!("{} (Average)", head.name),
        kind: NodeKind::Average,
        value,
        target,
        trend,
        is_less_better: head.classification.is_less_better(),
        lag_number: None,
        lead_number: None,
        leads: Vec::new(),
    }
}

/// One department's plan rows.
#[derive(Debug, Clone)]
pub struct DepartmentRows {
    pub code: String,
    pub display_name: String,
    pub rows: Vec<Row>,
}

/// Assembled measures and health score for one department.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentSummary {
    pub code: String,
    pub display_name: String,
    pub health: f64,
    pub measures: Vec<MeasureNode>,
}

/// Per-department measures and health, in input order.
pub fn department_overview(
    departments: &[DepartmentRows],
    window: &TimeWindow,
) -> Vec<DepartmentSummary> {
    departments
        .iter()
        .map(|dept| {
            let measures = assemble(&dept.rows, window);
            DepartmentSummary {
                code: dept.code.clone(),
                display_name: dept.display_name.clone(),
                health: display::department_health(&measures),
                measures,
            }
        })
        .collect()
}

/// All departments' top-level measures in one list, with names prefixed by
/// the department display name and ids by the department code.
pub fn assemble_departments(departments: &[DepartmentRows], window: &TimeWindow) -> Vec<MeasureNode> {
    departments
        .iter()
        .flat_map(|dept| {
            assemble(&dept.rows, window)
                .into_iter()
                .map(move |mut node| {
                    node.name = format!("{}: {}", dept.display_name, node.name);
                    node.id = format!("{}_{}", dept.code, node.id);
                    node
                })
        })
        .collect()
}
