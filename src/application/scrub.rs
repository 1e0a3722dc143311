// Scrubber - strips queries, links and data source references before publishing
use crate::domain::context::ShareContext;
use crate::domain::dashboard::{AnnotationRule, DashboardDefinition, GridPos, Panel, VariableRefresh};
use crate::domain::snapshot::ScrubbedDashboard;
use crate::domain::time_range::resolve_absolute;
use serde_json::{Map, Value};

/// Position given to a panel snapshotted on its own.
pub const SINGLE_PANEL_GRID: GridPos = GridPos { x: 0, y: 0, w: 24, h: 20 };

/// Produce a publishable copy of `live`.
///
/// The copy is taken first; afterwards the live dashboard loses its snapshot
/// marker and any cached `snapshotData` on panels and annotations. The live
/// dashboard is otherwise left as it was.
pub fn scrub(
    live: &mut DashboardDefinition,
    snapshot_name: &str,
    focused_panel: Option<&Panel>,
    context: &ShareContext,
) -> ScrubbedDashboard {
    let mut dash = live.clone();

    dash.title = snapshot_name.to_string();

    if let Some(time) = &dash.time {
        dash.time = Some(resolve_absolute(time, context.now, context.zone()));
    }

    dash.panels.iter_mut().for_each(scrub_panel);

    dash.annotations.list = std::mem::take(&mut dash.annotations.list)
        .into_iter()
        .filter(|rule| rule.enable)
        .map(scrub_annotation)
        .collect();

    for variable in dash.templating.list.iter_mut() {
        variable.query = Value::String(String::new());
        variable.options = variable.current.iter().cloned().collect();
        variable.refresh = VariableRefresh::Never;
    }

    if let Some(panel) = focused_panel {
        let mut single = panel.clone();
        scrub_panel(&mut single);
        single.grid_pos = SINGLE_PANEL_GRID;
        dash.panels = vec![single];
    }

    clear_snapshot_data(live);

    tracing::debug!(
        title = %dash.title,
        panels = dash.panels.len(),
        annotations = dash.annotations.list.len(),
        variables = dash.templating.list.len(),
        "Scrubbed dashboard"
    );

    ScrubbedDashboard::new(dash)
}

fn scrub_panel(panel: &mut Panel) {
    panel.targets.clear();
    panel.links.clear();
    panel.datasource = None;
    for nested in row_panels(&mut panel.extra) {
        scrub_nested_panel(nested);
    }
}

/// Panels folded into a collapsed row stay raw JSON under the row's `panels`.
fn row_panels(fields: &mut Map<String, Value>) -> impl Iterator<Item = &mut Value> {
    fields
        .get_mut("panels")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
}

fn scrub_nested_panel(panel: &mut Value) {
    let Some(fields) = panel.as_object_mut() else {
        return;
    };
    fields.insert("targets".to_string(), Value::Array(Vec::new()));
    fields.insert("links".to_string(), Value::Array(Vec::new()));
    fields.insert("datasource".to_string(), Value::Null);
    for nested in row_panels(fields) {
        scrub_nested_panel(nested);
    }
}

fn clear_nested_snapshot_data(panel: &mut Value) {
    if let Some(fields) = panel.as_object_mut() {
        fields.remove("snapshotData");
        for nested in row_panels(fields) {
            clear_nested_snapshot_data(nested);
        }
    }
}

fn scrub_annotation(rule: AnnotationRule) -> AnnotationRule {
    AnnotationRule {
        extra: Map::new(),
        ..rule
    }
}

fn clear_snapshot_data(live: &mut DashboardDefinition) {
    live.snapshot = None;
    for panel in live.panels.iter_mut() {
        panel.snapshot_data = None;
        for nested in row_panels(&mut panel.extra) {
            clear_nested_snapshot_data(nested);
        }
    }
    for rule in live.annotations.list.iter_mut() {
        rule.snapshot_data = None;
    }
}
