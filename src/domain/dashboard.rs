// Dashboard domain model
//
// Only the fields the share workflow touches are typed. Everything else
// rides along in the flattened `extra` maps so a dashboard survives a
// deserialize/serialize round trip unchanged.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeRange>,
    #[serde(default)]
    pub panels: Vec<Panel>,
    #[serde(default)]
    pub annotations: AnnotationList,
    #[serde(default)]
    pub templating: TemplatingList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotMeta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DashboardDefinition {
    pub fn panel(&self, id: i64) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }

    pub fn variables(&self) -> &[TemplateVariable] {
        &self.templating.list
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::new("now-6h", "now")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Default for GridPos {
    fn default() -> Self {
        Self { x: 0, y: 0, w: 12, h: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub grid_pos: GridPos,
    #[serde(default)]
    pub targets: Vec<Value>,
    #[serde(default)]
    pub links: Vec<Value>,
    /// Always serialized; a scrubbed panel carries an explicit `null`.
    #[serde(default)]
    pub datasource: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationList {
    #[serde(default)]
    pub list: Vec<AnnotationRule>,
}

/// An annotation rule. The seven typed fields are the ones that survive a
/// scrub; query definitions and anything else live in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub icon_color: Option<String>,
    #[serde(default)]
    pub snapshot_data: Option<Value>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub built_in: Option<Value>,
    #[serde(default)]
    pub hide: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplatingList {
    #[serde(default)]
    pub list: Vec<TemplateVariable>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateVariable {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub query: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
    #[serde(default)]
    pub options: Vec<Value>,
    #[serde(default)]
    pub refresh: VariableRefresh,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateVariable {
    /// Current selection as URL values; multi-value selections yield several.
    pub fn current_values(&self) -> Vec<String> {
        let value = match self.current.as_ref().and_then(|c| c.get("value")) {
            Some(value) => value,
            None => return Vec::new(),
        };

        match value {
            Value::Array(items) => items.iter().filter_map(value_to_string).collect(),
            other => value_to_string(other).into_iter().collect(),
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// When a template variable re-runs its query. Stored numerically on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VariableRefresh {
    #[default]
    Never,
    OnDashboardLoad,
    OnTimeRangeChanged,
}

impl From<VariableRefresh> for u8 {
    fn from(refresh: VariableRefresh) -> Self {
        match refresh {
            VariableRefresh::Never => 0,
            VariableRefresh::OnDashboardLoad => 1,
            VariableRefresh::OnTimeRangeChanged => 2,
        }
    }
}

impl TryFrom<u8> for VariableRefresh {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VariableRefresh::Never),
            1 => Ok(VariableRefresh::OnDashboardLoad),
            2 => Ok(VariableRefresh::OnTimeRangeChanged),
            other => Err(format!("unknown variable refresh mode {}", other)),
        }
    }
}

/// Marker attached to a dashboard while a snapshot of it is being taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
}
