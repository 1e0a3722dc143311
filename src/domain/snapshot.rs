// Snapshot domain model - what gets sent to and returned by the snapshot API
use serde::{Deserialize, Serialize};
use std::ops::Deref;

use super::dashboard::DashboardDefinition;

/// A dashboard that has been through the scrubber. Only the scrubber can
/// build one, so anything holding this type is safe to publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScrubbedDashboard(DashboardDefinition);

impl ScrubbedDashboard {
    pub(crate) fn new(dashboard: DashboardDefinition) -> Self {
        Self(dashboard)
    }
}

impl Deref for ScrubbedDashboard {
    type Target = DashboardDefinition;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Snapshot lifetime in seconds. Zero means the snapshot never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expiry(u64);

impl Expiry {
    pub const NEVER: Expiry = Expiry(0);
    pub const ONE_HOUR: Expiry = Expiry(60 * 60);
    pub const ONE_DAY: Expiry = Expiry(60 * 60 * 24);
    pub const SEVEN_DAYS: Expiry = Expiry(60 * 60 * 24 * 7);

    pub fn from_seconds(seconds: u64) -> Self {
        Self(seconds)
    }

    pub fn seconds(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpireOption {
    pub label: &'static str,
    pub value: Expiry,
}

/// Choices offered by the share dialog, in display order.
pub fn expire_options() -> Vec<ExpireOption> {
    vec![
        ExpireOption { label: "Never", value: Expiry::NEVER },
        ExpireOption { label: "1 Hour", value: Expiry::ONE_HOUR },
        ExpireOption { label: "1 Day", value: Expiry::ONE_DAY },
        ExpireOption { label: "7 Days", value: Expiry::SEVEN_DAYS },
    ]
}

/// Body of `POST /api/snapshots`.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRequest {
    pub dashboard: ScrubbedDashboard,
    pub name: String,
    pub expires: Expiry,
    pub external: bool,
}

impl SnapshotRequest {
    pub fn new(dashboard: ScrubbedDashboard, expires: Expiry, external: bool) -> Self {
        let name = dashboard.title.clone();
        Self {
            dashboard,
            name,
            expires,
            external,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    pub url: String,
    pub delete_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_key: Option<String>,
}

/// Response of `GET /api/snapshot/shared-options`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedOptions {
    #[serde(default)]
    pub external_enabled: bool,
    #[serde(default)]
    pub external_snapshot_name: String,
}
