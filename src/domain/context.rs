// Per-call context supplied by the caller instead of ambient session state
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareContext {
    /// Absolute URL the dashboard is being viewed at, query string included.
    pub location: String,
    #[serde(default = "default_org_id")]
    pub org_id: i64,
    /// IANA zone name of the viewer, e.g. "Europe/Berlin".
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "Utc::now")]
    pub now: DateTime<Utc>,
}

fn default_org_id() -> i64 {
    1
}

impl ShareContext {
    pub fn new(location: impl Into<String>, org_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            location: location.into(),
            org_id,
            timezone: None,
            now,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// The same context, `elapsed` later.
    pub fn advanced_by(&self, elapsed: std::time::Duration) -> Self {
        let mut later = self.clone();
        if let Ok(delta) = chrono::Duration::from_std(elapsed) {
            later.now += delta;
        }
        later
    }

    /// Zone used to round relative times. Unknown names, "browser" and
    /// "utc" all fall back to UTC.
    pub fn zone(&self) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }

    /// `&tz=...` suffix used by render and PDF URLs.
    pub fn tz_param(&self) -> String {
        let zone = self.timezone.as_deref().unwrap_or("UTC");
        format!("&tz={}", urlencoding::encode(zone))
    }
}
