// Share links - URLs for the Link / PDF and Embed tabs
use crate::domain::context::ShareContext;
use crate::domain::dashboard::{DashboardDefinition, Panel, TimeRange};
use crate::domain::time_range::parse_bound;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOptions {
    #[serde(default = "default_true")]
    pub for_current: bool,
    #[serde(default = "default_true")]
    pub include_template_vars: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_true() -> bool {
    true
}

fn default_theme() -> String {
    "current".to_string()
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            for_current: true,
            include_template_vars: true,
            theme: default_theme(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinks {
    pub share_url: String,
    pub solo_url: String,
    pub iframe_html: String,
    pub image_url: String,
    pub pdf_url: String,
    pub pdf_landscape_url: String,
}

#[derive(Debug, Clone)]
pub struct ShareLinkBuilder {
    app_sub_url: String,
}

impl ShareLinkBuilder {
    pub fn new(app_sub_url: impl Into<String>) -> Self {
        Self {
            app_sub_url: app_sub_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn build(
        &self,
        dashboard: &DashboardDefinition,
        panel: Option<&Panel>,
        options: &LinkOptions,
        context: &ShareContext,
    ) -> ShareLinks {
        let (base_url, query) = match context.location.split_once('?') {
            Some((base, query)) => (base.to_string(), query),
            None => (context.location.clone(), ""),
        };

        let mut params = QueryParams::parse(query);

        if options.for_current {
            let range = dashboard.time.clone().unwrap_or_default();
            let (from, to) = epoch_range(&range, context);
            params.set("from", from);
            params.set("to", to);
        } else {
            params.remove("from");
            params.remove("to");
        }

        params.set("orgId", context.org_id.to_string());

        if options.include_template_vars {
            for variable in dashboard.variables() {
                let key = format!("var-{}", variable.name);
                params.remove(&key);
                for value in variable.current_values() {
                    params.push(&key, value);
                }
            }
        }

        if options.theme != "current" {
            params.set("theme", options.theme.clone());
        }

        match panel {
            Some(panel) => {
                params.set("panelId", panel.id.to_string());
                params.set("fullscreen", "true".to_string());
            }
            None => {
                params.remove("panelId");
                params.remove("fullscreen");
            }
        }

        let share_url = append_query(&base_url, &params.encode());

        // Solo, image and PDF links render without the dashboard chrome
        params.remove("fullscreen");
        params.remove("edit");
        let render_query = params.encode();

        let solo_base = self.rewrite_prefix(&base_url, "dashboard-solo", "d-solo");
        let solo_url = append_query(&solo_base, &render_query);

        let iframe_html = format!(
            r#"<iframe src="{}" width="450" height="200" frameborder="0"></iframe>"#,
            solo_url
        );

        let sub = &self.app_sub_url;
        let image_url = format!(
            "{}&width=1000&height=500{}",
            solo_url
                .replace(&format!("{}/dashboard-solo/", sub), &format!("{}/render/dashboard-solo/", sub))
                .replace(&format!("{}/d-solo/", sub), &format!("{}/render/d-solo/", sub)),
            context.tz_param()
        );

        let pdf_url = format!(
            "{}{}",
            append_query(
                &self.rewrite_prefix(&base_url, "renderPdf/dashboard", "renderPdf/d"),
                &render_query
            ),
            context.tz_param()
        );

        let pdf_landscape_url = format!(
            "{}{}",
            append_query(
                &self.rewrite_prefix(&base_url, "renderPdfLandscape/dashboard", "renderPdfLandscape/d"),
                &render_query
            ),
            context.tz_param()
        );

        ShareLinks {
            share_url,
            solo_url,
            iframe_html,
            image_url,
            pdf_url,
            pdf_landscape_url,
        }
    }

    /// Swap the `/dashboard/` or `/d/` route segment under the app sub URL.
    fn rewrite_prefix(&self, url: &str, dashboard_route: &str, short_route: &str) -> String {
        let sub = &self.app_sub_url;
        url.replace(&format!("{}/dashboard/", sub), &format!("{}/{}/", sub, dashboard_route))
            .replace(&format!("{}/d/", sub), &format!("{}/{}/", sub, short_route))
    }
}

fn epoch_range(range: &TimeRange, context: &ShareContext) -> (String, String) {
    let to_ms = |text: &str, round_up: bool| {
        parse_bound(text, context.now, round_up, context.zone())
            .map(|t| t.timestamp_millis().to_string())
            .unwrap_or_else(|| text.to_string())
    };
    (to_ms(&range.from, false), to_ms(&range.to, true))
}

fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query)
}

/// Ordered query parameters; keys may repeat.
#[derive(Debug, Clone, Default)]
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn parse(query: &str) -> Self {
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect();
        Self(pairs)
    }

    fn set(&mut self, key: &str, value: String) {
        match self.0.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.0[index].1 = value;
                let mut seen = false;
                self.0.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.0.push((key.to_string(), value)),
        }
    }

    fn push(&mut self, key: &str, value: String) {
        self.0.push((key.to_string(), value));
    }

    fn remove(&mut self, key: &str) {
        self.0.retain(|(k, _)| k != key);
    }

    fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn decode(text: &str) -> String {
    let text = text.replace('+', " ");
    urlencoding::decode(&text)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| text.clone())
}
