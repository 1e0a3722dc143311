use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ShareConfig {
    pub server: ServerSettings,
    pub grafana: GrafanaSettings,
    pub snapshot: SnapshotSettings,
    pub sessions: SessionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GrafanaSettings {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub app_sub_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotSettings {
    pub timeout_seconds: u64,
    pub default_expires: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub idle_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("grafana.app_sub_url", "")?
        .set_default("grafana.request_timeout_ms", 30_000)?
        .set_default("snapshot.timeout_seconds", 20)?
        .set_default("snapshot.default_expires", 0)?
        .set_default("sessions.idle_ttl_seconds", 1800)?
        .set_default("sessions.sweep_interval_seconds", 60)?)
}

/// Defaults, then `config/share.toml` if present, then `SHARE__*` environment variables.
pub fn load_share_config() -> anyhow::Result<ShareConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/share").required(false))
        .add_source(
            config::Environment::with_prefix("SHARE")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
