use anyhow::{Result, anyhow};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub env: String, // "dev" or "prod"
    pub command: CommandSettings,
    pub http: Http,
    pub log: Log,
    pub propagation: PropagationSettings,
    pub storage: StorageSettings,
}

impl Settings {
    pub fn is_prod(&self) -> bool {
        self.env == "prod"
    }
}

#[derive(Debug, Deserialize)]
pub struct CommandSettings {
    pub timeout_ms: u64,
}

impl CommandSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    pub backend: String, // "fake" or "real"
    #[serde(default)]
    pub mysql_dsn: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Users registered at startup by the `fake` backend.
    #[serde(default)]
    pub seed_users: Vec<String>,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct PropagationSettings {
    pub transport: String, // "direct", "channel" or "kafka"
    #[serde(default)]
    pub bootstrap_server: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
}

fn default_topic() -> String {
    "subscription.created".to_owned()
}

fn default_consumer_group() -> String {
    "rapport-subscription".to_owned()
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the TOML file, then applies `RAPPORT__SECTION__KEY` overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    build(Config::builder().add_source(File::with_name(path)))
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .add_source(
            Environment::with_prefix("RAPPORT")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const MINIMAL: &str = r#"
env = "dev"

[command]
timeout_ms = 1500

[http]
address = "127.0.0.1:8080"

[log]
filter = "info"

[storage]
backend = "fake"
seed_users = ["alice@example.com"]

[propagation]
transport = "direct"
"#;

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let settings =
            build(Config::builder().add_source(File::from_str(MINIMAL, FileFormat::Toml)))
                .unwrap();

        assert!(!settings.is_prod());
        assert!(settings.http.tls.is_none());
        assert_eq!(settings.command.timeout(), Duration::from_millis(1500));
        assert_eq!(settings.storage.max_connections, 10);
        assert_eq!(settings.storage.seed_users, vec!["alice@example.com"]);
        assert_eq!(settings.propagation.topic, "subscription.created");
    }

    #[test]
    fn missing_required_section_is_an_error() {
        let broken = MINIMAL.replace("[command]\ntimeout_ms = 1500\n", "");

        let result = build(Config::builder().add_source(File::from_str(&broken, FileFormat::Toml)));

        assert!(result.is_err());
    }
}
