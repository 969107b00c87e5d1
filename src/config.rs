use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use crate::facts::classify::DEFAULT_BLACKLIST;
use crate::facts::engine::DEFAULT_ACKS;
use crate::fs_util::{expand_home, state_dir};

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FactbotConfig {
    pub gateway: GatewayConfig,
    pub facts: FactsConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// The bot's own address-name, as it appears at the start of addressed lines.
    #[serde(default = "default_nickname")]
    pub nickname: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            nickname: default_nickname(),
        }
    }
}

fn default_port() -> u16 {
    7300
}
fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_nickname() -> String {
    "factbot".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactsConfig {
    #[serde(default = "default_blacklist")]
    pub word_blacklist: Vec<String>,
    #[serde(default)]
    pub require_nickname: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_acks")]
    pub acks: Vec<String>,
}

impl Default for FactsConfig {
    fn default() -> Self {
        Self {
            word_blacklist: default_blacklist(),
            require_nickname: false,
            timezone: default_timezone(),
            acks: default_acks(),
        }
    }
}

impl FactsConfig {
    /// The configured zone, parsed. Validation has already rejected bad names
    /// for loaded configs; a hand-built config falls back to the default zone.
    pub fn tz(&self) -> Tz {
        self.timezone
            .parse()
            .unwrap_or(crate::facts::format::DEFAULT_TIMEZONE)
    }
}

fn default_blacklist() -> Vec<String> {
    DEFAULT_BLACKLIST.iter().map(|w| w.to_string()).collect()
}
fn default_timezone() -> String {
    "US/Eastern".into()
}
fn default_acks() -> Vec<String> {
    DEFAULT_ACKS.iter().map(|a| a.to_string()).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Json,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON backend file. Defaults to `facts.json` in the state directory.
    pub path: Option<String>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match self.path.as_deref() {
            Some(path) => expand_home(path),
            None => state_dir().join("facts.json"),
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Search order:
/// 1. `FACTBOT_CONFIG` env var
/// 2. `~/.factbot/config.toml`
/// 3. Zero-config defaults (no file needed)
///
/// Environment overrides (`FACTS_WORD_BLACKLIST`, `FACTS_REQUIRE_NICKNAME`,
/// `TIMEZONE`, `FACTBOT_NICK`) apply on top of either.
pub fn load() -> anyhow::Result<FactbotConfig> {
    let path = config_path();

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let config: FactbotConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;
        info!("loaded config from {}", path.display());
        config
    } else {
        info!("no config file found, using zero-config defaults");
        FactbotConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("FACTBOT_CONFIG") {
        return PathBuf::from(path);
    }
    state_dir().join("config.toml")
}

/// Apply environment overrides, reading variables through `lookup`.
pub fn apply_env_overrides(config: &mut FactbotConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(list) = lookup("FACTS_WORD_BLACKLIST") {
        config.facts.word_blacklist = list
            .split(',')
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(flag) = lookup("FACTS_REQUIRE_NICKNAME") {
        config.facts.require_nickname = parse_flag(&flag);
    }
    if let Some(tz) = lookup("TIMEZONE") {
        config.facts.timezone = tz;
    }
    if let Some(nick) = lookup("FACTBOT_NICK") {
        config.gateway.nickname = nick;
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Validate the config and return clear error messages.
pub fn validate(config: &FactbotConfig) -> anyhow::Result<()> {
    if config.gateway.port == 0 {
        anyhow::bail!("gateway.port must be > 0");
    }

    if let Err(e) = config.facts.timezone.parse::<Tz>() {
        anyhow::bail!("invalid facts.timezone '{}': {e}", config.facts.timezone);
    }

    if config.facts.acks.is_empty() {
        anyhow::bail!("facts.acks must contain at least one phrase");
    }
    if config.facts.acks.iter().any(|a| a.trim().is_empty()) {
        anyhow::bail!("facts.acks must not contain blank phrases");
    }

    if config.facts.require_nickname && config.gateway.nickname.trim().is_empty() {
        anyhow::bail!("facts.require_nickname is set but gateway.nickname is empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = FactbotConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("FACTS_WORD_BLACKLIST", "foo, bar,,baz"),
                ("FACTS_REQUIRE_NICKNAME", "TRUE"),
                ("TIMEZONE", "Europe/Berlin"),
                ("FACTBOT_NICK", "helga"),
            ]),
        );
        assert_eq!(config.facts.word_blacklist, vec!["foo", "bar", "baz"]);
        assert!(config.facts.require_nickname);
        assert_eq!(config.facts.timezone, "Europe/Berlin");
        assert_eq!(config.gateway.nickname, "helga");
    }

    #[test]
    fn missing_env_leaves_config_alone() {
        let mut config = FactbotConfig::default();
        apply_env_overrides(&mut config, env(&[]));
        assert_eq!(config.facts.word_blacklist.len(), DEFAULT_BLACKLIST.len());
        assert!(!config.facts.require_nickname);
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" yes "));
        assert!(parse_flag("On"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
