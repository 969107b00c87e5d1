use factbot::config::{FactbotConfig, StoreBackend, validate};
use std::path::PathBuf;

#[test]
fn default_config_has_sensible_values() {
    let config = FactbotConfig::default();
    assert_eq!(config.gateway.port, 7300);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.gateway.nickname, "factbot");
    assert_eq!(config.facts.timezone, "US/Eastern");
    assert!(!config.facts.require_nickname);
    assert!(config.facts.word_blacklist.contains(&"who".to_string()));
    assert_eq!(config.facts.word_blacklist.len(), 15);
    assert!(!config.facts.acks.is_empty());
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert!(config.store.path.is_none());
    validate(&config).expect("defaults are valid");
}

#[test]
fn valid_toml_parses_successfully() {
    let toml_str = r#"
[gateway]
port = 8080
bind = "0.0.0.0"
nickname = "helga"

[facts]
word_blacklist = ["um", "uh"]
require_nickname = true
timezone = "Europe/London"
acks = ["done"]

[store]
backend = "json"
path = "/var/lib/factbot/facts.json"
"#;

    let config: FactbotConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bind, "0.0.0.0");
    assert_eq!(config.gateway.nickname, "helga");
    assert_eq!(config.facts.word_blacklist, vec!["um", "uh"]);
    assert!(config.facts.require_nickname);
    assert_eq!(config.facts.timezone, "Europe/London");
    assert_eq!(config.facts.tz(), chrono_tz::Europe::London);
    assert_eq!(config.facts.acks, vec!["done"]);
    assert_eq!(config.store.backend, StoreBackend::Json);
    assert_eq!(
        config.store.resolved_path(),
        PathBuf::from("/var/lib/factbot/facts.json")
    );
    validate(&config).expect("config is valid");
}

#[test]
fn partial_config_uses_defaults_for_missing_fields() {
    let toml_str = r#"
[facts]
require_nickname = true
"#;

    let config: FactbotConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.gateway.port, 7300);
    assert_eq!(config.facts.timezone, "US/Eastern");
    assert_eq!(config.facts.word_blacklist.len(), 15);
    assert!(config.facts.require_nickname);
}

#[test]
fn empty_toml_uses_all_defaults() {
    let config: FactbotConfig = toml::from_str("").unwrap();
    assert_eq!(config.gateway.port, 7300);
    assert_eq!(config.store.backend, StoreBackend::Memory);
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = toml::from_str::<FactbotConfig>("this is not valid toml {{{");
    assert!(result.is_err());
}

#[test]
fn unknown_backend_is_rejected() {
    let result = toml::from_str::<FactbotConfig>("[store]\nbackend = \"mongo\"\n");
    assert!(result.is_err());
}

#[test]
fn invalid_timezone_fails_validation() {
    let config: FactbotConfig = toml::from_str("[facts]\ntimezone = \"Mars/Olympus\"\n").unwrap();
    let err = validate(&config).expect_err("bad zone must fail");
    assert!(err.to_string().contains("invalid facts.timezone"));
    // Hand-built configs still get a usable zone.
    assert_eq!(config.facts.tz(), chrono_tz::US::Eastern);
}

#[test]
fn empty_acks_fail_validation() {
    let config: FactbotConfig = toml::from_str("[facts]\nacks = []\n").unwrap();
    let err = validate(&config).expect_err("no acks must fail");
    assert!(err.to_string().contains("facts.acks"));
}

#[test]
fn blank_ack_fails_validation() {
    let config: FactbotConfig = toml::from_str("[facts]\nacks = [\"\", \"roger\"]\n").unwrap();
    let err = validate(&config).expect_err("blank ack must fail");
    assert!(err.to_string().contains("blank"));
}

#[test]
fn require_nickname_without_nickname_fails_validation() {
    let toml_str = r#"
[gateway]
nickname = ""

[facts]
require_nickname = true
"#;
    let config: FactbotConfig = toml::from_str(toml_str).unwrap();
    let err = validate(&config).expect_err("gated mode needs a nick");
    assert!(err.to_string().contains("gateway.nickname"));
}

#[test]
fn zero_port_fails_validation() {
    let config: FactbotConfig = toml::from_str("[gateway]\nport = 0\n").unwrap();
    assert!(validate(&config).is_err());
}
