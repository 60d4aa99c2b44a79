use felos_domain::config::{
    Config, ConfigSeverity, ImageBackendKind, LedgerBackendKind, NetworkId,
};
use felos_domain::money::Usd;
use felos_domain::pricing::PricingTable;

#[test]
fn empty_file_is_a_valid_config() {
    let config: Config = toml::from_str("").unwrap();
    let issues = config.validate();
    assert!(
        issues.iter().all(|e| e.severity != ConfigSeverity::Error),
        "unexpected errors: {issues:?}"
    );
}

#[test]
fn default_turn_limits() {
    let config = Config::default();
    assert_eq!(config.turn.max_rounds, 10);
    assert_eq!(config.turn.deadline_secs, 120);
}

#[test]
fn default_backends() {
    let config = Config::default();
    assert_eq!(config.images.backend, ImageBackendKind::Sync);
    assert_eq!(config.ledger.backend, LedgerBackendKind::Jsonl);
    assert_eq!(config.network.id, NetworkId::BaseSepolia);
    assert!(!config.payments.enabled);
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn pricing_overrides_flow_into_table() {
    let toml_str = r#"
[pricing]
scrape = 0.05

[pricing.subscription]
copy_ai = 40
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let table = PricingTable::from_config(&config.pricing);
    assert_eq!(table.scrape, Usd::from_dollars(0.05));
    assert_eq!(table.ad_copy, Usd::from_dollars(0.02));
    assert_eq!(table.subscription.total(), Usd::from_dollars(209.0));
}

#[test]
fn zero_round_limit_is_rejected() {
    let toml_str = r#"
[turn]
max_rounds = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|e| e.field == "turn.max_rounds" && e.severity == ConfigSeverity::Error));
}

#[test]
fn wildcard_cors_is_a_warning() {
    let toml_str = r#"
[server.cors]
allowed_origins = ["*"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    let cors = issues
        .iter()
        .find(|e| e.field == "server.cors.allowed_origins")
        .expect("cors warning");
    assert_eq!(cors.severity, ConfigSeverity::Warning);
}

#[test]
fn negative_price_is_rejected() {
    let toml_str = r#"
[pricing]
image_fast = -1.0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|e| e.field == "pricing.image_fast"));
}
