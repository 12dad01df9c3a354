//! Configuration integration tests

use edge_kelly::config::{BankrollMethod, Config, ConfigError, PositionSizingMethod};
use std::io::Write;

#[test]
fn test_load_example_config() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.validator.history_capacity, 1000);
    assert_eq!(config.kelly.position_sizing.method, PositionSizingMethod::Adaptive);
    assert_eq!(config.kelly.bankroll_management.method, BankrollMethod::Adaptive);
    assert_eq!(config.telemetry.log_level, "info");
}

#[test]
fn test_load_rejects_invalid_bounds() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [kelly.position_sizing]
        min_size = 0.2
        base_size = 0.1
        max_size = 0.05
        "#
    )
    .unwrap();

    let err = Config::load(file.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::SizingBounds { .. })
    ));
}
