use std::io::Write;

use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

use flashmirror::domain::{InstrumentId, Strategy};
use flashmirror::error::{ConfigError, Error};
use flashmirror::infrastructure::config::{Config, LogFormat};

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

fn invalid_field(result: Result<Config, Error>) -> &'static str {
    match result {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => field,
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn example_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.toml");
    let config = Config::load(path).expect("example config is valid");

    assert_eq!(config.account_id, "main");
    assert!(config.dry_run);
    assert_eq!(config.instruments.len(), 1);
    assert_eq!(config.execution.take_profit_pct, dec!(0.20));
}

#[test]
fn load_reads_sections_from_disk() {
    let file = write_temp_config(
        r#"
account_id = "acct-7"
instruments = ["t1", "t2"]

[logging]
level = "debug"
format = "json"

[hub.polling]
enabled = true
wallets = ["0xabc"]

[risk]
preferred_strategy = "adaptive"
base_size_usd = "25"

[execution]
max_concurrent_positions = 3
"#,
    );

    let config = Config::load(file.path()).expect("valid config");

    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "debug");
    assert!(config.hub.polling.enabled);
    assert_eq!(config.hub.polling.wallets, vec!["0xabc".to_string()]);
    assert_eq!(config.risk.preferred_strategy, Some(Strategy::Adaptive));

    let flash = config.flash();
    assert_eq!(flash.instruments, vec![InstrumentId::from("t1"), InstrumentId::from("t2")]);
    assert_eq!(flash.risk.base_size_usd, dec!(25));
    assert_eq!(flash.execution.max_concurrent_positions, 3);
    assert_eq!(config.account().as_str(), "acct-7");
}

#[test]
fn missing_file_is_a_read_error() {
    let result = Config::load("/nonexistent/flashmirror/config.toml");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::ReadFile(_)))
    ));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_temp_config("[risk\nmin_confidence = ");
    assert!(matches!(
        Config::load(file.path()),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn config_rejects_invalid_stop_loss() {
    let file = write_temp_config(
        r#"
[execution]
stop_loss_pct = "1.5"
"#,
    );
    assert_eq!(invalid_field(Config::load(file.path())), "stop_loss_pct");
}

#[test]
fn config_rejects_zero_heartbeat() {
    let file = write_temp_config(
        r#"
[hub]
heartbeat_interval_secs = 0
"#,
    );
    assert_eq!(invalid_field(Config::load(file.path())), "heartbeat_interval_secs");
}

#[test]
fn config_rejects_bad_endpoint() {
    let file = write_temp_config(
        r#"
[polymarket]
gamma_api_url = "not a url"
"#,
    );
    assert_eq!(invalid_field(Config::load(file.path())), "gamma_api_url");
}

#[test]
fn config_rejects_out_of_range_confidence() {
    let file = write_temp_config(
        r#"
[risk]
min_confidence = 1.5
"#,
    );
    assert_eq!(invalid_field(Config::load(file.path())), "min_confidence");
}

#[test]
fn config_rejects_non_positive_signal_thresholds() {
    let file = write_temp_config(
        r#"
[detector]
momentum_threshold = 0.0
"#,
    );
    assert_eq!(invalid_field(Config::load(file.path())), "momentum_threshold");

    let file = write_temp_config(
        r#"
[detector]
volume_spike_threshold = -1.0
"#,
    );
    assert_eq!(invalid_field(Config::load(file.path())), "volume_spike_threshold");
}
