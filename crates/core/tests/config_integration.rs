//! ironscope.toml 통합 설정 테스트
//!
//! - ironscope.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use ironscope_core::config::IronscopeConfig;
use ironscope_core::error::{ConfigError, IronscopeError};
use ironscope_core::types::BackendType;

// =============================================================================
// ironscope.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../ironscope.toml.example");
    let config = IronscopeConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.persistence.root, "~/.ironscope/persistence");
    assert_eq!(config.persistence.docstore_uri, "sled://~/.ironscope/docstore");
    assert!(config.persistence.docstore_enabled);
    assert_eq!(config.persistence.default_backend(), BackendType::Fs);
    assert_eq!(config.plugins.max_output_size, 64 * 1024 * 1024);
    assert!(config.plugins.disabled.is_empty());
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../ironscope.toml.example");
    let config = IronscopeConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../ironscope.toml.example");
    let parsed = IronscopeConfig::parse(content).expect("should parse");
    let defaults = IronscopeConfig::default();

    assert_eq!(parsed.general.log_level, defaults.general.log_level);
    assert_eq!(parsed.general.log_format, defaults.general.log_format);
    assert_eq!(parsed.persistence.root, defaults.persistence.root);
    assert_eq!(
        parsed.persistence.docstore_uri,
        defaults.persistence.docstore_uri
    );
    assert_eq!(
        parsed.persistence.default_backend,
        defaults.persistence.default_backend
    );
    assert_eq!(
        parsed.plugins.max_output_size,
        defaults.plugins.max_output_size
    );
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let config = IronscopeConfig::parse(
        r#"
[general]
log_level = "debug"
"#,
    )
    .expect("should parse");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.persistence.default_backend, "fs");
    config.validate().expect("partial config should validate");
}

#[test]
fn partial_config_persistence_only() {
    let config = IronscopeConfig::parse(
        r#"
[persistence]
root = "/srv/ironscope"
default_backend = "docstore"
"#,
    )
    .expect("should parse");

    assert_eq!(config.persistence.root_path().to_str(), Some("/srv/ironscope"));
    assert_eq!(config.persistence.default_backend(), BackendType::DocStore);
    assert!(config.persistence.docstore_enabled);
    config.validate().expect("should validate");
}

#[test]
fn docstore_default_requires_docstore_enabled() {
    let config = IronscopeConfig::parse(
        r#"
[persistence]
docstore_enabled = false
default_backend = "docstore"
"#,
    )
    .expect("should parse");

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("default_backend"));
}

#[test]
fn docstore_uri_path_strips_scheme() {
    let config = IronscopeConfig::parse(
        r#"
[persistence]
docstore_uri = "sled:///var/lib/ironscope/docs"
"#,
    )
    .expect("should parse");
    assert_eq!(
        config.persistence.docstore_path().to_str(),
        Some("/var/lib/ironscope/docs")
    );
}

// =============================================================================
// 에러 케이스
// =============================================================================

#[test]
fn empty_file_yields_defaults() {
    let config = IronscopeConfig::parse("").expect("empty file should parse");
    config.validate().expect("defaults should validate");
}

#[test]
fn malformed_toml_is_parse_error() {
    let err = IronscopeConfig::parse("[general\nlog_level = ").unwrap_err();
    assert!(matches!(
        err,
        IronscopeError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let config = IronscopeConfig::parse(
        r#"
[general]
log_level = "verbose"
"#,
    )
    .expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        IronscopeError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "general.log_level"
    ));
}

#[test]
fn traversal_in_root_is_rejected() {
    let config = IronscopeConfig::parse(
        r#"
[persistence]
root = "/srv/../etc"
"#,
    )
    .expect("should parse");
    assert!(config.validate().is_err());
}

#[test]
fn unsupported_docstore_scheme_is_rejected() {
    let config = IronscopeConfig::parse(
        r#"
[persistence]
docstore_uri = "http://localhost:5984"
"#,
    )
    .expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("docstore_uri"));
}

#[test]
fn zero_max_output_size_is_rejected() {
    let config = IronscopeConfig::parse(
        r#"
[plugins]
max_output_size = 0
"#,
    )
    .expect("should parse");
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn load_missing_file_is_file_not_found() {
    let err = IronscopeConfig::load("/nonexistent/ironscope.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IronscopeError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_or_default_tolerates_missing_file() {
    let config = IronscopeConfig::load_or_default("/nonexistent/ironscope.toml")
        .await
        .expect("missing file should fall back to defaults");
    assert_eq!(config.persistence.default_backend(), BackendType::Fs);
}

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ironscope.toml");
    std::fs::write(
        &path,
        r#"
[persistence]
root = "/tmp/ironscope-test"
"#,
    )
    .unwrap();

    let config = IronscopeConfig::load(&path).await.expect("should load");
    assert_eq!(config.persistence.root, "/tmp/ironscope-test");
}

// =============================================================================
// 환경변수 오버라이드
// =============================================================================

fn with_env<F: FnOnce()>(key: &str, value: &str, f: F) {
    let original = std::env::var(key).ok();
    // SAFETY: serial_test로 직렬화된 테스트에서만 호출
    unsafe {
        std::env::set_var(key, value);
    }
    f();
    // SAFETY: 위와 동일
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
}

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let mut config = IronscopeConfig::parse(
        r#"
[general]
log_level = "debug"
"#,
    )
    .expect("should parse");

    with_env("IRONSCOPE_GENERAL_LOG_LEVEL", "error", || {
        config.apply_env_overrides();
    });
    assert_eq!(config.general.log_level, "error");
}

#[test]
#[serial_test::serial]
fn env_override_csv_for_vec_fields() {
    let mut config = IronscopeConfig::default();
    with_env("IRONSCOPE_PLUGINS_DISABLED", "nmap, nessus", || {
        config.apply_env_overrides();
    });
    assert_eq!(config.plugins.disabled, vec!["nmap", "nessus"]);
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let mut config = IronscopeConfig::default();
    with_env("IRONSCOPE_PERSISTENCE_DOCSTORE_ENABLED", "false", || {
        config.apply_env_overrides();
    });
    assert!(!config.persistence.docstore_enabled);
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let mut config = IronscopeConfig::default();
    with_env("IRONSCOPE_PLUGINS_MAX_OUTPUT_SIZE", "1024", || {
        config.apply_env_overrides();
    });
    assert_eq!(config.plugins.max_output_size, 1024);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_numeric_is_ignored() {
    let mut config = IronscopeConfig::default();
    with_env("IRONSCOPE_PLUGINS_MAX_OUTPUT_SIZE", "lots", || {
        config.apply_env_overrides();
    });
    assert_eq!(config.plugins.max_output_size, 64 * 1024 * 1024);
}
