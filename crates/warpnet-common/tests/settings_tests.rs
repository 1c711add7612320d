use serial_test::serial;
use temp_env::with_var;
use tempfile::tempdir;
use warpnet_common::{BridgeSettings, ConfigError};

#[test]
fn test_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.toml");

    let mut settings = BridgeSettings::default();
    settings.request_timeout_secs = 12;
    settings.user_agent = "custom/1.0".to_string();
    settings.save(&path).unwrap();

    let loaded = BridgeSettings::load(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
#[serial]
fn test_load_or_create_writes_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub/settings.toml");

    let settings = BridgeSettings::load_or_create(&path).unwrap();

    assert!(path.exists());
    assert_eq!(settings.connect_timeout_secs, 30);
}

#[test]
fn test_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "invalid toml [[[").unwrap();

    let result = BridgeSettings::load(&path);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
#[serial]
fn test_env_override_data_dir() {
    with_var("WARPNET_DATA_DIR", Some("/tmp/warpnet-test"), || {
        let settings = BridgeSettings::from_env().unwrap();
        assert_eq!(settings.data_dir, "/tmp/warpnet-test");
        assert_eq!(
            settings.config_manager().store().dir(),
            std::path::Path::new("/tmp/warpnet-test")
        );
    });
}

#[test]
#[serial]
fn test_env_override_timeouts() {
    temp_env::with_vars(
        [
            ("WARPNET_CONNECT_TIMEOUT", Some("7")),
            ("WARPNET_REQUEST_TIMEOUT", Some("9")),
        ],
        || {
            let settings = BridgeSettings::from_env().unwrap();
            assert_eq!(settings.connect_timeout_secs, 7);
            assert_eq!(settings.request_timeout_secs, 9);
        },
    );
}

#[test]
#[serial]
fn test_invalid_env_value_is_ignored() {
    with_var("WARPNET_REQUEST_TIMEOUT", Some("soon"), || {
        let settings = BridgeSettings::from_env().unwrap();
        assert_eq!(settings.request_timeout_secs, 30);
    });
}

#[test]
#[serial]
fn test_zero_env_timeout_fails_validation() {
    with_var("WARPNET_CONNECT_TIMEOUT", Some("0"), || {
        assert!(BridgeSettings::from_env().is_err());
    });
}
