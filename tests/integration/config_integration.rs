//! Integration tests for the configuration system

use context_guard::config::{ConfigLoader, GuardConfig};
use context_guard::{ContextGuard, ViolationPolicy, TRACKING_COMPILED};
use tempfile::TempDir;

#[test]
fn test_guard_built_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("guard.toml");
    std::fs::write(
        &config_file,
        r#"
[tracking]
enabled_at_start = false
policy = "ignore"

[logging]
level = "warn"

[logging.modules]
"context_guard::guard" = "debug"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert_eq!(config.tracking.policy, ViolationPolicy::Ignore);
    assert_eq!(
        config.logging.modules.get("context_guard::guard"),
        Some(&"debug".to_string())
    );

    let guard = ContextGuard::from_config(&config);
    assert!(!guard.is_tracking());
    guard.begin_tracking();
    assert_eq!(guard.is_tracking(), TRACKING_COMPILED);
}

#[test]
fn test_environment_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("guard.toml");
    std::fs::write(&config_file, "[tracking]\npolicy = \"log\"\n").unwrap();

    // Only this test reads the environment, so setting it here does not race.
    std::env::set_var("CONTEXT_GUARD__TRACKING__POLICY", "panic");
    let loaded = ConfigLoader::load(Some(&config_file));
    std::env::remove_var("CONTEXT_GUARD__TRACKING__POLICY");

    let config = loaded.unwrap();
    assert_eq!(config.tracking.policy, ViolationPolicy::Panic);
    assert!(config.tracking.enabled_at_start);
}

#[test]
fn test_config_round_trips_through_toml() {
    let mut config = GuardConfig::default();
    config.tracking.policy = ViolationPolicy::Abort;
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("policy = \"abort\""));

    let parsed: GuardConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed.tracking.policy, ViolationPolicy::Abort);
}
