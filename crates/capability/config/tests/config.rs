use appng_config::{ConfigError, PlatformConfig};
use std::collections::HashMap;
use std::path::PathBuf;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_when_unset() {
    let config = PlatformConfig::from_lookup(lookup(&[])).expect("config");
    assert_eq!(config, PlatformConfig::default());
    assert_eq!(config.default_page_size, 25);
    assert_eq!(config.manager_path, "/manager");
}

#[test]
fn values_are_read_from_lookup() {
    let config = PlatformConfig::from_lookup(lookup(&[
        ("APPNG_APPLICATION_DIR", "/srv/demo"),
        ("APPNG_DEV_MODE", "on"),
        ("APPNG_VALIDATION_FAIL_FAST", "1"),
        ("APPNG_MANAGER_PATH", "admin/"),
        ("APPNG_DEFAULT_PAGE_SIZE", "10"),
        ("APPNG_LOCALE", "de"),
    ]))
    .expect("config");
    assert_eq!(config.application_dir, PathBuf::from("/srv/demo"));
    assert!(config.dev_mode);
    assert!(config.validation_fail_fast);
    assert!(!config.detailed_errors);
    assert_eq!(config.manager_path, "/admin");
    assert_eq!(config.default_page_size, 10);
    assert_eq!(config.locale, "de");
}

#[test]
fn invalid_page_size_is_rejected() {
    let result = PlatformConfig::from_lookup(lookup(&[("APPNG_DEFAULT_PAGE_SIZE", "many")]));
    assert!(matches!(result, Err(ConfigError::Invalid(key, _)) if key == "APPNG_DEFAULT_PAGE_SIZE"));
}

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("APPNG_LOCALE", "fr");
    }
    let config = PlatformConfig::from_env().expect("config");
    assert_eq!(config.locale, "fr");
}
