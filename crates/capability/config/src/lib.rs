//! 平台运行配置加载。

use std::env;
use std::path::PathBuf;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 平台运行配置。
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformConfig {
    pub application_dir: PathBuf,
    pub dev_mode: bool,
    pub validation_fail_fast: bool,
    pub detailed_errors: bool,
    pub manager_path: String,
    pub default_page_size: u32,
    pub locale: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            application_dir: PathBuf::from("application"),
            dev_mode: false,
            validation_fail_fast: false,
            detailed_errors: false,
            manager_path: "/manager".to_string(),
            default_page_size: 25,
            locale: "en".to_string(),
        }
    }
}

impl PlatformConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（便于测试注入）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let application_dir = read_optional(&lookup, "APPNG_APPLICATION_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.application_dir);
        let dev_mode = read_bool_with_default(&lookup, "APPNG_DEV_MODE", defaults.dev_mode);
        let validation_fail_fast = read_bool_with_default(
            &lookup,
            "APPNG_VALIDATION_FAIL_FAST",
            defaults.validation_fail_fast,
        );
        let detailed_errors =
            read_bool_with_default(&lookup, "APPNG_DETAILED_ERRORS", defaults.detailed_errors);
        let manager_path = read_optional(&lookup, "APPNG_MANAGER_PATH")
            .map(|value| format!("/{}", value.trim_matches('/')))
            .unwrap_or(defaults.manager_path);
        let default_page_size = read_u32_with_default(
            &lookup,
            "APPNG_DEFAULT_PAGE_SIZE",
            defaults.default_page_size,
        )?;
        if default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "APPNG_DEFAULT_PAGE_SIZE".to_string(),
                "0".to_string(),
            ));
        }
        let locale = read_optional(&lookup, "APPNG_LOCALE").unwrap_or(defaults.locale);

        Ok(Self {
            application_dir,
            dev_mode,
            validation_fail_fast,
            detailed_errors,
            manager_path,
            default_page_size,
            locale,
        })
    }
}

fn read_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

fn read_u32_with_default<F>(lookup: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match read_optional(lookup, key) {
        Some(value) => value,
        None => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_bool_with_default<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        None => default,
    }
}
