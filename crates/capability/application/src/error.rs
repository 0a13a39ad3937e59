//! 应用配置错误类型

/// 配置加载或校验失败。
#[derive(Debug, thiserror::Error)]
pub enum InvalidConfigurationError {
    #[error("application '{0}' has no application descriptor")]
    MissingApplicationInfo(String),
    #[error("application '{application}': more than one root config, second one in {resource}")]
    DuplicateRootConfig {
        application: String,
        resource: String,
    },
    #[error("application '{application}': cannot read {resource}: {message}")]
    Resource {
        application: String,
        resource: String,
        message: String,
    },
    #[error("application '{application}' has {} validation error(s): {}", .errors.len(), .errors.join("; "))]
    Validation {
        application: String,
        errors: Vec<String>,
    },
    #[error("config snapshot error: {0}")]
    Snapshot(String),
    #[error("config lock failed")]
    Lock,
}
