use crate::field_processor::FieldProcessor;
use appng_binding::BindingError;
use appng_expression::ExpressionError;
use domain::SessionError;

/// 业务 Provider 返回的错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// 自带可展示消息（消息键 + 位置参数），不做通用包装。
    #[error("{key}")]
    Message { key: String, args: Vec<String> },
    #[error("{0}")]
    Failed(String),
}

impl ProviderError {
    pub fn message(key: impl Into<String>, args: &[&str]) -> Self {
        Self::Message {
            key: key.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 处理失败的具体原因。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessingCause {
    #[error("unknown reference: {0}")]
    UnknownReference(String),
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("no data: {0}")]
    NoData(String),
    #[error("provider failed: {0}")]
    Provider(String),
    #[error("binding failed: {0}")]
    Binding(String),
    #[error("expression failed: {0}")]
    Expression(String),
    #[error("session failed: {0}")]
    Session(String),
}

/// 单次请求内的处理错误。
///
/// 始终可携带 `FieldProcessor` 快照；意外错误另带关联 ID，
/// 终端用户只看到包含该 ID 的通用提示。
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProcessingError {
    pub message: String,
    #[source]
    pub cause: ProcessingCause,
    pub correlation_id: Option<u64>,
    pub field_processor: Option<FieldProcessor>,
}

impl ProcessingError {
    pub fn new(message: impl Into<String>, cause: ProcessingCause) -> Self {
        Self {
            message: message.into(),
            cause,
            correlation_id: None,
            field_processor: None,
        }
    }

    pub fn unknown(kind: &str, id: &str) -> Self {
        Self::new(
            format!("unknown {} '{}'", kind, id),
            ProcessingCause::UnknownReference(format!("{}:{}", kind, id)),
        )
    }

    pub fn with_correlation_id(mut self, correlation_id: u64) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_field_processor(mut self, field_processor: &FieldProcessor) -> Self {
        self.field_processor = Some(field_processor.clone());
        self
    }

    pub fn is_illegal_argument(&self) -> bool {
        matches!(self.cause, ProcessingCause::IllegalArgument(_))
    }
}

impl From<ExpressionError> for ProcessingError {
    fn from(err: ExpressionError) -> Self {
        Self::new(err.to_string(), ProcessingCause::Expression(err.to_string()))
    }
}

impl From<BindingError> for ProcessingError {
    fn from(err: BindingError) -> Self {
        Self::new(err.to_string(), ProcessingCause::Binding(err.to_string()))
    }
}

impl From<SessionError> for ProcessingError {
    fn from(err: SessionError) -> Self {
        Self::new(err.to_string(), ProcessingCause::Session(err.to_string()))
    }
}
