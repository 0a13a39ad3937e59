//! 会话存储。
//!
//! 会话级消息在重定向之后仍然可见（flash 语义），
//! 排序/分页状态等以字符串属性保存。

use crate::messages::Messages;
use std::collections::HashMap;
use std::sync::RwLock;

/// 会话存储错误。
#[derive(Debug)]
pub struct SessionError {
    message: String,
}

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SessionError {}

/// 会话存储接口
///
/// 异步任务会在请求结束后写入消息，因此实现必须线程安全。
pub trait SessionStore: Send + Sync {
    /// 当前会话消息（副本）
    fn messages(&self) -> Messages;

    /// 追加会话消息
    fn add_messages(&self, messages: &Messages) -> Result<(), SessionError>;

    /// 覆盖会话消息
    fn set_messages(&self, messages: Messages) -> Result<(), SessionError>;

    /// 取出并清空会话消息
    fn take_messages(&self) -> Result<Messages, SessionError>;

    /// 读取会话属性
    fn attribute(&self, key: &str) -> Option<String>;

    /// 写入会话属性
    fn set_attribute(&self, key: &str, value: String) -> Result<(), SessionError>;

    /// 删除会话属性
    fn remove_attribute(&self, key: &str) -> Result<(), SessionError>;
}

/// 会话内存存储
///
/// 使用 RwLock 提供线程安全的内存存储。
#[derive(Default)]
pub struct InMemorySessionStore {
    messages: RwLock<Messages>,
    attributes: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn messages(&self) -> Messages {
        self.messages
            .read()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    fn add_messages(&self, messages: &Messages) -> Result<(), SessionError> {
        let mut current = self
            .messages
            .write()
            .map_err(|_| SessionError::new("lock failed"))?;
        current.extend(messages);
        Ok(())
    }

    fn set_messages(&self, messages: Messages) -> Result<(), SessionError> {
        let mut current = self
            .messages
            .write()
            .map_err(|_| SessionError::new("lock failed"))?;
        *current = messages;
        Ok(())
    }

    fn take_messages(&self) -> Result<Messages, SessionError> {
        let mut current = self
            .messages
            .write()
            .map_err(|_| SessionError::new("lock failed"))?;
        Ok(std::mem::take(&mut *current))
    }

    fn attribute(&self, key: &str) -> Option<String> {
        self.attributes
            .read()
            .ok()
            .and_then(|map| map.get(key).cloned())
    }

    fn set_attribute(&self, key: &str, value: String) -> Result<(), SessionError> {
        let mut map = self
            .attributes
            .write()
            .map_err(|_| SessionError::new("lock failed"))?;
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_attribute(&self, key: &str) -> Result<(), SessionError> {
        let mut map = self
            .attributes
            .write()
            .map_err(|_| SessionError::new("lock failed"))?;
        map.remove(key);
        Ok(())
    }
}
