use crate::pageable::Pageable;
use appng_schema::{self as schema, FieldDef, Linkpanel, MetaData, MessageType};
use domain::{Message, MessageKind, Messages};
use std::collections::BTreeMap;

/// 单次调用的字段与消息收集器。
///
/// 持有当前生效的元数据（已按权限过滤）、全局消息、字段级消息、
/// Provider 追加的链接面板以及分页状态。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldProcessor {
    reference: String,
    meta_data: MetaData,
    messages: Messages,
    field_messages: BTreeMap<String, Messages>,
    linkpanels: Vec<Linkpanel>,
    pageable: Option<Pageable>,
}

impl FieldProcessor {
    pub fn new(reference: impl Into<String>, meta_data: MetaData) -> Self {
        Self {
            reference: reference.into(),
            meta_data,
            ..Self::default()
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn meta_data(&self) -> &MetaData {
        &self.meta_data
    }

    pub fn meta_data_mut(&mut self) -> &mut MetaData {
        &mut self.meta_data
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.meta_data.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.meta_data.field(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    fn message(&self, kind: MessageKind, text: impl Into<String>) -> Message {
        let mut message = Message::new(kind, text);
        message.reference = Some(self.reference.clone());
        message
    }

    pub fn add_ok_message(&mut self, text: impl Into<String>) {
        let message = self.message(MessageKind::Ok, text);
        self.messages.add(message);
    }

    pub fn add_notice_message(&mut self, text: impl Into<String>) {
        let message = self.message(MessageKind::Notice, text);
        self.messages.add(message);
    }

    pub fn add_error_message(&mut self, text: impl Into<String>) {
        let message = self.message(MessageKind::Error, text);
        self.messages.add(message);
    }

    pub fn add_invalid_message(&mut self, text: impl Into<String>) {
        let message = self.message(MessageKind::Invalid, text);
        self.messages.add(message);
    }

    /// 字段级消息。
    pub fn add_field_message(&mut self, field: &str, kind: MessageKind, text: impl Into<String>) {
        let message = self.message(kind, text);
        self.field_messages
            .entry(field.to_string())
            .or_default()
            .add(message);
    }

    pub fn add_invalid_field_message(&mut self, field: &str, text: impl Into<String>) {
        self.add_field_message(field, MessageKind::Invalid, text);
    }

    /// 追加一组已有消息（会话差异、后台任务）。
    pub fn add_messages(&mut self, messages: &Messages) {
        self.messages.extend(messages);
    }

    /// 全局消息。
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn field_messages(&self, field: &str) -> Option<&Messages> {
        self.field_messages.get(field)
    }

    pub fn has_errors(&self) -> bool {
        self.messages.has_errors() || self.has_field_errors()
    }

    pub fn has_field_errors(&self) -> bool {
        self.field_messages.values().any(Messages::has_errors)
    }

    pub fn clear_messages(&mut self) {
        self.messages = Messages::new();
        self.field_messages.clear();
    }

    /// Provider 动态追加的链接面板（同 id 覆盖）。
    pub fn add_linkpanel(&mut self, linkpanel: Linkpanel) {
        self.linkpanels.retain(|existing| existing.id != linkpanel.id);
        self.linkpanels.push(linkpanel);
    }

    pub fn linkpanels(&self) -> &[Linkpanel] {
        &self.linkpanels
    }

    pub fn linkpanel(&self, id: &str) -> Option<&Linkpanel> {
        self.linkpanels.iter().find(|linkpanel| linkpanel.id == id)
    }

    pub fn pageable(&self) -> Option<&Pageable> {
        self.pageable.as_ref()
    }

    pub fn set_pageable(&mut self, pageable: Pageable) {
        self.pageable = Some(pageable);
    }

    /// 全局消息转换为输出模型。
    pub fn schema_messages(&self) -> Option<schema::Messages> {
        to_schema_messages(Some(&self.reference), &self.messages)
    }

    /// 元数据副本，字段级消息写入对应字段。
    pub fn meta_data_with_messages(&self) -> MetaData {
        let mut meta_data = self.meta_data.clone();
        for field in meta_data.fields.iter_mut() {
            if let Some(messages) = self.field_messages.get(&field.name) {
                field.messages = to_schema_messages(Some(&field.name), messages);
            }
        }
        meta_data
    }
}

/// 领域消息转换为输出模型；无消息时返回 `None`。
pub fn to_schema_messages(reference: Option<&str>, messages: &Messages) -> Option<schema::Messages> {
    if messages.is_empty() {
        return None;
    }
    Some(schema::Messages {
        reference: reference.map(str::to_string),
        messages: messages
            .iter()
            .map(|message| schema::Message {
                kind: match message.kind {
                    MessageKind::Notice => MessageType::Notice,
                    MessageKind::Ok => MessageType::Ok,
                    MessageKind::Error => MessageType::Error,
                    MessageKind::Invalid => MessageType::Invalid,
                },
                reference: message.reference.clone(),
                text: message.text.clone(),
            })
            .collect(),
    })
}
