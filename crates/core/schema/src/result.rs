//! 输出给模板层的结果模型。

use crate::config::{Label, Linkpanel};
use serde::{Deserialize, Serialize};

/// 单个字段值（嵌套对象字段含子字段）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Datafield {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(rename = "field", default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Datafield>,
}

impl Datafield {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Datafield> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// 单条结果。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "@selected", skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(rename = "field", default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Datafield>,
    #[serde(rename = "linkpanel", default, skip_serializing_if = "Vec::is_empty")]
    pub linkpanels: Vec<Linkpanel>,
}

impl ResultRow {
    pub fn field(&self, name: &str) -> Option<&Datafield> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }
}

/// 分页结果集。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resultset {
    #[serde(rename = "@chunk")]
    pub chunk: u32,
    #[serde(rename = "@chunkname")]
    pub chunk_name: String,
    #[serde(rename = "@chunksize")]
    pub chunk_size: u32,
    #[serde(rename = "@nextchunk")]
    pub next_chunk: u32,
    #[serde(rename = "@previouschunk")]
    pub previous_chunk: u32,
    #[serde(rename = "@firstchunk")]
    pub first_chunk: u32,
    #[serde(rename = "@lastchunk")]
    pub last_chunk: u32,
    #[serde(rename = "@hits")]
    pub hits: u64,
    #[serde(rename = "result", default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ResultRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionType {
    #[default]
    #[serde(rename = "select")]
    Select,
    #[serde(rename = "select:multiple")]
    SelectMultiple,
    #[serde(rename = "checkbox")]
    Checkbox,
    #[serde(rename = "radio")]
    Radio,
    #[serde(rename = "text")]
    Text,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionOption {
    #[serde(rename = "@value")]
    pub value: String,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@selected", skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl SelectionOption {
    pub fn new(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: name.into(),
            selected: None,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }
}

/// 选项集合（下拉框、复选框等）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub selection_type: SelectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Label>,
    #[serde(rename = "option", default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectionOption>,
}

/// 数据源输出槽。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Data {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resultset: Option<Resultset>,
    #[serde(rename = "selection", default, skip_serializing_if = "Vec::is_empty")]
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "NOTICE")]
    Notice,
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "INVALID")]
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "@class")]
    pub kind: MessageType,
    #[serde(rename = "@ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "$text", default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Messages {
    #[serde(rename = "@ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "message", default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl Messages {
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|message| matches!(message.kind, MessageType::Error | MessageType::Invalid))
    }
}

/// 用户提交的原始输入。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "$text", default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserData {
    #[serde(rename = "input", default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<UserInput>,
}

impl UserData {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| input.value.as_str())
    }
}
