//! XML 编组服务。
//!
//! 解组时先读取根元素名判定文档类型，再按类型反序列化。

use crate::application::ApplicationInfo;
use crate::config::{
    ApplicationRootConfig, Datasource, Datasources, Event, Events, PageDefinition, Pages,
};
use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// 编组错误。
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    #[error("xml parse error: {0}")]
    Parse(String),
    #[error("xml serialize error: {0}")]
    Serialize(String),
    #[error("unknown root element: {0}")]
    UnknownRoot(String),
    #[error("document has no root element")]
    Empty,
}

/// 已识别的配置文档。
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigDocument {
    Datasources(Datasources),
    Datasource(Datasource),
    Events(Events),
    Event(Event),
    Pages(Pages),
    Page(PageDefinition),
    RootConfig(ApplicationRootConfig),
    Application(ApplicationInfo),
}

impl ConfigDocument {
    pub fn root_name(&self) -> &'static str {
        match self {
            ConfigDocument::Datasources(_) => "datasources",
            ConfigDocument::Datasource(_) => "datasource",
            ConfigDocument::Events(_) => "events",
            ConfigDocument::Event(_) => "event",
            ConfigDocument::Pages(_) => "pages",
            ConfigDocument::Page(_) => "page",
            ConfigDocument::RootConfig(_) => "applicationRootConfig",
            ConfigDocument::Application(_) => "application",
        }
    }
}

/// XML 编组/解组服务。
#[derive(Debug, Clone, Default)]
pub struct MarshallService {
    pretty: bool,
}

impl MarshallService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输出带缩进的 XML。
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// 读取根元素的本地名称（忽略命名空间前缀）。
    pub fn root_element(xml: &str) -> Result<String, MarshalError> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event() {
                Ok(XmlEvent::Start(ref element)) | Ok(XmlEvent::Empty(ref element)) => {
                    return Ok(String::from_utf8_lossy(element.local_name().as_ref()).into_owned());
                }
                Ok(XmlEvent::Eof) => return Err(MarshalError::Empty),
                Err(err) => return Err(MarshalError::Parse(err.to_string())),
                _ => {}
            }
        }
    }

    /// 按根元素解组配置文档。
    pub fn unmarshal(&self, xml: &str) -> Result<ConfigDocument, MarshalError> {
        let root = Self::root_element(xml)?;
        let document = match root.as_str() {
            "datasources" => ConfigDocument::Datasources(self.unmarshal_as(xml)?),
            "datasource" => ConfigDocument::Datasource(self.unmarshal_as(xml)?),
            "events" => ConfigDocument::Events(self.unmarshal_as(xml)?),
            "event" => ConfigDocument::Event(self.unmarshal_as(xml)?),
            "pages" => ConfigDocument::Pages(self.unmarshal_as(xml)?),
            "page" => ConfigDocument::Page(self.unmarshal_as(xml)?),
            "applicationRootConfig" => ConfigDocument::RootConfig(self.unmarshal_as(xml)?),
            "application" => ConfigDocument::Application(self.unmarshal_as(xml)?),
            _ => return Err(MarshalError::UnknownRoot(root)),
        };
        tracing::debug!(
            target: "appng.schema",
            root = %document.root_name(),
            "document_unmarshalled"
        );
        Ok(document)
    }

    pub fn unmarshal_as<T: DeserializeOwned>(&self, xml: &str) -> Result<T, MarshalError> {
        quick_xml::de::from_str(xml).map_err(|err| MarshalError::Parse(err.to_string()))
    }

    /// 以指定根元素名编组。
    pub fn marshal<T: Serialize>(&self, root: &str, value: &T) -> Result<String, MarshalError> {
        let mut buffer = String::new();
        let mut serializer = quick_xml::se::Serializer::with_root(&mut buffer, Some(root))
            .map_err(|err| MarshalError::Serialize(err.to_string()))?;
        if self.pretty {
            serializer.indent(' ', 2);
        }
        value
            .serialize(serializer)
            .map_err(|err| MarshalError::Serialize(err.to_string()))?;
        Ok(buffer)
    }

    pub fn marshal_document(&self, document: &ConfigDocument) -> Result<String, MarshalError> {
        let root = document.root_name();
        match document {
            ConfigDocument::Datasources(value) => self.marshal(root, value),
            ConfigDocument::Datasource(value) => self.marshal(root, value),
            ConfigDocument::Events(value) => self.marshal(root, value),
            ConfigDocument::Event(value) => self.marshal(root, value),
            ConfigDocument::Pages(value) => self.marshal(root, value),
            ConfigDocument::Page(value) => self.marshal(root, value),
            ConfigDocument::RootConfig(value) => self.marshal(root, value),
            ConfigDocument::Application(value) => self.marshal(root, value),
        }
    }
}
