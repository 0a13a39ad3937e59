use crate::line_index::XmlLineIndex;
use appng_schema::{
    Action, ApplicationInfo, ApplicationRootConfig, Datasource, Event, PageDefinition,
};
use std::collections::BTreeMap;
use std::fmt;

/// 资源名索引中的实体类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Page,
    Event,
    Action,
    Datasource,
    RootConfig,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Page => "page",
            ResourceKind::Event => "event",
            ResourceKind::Action => "action",
            ResourceKind::Datasource => "datasource",
            ResourceKind::RootConfig => "applicationRootConfig",
        }
    }

    /// 对应的 XML 元素名（行号索引的键）。
    pub fn element(&self) -> &'static str {
        self.as_str()
    }

    pub(crate) fn key(&self, id: &str) -> String {
        format!("{}:{}", self.as_str(), id)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一个应用的完整配置图（加载后只读共享）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigState {
    pub application: ApplicationInfo,
    pub root_config: Option<ApplicationRootConfig>,
    pub pages: BTreeMap<String, PageDefinition>,
    pub events: BTreeMap<String, Event>,
    pub datasources: BTreeMap<String, Datasource>,
    pub default_page: Option<String>,
    pub session_params: Vec<String>,
    /// `kind:id` → 资源名
    pub resource_names: BTreeMap<String, String>,
    /// 资源名 → 行号索引（仅在详细错误模式下构建，不进入快照）
    pub line_index: BTreeMap<String, XmlLineIndex>,
}

impl ConfigState {
    pub fn action(&self, event_id: &str, action_id: &str) -> Option<&Action> {
        self.events
            .get(event_id)?
            .actions
            .iter()
            .find(|action| action.id == action_id)
    }

    pub fn resource_name(&self, kind: ResourceKind, id: &str) -> Option<&str> {
        self.resource_names.get(&kind.key(id)).map(String::as_str)
    }

    pub(crate) fn record_resource(&mut self, kind: ResourceKind, id: &str, resource: &str) {
        self.resource_names
            .insert(kind.key(id), resource.to_string());
    }

    /// `[resource:line]` 位置前缀；行号未知时只给出资源名。
    pub fn location(&self, kind: ResourceKind, id: &str) -> Option<String> {
        let lookup_id = match kind {
            ResourceKind::Action => id.rsplit(':').next().unwrap_or(id),
            _ => id,
        };
        let resource = self.resource_name(kind, id)?;
        let line = self
            .line_index
            .get(resource)
            .and_then(|index| index.line_of(kind.element(), lookup_id));
        Some(match line {
            Some(line) => format!("{}:{}", resource, line),
            None => resource.to_string(),
        })
    }
}
