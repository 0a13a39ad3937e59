//! 应用 XML 资源来源
//!
//! - `InMemoryResources`：测试与嵌入场景
//! - `DirectoryResources`：应用目录（`application.xml` + `conf/*.xml`）

use crate::error::InvalidConfigurationError;
use std::fs;
use std::path::{Path, PathBuf};

/// 单个 XML 资源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub content: String,
}

impl Resource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// 应用资源来源；开发模式下每次加载都会重新读取。
pub trait Resources: Send + Sync {
    /// 应用描述（application.xml）；不存在时返回 None。
    fn application_descriptor(&self) -> Result<Option<Resource>, InvalidConfigurationError>;

    /// 全部配置 XML，按名称排序。
    fn config_resources(&self) -> Result<Vec<Resource>, InvalidConfigurationError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    application: Option<Resource>,
    resources: Vec<Resource>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application_xml(mut self, xml: impl Into<String>) -> Self {
        self.application = Some(Resource::new("application.xml", xml));
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, xml: impl Into<String>) -> Self {
        self.resources.push(Resource::new(name, xml));
        self
    }
}

impl Resources for InMemoryResources {
    fn application_descriptor(&self) -> Result<Option<Resource>, InvalidConfigurationError> {
        Ok(self.application.clone())
    }

    fn config_resources(&self) -> Result<Vec<Resource>, InvalidConfigurationError> {
        Ok(self.resources.clone())
    }
}

/// 目录资源
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    application: String,
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(application: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            application: application.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, path: &Path) -> Result<Resource, InvalidConfigurationError> {
        let name = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let content = fs::read_to_string(path).map_err(|err| InvalidConfigurationError::Resource {
            application: self.application.clone(),
            resource: name.clone(),
            message: err.to_string(),
        })?;
        Ok(Resource::new(name, content))
    }
}

impl Resources for DirectoryResources {
    fn application_descriptor(&self) -> Result<Option<Resource>, InvalidConfigurationError> {
        let path = self.root.join("application.xml");
        if !path.is_file() {
            return Ok(None);
        }
        self.read(&path).map(Some)
    }

    fn config_resources(&self) -> Result<Vec<Resource>, InvalidConfigurationError> {
        let conf = self.root.join("conf");
        let entries = fs::read_dir(&conf).map_err(|err| InvalidConfigurationError::Resource {
            application: self.application.clone(),
            resource: "conf".to_string(),
            message: err.to_string(),
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        paths.sort();
        paths.iter().map(|path| self.read(path)).collect()
    }
}
