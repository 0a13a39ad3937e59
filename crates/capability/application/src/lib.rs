//! 应用配置：加载、缓存快照、数据源继承与静态校验。
//!
//! - `resources`：XML 资源来源（内存 / 应用目录）
//! - `provider`：`ApplicationConfigProvider`，按开发/生产模式加载并共享配置图
//! - `inheritance`：`child::parent` 数据源继承
//! - `validator`：`ConfigValidator` 一次性收集全部问题
//! - `snapshot`：带版本号的配置快照

mod error;
mod inheritance;
mod line_index;
mod provider;
mod resources;
mod snapshot;
mod state;
mod validator;

pub use error::InvalidConfigurationError;
pub use inheritance::{
    INHERITANCE_SEPARATOR, InheritanceOutcome, PendingDatasource, merge_datasource,
    process_inheritance, split_inheritance_id,
};
pub use line_index::XmlLineIndex;
pub use provider::{ApplicationConfigProvider, LoadOptions};
pub use resources::{DirectoryResources, InMemoryResources, Resource, Resources};
pub use snapshot::SNAPSHOT_VERSION;
pub use state::{ConfigState, ResourceKind};
pub use validator::{ConfigValidator, ValidationReport};
