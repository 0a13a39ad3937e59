//! 应用 XML 配置契约。
//!
//! - `config`：页面/事件/动作/数据源及其元数据
//! - `application`：应用描述（application.xml）
//! - `result`：输出给模板层的结果模型
//! - `marshal`：XML 编组/解组服务

pub mod application;
pub mod config;
pub mod marshal;
pub mod result;

pub use application::{ApplicationInfo, ApplicationPermission, ApplicationProperty, ApplicationRole, RoleRef};
pub use config::*;
pub use marshal::{ConfigDocument, MarshalError, MarshallService};
pub use result::{
    Data, Datafield, Message, MessageType, Messages, ResultRow, Resultset, Selection,
    SelectionOption, SelectionType, UserData, UserInput,
};
