//! 请求期执行引擎。
//!
//! - `callable_datasource` / `callable_action`：页面元素的执行单元
//! - `page_processor`：按页面结构驱动元素执行
//! - `element_helper`：参数解析、条件、链接面板与标签
//! - `field_processor`：单个元素的字段与消息容器
//! - `provider`：数据/动作 Provider 接口与 Bean 注册表
//! - `request`：表单请求、绑定对象填充与校验
//! - `result_service`：对象到输出结果的转换
//! - `async_runner`：后台动作执行

mod async_runner;
mod callable_action;
mod callable_datasource;
mod element_helper;
mod error;
mod field_processor;
mod labels;
mod page_processor;
mod pageable;
mod provider;
mod request;
mod result_service;
mod runtime;

pub use async_runner::{AsyncTaskRunner, TaskAborted, TaskHandle};
pub use callable_action::CallableAction;
pub use callable_datasource::CallableDataSource;
pub use element_helper::ElementHelper;
pub use error::{ProcessingCause, ProcessingError, ProviderError};
pub use field_processor::{FieldProcessor, to_schema_messages};
pub use labels::{
    BACKGROUND_TASK_ERROR, BACKGROUND_TASK_FINISHED, BACKGROUND_TASK_STARTED, INTERNAL_ERROR,
    INVALID_VALUE, InMemoryMessageSource, LabelSupport, MessageSource, format_message, localize,
};
pub use page_processor::{ElementError, ElementOutput, PageOutput, PageProcessor, SectionOutput};
pub use pageable::{Page, Pageable, SortField, sort_parameter_name};
pub use provider::{
    ActionProvider, BeanRegistry, DataContainer, DataProvider, NoopActionProvider, Options,
};
pub use request::{
    ApplicationRequest, RequestMethod, RequestSupport, apply_selections, user_data,
};
pub use result_service::{FieldConverter, ResultService};
pub use runtime::ApplicationRuntime;
