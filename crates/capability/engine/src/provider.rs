//! 业务 Provider 契约与 Bean 注册表。

use crate::error::ProviderError;
use crate::field_processor::FieldProcessor;
use crate::pageable::{Page, Pageable};
use crate::request::ApplicationRequest;
use appng_binding::BindFormValidator;
use appng_expression::ParameterSupport;
use appng_schema::{Bean, Selection};
use async_trait::async_trait;
use domain::{Instance, RequestContext, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Bean 选项：`<option name="x" id="1" value="..."/>`，属性值已完成参数替换。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    options: BTreeMap<String, BTreeMap<String, String>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 Bean 声明构造，属性中的 `${param}` 以当前参数替换。
    pub fn from_bean(bean: &Bean, parameters: &ParameterSupport) -> Self {
        let mut options = Self::new();
        for option in &bean.options {
            let attributes = options.options.entry(option.name.clone()).or_default();
            if let Some(id) = &option.id {
                attributes.insert("id".to_string(), parameters.replace(id));
            }
            if let Some(value) = &option.value {
                attributes.insert("value".to_string(), parameters.replace(value));
            }
        }
        options
    }

    pub fn with_option(mut self, name: &str, attribute: &str, value: impl Into<String>) -> Self {
        self.options
            .entry(name.to_string())
            .or_default()
            .insert(attribute.to_string(), value.into());
        self
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn option_value(&self, name: &str, attribute: &str) -> Option<&str> {
        self.options
            .get(name)
            .and_then(|attributes| attributes.get(attribute))
            .map(String::as_str)
    }

    pub fn string(&self, name: &str, attribute: &str) -> Option<String> {
        self.option_value(name, attribute).map(str::to_string)
    }

    pub fn integer(&self, name: &str, attribute: &str) -> Option<i64> {
        self.option_value(name, attribute)
            .and_then(|value| value.trim().parse().ok())
    }

    pub fn boolean(&self, name: &str, attribute: &str) -> Option<bool> {
        self.option_value(name, attribute)
            .and_then(|value| value.trim().parse().ok())
    }

    pub fn names(&self) -> Vec<String> {
        self.options.keys().cloned().collect()
    }
}

/// DataProvider 的返回值：单条对象或一页对象，外加选项集合。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataContainer {
    pub item: Option<Value>,
    pub page: Option<Page>,
    pub selections: Vec<Selection>,
}

impl DataContainer {
    pub fn single(item: impl Into<Value>) -> Self {
        Self {
            item: Some(item.into()),
            ..Self::default()
        }
    }

    pub fn paged(page: Page) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// 完整集合按分页请求排序截取。
    pub fn from_items(items: Vec<Value>, pageable: &Pageable) -> Self {
        Self::paged(Page::of(items, pageable))
    }

    pub fn selections_only(selections: Vec<Selection>) -> Self {
        Self {
            selections,
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selections.push(selection);
        self
    }

    /// 返回对象（单条或当前页全部条目）。
    pub fn values(&self) -> Vec<&Value> {
        let mut values: Vec<&Value> = self.item.iter().collect();
        if let Some(page) = &self.page {
            values.extend(page.items.iter());
        }
        values
    }
}

/// 只读数据提供者。
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// 返回 `Ok(None)` 表示没有数据，属于处理错误。
    async fn get_data(
        &self,
        context: &RequestContext,
        options: &Options,
        request: &ApplicationRequest,
        field_processor: &mut FieldProcessor,
    ) -> Result<Option<DataContainer>, ProviderError>;
}

/// 动作执行者。
#[async_trait]
pub trait ActionProvider: Send + Sync {
    async fn perform(
        &self,
        context: &RequestContext,
        options: &Options,
        request: &ApplicationRequest,
        bind_object: Option<&Instance>,
        field_processor: &mut FieldProcessor,
    ) -> Result<(), ProviderError>;

    /// Provider 自带的表单校验。
    fn form_validator(&self) -> Option<Arc<dyn BindFormValidator>> {
        None
    }
}

/// 空 Provider（用于占位）。
#[derive(Debug, Default)]
pub struct NoopActionProvider;

#[async_trait]
impl ActionProvider for NoopActionProvider {
    async fn perform(
        &self,
        _context: &RequestContext,
        _options: &Options,
        _request: &ApplicationRequest,
        _bind_object: Option<&Instance>,
        _field_processor: &mut FieldProcessor,
    ) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// 应用的 Bean 注册表（按 id 查找 Provider）。
#[derive(Clone, Default)]
pub struct BeanRegistry {
    data_providers: BTreeMap<String, Arc<dyn DataProvider>>,
    action_providers: BTreeMap<String, Arc<dyn ActionProvider>>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_data_provider(&mut self, id: impl Into<String>, provider: Arc<dyn DataProvider>) {
        self.data_providers.insert(id.into(), provider);
    }

    pub fn register_action_provider(
        &mut self,
        id: impl Into<String>,
        provider: Arc<dyn ActionProvider>,
    ) {
        self.action_providers.insert(id.into(), provider);
    }

    pub fn with_data_provider(mut self, id: impl Into<String>, provider: Arc<dyn DataProvider>) -> Self {
        self.register_data_provider(id, provider);
        self
    }

    pub fn with_action_provider(
        mut self,
        id: impl Into<String>,
        provider: Arc<dyn ActionProvider>,
    ) -> Self {
        self.register_action_provider(id, provider);
        self
    }

    pub fn data_provider(&self, id: &str) -> Option<Arc<dyn DataProvider>> {
        self.data_providers.get(id).cloned()
    }

    pub fn action_provider(&self, id: &str) -> Option<Arc<dyn ActionProvider>> {
        self.action_providers.get(id).cloned()
    }

    pub fn bean_ids(&self) -> Vec<String> {
        self.data_providers
            .keys()
            .chain(self.action_providers.keys())
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for BeanRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanRegistry")
            .field("data_providers", &self.data_providers.keys().collect::<Vec<_>>())
            .field("action_providers", &self.action_providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appng_schema::BeanOption;

    #[test]
    fn options_replace_parameters() {
        let bean = Bean {
            id: "personProvider".to_string(),
            options: vec![BeanOption {
                name: "mode".to_string(),
                id: Some("${personId}".to_string()),
                value: Some("fixed".to_string()),
            }],
        };
        let mut parameters = BTreeMap::new();
        parameters.insert("personId".to_string(), "7".to_string());
        let support = ParameterSupport::dollar(parameters).expect("pattern");
        let options = Options::from_bean(&bean, &support);
        assert_eq!(options.integer("mode", "id"), Some(7));
        assert_eq!(options.option_value("mode", "value"), Some("fixed"));
        assert!(!options.has_option("other"));
    }
}
