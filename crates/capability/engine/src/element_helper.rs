//! 元素级公共处理：参数、条件、链接面板、标签、消息。

use crate::error::ProcessingError;
use crate::field_processor::FieldProcessor;
use crate::labels::{LabelSupport, localize};
use crate::provider::{DataContainer, Options};
use crate::runtime::ApplicationRuntime;
use appng_expression::{ExpressionEvaluator, ParameterSupport};
use appng_permission::PermissionProcessor;
use appng_schema::{
    Bean, Condition, Data, DataConfig, FieldDef, Label, LinkMode, Linkpanel, MetaData, Param,
};
use domain::{Messages, RequestContext};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 绑定到一次请求的元素辅助。
pub struct ElementHelper<'a> {
    runtime: &'a ApplicationRuntime,
    context: &'a RequestContext,
    permissions: Arc<dyn PermissionProcessor>,
}

impl<'a> ElementHelper<'a> {
    pub fn new(runtime: &'a ApplicationRuntime, context: &'a RequestContext) -> Self {
        Self {
            runtime,
            context,
            permissions: runtime.permission_processor(context),
        }
    }

    pub fn permissions(&self) -> &dyn PermissionProcessor {
        self.permissions.as_ref()
    }

    /// 解析元素参数。
    ///
    /// 引用参数先以调用方参数替换；每个声明参数按
    /// 执行值 > 引用值 > 声明默认值 取值，三者皆无则不出现在结果中。
    /// 执行值与引用值冲突时只记录警告，保留执行值。
    pub fn initialize_parameters(
        &self,
        reference: &str,
        declared: &[Param],
        reference_params: &[Param],
        caller: &ParameterSupport,
        execution: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut resolved = BTreeMap::new();
        for param in declared {
            let reference_value = reference_params
                .iter()
                .find(|candidate| candidate.name == param.name)
                .map(|candidate| caller.replace(&candidate.value))
                .filter(|value| !value.is_empty());
            let execution_value = execution
                .get(&param.name)
                .filter(|value| !value.is_empty())
                .cloned();
            let default_value = param.default.clone().filter(|value| !value.is_empty());

            if let (Some(execution_value), Some(reference_value)) =
                (&execution_value, &reference_value)
                && execution_value != reference_value
            {
                warn!(
                    target: "appng.engine",
                    element = %reference,
                    parameter = %param.name,
                    request_value = %execution_value,
                    reference_value = %reference_value,
                    "ambiguous_parameter"
                );
            }
            if let Some(value) = execution_value.or(reference_value).or(default_value) {
                resolved.insert(param.name.clone(), value);
            }
        }
        debug!(
            target: "appng.engine",
            element = %reference,
            parameters = ?resolved,
            "parameters_resolved"
        );
        resolved
    }

    /// 以参数表构造求值器，附带 `SESSION`、`PLATFORM`、`SITE` 变量。
    pub fn evaluator(&self, parameters: &BTreeMap<String, String>) -> ExpressionEvaluator {
        let mut evaluator = ExpressionEvaluator::with_parameters(parameters);
        let session: BTreeMap<String, String> = self
            .runtime
            .config()
            .session_params()
            .into_iter()
            .filter_map(|name| {
                self.context
                    .session
                    .attribute(&name)
                    .map(|value| (name, value))
            })
            .collect();
        evaluator.set_map("SESSION", &session);
        evaluator.set_map("PLATFORM", &self.context.platform.as_map());
        let site = &self.context.site;
        let mut site_values = BTreeMap::new();
        site_values.insert("name".to_string(), site.name.clone());
        site_values.insert("host".to_string(), site.host.clone());
        site_values.insert("domain".to_string(), site.domain.clone());
        evaluator.set_map("SITE", &site_values);
        evaluator
    }

    /// 没有条件视为满足。
    pub fn condition_matches(
        &self,
        condition: Option<&Condition>,
        evaluator: &ExpressionEvaluator,
    ) -> bool {
        condition.is_none_or(|condition| evaluator.is_true(&condition.expression))
    }

    /// 应用输出前缀：`<manager>/<site>/<application>`，请求上下文可覆盖。
    pub fn output_prefix(&self) -> String {
        if !self.context.output_prefix.is_empty() {
            return self.context.output_prefix.trim_end_matches('/').to_string();
        }
        format!(
            "{}/{}/{}",
            self.runtime.platform().manager_path.trim_end_matches('/'),
            self.context.site.name,
            self.context.application.name
        )
    }

    /// 标签解析；`field_parameters` 提供 `#{name}` 形式的标签参数。
    pub fn label_support<'b>(
        &'b self,
        evaluator: &'b ExpressionEvaluator,
        field_parameters: Option<&'b ParameterSupport>,
    ) -> LabelSupport<'b> {
        let labels = LabelSupport::new(self.runtime.messages(), &self.context.locale, evaluator);
        match field_parameters {
            Some(field_parameters) => labels.with_field_parameters(field_parameters),
            None => labels,
        }
    }

    pub fn localize(&self, key: &str, args: &[String]) -> String {
        localize(self.runtime.messages(), &self.context.locale, key, args)
    }

    /// 过滤链接：权限与条件不满足的链接移除；目标参数替换，内部链接加输出前缀。
    /// 未知占位符（如行内的 `${current.id}`）保留到逐行处理。
    pub fn init_linkpanels(
        &self,
        linkpanels: &mut [Linkpanel],
        evaluator: &ExpressionEvaluator,
        parameters: &ParameterSupport,
    ) {
        let prefix = self.output_prefix();
        let field_parameters = ParameterSupport::hash(parameters.parameters().clone()).ok();
        let labels = self.label_support(evaluator, field_parameters.as_ref());
        for linkpanel in linkpanels.iter_mut() {
            linkpanel.links.retain_mut(|link| {
                self.permissions.has_permissions(&mut *link)
                    && self.condition_matches(link.condition.as_ref(), evaluator)
            });
            for link in linkpanel.links.iter_mut() {
                let target = replace_known(parameters, &link.target);
                link.target = match link.mode {
                    LinkMode::Intern if target.starts_with('/') => format!("{}{}", prefix, target),
                    LinkMode::Intern => format!("{}/{}", prefix, target),
                    _ => target,
                };
                if let Some(label) = link.label.as_mut() {
                    labels.set_label(label);
                }
                if let Some(confirmation) = link.confirmation.as_mut() {
                    labels.set_label(confirmation);
                }
            }
        }
    }

    /// 根配置中的导航面板。
    pub fn init_navigation(&self, evaluator: &ExpressionEvaluator) -> Option<Linkpanel> {
        let mut navigation = self.runtime.config().root_config()?.navigation?;
        let parameters = ParameterSupport::dollar(BTreeMap::new()).ok()?;
        self.init_linkpanels(std::slice::from_mut(&mut navigation), evaluator, &parameters);
        Some(navigation)
    }

    /// 标题、描述、标签与字段标签；`#{name}` 参数取自元素参数。
    pub fn set_labels(
        &self,
        config: &mut DataConfig,
        evaluator: &ExpressionEvaluator,
        parameters: &BTreeMap<String, String>,
    ) {
        let field_parameters = ParameterSupport::hash(parameters.clone()).ok();
        let labels = self.label_support(evaluator, field_parameters.as_ref());
        set_optional_label(&labels, config.title.as_mut());
        set_optional_label(&labels, config.description.as_mut());
        if let Some(config_labels) = config.labels.as_mut() {
            labels.set_labels(&mut config_labels.labels);
        }
        if let Some(meta_data) = config.meta_data.as_mut() {
            set_field_labels(&labels, &mut meta_data.fields);
        }
    }

    pub fn options(&self, bean: &Bean, parameters: &ParameterSupport) -> Options {
        Options::from_bean(bean, parameters)
    }

    /// 按权限与条件裁剪字段。
    ///
    /// 无读权限的字段移除；`writable` 时无写权限的字段标记为只读。
    /// 引用 `current` 的条件留到逐行求值。
    pub fn init_meta_data(&self, meta_data: &mut MetaData, evaluator: &ExpressionEvaluator, writable: bool) {
        self.init_fields(&mut meta_data.fields, evaluator, writable);
    }

    fn init_fields(&self, fields: &mut Vec<FieldDef>, evaluator: &ExpressionEvaluator, writable: bool) {
        fields.retain_mut(|field| {
            if !self.permissions.has_read_permission(field) {
                return false;
            }
            if let Some(condition) = &field.condition
                && !condition.expression.contains("current")
                && !evaluator.is_true(&condition.expression)
            {
                return false;
            }
            if writable && !self.permissions.has_write_permission(field) {
                field.readonly = Some(true);
            }
            true
        });
        for field in fields.iter_mut() {
            self.init_fields(&mut field.fields, evaluator, writable);
        }
    }

    pub fn add_messages(&self, messages: &Messages) -> Result<(), ProcessingError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.context.session.add_messages(messages)?;
        Ok(())
    }

    /// 会话中现有消息（不取出）。
    pub fn session_messages(&self) -> Messages {
        self.context.session.messages()
    }

    /// 选项集合的标题。
    pub fn set_selection_titles(&self, data: &mut Data, evaluator: &ExpressionEvaluator) {
        let labels = self.label_support(evaluator, None);
        for selection in data.selections.iter_mut() {
            set_optional_label(&labels, selection.title.as_mut());
        }
    }

    /// Provider 返回值转换为输出数据。
    pub fn build_data(
        &self,
        container: &DataContainer,
        field_processor: &FieldProcessor,
        evaluator: &ExpressionEvaluator,
    ) -> Data {
        let results = self.runtime.results();
        let mut data = Data {
            result: container
                .item
                .as_ref()
                .map(|item| results.build_result(field_processor, item, evaluator)),
            resultset: container
                .page
                .as_ref()
                .map(|page| results.build_resultset(field_processor, page, evaluator)),
            selections: container.selections.clone(),
        };
        self.set_selection_titles(&mut data, evaluator);
        data
    }
}

fn replace_known(parameters: &ParameterSupport, text: &str) -> String {
    parameters
        .placeholder_names(text)
        .into_iter()
        .fold(text.to_string(), |target, name| match parameters.get(&name) {
            Some(value) => target.replace(
                &format!("{}{}{}", parameters.prefix(), name, parameters.suffix()),
                value,
            ),
            None => target,
        })
}

fn set_optional_label(labels: &LabelSupport<'_>, label: Option<&mut Label>) {
    if let Some(label) = label {
        labels.set_label(label);
    }
}

fn set_field_labels(labels: &LabelSupport<'_>, fields: &mut [FieldDef]) {
    for field in fields {
        set_optional_label(labels, field.label.as_mut());
        set_field_labels(labels, &mut field.fields);
    }
}
