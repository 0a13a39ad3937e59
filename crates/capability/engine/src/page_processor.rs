//! 页面处理：参数、权限、动作与数据源元素的执行顺序。

use crate::async_runner::TaskHandle;
use crate::callable_action::CallableAction;
use crate::callable_datasource::CallableDataSource;
use crate::error::ProcessingError;
use crate::request::ApplicationRequest;
use crate::runtime::ApplicationRuntime;
use appng_expression::ParameterSupport;
use appng_schema::{
    Action, Datasource, Label, Linkpanel, Messages as SchemaMessages, PageDefinition, Section,
};
use appng_telemetry::new_request_ids;
use domain::{Messages, Redirect, RequestContext};
use std::collections::BTreeMap;
use tracing::{Instrument, error, info, info_span};

/// 页面处理结果。
#[derive(Debug, Default)]
pub struct PageOutput {
    pub page_id: String,
    pub permitted: bool,
    pub title: Option<Label>,
    pub parameters: BTreeMap<String, String>,
    pub sections: Vec<SectionOutput>,
    pub linkpanels: Vec<Linkpanel>,
    pub navigation: Option<Linkpanel>,
    /// 本次请求展示的会话消息；发生重定向时留在会话中。
    pub messages: Messages,
    pub redirect: Option<Redirect>,
    pub tasks: Vec<TaskHandle>,
}

impl PageOutput {
    pub fn section(&self, id: &str) -> Option<&SectionOutput> {
        self.sections
            .iter()
            .find(|section| section.id.as_deref() == Some(id))
    }

    pub fn elements(&self) -> impl Iterator<Item = &ElementOutput> {
        self.sections.iter().flat_map(|section| section.elements.iter())
    }

    pub fn datasource(&self, id: &str) -> Option<&Datasource> {
        self.elements().find_map(|element| match element {
            ElementOutput::Datasource(datasource) if datasource.id == id => Some(datasource),
            _ => None,
        })
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.elements().find_map(|element| match element {
            ElementOutput::Action(action) if action.id == id => Some(action),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<&ElementError> {
        self.elements()
            .filter_map(|element| match element {
                ElementOutput::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionOutput {
    pub id: Option<String>,
    pub hidden: bool,
    pub title: Option<Label>,
    pub elements: Vec<ElementOutput>,
}

#[derive(Debug, Clone)]
pub enum ElementOutput {
    Action(Action),
    Datasource(Datasource),
    Error(ElementError),
}

/// 处理失败的元素：只保留引用、错误消息与关联 ID。
#[derive(Debug, Clone)]
pub struct ElementError {
    pub reference: String,
    pub message: String,
    pub correlation_id: Option<u64>,
    pub messages: Option<SchemaMessages>,
}

impl ElementError {
    fn from_error(reference: String, err: &ProcessingError) -> Self {
        Self {
            reference,
            message: err.to_string(),
            correlation_id: err.correlation_id,
            messages: err
                .field_processor
                .as_ref()
                .and_then(|field_processor| field_processor.schema_messages()),
        }
    }
}

pub struct PageProcessor {
    runtime: ApplicationRuntime,
}

impl PageProcessor {
    pub fn new(runtime: ApplicationRuntime) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &ApplicationRuntime {
        &self.runtime
    }

    /// 处理页面；`page_id` 为空时使用默认页面。
    pub async fn process(
        &self,
        context: &RequestContext,
        page_id: Option<&str>,
        request: &ApplicationRequest,
    ) -> Result<PageOutput, ProcessingError> {
        let page_id = match page_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self
                .runtime
                .config()
                .default_page()
                .ok_or_else(|| ProcessingError::unknown("page", "<default>"))?,
        };
        let ids = new_request_ids();
        let span = info_span!(
            "request",
            request_id = %ids.request_id,
            trace_id = %ids.trace_id,
            page_id = %page_id
        );
        self.process_page(context, &page_id, request)
            .instrument(span)
            .await
    }

    async fn process_page(
        &self,
        context: &RequestContext,
        page_id: &str,
        request: &ApplicationRequest,
    ) -> Result<PageOutput, ProcessingError> {
        let mut page = self
            .runtime
            .config()
            .page(page_id)
            .ok_or_else(|| ProcessingError::unknown("page", page_id))?;
        let helper = self.runtime.element_helper(context);
        let mut output = PageOutput {
            page_id: page.id.clone(),
            permitted: helper.permissions().has_permissions(&mut page),
            ..PageOutput::default()
        };
        if !output.permitted {
            info!(target: "appng.engine", page_id = %page.id, "page_not_permitted");
            return Ok(output);
        }

        output.parameters = self.page_parameters(context, &page, request)?;
        let support = ParameterSupport::dollar(output.parameters.clone())?;
        let sections = page.structure.sections.clone();
        let mut slots: Vec<Vec<Option<ElementOutput>>> = sections
            .iter()
            .map(|section| vec![None; section.elements.len()])
            .collect();

        for (section_index, section) in sections.iter().enumerate() {
            for (element_index, element) in section.elements.iter().enumerate() {
                let Some(reference) = element.action.clone() else {
                    continue;
                };
                let name = format!("{}:{}", reference.event_id, reference.id);
                let result = self
                    .perform_action(context, request, reference, &support, &mut output)
                    .await;
                slots[section_index][element_index] = element_output(name, result);
                if context.is_redirected() {
                    return Ok(self.redirected(context, output));
                }
            }
        }

        for (section_index, section) in sections.iter().enumerate() {
            for (element_index, element) in section.elements.iter().enumerate() {
                let Some(reference) = element.datasource.clone() else {
                    continue;
                };
                let name = reference.id.clone();
                let result = self
                    .perform_datasource(context, request, reference, &support)
                    .await;
                slots[section_index][element_index] = element_output(name, result);
                if context.is_redirected() {
                    return Ok(self.redirected(context, output));
                }
            }
        }

        let evaluator = helper.evaluator(&output.parameters);
        let field_parameters = ParameterSupport::hash(output.parameters.clone())?;
        let labels = helper.label_support(&evaluator, Some(&field_parameters));
        output.sections = sections
            .into_iter()
            .zip(slots)
            .map(|(section, elements)| section_output(section, elements, &labels))
            .collect();
        output.title = page.config.title.clone().map(|mut title| {
            labels.set_label(&mut title);
            title
        });
        output.linkpanels = page.config.linkpanels.clone();
        helper.init_linkpanels(&mut output.linkpanels, &evaluator, &support);
        output.navigation = helper.init_navigation(&evaluator);
        output.messages = context.session.take_messages()?;
        info!(
            target: "appng.engine",
            page_id = %page.id,
            sections = output.sections.len(),
            messages = output.messages.len(),
            "page_processed"
        );
        Ok(output)
    }

    /// 页面参数：路径参数按位置，get/post 参数取自请求，会话参数取自会话。
    fn page_parameters(
        &self,
        context: &RequestContext,
        page: &PageDefinition,
        request: &ApplicationRequest,
    ) -> Result<BTreeMap<String, String>, ProcessingError> {
        let mut parameters = BTreeMap::new();
        if let Some(schema) = &page.config.url_schema {
            for (index, param) in schema.url_params().iter().enumerate() {
                let value = request
                    .url_parameters()
                    .get(index)
                    .filter(|value| !value.is_empty())
                    .cloned()
                    .or_else(|| param.default.clone());
                if let Some(value) = value {
                    parameters.insert(param.name.clone(), value);
                }
            }
            let post_params: &[_] = if request.is_post() {
                schema.post_params()
            } else {
                &[]
            };
            for param in schema.get_params().iter().chain(post_params) {
                let value = request
                    .parameter(&param.name)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
                    .or_else(|| param.default.clone());
                if let Some(value) = value {
                    parameters.insert(param.name.clone(), value);
                }
            }
        }
        for name in self.runtime.config().session_params() {
            if let Some(value) = request.parameter(&name).filter(|value| !value.is_empty()) {
                context.session.set_attribute(&name, value.to_string())?;
            }
            if let Some(value) = context.session.attribute(&name) {
                parameters.entry(name).or_insert(value);
            }
        }
        Ok(parameters)
    }

    async fn perform_action(
        &self,
        context: &RequestContext,
        request: &ApplicationRequest,
        reference: appng_schema::ActionRef,
        support: &ParameterSupport,
        output: &mut PageOutput,
    ) -> Result<Option<ElementOutput>, ProcessingError> {
        let mut action = CallableAction::new(&self.runtime, context, request, reference, support)?;
        if !action.do_include() && !action.do_execute() {
            return Ok(None);
        }
        let result = action.perform().await;
        if let Some(task) = action.take_task() {
            output.tasks.push(task);
        }
        result?;
        if !action.do_include() {
            return Ok(None);
        }
        Ok(action.into_action().map(ElementOutput::Action))
    }

    async fn perform_datasource(
        &self,
        context: &RequestContext,
        request: &ApplicationRequest,
        reference: appng_schema::DatasourceRef,
        support: &ParameterSupport,
    ) -> Result<Option<ElementOutput>, ProcessingError> {
        let mut datasource =
            CallableDataSource::new(&self.runtime, context, request, reference, support)?;
        if !datasource.perform().await? {
            return Ok(None);
        }
        self.runtime
            .element_helper(context)
            .add_messages(datasource.field_processor().messages())?;
        Ok(datasource.into_datasource().map(ElementOutput::Datasource))
    }

    fn redirected(&self, context: &RequestContext, mut output: PageOutput) -> PageOutput {
        output.redirect = context.redirects().into_iter().next();
        output.sections.clear();
        info!(
            target: "appng.engine",
            page_id = %output.page_id,
            redirect = ?output.redirect.as_ref().map(|redirect| redirect.target.as_str()),
            "page_redirected"
        );
        output
    }
}

fn element_output(
    reference: String,
    result: Result<Option<ElementOutput>, ProcessingError>,
) -> Option<ElementOutput> {
    match result {
        Ok(element) => element,
        Err(err) => {
            error!(
                target: "appng.engine",
                element = %reference,
                correlation_id = ?err.correlation_id,
                error = %err,
                "element_failed"
            );
            Some(ElementOutput::Error(ElementError::from_error(reference, &err)))
        }
    }
}

fn section_output(
    section: Section,
    elements: Vec<Option<ElementOutput>>,
    labels: &crate::labels::LabelSupport<'_>,
) -> SectionOutput {
    SectionOutput {
        id: section.id,
        hidden: section.hidden.unwrap_or(false),
        title: section.title.map(|mut title| {
            labels.set_label(&mut title);
            title
        }),
        elements: elements.into_iter().flatten().collect(),
    }
}
