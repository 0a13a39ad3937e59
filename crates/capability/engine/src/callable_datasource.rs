//! 单次请求内的数据源执行。
//!
//! 流程：权限 → 引用条件 → 参数解析 → Provider 取数 → 类型检查 → 输出。

use crate::error::{ProcessingCause, ProcessingError, ProviderError};
use crate::field_processor::FieldProcessor;
use crate::labels::INTERNAL_ERROR;
use crate::pageable::sort_parameter_name;
use crate::provider::DataContainer;
use crate::request::ApplicationRequest;
use crate::runtime::ApplicationRuntime;
use appng_expression::{ExpressionEvaluator, ParameterSupport};
use appng_schema::{Data, Datasource, DatasourceRef, Linkpanel, MetaData};
use appng_telemetry::{
    new_correlation_id, record_datasource_performed, record_processing_error, record_redirect,
};
use domain::{RequestContext, Value};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

pub struct CallableDataSource {
    runtime: ApplicationRuntime,
    context: RequestContext,
    request: ApplicationRequest,
    reference: DatasourceRef,
    source: Datasource,
    parameters: BTreeMap<String, String>,
    meta_data: MetaData,
    permitted: bool,
    include: bool,
    field_processor: FieldProcessor,
    container: Option<DataContainer>,
    output: Option<Datasource>,
}

impl CallableDataSource {
    /// 解析引用；权限不足时提前结束，`do_include()` 为 false。
    pub fn new(
        runtime: &ApplicationRuntime,
        context: &RequestContext,
        request: &ApplicationRequest,
        reference: DatasourceRef,
        caller: &ParameterSupport,
    ) -> Result<Self, ProcessingError> {
        let mut reference = reference;
        let mut source = runtime
            .config()
            .datasource(&reference.id)
            .ok_or_else(|| ProcessingError::unknown("datasource", &reference.id))?;
        let helper = runtime.element_helper(context);
        let reference_permitted = helper.permissions().has_permissions(&mut reference);
        let source_permitted = helper.permissions().has_permissions(&mut source);
        let permitted = reference_permitted && source_permitted;

        let mut callable = Self {
            runtime: runtime.clone(),
            context: context.clone(),
            request: request.clone(),
            field_processor: FieldProcessor::new(&source.id, MetaData::default()),
            reference,
            source,
            parameters: BTreeMap::new(),
            meta_data: MetaData::default(),
            permitted,
            include: false,
            container: None,
            output: None,
        };
        if !permitted {
            info!(
                target: "appng.engine",
                datasource_id = %callable.source.id,
                "datasource_not_permitted"
            );
            return Ok(callable);
        }

        let caller_evaluator = helper.evaluator(caller.parameters());
        callable.include =
            helper.condition_matches(callable.reference.condition.as_ref(), &caller_evaluator);
        callable.parameters = helper.initialize_parameters(
            &callable.source.id,
            callable.source.config.params(),
            callable.reference.params(),
            caller,
            &request.parameters(),
        );
        let evaluator = helper.evaluator(&callable.parameters);
        let mut meta_data = callable.source.config.meta_data.clone().unwrap_or_default();
        helper.init_meta_data(&mut meta_data, &evaluator, false);
        callable.field_processor = FieldProcessor::new(&callable.source.id, meta_data.clone());
        callable.meta_data = meta_data;
        Ok(callable)
    }

    pub fn id(&self) -> &str {
        &self.source.id
    }

    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    pub fn do_include(&self) -> bool {
        self.permitted && self.include
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn field_processor(&self) -> &FieldProcessor {
        &self.field_processor
    }

    pub fn has_errors(&self) -> bool {
        self.field_processor.has_errors()
    }

    /// 处理后的数据源（含数据、标签与链接面板）。
    pub fn datasource(&self) -> Option<&Datasource> {
        self.output.as_ref()
    }

    pub fn into_datasource(self) -> Option<Datasource> {
        self.output
    }

    /// Provider 原始返回值。
    pub fn data_container(&self) -> Option<&DataContainer> {
        self.container.as_ref()
    }

    /// 执行数据源；返回是否产生了输出。
    ///
    /// 相同输入重复执行得到相同输出。请求页超出范围时发送一次 302
    /// 跳回第一页，不返回数据。
    pub async fn perform(&mut self) -> Result<bool, ProcessingError> {
        self.output = None;
        self.container = None;
        if !self.do_include() {
            return Ok(false);
        }
        let mut field_processor = FieldProcessor::new(&self.source.id, self.meta_data.clone());
        let support = ParameterSupport::dollar(self.parameters.clone())?;
        let helper = self.runtime.element_helper(&self.context);
        let evaluator = helper.evaluator(&self.parameters);
        let mut datasource = self.source.clone();

        let data = match datasource.bean.clone() {
            None => datasource.data.clone(),
            Some(bean) => {
                let provider = self.runtime.beans().data_provider(&bean.id).ok_or_else(|| {
                    ProcessingError::unknown("bean", &bean.id)
                        .with_field_processor(&field_processor)
                })?;
                let options = helper.options(&bean, &support);
                let page_size = self
                    .reference
                    .page_size
                    .unwrap_or(self.runtime.platform().default_page_size);
                let sort_parameter = sort_parameter_name(&self.source.id);
                let stored = self.context.session.attribute(&sort_parameter);
                let pageable = self.runtime.request_support(&self.context).pageable(
                    &self.request,
                    stored.as_deref(),
                    &self.source.id,
                    page_size,
                    field_processor.fields(),
                );
                field_processor.set_pageable(pageable.clone());

                let result = provider
                    .get_data(&self.context, &options, &self.request, &mut field_processor)
                    .await;
                match result {
                    Ok(Some(container)) => {
                        self.check_bind_class(&container, &bean.id, &field_processor)?;
                        if let Some(page) = &container.page
                            && page.is_out_of_range()
                        {
                            let mut first = pageable.first_page();
                            first.page_size = page.size;
                            let query = first.to_query_value();
                            self.context.session.set_attribute(&sort_parameter, query.clone())?;
                            let target =
                                format!("{}?{}={}", self.context.servlet_path, sort_parameter, query);
                            record_redirect();
                            info!(
                                target: "appng.engine",
                                datasource_id = %self.source.id,
                                requested_page = page.number,
                                total_pages = page.total_pages(),
                                redirect = %target,
                                "datasource_page_out_of_range"
                            );
                            self.context.send_redirect(target, 302);
                            self.field_processor = field_processor;
                            return Ok(false);
                        }
                        if container.page.is_some() {
                            let pageable = field_processor.pageable().cloned().unwrap_or(pageable);
                            self.context
                                .session
                                .set_attribute(&sort_parameter, pageable.to_query_value())?;
                        }
                        self.merge_linkpanels(&mut datasource, &mut field_processor, &evaluator, &support);
                        let data = helper.build_data(&container, &field_processor, &evaluator);
                        self.container = Some(container);
                        Some(data)
                    }
                    Ok(None) => {
                        return Err(ProcessingError::new(
                            format!("datasource '{}' returned no data", self.source.id),
                            ProcessingCause::NoData(self.source.id.clone()),
                        )
                        .with_field_processor(&field_processor));
                    }
                    Err(ProviderError::Message { key, args }) => {
                        warn!(
                            target: "appng.engine",
                            datasource_id = %self.source.id,
                            key = %key,
                            "datasource_provider_message"
                        );
                        field_processor.add_error_message(helper.localize(&key, &args));
                        None
                    }
                    Err(ProviderError::Failed(message)) => {
                        let correlation_id = new_correlation_id();
                        record_processing_error();
                        error!(
                            target: "appng.engine",
                            datasource_id = %self.source.id,
                            correlation_id = correlation_id,
                            error = %message,
                            "datasource_failed"
                        );
                        field_processor.add_error_message(
                            helper.localize(INTERNAL_ERROR, &[correlation_id.to_string()]),
                        );
                        self.field_processor = field_processor.clone();
                        return Err(ProcessingError::new(
                            format!("error while performing datasource '{}'", self.source.id),
                            ProcessingCause::Provider(message),
                        )
                        .with_correlation_id(correlation_id)
                        .with_field_processor(&field_processor));
                    }
                }
            }
        };

        if datasource.bean.is_none() {
            self.merge_linkpanels(&mut datasource, &mut field_processor, &evaluator, &support);
        }
        helper.set_labels(&mut datasource.config, &evaluator, &self.parameters);
        datasource.config.meta_data = Some(field_processor.meta_data_with_messages());
        datasource.data = data.or_else(|| Some(Data::default()));

        record_datasource_performed();
        info!(
            target: "appng.engine",
            datasource_id = %self.source.id,
            has_errors = field_processor.has_errors(),
            "datasource_performed"
        );
        self.output = Some(datasource);
        self.field_processor = field_processor;
        Ok(true)
    }

    /// 返回对象必须可赋值给声明的绑定类。
    fn check_bind_class(
        &self,
        container: &DataContainer,
        bean_id: &str,
        field_processor: &FieldProcessor,
    ) -> Result<(), ProcessingError> {
        let Some(bind_class) = field_processor.meta_data().bind_class.as_deref() else {
            return Ok(());
        };
        for value in container.values() {
            let Some(actual) = type_name_of(value) else {
                continue;
            };
            if !self.runtime.binding().is_assignable(actual, bind_class) {
                let message = format!(
                    "the object of type '{}' returned by '{}' is not of the desired type '{}' as defined in the meta-data!",
                    actual, bean_id, bind_class
                );
                error!(
                    target: "appng.engine",
                    datasource_id = %self.source.id,
                    actual = %actual,
                    declared = %bind_class,
                    "bind_class_mismatch"
                );
                return Err(ProcessingError::new(
                    format!("error while performing datasource '{}'", self.source.id),
                    ProcessingCause::IllegalArgument(message),
                )
                .with_field_processor(field_processor));
            }
        }
        Ok(())
    }

    /// 配置中的链接面板与 Provider 追加的面板合并后统一处理。
    fn merge_linkpanels(
        &self,
        datasource: &mut Datasource,
        field_processor: &mut FieldProcessor,
        evaluator: &ExpressionEvaluator,
        support: &ParameterSupport,
    ) {
        let mut linkpanels: Vec<Linkpanel> = datasource.config.linkpanels.clone();
        for added in field_processor.linkpanels() {
            match linkpanels.iter_mut().find(|existing| existing.id == added.id) {
                Some(existing) => *existing = added.clone(),
                None => linkpanels.push(added.clone()),
            }
        }
        let helper = self.runtime.element_helper(&self.context);
        helper.init_linkpanels(&mut linkpanels, evaluator, support);
        for linkpanel in &linkpanels {
            field_processor.add_linkpanel(linkpanel.clone());
        }
        datasource.config.linkpanels = linkpanels;
    }
}

/// 运行时值对应的类型名；空值不参与类型检查。
fn type_name_of(value: &Value) -> Option<&str> {
    match value {
        Value::Null => None,
        Value::Object(instance) => Some(&instance.type_name),
        Value::List(_) => Some("List"),
        Value::Text(_) => Some("String"),
        Value::Int(_) => Some("Long"),
        Value::Decimal(_) => Some("Double"),
        Value::Bool(_) => Some("Boolean"),
    }
}
