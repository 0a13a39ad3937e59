//! 单次请求内的动作执行。
//!
//! 动作在页面中被引用时先取数（可选的数据源），仅在表单提交且
//! 条件满足时执行 Provider。失败消息随动作输出；成功且声明
//! `onSuccess` 时重定向，消息转入会话。

use crate::async_runner::{TaskAborted, TaskHandle};
use crate::callable_datasource::CallableDataSource;
use crate::error::{ProcessingCause, ProcessingError, ProviderError};
use crate::field_processor::FieldProcessor;
use crate::labels::{
    BACKGROUND_TASK_ERROR, BACKGROUND_TASK_FINISHED, BACKGROUND_TASK_STARTED, INTERNAL_ERROR,
    localize,
};
use crate::provider::{ActionProvider, Options};
use crate::request::{ApplicationRequest, apply_selections, user_data};
use crate::runtime::ApplicationRuntime;
use appng_expression::ParameterSupport;
use appng_schema::{Action, ActionRef, Data, Event, FieldDef, MetaData};
use appng_telemetry::{
    new_correlation_id, record_action_failed, record_action_performed, record_async_task_failed,
    record_processing_error, record_redirect,
};
use domain::{Instance, Messages, RequestContext, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 数据源取数的结果。
#[derive(Default)]
struct Retrieval {
    ok: bool,
    meta_data: Option<MetaData>,
    data: Option<Data>,
    item: Option<Value>,
    errors: Messages,
}

pub struct CallableAction {
    runtime: ApplicationRuntime,
    context: RequestContext,
    request: ApplicationRequest,
    reference: ActionRef,
    event: Event,
    source: Action,
    parameters: BTreeMap<String, String>,
    permitted: bool,
    include: bool,
    execute: bool,
    field_processor: FieldProcessor,
    output: Option<Action>,
    task: Option<TaskHandle>,
    forward: Option<String>,
}

impl CallableAction {
    /// 解析引用与参数；权限不足时既不包含也不执行。
    pub fn new(
        runtime: &ApplicationRuntime,
        context: &RequestContext,
        request: &ApplicationRequest,
        reference: ActionRef,
        caller: &ParameterSupport,
    ) -> Result<Self, ProcessingError> {
        let mut reference = reference;
        let config = runtime.config();
        let mut event = config
            .event(&reference.event_id)
            .ok_or_else(|| ProcessingError::unknown("event", &reference.event_id))?;
        let mut source = config
            .action(&reference.event_id, &reference.id)
            .ok_or_else(|| {
                ProcessingError::unknown("action", &format!("{}:{}", reference.event_id, reference.id))
            })?;
        let helper = runtime.element_helper(context);
        let permissions = helper.permissions();
        let reference_permitted = permissions.has_permissions(&mut reference);
        let event_permitted = permissions.has_permissions(&mut event);
        let action_permitted = permissions.has_permissions(&mut source);
        let permitted = reference_permitted && event_permitted && action_permitted;

        let mut callable = Self {
            runtime: runtime.clone(),
            context: context.clone(),
            request: request.clone(),
            field_processor: FieldProcessor::new(&source.id, MetaData::default()),
            reference,
            event,
            source,
            parameters: BTreeMap::new(),
            permitted,
            include: false,
            execute: false,
            output: None,
            task: None,
            forward: None,
        };
        if !permitted {
            info!(
                target: "appng.engine",
                event_id = %callable.event.id,
                action_id = %callable.source.id,
                "action_not_permitted"
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
        callable.execute = request.is_post()
            && helper.condition_matches(callable.source.condition.as_ref(), &evaluator);
        Ok(callable)
    }

    pub fn id(&self) -> &str {
        &self.source.id
    }

    pub fn event_id(&self) -> &str {
        &self.event.id
    }

    pub fn is_permitted(&self) -> bool {
        self.permitted
    }

    pub fn do_include(&self) -> bool {
        self.permitted && self.include
    }

    /// 表单提交且动作条件满足。
    pub fn do_execute(&self) -> bool {
        self.permitted && self.execute
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

    pub fn action(&self) -> Option<&Action> {
        self.output.as_ref()
    }

    pub fn into_action(self) -> Option<Action> {
        self.output
    }

    /// 成功后的重定向目标。
    pub fn forward(&self) -> Option<&str> {
        self.forward.as_deref()
    }

    /// 异步执行时的后台任务句柄。
    pub fn take_task(&mut self) -> Option<TaskHandle> {
        self.task.take()
    }

    /// 取数并在需要时执行；返回是否执行且成功。
    pub async fn perform(&mut self) -> Result<bool, ProcessingError> {
        self.output = None;
        self.forward = None;
        if !self.permitted || !(self.include || self.execute) {
            return Ok(false);
        }
        let support = ParameterSupport::dollar(self.parameters.clone())?;
        let retrieval = self.retrieve_data(&support).await?;

        let mut action = self.source.clone();
        let mut meta_data = retrieval
            .meta_data
            .clone()
            .or_else(|| action.config.meta_data.clone())
            .unwrap_or_default();
        {
            let helper = self.runtime.element_helper(&self.context);
            let evaluator = helper.evaluator(&self.parameters);
            helper.init_meta_data(&mut meta_data, &evaluator, true);
        }
        let mut field_processor = FieldProcessor::new(&action.id, meta_data);
        field_processor.add_messages(&retrieval.errors);
        action.data = retrieval.data.clone();

        let mut succeeded = false;
        let executed = self.execute && retrieval.ok;
        if executed {
            succeeded = self
                .execute_provider(&action, &mut field_processor, retrieval.item.clone(), &support)
                .await?;
        } else if self.execute {
            info!(
                target: "appng.engine",
                event_id = %self.event.id,
                action_id = %action.id,
                "action_skipped_data_errors"
            );
        }

        let helper = self.runtime.element_helper(&self.context);
        let evaluator = helper.evaluator(&self.parameters);
        if succeeded {
            let target = self
                .reference
                .on_success
                .clone()
                .or_else(|| action.on_success.clone())
                .filter(|target| !target.is_empty());
            if let Some(target) = target {
                let target = support.replace(&target);
                let forward = format!(
                    "{}/{}",
                    helper.output_prefix(),
                    target.trim_start_matches('/')
                );
                helper.add_messages(field_processor.messages())?;
                field_processor.clear_messages();
                record_redirect();
                info!(
                    target: "appng.engine",
                    event_id = %self.event.id,
                    action_id = %action.id,
                    redirect = %forward,
                    "action_forward"
                );
                self.context.send_redirect(forward.clone(), 302);
                self.forward = Some(forward);
            }
        } else if executed {
            action.user_data = Some(user_data(field_processor.fields(), &self.request));
            if let Some(data) = action.data.as_mut() {
                apply_selections(&mut data.selections, &self.request);
            }
        }

        helper.init_linkpanels(&mut action.config.linkpanels, &evaluator, &support);
        action.config.meta_data = Some(field_processor.meta_data_with_messages());
        helper.set_labels(&mut action.config, &evaluator, &self.parameters);
        action.messages = field_processor.schema_messages();
        self.output = Some(action);
        self.field_processor = field_processor;
        Ok(succeeded)
    }

    /// 引用的数据源：其消息先进入会话，新增的错误消息再从会话移到动作上。
    async fn retrieve_data(&self, support: &ParameterSupport) -> Result<Retrieval, ProcessingError> {
        let Some(reference) = self.source.datasource.clone() else {
            return Ok(Retrieval {
                ok: true,
                ..Retrieval::default()
            });
        };
        let mut datasource = CallableDataSource::new(
            &self.runtime,
            &self.context,
            &self.request,
            reference,
            support,
        )?;
        if !datasource.do_include() {
            return Ok(Retrieval {
                ok: true,
                ..Retrieval::default()
            });
        }
        let helper = self.runtime.element_helper(&self.context);
        let before = helper.session_messages();
        let performed = datasource.perform().await?;
        helper.add_messages(datasource.field_processor().messages())?;
        let added = helper.session_messages().added_since(&before);

        let mut retrieval = Retrieval {
            ok: true,
            ..Retrieval::default()
        };
        if added.has_errors() {
            let mut remaining = helper.session_messages();
            remaining.remove_all(&added);
            self.context.session.set_messages(remaining)?;
            warn!(
                target: "appng.engine",
                action_id = %self.source.id,
                datasource_id = %datasource.id(),
                errors = added.len(),
                "action_data_retrieval_failed"
            );
            retrieval.ok = false;
            retrieval.errors = added;
        }
        if performed {
            retrieval.meta_data = Some(datasource.field_processor().meta_data().clone());
            retrieval.data = datasource.datasource().and_then(|output| output.data.clone());
            retrieval.item = datasource
                .data_container()
                .and_then(|container| container.item.clone());
        }
        Ok(retrieval)
    }

    /// 填充并校验绑定对象，然后同步或异步调用 Provider。
    async fn execute_provider(
        &mut self,
        action: &Action,
        field_processor: &mut FieldProcessor,
        item: Option<Value>,
        support: &ParameterSupport,
    ) -> Result<bool, ProcessingError> {
        let bean = action
            .bean
            .clone()
            .ok_or_else(|| ProcessingError::unknown("bean", &action.id))?;
        let provider = self
            .runtime
            .beans()
            .action_provider(&bean.id)
            .ok_or_else(|| ProcessingError::unknown("bean", &bean.id))?;
        let options = self.runtime.element_helper(&self.context).options(&bean, support);
        let bind_object = self.bind_object(field_processor, item, provider.as_ref())?;

        if field_processor.has_errors() {
            record_action_failed();
            info!(
                target: "appng.engine",
                event_id = %self.event.id,
                action_id = %action.id,
                "action_validation_failed"
            );
            return Ok(false);
        }

        if action.runs_async() {
            self.spawn(action, provider, options, bind_object, field_processor);
            return Ok(true);
        }

        let helper = self.runtime.element_helper(&self.context);
        let result = provider
            .perform(
                &self.context,
                &options,
                &self.request,
                bind_object.as_ref(),
                field_processor,
            )
            .await;
        match result {
            Ok(()) if field_processor.has_errors() => {
                record_action_failed();
                info!(
                    target: "appng.engine",
                    event_id = %self.event.id,
                    action_id = %action.id,
                    "action_reported_errors"
                );
                Ok(false)
            }
            Ok(()) => {
                record_action_performed();
                info!(
                    target: "appng.engine",
                    event_id = %self.event.id,
                    action_id = %action.id,
                    "action_performed"
                );
                Ok(true)
            }
            Err(ProviderError::Message { key, args }) => {
                record_action_failed();
                warn!(
                    target: "appng.engine",
                    event_id = %self.event.id,
                    action_id = %action.id,
                    key = %key,
                    "action_provider_message"
                );
                field_processor.add_error_message(helper.localize(&key, &args));
                Ok(false)
            }
            Err(ProviderError::Failed(message)) => {
                let correlation_id = new_correlation_id();
                record_action_failed();
                record_processing_error();
                error!(
                    target: "appng.engine",
                    event_id = %self.event.id,
                    action_id = %action.id,
                    correlation_id = correlation_id,
                    error = %message,
                    "action_failed"
                );
                field_processor.add_error_message(
                    helper.localize(INTERNAL_ERROR, &[correlation_id.to_string()]),
                );
                self.field_processor = field_processor.clone();
                Err(ProcessingError::new(
                    format!("error while performing action '{}'", action.id),
                    ProcessingCause::Provider(message),
                )
                .with_correlation_id(correlation_id)
                .with_field_processor(field_processor))
            }
        }
    }

    /// 绑定对象：数据源返回的对象或新实例，再写入请求参数并校验。
    fn bind_object(
        &self,
        field_processor: &mut FieldProcessor,
        item: Option<Value>,
        provider: &dyn ActionProvider,
    ) -> Result<Option<Instance>, ProcessingError> {
        let Some(bind_class) = field_processor.meta_data().bind_class.clone() else {
            return Ok(None);
        };
        let binding = self.runtime.binding();
        let mut instance = match item {
            Some(Value::Object(instance)) if binding.is_assignable(&instance.type_name, &bind_class) => {
                instance
            }
            _ => binding
                .new_instance(&bind_class)
                .map_err(|err| ProcessingError::from(err).with_field_processor(field_processor))?,
        };
        let writable: Vec<FieldDef> = field_processor
            .fields()
            .iter()
            .filter(|field| !field.is_readonly())
            .cloned()
            .collect();
        let request_support = self.runtime.request_support(&self.context);
        request_support.fill_bind_object(&mut instance, field_processor, &self.request, &writable);
        let groups: Vec<String> = field_processor
            .meta_data()
            .validation
            .as_ref()
            .map(|validation| {
                validation
                    .groups
                    .iter()
                    .map(|group| group.class.clone())
                    .collect()
            })
            .unwrap_or_default();
        request_support.validate(&instance, field_processor, &groups, provider.form_validator());
        Ok(Some(instance))
    }

    /// 后台执行：独立的 FieldProcessor，完成后消息写入会话。
    fn spawn(
        &mut self,
        action: &Action,
        provider: Arc<dyn ActionProvider>,
        options: Options,
        bind_object: Option<Instance>,
        field_processor: &mut FieldProcessor,
    ) {
        let locale = self.context.locale.clone();
        field_processor.add_ok_message(localize(
            self.runtime.messages(),
            &locale,
            BACKGROUND_TASK_STARTED,
            &[],
        ));

        let mut task_processor =
            FieldProcessor::new(&action.id, field_processor.meta_data().clone());
        let context = self.context.clone();
        let request = self.request.clone();
        let task = async move {
            let result = provider
                .perform(
                    &context,
                    &options,
                    &request,
                    bind_object.as_ref(),
                    &mut task_processor,
                )
                .await;
            (result, task_processor)
        };

        let runtime = self.runtime.clone();
        let session = self.context.session.clone();
        let action_id = action.id.clone();
        let completion = move |outcome: Result<(Result<(), ProviderError>, FieldProcessor), TaskAborted>| {
            let background_error = |message: &str| {
                let correlation_id = new_correlation_id();
                record_action_failed();
                error!(
                    target: "appng.engine",
                    action_id = %action_id,
                    correlation_id = correlation_id,
                    error = %message,
                    "background_task_failed"
                );
                localize(
                    runtime.messages(),
                    &locale,
                    BACKGROUND_TASK_ERROR,
                    &[correlation_id.to_string()],
                )
            };
            let messages = match outcome {
                Ok((result, processor)) => {
                    let mut messages = processor.messages().clone();
                    match result {
                        Ok(()) if !processor.has_errors() => {
                            record_action_performed();
                            messages.ok(localize(
                                runtime.messages(),
                                &locale,
                                BACKGROUND_TASK_FINISHED,
                                &[],
                            ));
                        }
                        Ok(()) => record_action_failed(),
                        Err(ProviderError::Message { key, args }) => {
                            record_action_failed();
                            messages.error(localize(runtime.messages(), &locale, &key, &args));
                        }
                        Err(ProviderError::Failed(message)) => {
                            record_async_task_failed();
                            messages.error(background_error(&message));
                        }
                    }
                    messages
                }
                // panic 时 FieldProcessor 已随任务丢失，只报告错误编号
                Err(aborted) => {
                    let mut messages = Messages::default();
                    messages.error(background_error(&aborted.message));
                    messages
                }
            };
            if let Err(err) = session.add_messages(&messages) {
                error!(
                    target: "appng.engine",
                    action_id = %action_id,
                    error = %err,
                    "background_task_messages_lost"
                );
            }
        };
        let name = format!("{}:{}", self.event.id, action.id);
        self.task = Some(self.runtime.tasks().spawn(name, task, completion));
    }
}
