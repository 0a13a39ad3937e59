use crate::async_runner::AsyncTaskRunner;
use crate::element_helper::ElementHelper;
use crate::labels::{InMemoryMessageSource, MessageSource};
use crate::provider::BeanRegistry;
use crate::request::RequestSupport;
use crate::result_service::ResultService;
use appng_application::ApplicationConfigProvider;
use appng_binding::{BindRegistry, ConstraintValidator, ValidationProvider};
use appng_config::PlatformConfig;
use appng_permission::{DefaultPermissionProcessor, DummyPermissionProcessor, PermissionProcessor};
use domain::RequestContext;
use std::sync::Arc;

/// 一个应用在引擎中的运行时依赖：配置、Bean、绑定类型、校验与消息。
#[derive(Clone)]
pub struct ApplicationRuntime {
    config: Arc<ApplicationConfigProvider>,
    beans: Arc<BeanRegistry>,
    binding: Arc<BindRegistry>,
    validation: Arc<dyn ValidationProvider>,
    messages: Arc<dyn MessageSource>,
    platform: PlatformConfig,
    tasks: AsyncTaskRunner,
    results: ResultService,
    trusted: bool,
}

impl ApplicationRuntime {
    pub fn new(
        config: Arc<ApplicationConfigProvider>,
        beans: Arc<BeanRegistry>,
        binding: Arc<BindRegistry>,
    ) -> Self {
        let validation: Arc<dyn ValidationProvider> =
            Arc::new(ConstraintValidator::new(binding.clone()));
        Self {
            config,
            beans,
            binding,
            validation,
            messages: Arc::new(InMemoryMessageSource::new()),
            platform: PlatformConfig::default(),
            tasks: AsyncTaskRunner::new(),
            results: ResultService::new(),
            trusted: false,
        }
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageSource>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_validation(mut self, validation: Arc<dyn ValidationProvider>) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_platform(mut self, platform: PlatformConfig) -> Self {
        self.platform = platform;
        self
    }

    /// 内部可信上下文：所有权限直接放行。
    pub fn trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    pub fn config(&self) -> &ApplicationConfigProvider {
        &self.config
    }

    pub fn beans(&self) -> &BeanRegistry {
        &self.beans
    }

    pub fn binding(&self) -> &Arc<BindRegistry> {
        &self.binding
    }

    pub fn messages(&self) -> &dyn MessageSource {
        self.messages.as_ref()
    }

    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    pub fn tasks(&self) -> &AsyncTaskRunner {
        &self.tasks
    }

    pub fn results(&self) -> &ResultService {
        &self.results
    }

    pub fn permission_processor(&self, context: &RequestContext) -> Arc<dyn PermissionProcessor> {
        if self.trusted {
            return Arc::new(DummyPermissionProcessor);
        }
        Arc::new(DefaultPermissionProcessor::new(
            context.subject.clone(),
            context.application.name.clone(),
        ))
    }

    pub fn request_support(&self, context: &RequestContext) -> RequestSupport {
        RequestSupport::new(
            self.binding.clone(),
            self.validation.clone(),
            self.messages.clone(),
            context.locale.clone(),
        )
    }

    pub fn element_helper<'a>(&'a self, context: &'a RequestContext) -> ElementHelper<'a> {
        ElementHelper::new(self, context)
    }
}
