//! 应用配置提供者
//!
//! - 开发模式：每次访问配置都重新读取 XML 并重新校验
//! - 生产模式：首次解析后生成快照，之后的加载从快照恢复，只读状态以 `Arc` 共享

use crate::error::InvalidConfigurationError;
use crate::inheritance::{PendingDatasource, process_inheritance, split_inheritance_id};
use crate::line_index::XmlLineIndex;
use crate::resources::Resources;
use crate::snapshot::{read_snapshot, write_snapshot};
use crate::state::{ConfigState, ResourceKind};
use crate::validator::{ConfigValidator, ValidationReport};
use appng_binding::BindRegistry;
use appng_config::PlatformConfig;
use appng_schema::{
    Action, ApplicationInfo, ApplicationRootConfig, ConfigDocument, Datasource, Event,
    MarshalError, MarshallService, PageDefinition,
};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

/// 加载选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub dev_mode: bool,
    /// 校验错误作为一个聚合错误返回（否则只记录日志）
    pub fail_fast: bool,
    pub detailed_errors: bool,
}

impl LoadOptions {
    pub fn from_platform(config: &PlatformConfig) -> Self {
        Self {
            dev_mode: config.dev_mode,
            fail_fast: config.validation_fail_fast,
            detailed_errors: config.detailed_errors,
        }
    }

    pub fn dev() -> Self {
        Self {
            dev_mode: true,
            ..Self::default()
        }
    }
}

/// 单个应用的配置提供者。
pub struct ApplicationConfigProvider {
    application: String,
    resources: Arc<dyn Resources>,
    registry: Arc<BindRegistry>,
    options: LoadOptions,
    marshaller: MarshallService,
    state: RwLock<Arc<ConfigState>>,
    snapshot: RwLock<Option<Arc<Vec<u8>>>>,
}

impl ApplicationConfigProvider {
    /// 创建并立即加载。
    pub fn load(
        application: impl Into<String>,
        resources: Arc<dyn Resources>,
        registry: Arc<BindRegistry>,
        options: LoadOptions,
    ) -> Result<Self, InvalidConfigurationError> {
        let provider = Self {
            application: application.into(),
            resources,
            registry,
            options,
            marshaller: MarshallService::new(),
            state: RwLock::new(Arc::new(ConfigState::default())),
            snapshot: RwLock::new(None),
        };
        provider.reload()?;
        Ok(provider)
    }

    pub fn application_name(&self) -> &str {
        &self.application
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// 重新加载：开发模式重新解析；生产模式优先从快照恢复。
    pub fn reload(&self) -> Result<(), InvalidConfigurationError> {
        let cached = if self.options.dev_mode {
            None
        } else {
            self.snapshot
                .read()
                .map_err(|_| InvalidConfigurationError::Lock)?
                .clone()
        };
        let from_snapshot = cached.is_some();
        let state = match cached {
            Some(bytes) => read_snapshot(&bytes)?,
            None => {
                let state = self.parse()?;
                self.check(&state)?;
                if !self.options.dev_mode {
                    let bytes = write_snapshot(&state)?;
                    *self
                        .snapshot
                        .write()
                        .map_err(|_| InvalidConfigurationError::Lock)? = Some(Arc::new(bytes));
                }
                state
            }
        };
        info!(
            target: "appng.application",
            application = %self.application,
            dev_mode = self.options.dev_mode,
            from_snapshot = from_snapshot,
            pages = state.pages.len(),
            events = state.events.len(),
            datasources = state.datasources.len(),
            "config_loaded"
        );
        appng_telemetry::record_config_loaded();
        self.replace_state(state)
    }

    /// 清空已加载配置与快照。
    pub fn clear(&self) -> Result<(), InvalidConfigurationError> {
        *self
            .snapshot
            .write()
            .map_err(|_| InvalidConfigurationError::Lock)? = None;
        self.replace_state(ConfigState::default())?;
        info!(
            target: "appng.application",
            application = %self.application,
            "config_cleared"
        );
        Ok(())
    }

    /// 复制出独立的提供者：开发模式重新解析；生产模式共享快照与只读状态。
    pub fn clone_config(&self) -> Result<Self, InvalidConfigurationError> {
        if self.options.dev_mode {
            return Self::load(
                self.application.clone(),
                Arc::clone(&self.resources),
                Arc::clone(&self.registry),
                self.options,
            );
        }
        let snapshot = self
            .snapshot
            .read()
            .map_err(|_| InvalidConfigurationError::Lock)?
            .clone();
        Ok(Self {
            application: self.application.clone(),
            resources: Arc::clone(&self.resources),
            registry: Arc::clone(&self.registry),
            options: self.options,
            marshaller: self.marshaller.clone(),
            state: RwLock::new(self.loaded_state()),
            snapshot: RwLock::new(snapshot),
        })
    }

    pub fn write_data(&self) -> Result<Vec<u8>, InvalidConfigurationError> {
        write_snapshot(&self.loaded_state())
    }

    pub fn read_data(&self, bytes: &[u8]) -> Result<(), InvalidConfigurationError> {
        let state = read_snapshot(bytes)?;
        self.replace_state(state)
    }

    /// 当前只读配置图；开发模式下先重新加载。
    ///
    /// 重新加载失败时记录错误并继续使用上一次成功加载的配置。
    pub fn state(&self) -> Arc<ConfigState> {
        if self.options.dev_mode
            && let Err(err) = self.reload()
        {
            error!(
                target: "appng.application",
                application = %self.application,
                error = %err,
                "config_reload_failed"
            );
        }
        self.loaded_state()
    }

    fn loaded_state(&self) -> Arc<ConfigState> {
        match self.state.read() {
            Ok(state) => Arc::clone(&state),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn datasource(&self, id: &str) -> Option<Datasource> {
        self.state().datasources.get(id).cloned()
    }

    pub fn event(&self, id: &str) -> Option<Event> {
        self.state().events.get(id).cloned()
    }

    pub fn action(&self, event_id: &str, id: &str) -> Option<Action> {
        self.state().action(event_id, id).cloned()
    }

    pub fn page(&self, id: &str) -> Option<PageDefinition> {
        self.state().pages.get(id).cloned()
    }

    pub fn datasources(&self) -> BTreeMap<String, Datasource> {
        self.state().datasources.clone()
    }

    pub fn events(&self) -> BTreeMap<String, Event> {
        self.state().events.clone()
    }

    pub fn pages(&self) -> BTreeMap<String, PageDefinition> {
        self.state().pages.clone()
    }

    pub fn default_page(&self) -> Option<String> {
        self.state().default_page.clone()
    }

    pub fn session_params(&self) -> Vec<String> {
        self.state().session_params.clone()
    }

    pub fn root_config(&self) -> Option<ApplicationRootConfig> {
        self.state().root_config.clone()
    }

    pub fn application_info(&self) -> ApplicationInfo {
        self.state().application.clone()
    }

    pub fn resource_name(&self, kind: ResourceKind, id: &str) -> Option<String> {
        self.state().resource_name(kind, id).map(str::to_string)
    }

    /// 对当前配置运行校验。
    pub fn validate(&self) -> ValidationReport {
        ConfigValidator::new(Arc::clone(&self.registry), self.options.detailed_errors)
            .validate(&self.state())
    }

    fn replace_state(&self, state: ConfigState) -> Result<(), InvalidConfigurationError> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| InvalidConfigurationError::Lock)?;
        *guard = Arc::new(state);
        Ok(())
    }

    fn check(&self, state: &ConfigState) -> Result<(), InvalidConfigurationError> {
        let report = ConfigValidator::new(Arc::clone(&self.registry), self.options.detailed_errors)
            .validate(state);
        for warning in &report.warnings {
            warn!(
                target: "appng.application",
                application = %self.application,
                message = %warning,
                "config_validation_warning"
            );
        }
        if report.is_valid() {
            return Ok(());
        }
        appng_telemetry::record_validation_errors(report.errors.len() as u64);
        if self.options.fail_fast {
            return Err(InvalidConfigurationError::Validation {
                application: self.application.clone(),
                errors: report.errors,
            });
        }
        for message in &report.errors {
            error!(
                target: "appng.application",
                application = %self.application,
                message = %message,
                "config_validation_error"
            );
        }
        Ok(())
    }

    fn parse(&self) -> Result<ConfigState, InvalidConfigurationError> {
        let descriptor = self
            .resources
            .application_descriptor()?
            .ok_or_else(|| InvalidConfigurationError::MissingApplicationInfo(self.application.clone()))?;
        let application: ApplicationInfo = self
            .marshaller
            .unmarshal_as(&descriptor.content)
            .map_err(|err| InvalidConfigurationError::Resource {
                application: self.application.clone(),
                resource: descriptor.name.clone(),
                message: err.to_string(),
            })?;
        let mut state = ConfigState {
            application,
            ..ConfigState::default()
        };
        let mut pending = Vec::new();

        for resource in self.resources.config_resources()? {
            if self.options.detailed_errors {
                state
                    .line_index
                    .insert(resource.name.clone(), XmlLineIndex::build(&resource.content));
            }
            let document = match self.marshaller.unmarshal(&resource.content) {
                Ok(document) => document,
                Err(MarshalError::UnknownRoot(root)) => {
                    warn!(
                        target: "appng.application",
                        application = %self.application,
                        resource = %resource.name,
                        root = %root,
                        "resource_skipped"
                    );
                    appng_telemetry::record_resource_skipped();
                    continue;
                }
                Err(err) => {
                    error!(
                        target: "appng.application",
                        application = %self.application,
                        resource = %resource.name,
                        error = %err,
                        "resource_unmarshal_failed"
                    );
                    appng_telemetry::record_resource_skipped();
                    continue;
                }
            };
            let name = resource.name.as_str();
            match document {
                ConfigDocument::Datasources(datasources) => {
                    for datasource in datasources.datasources {
                        self.add_datasource(&mut state, &mut pending, datasource, name);
                    }
                }
                ConfigDocument::Datasource(datasource) => {
                    self.add_datasource(&mut state, &mut pending, datasource, name);
                }
                ConfigDocument::Events(events) => {
                    for event in events.events {
                        self.add_event(&mut state, event, name);
                    }
                }
                ConfigDocument::Event(event) => self.add_event(&mut state, event, name),
                ConfigDocument::Pages(pages) => {
                    for page in pages.pages {
                        self.add_page(&mut state, page, name);
                    }
                }
                ConfigDocument::Page(page) => self.add_page(&mut state, page, name),
                ConfigDocument::RootConfig(root_config) => {
                    if state.root_config.is_some() {
                        return Err(InvalidConfigurationError::DuplicateRootConfig {
                            application: self.application.clone(),
                            resource: resource.name.clone(),
                        });
                    }
                    state.record_resource(ResourceKind::RootConfig, &root_config.name, name);
                    state.root_config = Some(root_config);
                }
                ConfigDocument::Application(_) => {
                    warn!(
                        target: "appng.application",
                        application = %self.application,
                        resource = %resource.name,
                        "resource_skipped"
                    );
                    appng_telemetry::record_resource_skipped();
                }
            }
        }

        let outcome = process_inheritance(&self.application, &mut state.datasources, pending);
        for (id, resource) in &outcome.resolved {
            state.record_resource(ResourceKind::Datasource, id, resource);
        }

        if let Some(root_config) = &state.root_config {
            state.session_params = root_config.session_params();
        }
        state.default_page = state
            .root_config
            .as_ref()
            .and_then(|root_config| root_config.config.default_page.clone())
            .filter(|page| !page.is_empty())
            .or_else(|| {
                state
                    .pages
                    .values()
                    .find(|page| page.is_index())
                    .map(|page| page.id.clone())
            });
        Ok(state)
    }

    fn add_datasource(
        &self,
        state: &mut ConfigState,
        pending: &mut Vec<PendingDatasource>,
        datasource: Datasource,
        resource: &str,
    ) {
        if split_inheritance_id(&datasource.id).is_some() {
            pending.push(PendingDatasource {
                resource: resource.to_string(),
                datasource,
            });
            return;
        }
        if state.datasources.contains_key(&datasource.id) {
            self.warn_duplicate(ResourceKind::Datasource, &datasource.id, resource);
        }
        state.record_resource(ResourceKind::Datasource, &datasource.id, resource);
        state.datasources.insert(datasource.id.clone(), datasource);
    }

    fn add_event(&self, state: &mut ConfigState, mut event: Event, resource: &str) {
        if state.events.contains_key(&event.id) {
            self.warn_duplicate(ResourceKind::Event, &event.id, resource);
        }
        let mut actions: Vec<Action> = Vec::with_capacity(event.actions.len());
        for mut action in event.actions.drain(..) {
            if action.event_id.is_none() {
                action.event_id = Some(event.id.clone());
            }
            let key = format!("{}:{}", event.id, action.id);
            state.record_resource(ResourceKind::Action, &key, resource);
            match actions.iter_mut().find(|existing| existing.id == action.id) {
                Some(existing) => {
                    self.warn_duplicate(ResourceKind::Action, &key, resource);
                    *existing = action;
                }
                None => actions.push(action),
            }
        }
        event.actions = actions;
        state.record_resource(ResourceKind::Event, &event.id, resource);
        state.events.insert(event.id.clone(), event);
    }

    fn add_page(&self, state: &mut ConfigState, page: PageDefinition, resource: &str) {
        if state.pages.contains_key(&page.id) {
            self.warn_duplicate(ResourceKind::Page, &page.id, resource);
        }
        state.record_resource(ResourceKind::Page, &page.id, resource);
        state.pages.insert(page.id.clone(), page);
    }

    fn warn_duplicate(&self, kind: ResourceKind, id: &str, resource: &str) {
        warn!(
            target: "appng.application",
            application = %self.application,
            kind = %kind,
            id = %id,
            resource = %resource,
            "duplicate_definition"
        );
    }
}
