//! 配置静态校验。
//!
//! 遍历完整配置图，收集所有问题后一次性返回，不会提前终止。

use crate::state::{ConfigState, ResourceKind};
use appng_binding::BindRegistry;
use appng_expression::{ExpressionError, ParameterSupport, parse};
use appng_schema::{
    DataConfig, FieldDef, FieldType, Link, LinkMode, Linkpanel, Param, Permission,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// 表达式中始终可用的隐式变量。
const IMPLICIT_VARIABLES: [&str; 4] = ["SESSION", "PLATFORM", "SITE", "current"];

/// 校验结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push_error(&mut self, message: String) {
        if !self.errors.contains(&message) {
            self.errors.push(message);
        }
    }

    fn push_warning(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }
}

/// 配置静态校验器。
#[derive(Debug, Clone)]
pub struct ConfigValidator {
    registry: Arc<BindRegistry>,
    detailed: bool,
}

/// 问题来源实体。
#[derive(Debug, Clone)]
struct Origin {
    kind: ResourceKind,
    id: String,
}

impl Origin {
    fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// 条件表达式可见的参数名。
#[derive(Debug, Clone, Default)]
struct Scope {
    names: BTreeSet<String>,
}

impl Scope {
    fn of(params: &[Param]) -> Self {
        Self {
            names: params.iter().map(|param| param.name.clone()).collect(),
        }
    }

    fn with(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.names.extend(names);
        self
    }

    fn contains(&self, name: &str) -> bool {
        let root = name.split(['.', '[']).next().unwrap_or(name).trim();
        self.names.contains(root) || IMPLICIT_VARIABLES.contains(&root)
    }
}

struct Run<'a> {
    state: &'a ConfigState,
    detailed: bool,
    report: ValidationReport,
}

impl Run<'_> {
    fn describe(&self, origin: &Origin, message: &str) -> String {
        let text = format!("{} '{}': {}", origin.kind, origin.id, message);
        if !self.detailed {
            return text;
        }
        match self.state.location(origin.kind, &origin.id) {
            Some(location) => format!("[{}] {}", location, text),
            None => text,
        }
    }

    fn error(&mut self, origin: &Origin, message: impl AsRef<str>) {
        let text = self.describe(origin, message.as_ref());
        self.report.push_error(text);
    }

    fn warning(&mut self, origin: &Origin, message: impl AsRef<str>) {
        let text = self.describe(origin, message.as_ref());
        self.report.push_warning(text);
    }
}

impl ConfigValidator {
    pub fn new(registry: Arc<BindRegistry>, detailed: bool) -> Self {
        Self { registry, detailed }
    }

    pub fn validate(&self, state: &ConfigState) -> ValidationReport {
        let mut run = Run {
            state,
            detailed: self.detailed,
            report: ValidationReport::default(),
        };
        self.validate_application(&mut run);
        for datasource in state.datasources.values() {
            let origin = Origin::new(ResourceKind::Datasource, &datasource.id);
            let scope = Scope::of(datasource.config.params());
            self.validate_data_config(&mut run, &origin, &datasource.config, &scope);
            self.validate_bind_class(&mut run, &origin, &datasource.config, true);
        }
        for event in state.events.values() {
            let origin = Origin::new(ResourceKind::Event, &event.id);
            check_permissions(&mut run, &origin, event.config.permissions());
            for action in &event.actions {
                self.validate_action(&mut run, &event.id, action);
            }
        }
        for page in state.pages.values() {
            self.validate_page(&mut run, page);
        }
        if let Some(root_config) = &state.root_config {
            let origin = Origin::new(ResourceKind::RootConfig, &root_config.name);
            if let Some(default_page) = &state.default_page
                && !state.pages.contains_key(default_page)
            {
                run.error(&origin, format!("default page '{}' does not exist", default_page));
            }
            if let Some(navigation) = &root_config.navigation {
                let scope = Scope::default().with(state.session_params.iter().cloned());
                check_linkpanel(&mut run, &origin, navigation, &scope);
            }
        }
        run.report
    }

    fn validate_application(&self, run: &mut Run<'_>) {
        let application = &run.state.application;
        let origin = Origin::new(ResourceKind::RootConfig, "application.xml");
        let mut errors = Vec::new();
        for duplicate in duplicates(application.permissions.permissions.iter().map(|p| &p.id)) {
            errors.push(format!("duplicate permission '{}'", duplicate));
        }
        for duplicate in duplicates(application.properties.properties.iter().map(|p| &p.id)) {
            errors.push(format!("duplicate property '{}'", duplicate));
        }
        for duplicate in duplicates(application.roles.roles.iter().map(|r| &r.name)) {
            errors.push(format!("duplicate role '{}'", duplicate));
        }
        for role in &application.roles.roles {
            for reference in &role.permissions {
                if !application.has_permission(&reference.id) {
                    errors.push(format!(
                        "role '{}' references unknown permission '{}'",
                        role.name, reference.id
                    ));
                }
            }
        }
        for error in errors {
            run.error(&origin, error);
        }
    }

    fn validate_data_config(
        &self,
        run: &mut Run<'_>,
        origin: &Origin,
        config: &DataConfig,
        scope: &Scope,
    ) {
        check_permissions(run, origin, config.permissions());
        for panel in &config.linkpanels {
            check_linkpanel(run, origin, panel, scope);
        }
        for (path, field) in flatten_fields(config.fields()) {
            for permissions in &field.permissions {
                check_permissions(run, origin, &permissions.permissions);
            }
            if let Some(condition) = &field.condition {
                check_condition(run, origin, &condition.expression, scope, &path);
            }
        }
    }

    /// 绑定类与校验分组必须已注册；字段可读（数据源）/可写（动作）仅给出警告。
    fn validate_bind_class(
        &self,
        run: &mut Run<'_>,
        origin: &Origin,
        config: &DataConfig,
        readable: bool,
    ) {
        let Some(meta_data) = &config.meta_data else {
            return;
        };
        let mut groups: Vec<&str> = Vec::new();
        if let Some(validation) = &meta_data.validation {
            groups.extend(validation.groups.iter().map(|group| group.class.as_str()));
        }
        for (_, field) in flatten_fields(&meta_data.fields) {
            if let Some(validation) = &field.validation {
                groups.extend(validation.groups.iter().map(|group| group.class.as_str()));
            }
        }
        for group in groups {
            if !self.registry.has_group(group) && !self.registry.has_type(group) {
                run.error(origin, format!("validation group '{}' not found", group));
            }
        }
        let Some(bind_class) = &meta_data.bind_class else {
            return;
        };
        if !self.registry.has_type(bind_class) {
            run.error(origin, format!("bind class '{}' not found", bind_class));
            return;
        }
        for (_, field) in flatten_fields(&meta_data.fields) {
            if !is_bound(field) {
                continue;
            }
            let path = field.binding_path();
            if readable && !self.registry.is_readable(bind_class, path) {
                run.warning(
                    origin,
                    format!(
                        "field '{}' is not readable on '{}' (binding '{}')",
                        field.name, bind_class, path
                    ),
                );
            }
            if !readable && !field.is_readonly() && !self.registry.is_writable(bind_class, path) {
                run.warning(
                    origin,
                    format!(
                        "field '{}' is not writable on '{}' (binding '{}')",
                        field.name, bind_class, path
                    ),
                );
            }
        }
    }

    fn validate_action(&self, run: &mut Run<'_>, event_id: &str, action: &appng_schema::Action) {
        let origin = Origin::new(ResourceKind::Action, format!("{}:{}", event_id, action.id));
        let scope = Scope::of(action.config.params());
        self.validate_data_config(run, &origin, &action.config, &scope);
        if let Some(condition) = &action.condition {
            check_condition(run, &origin, &condition.expression, &scope, "condition");
        }
        let Some(reference) = &action.datasource else {
            return;
        };
        check_permissions(run, &origin, reference.permissions());
        if let Some(condition) = &reference.condition {
            check_condition(run, &origin, &condition.expression, &scope, "datasource");
        }
        match run.state.datasources.get(&reference.id) {
            Some(datasource) => {
                check_reference(
                    run,
                    &origin,
                    &format!("datasource '{}'", datasource.id),
                    datasource.config.params(),
                    reference.params(),
                    &scope,
                );
                self.validate_bind_class(run, &origin, &datasource.config, false);
            }
            None => run.error(
                &origin,
                format!("references unknown datasource '{}'", reference.id),
            ),
        }
    }

    fn validate_page(&self, run: &mut Run<'_>, page: &appng_schema::PageDefinition) {
        let origin = Origin::new(ResourceKind::Page, &page.id);
        let mut scope = Scope::default().with(run.state.session_params.iter().cloned());
        if let Some(url_schema) = &page.config.url_schema {
            for param in url_schema
                .url_params()
                .iter()
                .chain(url_schema.get_params())
                .chain(url_schema.post_params())
            {
                scope.names.insert(param.name.clone());
            }
        }
        check_permissions(run, &origin, page.config.permissions());
        for panel in &page.config.linkpanels {
            check_linkpanel(run, &origin, panel, &scope);
        }
        for section in page.sections() {
            for element in &section.elements {
                if let Some(reference) = &element.action {
                    check_permissions(run, &origin, reference.permissions());
                    if let Some(condition) = &reference.condition {
                        check_condition(run, &origin, &condition.expression, &scope, &reference.id);
                    }
                    match run.state.events.get(&reference.event_id) {
                        None => run.error(
                            &origin,
                            format!("references unknown event '{}'", reference.event_id),
                        ),
                        Some(_) => match run.state.action(&reference.event_id, &reference.id) {
                            Some(action) => check_reference(
                                run,
                                &origin,
                                &format!("action '{}:{}'", reference.event_id, action.id),
                                action.config.params(),
                                reference.params(),
                                &scope,
                            ),
                            None => run.error(
                                &origin,
                                format!(
                                    "references unknown action '{}' of event '{}'",
                                    reference.id, reference.event_id
                                ),
                            ),
                        },
                    }
                }
                if let Some(reference) = &element.datasource {
                    check_permissions(run, &origin, reference.permissions());
                    if let Some(condition) = &reference.condition {
                        check_condition(run, &origin, &condition.expression, &scope, &reference.id);
                    }
                    match run.state.datasources.get(&reference.id) {
                        Some(datasource) => check_reference(
                            run,
                            &origin,
                            &format!("datasource '{}'", datasource.id),
                            datasource.config.params(),
                            reference.params(),
                            &scope,
                        ),
                        None => run.error(
                            &origin,
                            format!("references unknown datasource '{}'", reference.id),
                        ),
                    }
                }
            }
        }
    }
}

fn duplicates<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<&'a String> {
    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    for id in ids {
        if !seen.insert(id) && !duplicates.contains(&id) {
            duplicates.push(id);
        }
    }
    duplicates
}

/// 展开嵌套字段：(路径, 字段)。
fn flatten_fields(fields: &[FieldDef]) -> Vec<(String, &FieldDef)> {
    let mut flattened = Vec::new();
    let mut stack: Vec<(String, &FieldDef)> = fields
        .iter()
        .rev()
        .map(|field| (field.name.clone(), field))
        .collect();
    while let Some((path, field)) = stack.pop() {
        for child in field.fields.iter().rev() {
            stack.push((format!("{}.{}", path, child.name), child));
        }
        flattened.push((path, field));
    }
    flattened
}

fn is_bound(field: &FieldDef) -> bool {
    !matches!(field.field_type, FieldType::Linkpanel) && !field.binding_path().contains('[')
}

fn check_permissions(run: &mut Run<'_>, origin: &Origin, permissions: &[Permission]) {
    for permission in permissions {
        if !run.state.application.has_permission(&permission.reference) {
            run.error(
                origin,
                format!("permission '{}' does not exist", permission.reference),
            );
        }
    }
}

fn check_condition(
    run: &mut Run<'_>,
    origin: &Origin,
    expression: &str,
    scope: &Scope,
    element: &str,
) {
    let unresolved = match parse(expression) {
        Ok(parsed) => parsed
            .variables()
            .into_iter()
            .filter(|name| !scope.contains(name))
            .map(ExpressionError::UnresolvedVariable)
            .collect::<Vec<_>>(),
        Err(err) => vec![err],
    };
    for err in unresolved {
        let message = match err {
            ExpressionError::UnresolvedVariable(name) => format!(
                "condition '{}' of '{}' uses undeclared parameter '{}'",
                expression, element, name
            ),
            other => format!("condition '{}' of '{}' is invalid: {}", expression, element, other),
        };
        run.error(origin, message);
    }
}

/// 引用参数：必须由被引用实体声明；占位符必须在调用方作用域内。
fn check_reference(
    run: &mut Run<'_>,
    origin: &Origin,
    target: &str,
    declared: &[Param],
    supplied: &[Param],
    scope: &Scope,
) {
    let declared_names: BTreeSet<&str> = declared.iter().map(|param| param.name.as_str()).collect();
    for param in supplied {
        if !declared_names.contains(param.name.as_str()) {
            run.error(
                origin,
                format!("parameter '{}' is not declared by {}", param.name, target),
            );
        }
        for name in placeholders(&param.value) {
            if !scope.contains(&name) {
                run.error(
                    origin,
                    format!(
                        "parameter '{}' of reference to {} uses unknown placeholder '${{{}}}'",
                        param.name, target, name
                    ),
                );
            }
        }
    }
    let supplied_names: BTreeSet<&str> = supplied.iter().map(|param| param.name.as_str()).collect();
    for param in declared {
        if param.default.is_none() && !supplied_names.contains(param.name.as_str()) {
            run.warning(
                origin,
                format!("{} declares parameter '{}' which is not supplied", target, param.name),
            );
        }
    }
}

fn placeholders(text: &str) -> Vec<String> {
    ParameterSupport::dollar(BTreeMap::new())
        .map(|support| support.placeholder_names(text))
        .unwrap_or_default()
}

fn check_linkpanel(run: &mut Run<'_>, origin: &Origin, panel: &Linkpanel, scope: &Scope) {
    for link in &panel.links {
        check_link(run, origin, link, scope);
    }
}

fn check_link(run: &mut Run<'_>, origin: &Origin, link: &Link, scope: &Scope) {
    check_permissions(run, origin, link.permissions());
    if let Some(condition) = &link.condition {
        check_condition(run, origin, &condition.expression, scope, &link.target);
    }
    if link.mode != LinkMode::Intern {
        return;
    }
    let target = link.target.trim_start_matches('/');
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let page_id = path.split('/').next().unwrap_or(path);
    if page_id.is_empty() || page_id.contains("${") || page_id.contains("#{") {
        return;
    }
    let Some(page) = run.state.pages.get(page_id) else {
        run.error(
            origin,
            format!("link target '{}' references unknown page '{}'", link.target, page_id),
        );
        return;
    };
    let get_params: BTreeSet<&str> = page
        .config
        .url_schema
        .as_ref()
        .map(|schema| schema.get_params().iter().map(|param| param.name.as_str()).collect())
        .unwrap_or_default();
    let undeclared: Vec<String> = query
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .filter(|name| !name.is_empty() && !get_params.contains(name))
        .map(str::to_string)
        .collect();
    for name in undeclared {
        run.error(
            origin,
            format!(
                "link target '{}' uses get-parameter '{}' not declared by page '{}'",
                link.target, name, page_id
            ),
        );
    }
}
