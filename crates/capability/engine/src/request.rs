//! 表单请求与绑定对象填充。

use crate::field_processor::FieldProcessor;
use crate::labels::{INVALID_VALUE, MessageSource, localize};
use crate::pageable::{Pageable, sort_parameter_name};
use appng_binding::{
    BindFormValidator, BindRegistry, ConstraintViolation, ValidationProvider, convert_field_value,
};
use appng_schema::{FieldDef, FieldType, Selection, UserData, UserInput};
use domain::Instance;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// 请求方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

/// 已解析的表单请求（单值/多值参数）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationRequest {
    method: RequestMethod,
    parameters: BTreeMap<String, Vec<String>>,
    url_parameters: Vec<String>,
}

impl ApplicationRequest {
    pub fn new(method: RequestMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(RequestMethod::Get)
    }

    pub fn post() -> Self {
        Self::new(RequestMethod::Post)
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value);
        self
    }

    pub fn with_parameters(mut self, name: impl Into<String>, values: &[&str]) -> Self {
        let entry = self.parameters.entry(name.into()).or_default();
        entry.extend(values.iter().map(|value| value.to_string()));
        self
    }

    /// 路径中的 URL 参数（按位置对应 url-params 声明）。
    pub fn with_url_parameters(mut self, values: &[&str]) -> Self {
        self.url_parameters = values.iter().map(|value| value.to_string()).collect();
        self
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.entry(name.into()).or_default().push(value.into());
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn is_post(&self) -> bool {
        self.method == RequestMethod::Post
    }

    pub fn is_get(&self) -> bool {
        self.method == RequestMethod::Get
    }

    /// 第一个值。
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn parameter_list(&self, name: &str) -> &[String] {
        self.parameters
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters.keys().cloned().collect()
    }

    /// 单值视图（多值取第一个）。
    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.parameters
            .iter()
            .filter_map(|(name, values)| values.first().map(|value| (name.clone(), value.clone())))
            .collect()
    }

    pub fn url_parameters(&self) -> &[String] {
        &self.url_parameters
    }
}

/// 请求到绑定对象的转换、校验与回显。
#[derive(Clone)]
pub struct RequestSupport {
    registry: Arc<BindRegistry>,
    validation: Arc<dyn ValidationProvider>,
    messages: Arc<dyn MessageSource>,
    locale: String,
}

impl RequestSupport {
    pub fn new(
        registry: Arc<BindRegistry>,
        validation: Arc<dyn ValidationProvider>,
        messages: Arc<dyn MessageSource>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            validation,
            messages,
            locale: locale.into(),
        }
    }

    /// 把请求参数写入绑定对象。
    ///
    /// 只处理可写字段；单个字段转换失败记为字段 invalid 消息，
    /// 该属性保持原值，其余字段继续填充。
    pub fn fill_bind_object(
        &self,
        instance: &mut Instance,
        field_processor: &mut FieldProcessor,
        request: &ApplicationRequest,
        writable: &[FieldDef],
    ) {
        for field in writable {
            self.fill_field(instance, field_processor, request, field, field.name.clone(), None);
        }
    }

    fn fill_field(
        &self,
        instance: &mut Instance,
        field_processor: &mut FieldProcessor,
        request: &ApplicationRequest,
        field: &FieldDef,
        parameter: String,
        parent_binding: Option<&str>,
    ) {
        let binding = match (parent_binding, &field.binding) {
            (_, Some(binding)) => binding.clone(),
            (Some(parent), None) => format!("{}.{}", parent, field.name),
            (None, None) => field.name.clone(),
        };
        if field.field_type == FieldType::Object {
            for child in &field.fields {
                if child.is_readonly() {
                    continue;
                }
                let child_parameter = format!("{}.{}", parameter, child.name);
                self.fill_field(
                    instance,
                    field_processor,
                    request,
                    child,
                    child_parameter,
                    Some(&binding),
                );
            }
            return;
        }
        if matches!(field.field_type, FieldType::ListObject | FieldType::Linkpanel) {
            return;
        }
        let present = request.has_parameter(&parameter);
        let implicit = field.field_type == FieldType::Checkbox || field.field_type.is_multi_valued();
        if !present && !implicit {
            return;
        }
        let raw = request.parameter_list(&parameter);
        let converted = convert_field_value(field, raw)
            .and_then(|value| self.registry.set_property(instance, &binding, value));
        if let Err(err) = converted {
            debug!(
                target: "appng.engine",
                field = %field.name,
                binding = %binding,
                error = %err,
                "field_conversion_failed"
            );
            let shown = raw.first().cloned().unwrap_or_default();
            let text = localize(self.messages.as_ref(), &self.locale, INVALID_VALUE, &[shown]);
            field_processor.add_invalid_field_message(&field.name, text);
        }
    }

    /// 校验绑定对象，违规写入字段/全局消息；返回是否通过。
    pub fn validate(
        &self,
        instance: &Instance,
        field_processor: &mut FieldProcessor,
        groups: &[String],
        provider_validator: Option<Arc<dyn BindFormValidator>>,
    ) -> bool {
        let fields = field_processor.fields().to_vec();
        let mut violations = self.validation.validate_bean(instance, &fields, groups);
        if let Some(validator) = provider_validator {
            violations.extend(validator.validate(instance));
        }
        let valid = violations.is_empty();
        for ConstraintViolation { field, message } in violations {
            match field {
                Some(field) => field_processor.add_invalid_field_message(&field, message),
                None => field_processor.add_invalid_message(message),
            }
        }
        valid
    }

    /// 分页请求：请求参数优先，其次会话中保存的值，最后是默认值与字段排序声明。
    pub fn pageable(
        &self,
        request: &ApplicationRequest,
        stored: Option<&str>,
        datasource_id: &str,
        page_size: u32,
        fields: &[FieldDef],
    ) -> Pageable {
        let parameter = sort_parameter_name(datasource_id);
        if let Some(sort) = request.parameter(&parameter).or(stored) {
            return Pageable::parse(sort, page_size);
        }
        let mut sorted: Vec<&FieldDef> = fields
            .iter()
            .filter(|field| field.sort.as_ref().is_some_and(|sort| sort.order.is_some()))
            .collect();
        sorted.sort_by_key(|field| field.sort.as_ref().and_then(|sort| sort.prio).unwrap_or(u32::MAX));
        sorted.into_iter().fold(Pageable::new(0, page_size), |pageable, field| {
            match field.sort.as_ref().and_then(|sort| sort.order) {
                Some(order) => pageable.with_sort(field.binding_path(), order),
                None => pageable,
            }
        })
    }
}

/// 用户提交的原始值（不含密码字段），失败时回显。
pub fn user_data(fields: &[FieldDef], request: &ApplicationRequest) -> UserData {
    let mut inputs = Vec::new();
    collect_inputs(fields, request, None, &mut inputs);
    UserData { inputs }
}

fn collect_inputs(
    fields: &[FieldDef],
    request: &ApplicationRequest,
    parent: Option<&str>,
    inputs: &mut Vec<UserInput>,
) {
    for field in fields {
        if field.field_type == FieldType::Password {
            continue;
        }
        let name = match parent {
            Some(parent) => format!("{}.{}", parent, field.name),
            None => field.name.clone(),
        };
        if field.field_type == FieldType::Object {
            collect_inputs(&field.fields, request, Some(&name), inputs);
            continue;
        }
        let values = request.parameter_list(&name);
        if values.is_empty() {
            continue;
        }
        inputs.push(UserInput {
            name,
            value: values.join(","),
        });
    }
}

/// 按请求中的原始值重新标记选项的选中状态。
pub fn apply_selections(selections: &mut [Selection], request: &ApplicationRequest) {
    for selection in selections {
        if !request.has_parameter(&selection.id) {
            continue;
        }
        let chosen = request.parameter_list(&selection.id);
        for option in selection.options.iter_mut() {
            option.selected = Some(chosen.contains(&option.value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::InMemoryMessageSource;
    use appng_binding::{ConstraintValidator, PropertyDescriptor, PropertyKind, TypeDescriptor};
    use appng_schema::{MetaData, SelectionOption};
    use domain::Value;

    fn support() -> (RequestSupport, Arc<BindRegistry>) {
        let registry = Arc::new(
            BindRegistry::new().with_type(
                TypeDescriptor::new("Person")
                    .property(PropertyDescriptor::new("name", PropertyKind::Text))
                    .property(PropertyDescriptor::new("age", PropertyKind::Int))
                    .property(PropertyDescriptor::new("active", PropertyKind::Bool)),
            ),
        );
        let support = RequestSupport::new(
            registry.clone(),
            Arc::new(ConstraintValidator::new(registry.clone())),
            Arc::new(InMemoryMessageSource::new()),
            "en",
        );
        (support, registry)
    }

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("age", FieldType::Int),
            FieldDef::new("active", FieldType::Checkbox),
            FieldDef::new("secret", FieldType::Password),
        ]
    }

    #[test]
    fn conversion_errors_leave_property_unset() {
        let (support, registry) = support();
        let mut instance = registry.new_instance("Person").expect("instance");
        let mut fp = FieldProcessor::new("persons", MetaData::default());
        let request = ApplicationRequest::post()
            .with_parameter("name", "Jane")
            .with_parameter("age", "abc");
        support.fill_bind_object(&mut instance, &mut fp, &request, &fields()[..3]);

        assert_eq!(instance.get("name"), Some(&Value::from("Jane")));
        assert_eq!(instance.get("age"), Some(&Value::Null));
        assert_eq!(instance.get("active"), Some(&Value::Bool(false)));
        let messages = fp.field_messages("age").expect("age messages");
        assert!(messages.has_errors());
        assert!(fp.field_messages("name").is_none());
    }

    #[test]
    fn user_data_excludes_passwords() {
        let request = ApplicationRequest::post()
            .with_parameter("name", "Jane")
            .with_parameter("secret", "hunter2");
        let data = user_data(&fields(), &request);
        assert_eq!(data.get("name"), Some("Jane"));
        assert!(data.get("secret").is_none());
    }

    #[test]
    fn pageable_prefers_request_then_session() {
        let (support, _) = support();
        let request = ApplicationRequest::get().with_parameter("sortPersons", "page:1;pageSize:5");
        let pageable = support.pageable(&request, Some("page:3"), "persons", 25, &[]);
        assert_eq!((pageable.page, pageable.page_size), (1, 5));

        let stored = support.pageable(&ApplicationRequest::get(), Some("page:3"), "persons", 25, &[]);
        assert_eq!((stored.page, stored.page_size), (3, 25));
    }

    #[test]
    fn selections_follow_raw_input() {
        let mut selections = vec![Selection {
            id: "colors".to_string(),
            options: vec![
                SelectionOption::new("red", "Red"),
                SelectionOption::new("blue", "Blue"),
            ],
            ..Selection::default()
        }];
        let request = ApplicationRequest::post().with_parameters("colors", &["blue"]);
        apply_selections(&mut selections, &request);
        assert!(!selections[0].options[0].is_selected());
        assert!(selections[0].options[1].is_selected());
    }
}
