//! 页面、事件、动作、数据源配置模型。
//!
//! 属性字段使用 `@` 前缀，文本内容使用 `$text`，其余字段映射为子元素。
//! 所有可选项在输出时省略，保证编组后再解组结构不变。

use crate::result::{Data, Messages, UserData};
use serde::{Deserialize, Serialize};

/// 标签（多语言 key + 参数 + 解析后的值）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "@id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "@params", skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    #[serde(rename = "$text", default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Label {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Labels {
    #[serde(rename = "label", default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

/// 权限模式：SET 参与访问控制，READ 仅标注。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionMode {
    #[serde(rename = "READ", alias = "read")]
    Read,
    #[serde(rename = "SET", alias = "set")]
    Set,
}

/// 权限引用；`value` 为运行时判定结果。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Permission {
    #[serde(rename = "@ref")]
    pub reference: String,
    #[serde(rename = "@mode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<PermissionMode>,
    #[serde(rename = "@value", skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

impl Permission {
    pub fn new(reference: impl Into<String>, mode: Option<PermissionMode>) -> Self {
        Self {
            reference: reference.into(),
            mode,
            value: None,
        }
    }

    pub fn is_set_mode(&self) -> bool {
        self.mode == Some(PermissionMode::Set)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(rename = "permission", default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

impl Permissions {
    pub fn of(permissions: Vec<Permission>) -> Self {
        Self { permissions }
    }
}

/// 参数声明或参数引用。
///
/// 声明处 `default` 为默认值；引用处文本内容为传入值（可含 `${...}` 占位符）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Param {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@default", skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(rename = "$text", default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Params {
    #[serde(rename = "param", default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

impl Params {
    pub fn of(params: Vec<Param>) -> Self {
        Self { params }
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|param| param.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "@expression", default)]
    pub expression: String,
}

impl Condition {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

/// Bean 选项：名称加任意属性（这里固定为 id / value）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BeanOption {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@value", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// 业务 Bean 引用。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bean {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "option", default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<BeanOption>,
}

impl Bean {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: Vec::new(),
        }
    }

    pub fn option(&self, name: &str) -> Option<&BeanOption> {
        self.options.iter().find(|option| option.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sort {
    #[serde(rename = "@prio", skip_serializing_if = "Option::is_none")]
    pub prio: Option<u32>,
    #[serde(rename = "@order", skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(rename = "@ignore-case", skip_serializing_if = "Option::is_none")]
    pub ignore_case: Option<bool>,
}

/// 字段类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "longtext")]
    LongText,
    #[serde(rename = "richtext")]
    RichText,
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "decimal")]
    Decimal,
    #[serde(rename = "checkbox")]
    Checkbox,
    #[serde(rename = "coordinate")]
    Coordinate,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file-multiple")]
    FileMultiple,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "linkpanel")]
    Linkpanel,
    #[serde(rename = "list:checkbox")]
    ListCheckbox,
    #[serde(rename = "list:radio")]
    ListRadio,
    #[serde(rename = "list:select")]
    ListSelect,
    #[serde(rename = "list:text")]
    ListText,
    #[serde(rename = "list:object")]
    ListObject,
    #[serde(rename = "object")]
    Object,
}

impl FieldType {
    /// 选择类字段（选项来自 selection）。
    pub fn is_selection(&self) -> bool {
        matches!(
            self,
            FieldType::ListCheckbox | FieldType::ListRadio | FieldType::ListSelect
        )
    }

    /// 多值字段。
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            FieldType::ListCheckbox
                | FieldType::ListSelect
                | FieldType::ListText
                | FieldType::FileMultiple
        )
    }
}

/// 单条校验规则，不同规则使用不同属性子集。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(rename = "@message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "@min", skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(rename = "@max", skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(rename = "@regexp", skip_serializing_if = "Option::is_none")]
    pub regexp: Option<String>,
    #[serde(rename = "@integer", skip_serializing_if = "Option::is_none")]
    pub integer: Option<u32>,
    #[serde(rename = "@fraction", skip_serializing_if = "Option::is_none")]
    pub fraction: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationGroup {
    #[serde(rename = "@class")]
    pub class: String,
}

/// 字段或元数据级校验声明。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Validation {
    #[serde(rename = "notNull", skip_serializing_if = "Option::is_none")]
    pub not_null: Option<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digits: Option<ValidationRule>,
    #[serde(rename = "group", default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<ValidationGroup>,
}

impl Validation {
    pub fn is_empty(&self) -> bool {
        self.not_null.is_none()
            && self.size.is_none()
            && self.pattern.is_none()
            && self.min.is_none()
            && self.max.is_none()
            && self.digits.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPermissionMode {
    #[serde(rename = "READ", alias = "read")]
    Read,
    #[serde(rename = "WRITE", alias = "write")]
    Write,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPermissions {
    #[serde(rename = "@mode")]
    pub mode: FieldPermissionMode,
    #[serde(rename = "permission", default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
}

/// 字段定义（可递归嵌套）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type", default)]
    pub field_type: FieldType,
    #[serde(rename = "@binding", skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(rename = "@readonly", skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(rename = "@hidden", skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(rename = "@format", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "@displayLength", skip_serializing_if = "Option::is_none")]
    pub display_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<FieldPermissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(rename = "field", default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Messages>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            ..Self::default()
        }
    }

    pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
        self.binding = Some(binding.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    /// 绑定路径；未声明 binding 时使用字段名。
    pub fn binding_path(&self) -> &str {
        self.binding.as_deref().unwrap_or(&self.name)
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly.unwrap_or(false)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or(false)
    }

    pub fn permissions_of(&self, mode: FieldPermissionMode) -> Vec<&Permission> {
        self.permissions
            .iter()
            .filter(|permissions| permissions.mode == mode)
            .flat_map(|permissions| permissions.permissions.iter())
            .collect()
    }
}

/// 元数据：绑定类与字段集合。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(rename = "@bindClass", skip_serializing_if = "Option::is_none")]
    pub bind_class: Option<String>,
    #[serde(rename = "@binding", skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(rename = "@result-selector", skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(rename = "field", default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
}

impl MetaData {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkMode {
    #[default]
    #[serde(rename = "intern")]
    Intern,
    #[serde(rename = "extern")]
    Extern,
    #[serde(rename = "webservice")]
    Webservice,
}

/// 链接。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "@mode", default)]
    pub mode: LinkMode,
    #[serde(rename = "@target", default)]
    pub target: String,
    #[serde(rename = "@default", skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    #[serde(rename = "@show-disabled", skip_serializing_if = "Option::is_none")]
    pub show_disabled: Option<bool>,
    #[serde(rename = "@active", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl Link {
    pub fn intern(target: impl Into<String>, label: Label) -> Self {
        Self {
            mode: LinkMode::Intern,
            target: target.into(),
            label: Some(label),
            ..Self::default()
        }
    }

    pub fn permissions(&self) -> &[Permission] {
        self.permissions
            .as_ref()
            .map(|permissions| permissions.permissions.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanelLocation {
    #[serde(rename = "top")]
    Top,
    #[default]
    #[serde(rename = "bottom")]
    Bottom,
    #[serde(rename = "both")]
    Both,
    #[serde(rename = "inline")]
    Inline,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Linkpanel {
    #[serde(rename = "@id", default)]
    pub id: String,
    #[serde(rename = "@location", default)]
    pub location: PanelLocation,
    #[serde(rename = "link", default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// 数据源/动作/事件公共配置。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(rename = "meta-data", skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
    #[serde(rename = "linkpanel", default, skip_serializing_if = "Vec::is_empty")]
    pub linkpanels: Vec<Linkpanel>,
}

impl DataConfig {
    pub fn permissions(&self) -> &[Permission] {
        self.permissions
            .as_ref()
            .map(|permissions| permissions.permissions.as_slice())
            .unwrap_or(&[])
    }

    pub fn params(&self) -> &[Param] {
        self.params
            .as_ref()
            .map(|params| params.params.as_slice())
            .unwrap_or(&[])
    }

    pub fn labels(&self) -> &[Label] {
        self.labels
            .as_ref()
            .map(|labels| labels.labels.as_slice())
            .unwrap_or(&[])
    }

    pub fn fields(&self) -> &[FieldDef] {
        self.meta_data
            .as_ref()
            .map(|meta| meta.fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn bind_class(&self) -> Option<&str> {
        self.meta_data
            .as_ref()
            .and_then(|meta| meta.bind_class.as_deref())
    }
}

/// 数据源定义。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Datasource {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub config: DataConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bean: Option<Bean>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
}

impl Datasource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// 没有 Bean 的数据源为静态数据源。
    pub fn is_static(&self) -> bool {
        self.bean.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Datasources {
    #[serde(rename = "datasource", default, skip_serializing_if = "Vec::is_empty")]
    pub datasources: Vec<Datasource>,
}

/// 数据源引用（页面元素或动作中）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasourceRef {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@page-size", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl DatasourceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn params(&self) -> &[Param] {
        self.params
            .as_ref()
            .map(|params| params.params.as_slice())
            .unwrap_or(&[])
    }

    pub fn permissions(&self) -> &[Permission] {
        self.permissions
            .as_ref()
            .map(|permissions| permissions.permissions.as_slice())
            .unwrap_or(&[])
    }
}

/// 动作定义。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(rename = "@async", skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
    #[serde(rename = "@onSuccess", skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,
    #[serde(default)]
    pub config: DataConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bean: Option<Bean>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Messages>,
    #[serde(rename = "userdata", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserData>,
}

impl Action {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn runs_async(&self) -> bool {
        self.is_async.unwrap_or(false)
    }
}

/// 动作引用（页面元素中）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionRef {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@eventId")]
    pub event_id: String,
    #[serde(rename = "@onSuccess", skip_serializing_if = "Option::is_none")]
    pub on_success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl ActionRef {
    pub fn new(event_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event_id: event_id.into(),
            ..Self::default()
        }
    }

    pub fn params(&self) -> &[Param] {
        self.params
            .as_ref()
            .map(|params| params.params.as_slice())
            .unwrap_or(&[])
    }

    pub fn permissions(&self) -> &[Permission] {
        self.permissions
            .as_ref()
            .map(|permissions| permissions.permissions.as_slice())
            .unwrap_or(&[])
    }
}

/// 事件：一组动作。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default)]
    pub config: DataConfig,
    #[serde(rename = "action", default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Events {
    #[serde(rename = "event", default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UrlSchema {
    #[serde(rename = "url-params", skip_serializing_if = "Option::is_none")]
    pub url_params: Option<Params>,
    #[serde(rename = "get-params", skip_serializing_if = "Option::is_none")]
    pub get_params: Option<Params>,
    #[serde(rename = "post-params", skip_serializing_if = "Option::is_none")]
    pub post_params: Option<Params>,
}

impl UrlSchema {
    pub fn url_params(&self) -> &[Param] {
        self.url_params.as_ref().map(|p| p.params.as_slice()).unwrap_or(&[])
    }

    pub fn get_params(&self) -> &[Param] {
        self.get_params.as_ref().map(|p| p.params.as_slice()).unwrap_or(&[])
    }

    pub fn post_params(&self) -> &[Param] {
        self.post_params.as_ref().map(|p| p.params.as_slice()).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(rename = "url-schema", skip_serializing_if = "Option::is_none")]
    pub url_schema: Option<UrlSchema>,
    #[serde(rename = "linkpanel", default, skip_serializing_if = "Vec::is_empty")]
    pub linkpanels: Vec<Linkpanel>,
}

impl PageConfig {
    pub fn permissions(&self) -> &[Permission] {
        self.permissions
            .as_ref()
            .map(|permissions| permissions.permissions.as_slice())
            .unwrap_or(&[])
    }
}

/// 页面元素：动作或数据源引用之一。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionElement {
    #[serde(rename = "@folded", skip_serializing_if = "Option::is_none")]
    pub folded: Option<bool>,
    #[serde(rename = "@passive", skip_serializing_if = "Option::is_none")]
    pub passive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "@hidden", skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Label>,
    #[serde(rename = "element", default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<SectionElement>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Structure {
    #[serde(rename = "section", default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

/// 页面定义。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageDefinition {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
    #[serde(default)]
    pub config: PageConfig,
    #[serde(default)]
    pub structure: Structure,
}

impl PageDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.structure.sections
    }

    pub fn is_index(&self) -> bool {
        self.page_type.as_deref() == Some("index")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pages {
    #[serde(rename = "page", default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageDefinition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionParam {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionParams {
    #[serde(rename = "session-param", default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<SessionParam>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "session-params", skip_serializing_if = "Option::is_none")]
    pub session_params: Option<SessionParams>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RootSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Label>,
    #[serde(rename = "default-page", skip_serializing_if = "Option::is_none")]
    pub default_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,
}

/// 应用根配置（每个应用至多一个）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationRootConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: RootSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<Linkpanel>,
}

impl ApplicationRootConfig {
    pub fn session_params(&self) -> Vec<String> {
        self.config
            .session
            .as_ref()
            .and_then(|session| session.session_params.as_ref())
            .map(|params| params.params.iter().map(|param| param.name.clone()).collect())
            .unwrap_or_default()
    }
}
