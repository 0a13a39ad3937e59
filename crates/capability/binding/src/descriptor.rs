use crate::validation::BindFormValidator;
use domain::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 属性值类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Int,
    Decimal,
    Bool,
    Date,
    List(Box<PropertyKind>),
    /// 嵌套对象（类型名）
    Object(String),
}

impl PropertyKind {
    pub fn object(type_name: impl Into<String>) -> Self {
        PropertyKind::Object(type_name.into())
    }

    pub fn list_of(kind: PropertyKind) -> Self {
        PropertyKind::List(Box::new(kind))
    }

    /// 嵌套对象（或对象列表）的类型名。
    pub fn nested_type(&self) -> Option<&str> {
        match self {
            PropertyKind::Object(name) => Some(name),
            PropertyKind::List(inner) => inner.nested_type(),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Text => write!(f, "text"),
            PropertyKind::Int => write!(f, "int"),
            PropertyKind::Decimal => write!(f, "decimal"),
            PropertyKind::Bool => write!(f, "boolean"),
            PropertyKind::Date => write!(f, "date"),
            PropertyKind::List(inner) => write!(f, "list<{}>", inner),
            PropertyKind::Object(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    pub readable: bool,
    pub writable: bool,
    pub default: Option<Value>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            readable: true,
            writable: true,
            default: None,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// 实例化策略：具体类型按默认值构造；接口类型使用全空对象。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstantiationStrategy {
    #[default]
    Constructor,
    NullObject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintRule {
    NotNull,
    Size { min: Option<i64>, max: Option<i64> },
    Pattern(String),
    Min(i64),
    Max(i64),
    Digits { integer: u32, fraction: u32 },
}

/// 属性约束。`groups` 为空表示默认分组。
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub property: String,
    pub rule: ConstraintRule,
    pub message: Option<String>,
    pub groups: Vec<String>,
}

impl Constraint {
    pub fn new(property: impl Into<String>, rule: ConstraintRule) -> Self {
        Self {
            property: property.into(),
            rule,
            message: None,
            groups: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn in_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|group| group.to_string()).collect();
        self
    }

    /// 请求分组为空时只应用默认分组约束。
    pub fn applies_to(&self, groups: &[String]) -> bool {
        if groups.is_empty() {
            return self.groups.is_empty();
        }
        if self.groups.is_empty() {
            return groups.iter().any(|group| group == "Default");
        }
        self.groups.iter().any(|group| groups.contains(group))
    }
}

/// 绑定类描述。
#[derive(Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub properties: BTreeMap<String, PropertyDescriptor>,
    pub strategy: InstantiationStrategy,
    /// 可赋值到的其它类型名（父类/接口）。
    pub assignable_to: Vec<String>,
    pub constraints: Vec<Constraint>,
    pub form_validator: Option<Arc<dyn BindFormValidator>>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            strategy: InstantiationStrategy::Constructor,
            assignable_to: Vec::new(),
            constraints: Vec::new(),
            form_validator: None,
        }
    }

    /// 接口类型：使用空对象实例化。
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            strategy: InstantiationStrategy::NullObject,
            ..Self::new(name)
        }
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.insert(property.name.clone(), property);
        self
    }

    pub fn assignable_to(mut self, names: &[&str]) -> Self {
        self.assignable_to
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_form_validator(mut self, validator: Arc<dyn BindFormValidator>) -> Self {
        self.form_validator = Some(validator);
        self
    }

    pub fn get(&self, property: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(property)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("strategy", &self.strategy)
            .field("assignable_to", &self.assignable_to)
            .field("constraints", &self.constraints.len())
            .field("form_validator", &self.form_validator.is_some())
            .finish()
    }
}
