//! 绑定对象的数据表示。
//!
//! 绑定类不再依赖运行时反射：一个实例就是「类型名 + 属性表」，
//! 属性通过点分路径（`address.city`）读写。

use std::collections::BTreeMap;
use std::fmt;

/// 属性值。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Text(String),
    List(Vec<Value>),
    Object(Instance),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 空值判断（与表达式中的 `empty` 一致）。
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Object(instance) => instance.properties.is_empty(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Text(text) => match text.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Decimal(value) if value.fract() == 0.0 => Some(*value as i64),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Decimal(value) => Some(*value),
            Value::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Decimal(value) => write!(f, "{}", value),
            Value::Text(value) => write!(f, "{}", value),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Object(instance) => write!(f, "{}", instance.type_name),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// 绑定类实例。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Instance {
    pub type_name: String,
    pub properties: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// 链式设置顶层属性（测试与 Provider 构造数据时使用）。
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// 按点分路径读取属性；路径中任一段缺失返回 `None`。
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.').filter(|segment| !segment.is_empty());
        let first = segments.next()?;
        let mut current = self.properties.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(instance) => instance.properties.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// 按点分路径写入属性，中间对象不存在时自动创建。
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').filter(|segment| !segment.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut current = self;
        for segment in parents {
            let entry = current
                .properties
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Instance::new(*segment)));
            if !matches!(entry, Value::Object(_)) {
                *entry = Value::Object(Instance::new(*segment));
            }
            current = match entry {
                Value::Object(instance) => instance,
                _ => return,
            };
        }
        current.properties.insert(last.to_string(), value);
    }

    /// 删除点分路径对应的属性。
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.properties.remove(path),
            Some((parent, last)) => match self.get_mut(parent) {
                Some(Value::Object(instance)) => instance.properties.remove(last),
                _ => None,
            },
        }
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split('.').filter(|segment| !segment.is_empty());
        let first = segments.next()?;
        let mut current = self.properties.get_mut(first)?;
        for segment in segments {
            current = match current {
                Value::Object(instance) => instance.properties.get_mut(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_set_creates_parents() {
        let mut person = Instance::new("Person");
        person.set("address.city", Value::from("Berlin"));
        assert_eq!(person.get("address.city"), Some(&Value::from("Berlin")));
        assert!(person.get("address.street").is_none());
    }

    #[test]
    fn remove_nested_property() {
        let mut person = Instance::new("Person").with("name", "John");
        person.set("address.zip", Value::from(12345));
        assert_eq!(person.remove("address.zip"), Some(Value::Int(12345)));
        assert!(person.get("address.zip").is_none());
        assert_eq!(person.remove("name"), Some(Value::from("John")));
    }

    #[test]
    fn empty_semantics() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::List(Vec::new()).is_empty());
        assert!(!Value::Int(0).is_empty());
    }
}
