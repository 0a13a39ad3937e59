//! 带前缀的类型化属性集合（平台属性与应用属性）。

use std::collections::BTreeMap;

/// 属性值类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Int,
    Float,
    Boolean,
    Blob,
    Clob,
    List,
}

/// 单个属性。类型由默认值推断，实际值为空时回退到默认值。
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub property_type: PropertyType,
    pub value: Option<String>,
    pub default_value: Option<String>,
    pub blob: Option<Vec<u8>>,
    pub description: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        let property_type = infer_type(&value);
        Self {
            name: name.into(),
            property_type,
            value: None,
            default_value: Some(value),
            blob: None,
            description: None,
        }
    }

    pub fn typed(name: impl Into<String>, property_type: PropertyType, value: impl Into<String>) -> Self {
        Self {
            property_type,
            ..Self::new(name, value)
        }
    }

    pub fn blob(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Blob,
            value: None,
            default_value: None,
            blob: Some(bytes),
            description: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// 实际值，空值时取默认值。
    pub fn effective(&self) -> Option<&str> {
        self.value
            .as_deref()
            .filter(|value| !value.is_empty())
            .or(self.default_value.as_deref())
    }
}

fn infer_type(value: &str) -> PropertyType {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        PropertyType::Boolean
    } else if trimmed.parse::<i64>().is_ok() {
        PropertyType::Int
    } else if trimmed.parse::<f64>().is_ok() {
        PropertyType::Float
    } else if value.contains('\n') {
        PropertyType::Clob
    } else {
        PropertyType::String
    }
}

/// 属性集合。
///
/// 属性以「前缀 + 名称」存储，读取时使用不带前缀的名称。
/// `set_final` 之后不能再添加属性。
#[derive(Debug, Clone, Default)]
pub struct PropertyHolder {
    prefix: String,
    properties: BTreeMap<String, Property>,
    is_final: bool,
}

impl PropertyHolder {
    pub fn new(prefix: impl Into<String>, properties: Vec<Property>) -> Self {
        let prefix = prefix.into();
        let properties = properties
            .into_iter()
            .map(|property| (format!("{}{}", prefix, property.name), property))
            .collect();
        Self {
            prefix,
            properties,
            is_final: false,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 添加属性；已 final 时返回 false。
    pub fn add(&mut self, property: Property) -> bool {
        if self.is_final {
            return false;
        }
        self.properties
            .insert(format!("{}{}", self.prefix, property.name), property);
        true
    }

    pub fn set_final(&mut self) {
        self.is_final = true;
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(&format!("{}{}", self.prefix, name))
    }

    pub fn names(&self) -> Vec<String> {
        self.properties
            .values()
            .map(|property| property.name.clone())
            .collect()
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.property(name)
            .and_then(Property::effective)
            .map(str::to_string)
    }

    pub fn get_string_or(&self, name: &str, default: &str) -> String {
        self.get_string(name).unwrap_or_else(|| default.to_string())
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.property(name)
            .and_then(Property::effective)
            .and_then(|value| value.trim().parse().ok())
    }

    pub fn get_int_or(&self, name: &str, default: i64) -> i64 {
        self.get_int(name).unwrap_or(default)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.property(name)
            .and_then(Property::effective)
            .and_then(|value| value.trim().parse().ok())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.property(name)
            .and_then(Property::effective)
            .map(|value| {
                let value = value.trim();
                value.eq_ignore_ascii_case("true") || value == "1"
            })
    }

    pub fn get_bool_or(&self, name: &str, default: bool) -> bool {
        self.get_bool(name).unwrap_or(default)
    }

    pub fn get_blob(&self, name: &str) -> Option<&[u8]> {
        self.property(name).and_then(|property| property.blob.as_deref())
    }

    /// 按分隔符拆分列表属性，去除空白项。
    pub fn get_list(&self, name: &str, delimiter: &str) -> Vec<String> {
        self.property(name)
            .and_then(Property::effective)
            .map(|value| {
                value
                    .split(delimiter)
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 全部属性（不带前缀名称 → 实际值），用于表达式上下文。
    pub fn as_map(&self) -> BTreeMap<String, String> {
        self.properties
            .values()
            .filter_map(|property| {
                property
                    .effective()
                    .map(|value| (property.name.clone(), value.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_use_default_value() {
        let holder = PropertyHolder::new(
            "application.demo.",
            vec![
                Property::new("pageSize", "10"),
                Property::new("enabled", "true"),
                Property::new("ratio", "0.5"),
                Property::new("tags", "a, b,,c"),
            ],
        );
        assert_eq!(holder.get_int("pageSize"), Some(10));
        assert_eq!(holder.get_bool("enabled"), Some(true));
        assert_eq!(holder.get_float("ratio"), Some(0.5));
        assert_eq!(holder.get_list("tags", ","), vec!["a", "b", "c"]);
        assert_eq!(holder.property("pageSize").map(|p| p.property_type), Some(PropertyType::Int));
        assert!(holder.get_string("missing").is_none());
    }

    #[test]
    fn actual_value_overrides_default() {
        let holder = PropertyHolder::new("", vec![Property::new("pageSize", "10").with_value("50")]);
        assert_eq!(holder.get_int("pageSize"), Some(50));
    }

    #[test]
    fn final_holder_rejects_additions() {
        let mut holder = PropertyHolder::new("p.", Vec::new());
        assert!(holder.add(Property::new("a", "1")));
        holder.set_final();
        assert!(!holder.add(Property::new("b", "2")));
        assert_eq!(holder.names(), vec!["a"]);
    }
}
