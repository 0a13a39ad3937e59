use crate::BindingError;
use crate::conversion::coerce;
use crate::descriptor::{InstantiationStrategy, PropertyDescriptor, PropertyKind, TypeDescriptor};
use domain::{Instance, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// 绑定类注册表（应用级，只读共享）。
#[derive(Debug, Clone, Default)]
pub struct BindRegistry {
    types: BTreeMap<String, Arc<TypeDescriptor>>,
    groups: BTreeSet<String>,
}

impl BindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// 注册校验分组名。
    pub fn register_group(&mut self, name: impl Into<String>) {
        self.groups.insert(name.into());
    }

    pub fn with_group(mut self, name: impl Into<String>) -> Self {
        self.register_group(name);
        self
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    pub fn resolve_type(&self, name: &str) -> Result<Arc<TypeDescriptor>, BindingError> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| BindingError::UnknownType(name.to_string()))
    }

    /// 按实例化策略创建实例。
    pub fn instantiate(&self, descriptor: &TypeDescriptor) -> Instance {
        let mut instance = Instance::new(&descriptor.name);
        for property in descriptor.properties.values() {
            let value = match descriptor.strategy {
                InstantiationStrategy::NullObject => Value::Null,
                InstantiationStrategy::Constructor => match (&property.default, &property.kind) {
                    (Some(default), _) => default.clone(),
                    (None, PropertyKind::List(_)) => Value::List(Vec::new()),
                    (None, _) => Value::Null,
                },
            };
            instance.properties.insert(property.name.clone(), value);
        }
        instance
    }

    pub fn new_instance(&self, type_name: &str) -> Result<Instance, BindingError> {
        let descriptor = self.resolve_type(type_name)?;
        Ok(self.instantiate(&descriptor))
    }

    /// 按点分路径查找属性描述（穿过嵌套对象类型）。
    pub fn property_descriptor(
        &self,
        type_name: &str,
        path: &str,
    ) -> Result<PropertyDescriptor, BindingError> {
        let mut current = self.resolve_type(type_name)?;
        let segments: Vec<&str> = path.split('.').collect();
        for (index, segment) in segments.iter().enumerate() {
            let property = current
                .get(segment)
                .cloned()
                .ok_or_else(|| BindingError::UnknownProperty {
                    type_name: current.name.clone(),
                    property: segment.to_string(),
                })?;
            if index == segments.len() - 1 {
                return Ok(property);
            }
            let nested = property
                .kind
                .nested_type()
                .ok_or_else(|| BindingError::UnknownProperty {
                    type_name: current.name.clone(),
                    property: segments[index..].join("."),
                })?
                .to_string();
            current = self.resolve_type(&nested)?;
        }
        Err(BindingError::UnknownProperty {
            type_name: type_name.to_string(),
            property: path.to_string(),
        })
    }

    pub fn is_readable(&self, type_name: &str, path: &str) -> bool {
        self.property_descriptor(type_name, path)
            .map(|property| property.readable)
            .unwrap_or(false)
    }

    pub fn is_writable(&self, type_name: &str, path: &str) -> bool {
        self.property_descriptor(type_name, path)
            .map(|property| property.writable)
            .unwrap_or(false)
    }

    pub fn get_property(&self, instance: &Instance, path: &str) -> Value {
        instance.get(path).cloned().unwrap_or(Value::Null)
    }

    /// 写入属性：校验可写并按属性类型转换，缺失的中间对象按声明类型创建。
    pub fn set_property(
        &self,
        instance: &mut Instance,
        path: &str,
        value: Value,
    ) -> Result<(), BindingError> {
        let property = self.property_descriptor(&instance.type_name, path)?;
        if !property.writable {
            return Err(BindingError::NotWritable {
                type_name: instance.type_name.clone(),
                property: path.to_string(),
            });
        }
        let coerced = coerce(path, &property.kind, value)?;

        let segments: Vec<&str> = path.split('.').collect();
        for depth in 1..segments.len() {
            let prefix = segments[..depth].join(".");
            if matches!(instance.get(&prefix), Some(Value::Object(_))) {
                continue;
            }
            let parent = self.property_descriptor(&instance.type_name, &prefix)?;
            let nested = match parent.kind.nested_type() {
                Some(name) => self.new_instance(name)?,
                None => Instance::new(&prefix),
            };
            instance.set(&prefix, Value::Object(nested));
        }
        instance.set(path, coerced);
        Ok(())
    }

    /// `actual` 是否可赋值给 `declared`（沿 assignable_to 传递）。
    pub fn is_assignable(&self, actual: &str, declared: &str) -> bool {
        let mut pending = vec![actual.to_string()];
        let mut seen = BTreeSet::new();
        while let Some(name) = pending.pop() {
            if name == declared {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(descriptor) = self.types.get(&name) {
                pending.extend(descriptor.assignable_to.iter().cloned());
            }
        }
        false
    }

    pub fn check_assignable(&self, actual: &str, declared: &str) -> Result<(), BindingError> {
        if self.is_assignable(actual, declared) {
            Ok(())
        } else {
            Err(BindingError::NotAssignable {
                actual: actual.to_string(),
                declared: declared.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BindRegistry {
        BindRegistry::new()
            .with_type(
                TypeDescriptor::new("Person")
                    .property(PropertyDescriptor::new("id", PropertyKind::Int).read_only())
                    .property(PropertyDescriptor::new("name", PropertyKind::Text))
                    .property(PropertyDescriptor::new("address", PropertyKind::object("Address")))
                    .assignable_to(&["Entity"]),
            )
            .with_type(
                TypeDescriptor::new("Address")
                    .property(PropertyDescriptor::new("city", PropertyKind::Text)),
            )
            .with_type(TypeDescriptor::interface("Entity"))
    }

    #[test]
    fn nested_set_creates_typed_parent() {
        let registry = registry();
        let mut person = registry.new_instance("Person").expect("person");
        registry
            .set_property(&mut person, "address.city", Value::from("Berlin"))
            .expect("set");
        let address = person.get("address").and_then(Value::as_instance).expect("address");
        assert_eq!(address.type_name, "Address");
        assert_eq!(registry.get_property(&person, "address.city"), Value::from("Berlin"));
    }

    #[test]
    fn read_only_property_rejects_write() {
        let registry = registry();
        let mut person = registry.new_instance("Person").expect("person");
        assert!(matches!(
            registry.set_property(&mut person, "id", Value::Int(1)),
            Err(BindingError::NotWritable { .. })
        ));
        assert!(registry.is_readable("Person", "id"));
        assert!(!registry.is_writable("Person", "id"));
        assert!(!registry.is_readable("Person", "address.zip"));
    }

    #[test]
    fn assignability_is_transitive() {
        let registry = registry();
        assert!(registry.is_assignable("Person", "Entity"));
        assert!(!registry.is_assignable("Address", "Entity"));
    }

    #[test]
    fn null_object_strategy_leaves_properties_null() {
        let registry = BindRegistry::new().with_type(
            TypeDescriptor::interface("Named")
                .property(PropertyDescriptor::new("tags", PropertyKind::list_of(PropertyKind::Text))),
        );
        let instance = registry.new_instance("Named").expect("instance");
        assert_eq!(instance.get("tags"), Some(&Value::Null));
    }
}
