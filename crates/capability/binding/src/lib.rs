//! 绑定类注册表、字段值转换与校验。
//!
//! 绑定类以显式描述（类型名 → 属性表）注册，不使用运行时反射。

mod conversion;
mod descriptor;
mod registry;
mod validation;

pub use conversion::{coerce, convert_field_value, format_value};
pub use descriptor::{
    Constraint, ConstraintRule, InstantiationStrategy, PropertyDescriptor, PropertyKind,
    TypeDescriptor,
};
pub use registry::BindRegistry;
pub use validation::{BindFormValidator, ConstraintValidator, ConstraintViolation, ValidationProvider};

/// 绑定错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("unknown type: {0}")]
    UnknownType(String),
    #[error("type {type_name} has no property {property}")]
    UnknownProperty { type_name: String, property: String },
    #[error("property {property} of type {type_name} is not writable")]
    NotWritable { type_name: String, property: String },
    #[error("cannot convert '{value}' for {field} to {expected}")]
    Conversion {
        field: String,
        value: String,
        expected: String,
    },
    #[error("type {actual} is not assignable to {declared}")]
    NotAssignable { actual: String, declared: String },
}
