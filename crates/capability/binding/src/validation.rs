use crate::descriptor::{Constraint, ConstraintRule};
use crate::registry::BindRegistry;
use appng_schema::{FieldDef, MetaData, Validation, ValidationRule};
use domain::{Instance, Value};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// 单条校验失败。`field` 为空表示对象级错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub field: Option<String>,
    pub message: String,
}

impl ConstraintViolation {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn global(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

/// 绑定对象自带的表单校验。
pub trait BindFormValidator: Send + Sync {
    fn validate(&self, bean: &Instance) -> Vec<ConstraintViolation>;
}

/// 可插拔的对象校验引擎。
pub trait ValidationProvider: Send + Sync {
    /// 校验对象的全部字段以及绑定类型上的表单校验。
    fn validate_bean(
        &self,
        bean: &Instance,
        fields: &[FieldDef],
        groups: &[String],
    ) -> Vec<ConstraintViolation>;

    fn validate_field(
        &self,
        bean: &Instance,
        field: &FieldDef,
        groups: &[String],
    ) -> Vec<ConstraintViolation>;

    /// 把绑定类型上的约束写入字段的 `<validation>` 声明。
    fn add_validation_metadata(&self, metadata: &mut MetaData);
}

/// 基于类型约束与字段 `<validation>` 声明的默认实现。
#[derive(Debug, Clone)]
pub struct ConstraintValidator {
    registry: Arc<BindRegistry>,
}

impl ConstraintValidator {
    pub fn new(registry: Arc<BindRegistry>) -> Self {
        Self { registry }
    }

    fn type_constraints(&self, type_name: &str, property: &str) -> Vec<Constraint> {
        match self.registry.resolve_type(type_name) {
            Ok(descriptor) => descriptor
                .constraints
                .iter()
                .filter(|constraint| constraint.property == property)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl ValidationProvider for ConstraintValidator {
    fn validate_bean(
        &self,
        bean: &Instance,
        fields: &[FieldDef],
        groups: &[String],
    ) -> Vec<ConstraintViolation> {
        let mut violations: Vec<ConstraintViolation> = fields
            .iter()
            .flat_map(|field| self.validate_field(bean, field, groups))
            .collect();
        if let Ok(descriptor) = self.registry.resolve_type(&bean.type_name)
            && let Some(validator) = &descriptor.form_validator
        {
            violations.extend(validator.validate(bean));
        }
        if !violations.is_empty() {
            debug!(
                target: "appng.binding",
                bind_class = %bean.type_name,
                violations = violations.len(),
                "bean_validation_failed"
            );
        }
        violations
    }

    fn validate_field(
        &self,
        bean: &Instance,
        field: &FieldDef,
        groups: &[String],
    ) -> Vec<ConstraintViolation> {
        let path = field.binding_path();
        let mut constraints = self.type_constraints(&bean.type_name, path);
        if let Some(validation) = &field.validation {
            constraints.extend(constraints_of(path, validation));
        }
        let value = bean.get(path).cloned().unwrap_or(Value::Null);
        constraints
            .iter()
            .filter(|constraint| constraint.applies_to(groups))
            .filter_map(|constraint| check(constraint, &value))
            .map(|message| ConstraintViolation::field(&field.name, message))
            .collect()
    }

    fn add_validation_metadata(&self, metadata: &mut MetaData) {
        let Some(bind_class) = metadata.bind_class.clone() else {
            return;
        };
        for field in metadata.fields.iter_mut() {
            let constraints = self.type_constraints(&bind_class, field.binding_path());
            if constraints.is_empty() {
                continue;
            }
            let validation = field.validation.get_or_insert_with(Validation::default);
            for constraint in constraints {
                annotate(validation, &constraint);
            }
        }
    }
}

/// 字段 `<validation>` 声明转换为约束。
fn constraints_of(property: &str, validation: &Validation) -> Vec<Constraint> {
    let groups: Vec<&str> = validation
        .groups
        .iter()
        .map(|group| group.class.as_str())
        .collect();
    let mut rules: Vec<(ConstraintRule, &ValidationRule)> = Vec::new();
    if let Some(rule) = &validation.not_null {
        rules.push((ConstraintRule::NotNull, rule));
    }
    if let Some(rule) = &validation.size {
        rules.push((
            ConstraintRule::Size {
                min: rule.min,
                max: rule.max,
            },
            rule,
        ));
    }
    if let Some(rule) = &validation.pattern {
        rules.push((
            ConstraintRule::Pattern(rule.regexp.clone().unwrap_or_default()),
            rule,
        ));
    }
    if let Some(rule) = &validation.min {
        rules.push((ConstraintRule::Min(rule.min.unwrap_or(i64::MIN)), rule));
    }
    if let Some(rule) = &validation.max {
        rules.push((ConstraintRule::Max(rule.max.unwrap_or(i64::MAX)), rule));
    }
    if let Some(rule) = &validation.digits {
        rules.push((
            ConstraintRule::Digits {
                integer: rule.integer.unwrap_or(u32::MAX),
                fraction: rule.fraction.unwrap_or(u32::MAX),
            },
            rule,
        ));
    }
    rules
        .into_iter()
        .map(|(rule, declared)| {
            let mut constraint = Constraint::new(property, rule).in_groups(&groups);
            constraint.message = declared.message.clone();
            constraint
        })
        .collect()
}

fn annotate(validation: &mut Validation, constraint: &Constraint) {
    let mut rule = ValidationRule {
        message: Some(message_of(constraint)),
        ..ValidationRule::default()
    };
    let slot = match &constraint.rule {
        ConstraintRule::NotNull => &mut validation.not_null,
        ConstraintRule::Size { min, max } => {
            rule.min = *min;
            rule.max = *max;
            &mut validation.size
        }
        ConstraintRule::Pattern(regexp) => {
            rule.regexp = Some(regexp.clone());
            &mut validation.pattern
        }
        ConstraintRule::Min(min) => {
            rule.min = Some(*min);
            &mut validation.min
        }
        ConstraintRule::Max(max) => {
            rule.max = Some(*max);
            &mut validation.max
        }
        ConstraintRule::Digits { integer, fraction } => {
            rule.integer = Some(*integer);
            rule.fraction = Some(*fraction);
            &mut validation.digits
        }
    };
    if slot.is_none() {
        *slot = Some(rule);
    }
}

fn message_of(constraint: &Constraint) -> String {
    if let Some(message) = &constraint.message {
        return message.clone();
    }
    match &constraint.rule {
        ConstraintRule::NotNull => "must not be null".to_string(),
        ConstraintRule::Size { min, max } => format!(
            "size must be between {} and {}",
            min.unwrap_or(0),
            max.map(|max| max.to_string())
                .unwrap_or_else(|| "unbounded".to_string())
        ),
        ConstraintRule::Pattern(regexp) => format!("must match \"{}\"", regexp),
        ConstraintRule::Min(min) => format!("must be greater than or equal to {}", min),
        ConstraintRule::Max(max) => format!("must be less than or equal to {}", max),
        ConstraintRule::Digits { integer, fraction } => format!(
            "numeric value out of bounds (<{} digits>.<{} digits> expected)",
            integer, fraction
        ),
    }
}

/// 返回失败消息；null 值只违反 NotNull。
fn check(constraint: &Constraint, value: &Value) -> Option<String> {
    let valid = match (&constraint.rule, value) {
        (ConstraintRule::NotNull, value) => !value.is_null(),
        (_, Value::Null) => true,
        (ConstraintRule::Size { min, max }, value) => {
            let size = match value {
                Value::Text(text) => text.chars().count() as i64,
                Value::List(items) => items.len() as i64,
                other => other.to_string().chars().count() as i64,
            };
            min.is_none_or(|min| size >= min) && max.is_none_or(|max| size <= max)
        }
        (ConstraintRule::Pattern(regexp), value) => {
            match Regex::new(&format!("^(?:{})$", regexp)) {
                Ok(pattern) => pattern.is_match(&value.to_string()),
                Err(err) => {
                    warn!(
                        target: "appng.binding",
                        property = %constraint.property,
                        error = %err,
                        "invalid_constraint_pattern"
                    );
                    true
                }
            }
        }
        (ConstraintRule::Min(min), value) => value.as_f64().is_none_or(|n| n >= *min as f64),
        (ConstraintRule::Max(max), value) => value.as_f64().is_none_or(|n| n <= *max as f64),
        (ConstraintRule::Digits { integer, fraction }, value) => {
            let text = value.to_string();
            let unsigned = text.trim_start_matches('-');
            let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
            int_part.len() as u32 <= *integer && frac_part.len() as u32 <= *fraction
        }
    };
    if valid {
        None
    } else {
        Some(message_of(constraint))
    }
}
