use crate::BindingError;
use crate::descriptor::PropertyKind;
use appng_schema::{FieldDef, FieldType};
use domain::Value;

fn conversion_error(field: &str, value: &Value, expected: impl ToString) -> BindingError {
    BindingError::Conversion {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim() {
        "true" | "on" | "1" => Some(true),
        "false" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

/// 将请求参数原始值按字段类型转换。
///
/// 空输入得到 Null；checkbox 缺省为 false；多值字段得到 List。
pub fn convert_field_value(field: &FieldDef, raw: &[String]) -> Result<Value, BindingError> {
    let field_type = field.field_type;
    if field_type.is_multi_valued() {
        let items = raw
            .iter()
            .filter(|value| !value.is_empty())
            .map(|value| convert_single(field, value))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::List(items));
    }
    if field_type == FieldType::Checkbox {
        let flag = raw.first().map(String::as_str).unwrap_or("");
        return parse_flag(flag)
            .map(Value::Bool)
            .ok_or_else(|| conversion_error(&field.name, &Value::from(flag), "boolean"));
    }
    match raw.first() {
        None => Ok(Value::Null),
        Some(value) if value.is_empty() => Ok(Value::Null),
        Some(value) => convert_single(field, value),
    }
}

fn convert_single(field: &FieldDef, raw: &str) -> Result<Value, BindingError> {
    let trimmed = raw.trim();
    match field.field_type {
        FieldType::Int | FieldType::Long => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| conversion_error(&field.name, &Value::from(raw), "integer")),
        FieldType::Decimal => trimmed
            .replace(',', "")
            .parse::<f64>()
            .map(Value::Decimal)
            .map_err(|_| conversion_error(&field.name, &Value::from(raw), "decimal")),
        FieldType::Object | FieldType::ListObject | FieldType::Linkpanel => Ok(Value::Null),
        _ => Ok(Value::from(raw)),
    }
}

/// 按字段类型与格式输出展示字符串。
pub fn format_value(field: &FieldDef, value: &Value) -> String {
    match (field.field_type, value) {
        (_, Value::Null) => String::new(),
        (FieldType::Decimal, _) => match value.as_f64() {
            Some(number) => format_decimal(number, field.format.as_deref()),
            None => value.to_string(),
        },
        (FieldType::Checkbox, _) => value.as_bool().unwrap_or(false).to_string(),
        (_, Value::List(items)) => items
            .iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join(","),
        _ => value.to_string(),
    }
}

/// 小数位数取格式中 `.` 之后的位数（如 `#,##0.00`）。
fn format_decimal(number: f64, format: Option<&str>) -> String {
    match format.and_then(|pattern| pattern.split_once('.')) {
        Some((_, fraction)) => format!("{:.*}", fraction.len(), number),
        None => number.to_string(),
    }
}

/// 将任意值转换为属性声明类型。
pub fn coerce(field: &str, kind: &PropertyKind, value: Value) -> Result<Value, BindingError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match kind {
        PropertyKind::Text | PropertyKind::Date => match value {
            Value::Object(_) => Err(conversion_error(field, &value, kind)),
            Value::Text(_) => Ok(value),
            other => Ok(Value::Text(other.to_string())),
        },
        PropertyKind::Int => match &value {
            Value::Text(text) if text.trim().is_empty() => Ok(Value::Null),
            _ => value
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| conversion_error(field, &value, kind)),
        },
        PropertyKind::Decimal => match &value {
            Value::Text(text) if text.trim().is_empty() => Ok(Value::Null),
            _ => value
                .as_f64()
                .map(Value::Decimal)
                .ok_or_else(|| conversion_error(field, &value, kind)),
        },
        PropertyKind::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::Text(text) => parse_flag(text)
                .map(Value::Bool)
                .ok_or_else(|| conversion_error(field, &value, kind)),
            Value::Int(number) => Ok(Value::Bool(*number != 0)),
            _ => Err(conversion_error(field, &value, kind)),
        },
        PropertyKind::List(inner) => {
            let items = match value {
                Value::List(items) => items,
                single => vec![single],
            };
            items
                .into_iter()
                .map(|item| coerce(field, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        PropertyKind::Object(_) => match value {
            Value::Object(_) => Ok(value),
            other => Err(conversion_error(field, &other, kind)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn empty_input_becomes_null() {
        let field = FieldDef::new("age", FieldType::Int);
        assert_eq!(convert_field_value(&field, &raw(&[""])), Ok(Value::Null));
        assert_eq!(convert_field_value(&field, &[]), Ok(Value::Null));
        assert_eq!(convert_field_value(&field, &raw(&["42"])), Ok(Value::Int(42)));
    }

    #[test]
    fn invalid_number_is_reported() {
        let field = FieldDef::new("age", FieldType::Int);
        assert!(matches!(
            convert_field_value(&field, &raw(&["abc"])),
            Err(BindingError::Conversion { .. })
        ));
    }

    #[test]
    fn checkbox_defaults_to_false() {
        let field = FieldDef::new("active", FieldType::Checkbox);
        assert_eq!(convert_field_value(&field, &[]), Ok(Value::Bool(false)));
        assert_eq!(convert_field_value(&field, &raw(&["on"])), Ok(Value::Bool(true)));
    }

    #[test]
    fn multi_valued_fields_collect_lists() {
        let field = FieldDef::new("tags", FieldType::ListCheckbox);
        assert_eq!(
            convert_field_value(&field, &raw(&["a", "", "b"])),
            Ok(Value::List(vec![Value::from("a"), Value::from("b")]))
        );
        let radio = FieldDef::new("kind", FieldType::ListRadio);
        assert_eq!(convert_field_value(&radio, &raw(&["x"])), Ok(Value::from("x")));
    }

    #[test]
    fn decimal_respects_format() {
        let mut field = FieldDef::new("price", FieldType::Decimal);
        field.format = Some("#,##0.00".to_string());
        assert_eq!(format_value(&field, &Value::Decimal(3.5)), "3.50");
        assert_eq!(format_value(&field, &Value::Null), "");
    }

    #[test]
    fn coerce_follows_property_kind() {
        assert_eq!(coerce("n", &PropertyKind::Int, Value::from("7")), Ok(Value::Int(7)));
        assert_eq!(
            coerce("l", &PropertyKind::list_of(PropertyKind::Int), Value::from("3")),
            Ok(Value::List(vec![Value::Int(3)]))
        );
        assert!(coerce("o", &PropertyKind::object("Address"), Value::from("x")).is_err());
    }
}
