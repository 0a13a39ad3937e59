use crate::ExpressionError;
use crate::parser::{BinaryOp, Expr, UnaryOp, parse};
use domain::{Instance, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::warn;

/// 表达式求值器。
///
/// 变量表中的参数均以文本保存，比较时按数值/布尔自动转换。
/// 严格模式下引用未定义变量返回 `UnresolvedVariable`，宽松模式视为 null。
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    variables: BTreeMap<String, Value>,
    strict: bool,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 严格模式（配置校验使用）。
    pub fn strict() -> Self {
        Self {
            variables: BTreeMap::new(),
            strict: true,
        }
    }

    /// 以参数表作为顶层变量。
    pub fn with_parameters(parameters: &BTreeMap<String, String>) -> Self {
        let mut evaluator = Self::new();
        for (name, value) in parameters {
            evaluator.set_variable(name, Value::Text(value.clone()));
        }
        evaluator
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// 以 map 形式注册变量（`SESSION['key']` / `PLATFORM.key`）。
    pub fn set_map(&mut self, name: &str, entries: &BTreeMap<String, String>) {
        let mut instance = Instance::new(name);
        for (key, value) in entries {
            instance
                .properties
                .insert(key.clone(), Value::Text(value.clone()));
        }
        self.set_variable(name, Value::Object(instance));
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn evaluate(&self, expression: &str) -> Result<Value, ExpressionError> {
        let expr = parse(expression)?;
        self.eval(&expr)
    }

    pub fn evaluate_bool(&self, expression: &str) -> Result<bool, ExpressionError> {
        self.evaluate(expression).map(|value| truthy(&value))
    }

    /// 宽松布尔求值：出错时记录警告并返回 false。
    pub fn is_true(&self, expression: &str) -> bool {
        match self.evaluate_bool(expression) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    target: "appng.expression",
                    expression = %expression,
                    error = %err,
                    "expression_evaluation_failed"
                );
                false
            }
        }
    }

    /// 替换文本中所有 `${...}` 片段为求值结果。
    pub fn evaluate_template(&self, text: &str) -> Result<String, ExpressionError> {
        let mut output = String::new();
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let tail = &rest[start..];
            let Some(end) = closing_brace(tail) else {
                return Err(ExpressionError::Syntax {
                    expression: text.to_string(),
                    message: "unterminated ${".to_string(),
                });
            };
            let value = self.evaluate(&tail[..=end])?;
            output.push_str(&value.to_string());
            rest = &tail[end + 1..];
        }
        output.push_str(rest);
        Ok(output)
    }

    fn eval(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => match self.variables.get(name) {
                Some(value) => Ok(value.clone()),
                None if self.strict => Err(ExpressionError::UnresolvedVariable(name.clone())),
                None => Ok(Value::Null),
            },
            Expr::Member(target, name) => {
                let target = self.eval(target)?;
                Ok(member(&target, name))
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                Ok(match (&target, &index) {
                    (Value::Object(_), key) => member(&target, &key.to_string()),
                    (Value::List(items), position) => position
                        .as_i64()
                        .and_then(|position| usize::try_from(position).ok())
                        .and_then(|position| items.get(position).cloned())
                        .unwrap_or(Value::Null),
                    _ => Value::Null,
                })
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                    UnaryOp::Empty => Ok(Value::Bool(value.is_empty())),
                    UnaryOp::Negate => match value {
                        Value::Int(number) => Ok(Value::Int(-number)),
                        other => to_number(&other)
                            .map(|number| Value::Decimal(-number))
                            .ok_or_else(|| {
                                ExpressionError::Type(format!("cannot negate '{}'", other))
                            }),
                    },
                }
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                if !truthy(&self.eval(left)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(truthy(&self.eval(right)?)))
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                if truthy(&self.eval(left)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(truthy(&self.eval(right)?)))
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right)
            }
            Expr::Ternary(condition, then, otherwise) => {
                if truthy(&self.eval(condition)?) {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }
}

fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (index, ch) in text.char_indices().skip(1) {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn member(target: &Value, name: &str) -> Value {
    match target {
        Value::Object(instance) => instance
            .properties
            .get(name)
            .cloned()
            .unwrap_or(Value::Null),
        Value::List(items) if name == "size" => Value::Int(items.len() as i64),
        _ => Value::Null,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(value) => *value,
        Value::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        other => other.as_f64(),
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Decimal(_))
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, Value::Text(text)) | (Value::Text(text), Value::Null) => text.is_empty(),
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => other.as_bool() == Some(*flag),
        _ if is_numeric(left) || is_numeric(right) => {
            match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        (Value::Text(a), Value::Text(b)) => a == b,
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if is_numeric(left) || is_numeric(right) {
        let a = to_number(left)?;
        let b = to_number(right)?;
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Text(b)) => Some("".cmp(b.as_str())),
        (Value::Text(a), Value::Null) => Some(a.as_str().cmp("")),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Null => Some(0),
        Value::Int(number) => Some(*number),
        Value::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
    let relational = |accept: fn(Ordering) -> bool| -> Result<Value, ExpressionError> {
        Ok(Value::Bool(compare(left, right).is_some_and(accept)))
    };
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(left, right))),
        BinaryOp::Lt => relational(|ordering| ordering == Ordering::Less),
        BinaryOp::Gt => relational(|ordering| ordering == Ordering::Greater),
        BinaryOp::Le => relational(|ordering| ordering != Ordering::Greater),
        BinaryOp::Ge => relational(|ordering| ordering != Ordering::Less),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Mod => {
            if let (Some(a), Some(b)) = (as_integer(left), as_integer(right)) {
                let result = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    _ => a.checked_rem(b),
                };
                return result.map(Value::Int).ok_or_else(|| {
                    ExpressionError::Type(format!("arithmetic overflow or division by zero: {} {:?} {}", a, op, b))
                });
            }
            let (Some(a), Some(b)) = (to_number(left), to_number(right)) else {
                return Err(ExpressionError::Type(format!(
                    "non-numeric operands '{}' and '{}'",
                    left, right
                )));
            };
            Ok(Value::Decimal(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a % b,
            }))
        }
        BinaryOp::Div => {
            let (Some(a), Some(b)) = (to_number(left), to_number(right)) else {
                return Err(ExpressionError::Type(format!(
                    "non-numeric operands '{}' and '{}'",
                    left, right
                )));
            };
            Ok(Value::Decimal(a / b))
        }
        BinaryOp::And => Ok(Value::Bool(truthy(left) && truthy(right))),
        BinaryOp::Or => Ok(Value::Bool(truthy(left) || truthy(right))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_operators_on_evaluated_operands() {
        let yes = Value::Bool(true);
        let no = Value::Bool(false);
        assert_eq!(binary(BinaryOp::Or, &no, &yes).expect("or"), Value::Bool(true));
        assert_eq!(binary(BinaryOp::Or, &no, &no).expect("or"), Value::Bool(false));
        assert_eq!(binary(BinaryOp::And, &yes, &no).expect("and"), Value::Bool(false));
        assert_eq!(binary(BinaryOp::And, &yes, &yes).expect("and"), Value::Bool(true));
    }

    fn evaluator() -> ExpressionEvaluator {
        let mut parameters = BTreeMap::new();
        parameters.insert("id".to_string(), "5".to_string());
        parameters.insert("action".to_string(), "edit".to_string());
        parameters.insert("flag".to_string(), "true".to_string());
        ExpressionEvaluator::with_parameters(&parameters)
    }

    #[test]
    fn text_parameters_compare_numerically() {
        let evaluator = evaluator();
        assert!(evaluator.is_true("${id eq 5}"));
        assert!(evaluator.is_true("${id > 3 and id lt 10}"));
        assert!(evaluator.is_true("${action == 'edit'}"));
        assert!(evaluator.is_true("${flag}"));
        assert!(!evaluator.is_true("${not flag}"));
    }

    #[test]
    fn empty_and_missing_values() {
        let evaluator = evaluator();
        assert!(evaluator.is_true("${empty missing}"));
        assert!(evaluator.is_true("${not empty id}"));
        assert!(evaluator.is_true("${missing eq null}"));
    }

    #[test]
    fn strict_mode_reports_unresolved_variable() {
        let evaluator = ExpressionEvaluator::strict();
        assert_eq!(
            evaluator.evaluate("${foo eq 1}"),
            Err(ExpressionError::UnresolvedVariable("foo".to_string()))
        );
    }

    #[test]
    fn member_and_index_access() {
        let mut evaluator = ExpressionEvaluator::new();
        let person = Instance::new("Person")
            .with("name", "John")
            .with("address", Instance::new("Address").with("city", "Berlin"));
        evaluator.set_variable("current", Value::Object(person));
        let mut session = BTreeMap::new();
        session.insert("lang".to_string(), "de".to_string());
        evaluator.set_map("SESSION", &session);

        assert!(evaluator.is_true("${current.address.city eq 'Berlin'}"));
        assert!(evaluator.is_true("${SESSION['lang'] eq 'de'}"));
        assert_eq!(
            evaluator.evaluate("${current.name}").expect("value"),
            Value::from("John")
        );
    }

    #[test]
    fn arithmetic_and_ternary() {
        let evaluator = evaluator();
        assert_eq!(evaluator.evaluate("${id + 1}").expect("value"), Value::Int(6));
        assert_eq!(evaluator.evaluate("${id mod 2}").expect("value"), Value::Int(1));
        assert_eq!(evaluator.evaluate("${10 div 4}").expect("value"), Value::Decimal(2.5));
        assert_eq!(
            evaluator.evaluate("${id gt 1 ? 'big' : 'small'}").expect("value"),
            Value::from("big")
        );
    }

    #[test]
    fn template_replaces_each_fragment() {
        let evaluator = evaluator();
        assert_eq!(
            evaluator.evaluate_template("/edit/${id}?mode=${action}").expect("template"),
            "/edit/5?mode=edit"
        );
    }
}
