//! 多语言消息与标签解析。

use appng_expression::{ExpressionEvaluator, ParameterSupport};
use appng_schema::Label;
use std::collections::BTreeMap;
use tracing::debug;

/// 引擎自身使用的消息键。
pub const INTERNAL_ERROR: &str = "internal.error";
pub const BACKGROUND_TASK_STARTED: &str = "backgroundTask.started";
pub const BACKGROUND_TASK_FINISHED: &str = "backgroundTask.finished";
pub const BACKGROUND_TASK_ERROR: &str = "backgroundTask.error";
pub const INVALID_VALUE: &str = "invalid.value";

/// 内置英文文本，应用未提供时使用。
fn builtin_message(key: &str) -> Option<&'static str> {
    match key {
        INTERNAL_ERROR => Some("An internal error occurred, error ID: {0}"),
        BACKGROUND_TASK_STARTED => Some("The task has been started in the background."),
        BACKGROUND_TASK_FINISHED => Some("The background task has finished."),
        BACKGROUND_TASK_ERROR => Some("The background task failed, error ID: {0}"),
        INVALID_VALUE => Some("Invalid value '{0}'"),
        _ => None,
    }
}

/// 消息来源。
pub trait MessageSource: Send + Sync {
    /// 查找并格式化消息；未定义时返回 `None`。
    fn message(&self, key: &str, args: &[String], locale: &str) -> Option<String>;
}

/// 用位置参数替换 `{0}`、`{1}` …
pub fn format_message(pattern: &str, args: &[String]) -> String {
    let mut text = pattern.to_string();
    for (index, arg) in args.iter().enumerate() {
        text = text.replace(&format!("{{{}}}", index), arg);
    }
    text
}

/// 内存消息包。
///
/// 查找顺序：完整 locale（`de_DE`）→ 语言（`de`）→ 根包（空 locale）。
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageSource {
    bundles: BTreeMap<String, BTreeMap<String, String>>,
}

impl InMemoryMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(
        mut self,
        locale: &str,
        key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.add_message(locale, key, text);
        self
    }

    pub fn add_message(&mut self, locale: &str, key: impl Into<String>, text: impl Into<String>) {
        self.bundles
            .entry(locale.to_string())
            .or_default()
            .insert(key.into(), text.into());
    }

    fn lookup(&self, key: &str, locale: &str) -> Option<&String> {
        let mut candidates = vec![locale.to_string()];
        if let Some((language, _)) = locale.split_once(['_', '-']) {
            candidates.push(language.to_string());
        }
        candidates.push(String::new());
        candidates
            .iter()
            .find_map(|candidate| self.bundles.get(candidate).and_then(|bundle| bundle.get(key)))
    }
}

impl MessageSource for InMemoryMessageSource {
    fn message(&self, key: &str, args: &[String], locale: &str) -> Option<String> {
        self.lookup(key, locale)
            .map(|pattern| format_message(pattern, args))
    }
}

/// 标签解析：表达式值或消息包查找。
pub struct LabelSupport<'a> {
    source: &'a dyn MessageSource,
    locale: &'a str,
    evaluator: &'a ExpressionEvaluator,
    field_parameters: Option<&'a ParameterSupport>,
}

impl<'a> LabelSupport<'a> {
    pub fn new(
        source: &'a dyn MessageSource,
        locale: &'a str,
        evaluator: &'a ExpressionEvaluator,
    ) -> Self {
        Self {
            source,
            locale,
            evaluator,
            field_parameters: None,
        }
    }

    /// 启用 `#{field}` 形式的参数。
    pub fn with_field_parameters(mut self, field_parameters: &'a ParameterSupport) -> Self {
        self.field_parameters = Some(field_parameters);
        self
    }

    /// 带内置文本回退的消息查找。
    pub fn localize(&self, key: &str, args: &[String]) -> String {
        localize(self.source, self.locale, key, args)
    }

    /// 解析单个标签的显示值。
    pub fn set_label(&self, label: &mut Label) {
        if label.value.starts_with('$') {
            match self.evaluator.evaluate_template(&label.value) {
                Ok(value) => label.value = value,
                Err(err) => debug!(
                    target: "appng.engine",
                    label = %label.id,
                    error = %err,
                    "label_expression_failed"
                ),
            }
            return;
        }
        if label.id.is_empty() {
            return;
        }
        let args = self.arguments(label.params.as_deref().unwrap_or(""));
        match self.source.message(&label.id, &args, self.locale) {
            Some(text) => label.value = text,
            None => {
                debug!(
                    target: "appng.engine",
                    key = %label.id,
                    locale = %self.locale,
                    "message_key_missing"
                );
                if label.value.is_empty() {
                    label.value = label.id.clone();
                }
            }
        }
    }

    pub fn set_labels(&self, labels: &mut [Label]) {
        for label in labels {
            self.set_label(label);
        }
    }

    fn arguments(&self, params: &str) -> Vec<String> {
        split_arguments(params)
            .into_iter()
            .map(str::trim)
            .filter(|param| !param.is_empty())
            .map(|param| self.argument(param))
            .collect()
    }

    fn argument(&self, param: &str) -> String {
        if param.starts_with("#{") {
            return match self.field_parameters {
                Some(parameters) => parameters.replace(param),
                None => param.to_string(),
            };
        }
        if param.starts_with("${") {
            let has_current = self
                .evaluator
                .variable("current")
                .is_some_and(|current| !current.is_null());
            if param.contains("current") && !has_current {
                return param.to_string();
            }
            return self
                .evaluator
                .evaluate_template(param)
                .unwrap_or_else(|_| param.to_string());
        }
        if param.len() >= 2 && param.starts_with('\'') && param.ends_with('\'') {
            return param[1..param.len() - 1].to_string();
        }
        param.to_string()
    }
}

/// 按逗号拆分标签参数；引号内与 `{}` 内的逗号不拆分。
fn split_arguments(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in params.char_indices() {
        match ch {
            '\'' => quoted = !quoted,
            '{' if !quoted => depth += 1,
            '}' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                parts.push(&params[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

/// 查找消息；应用包没有时回退到内置文本，再回退到键本身。
pub fn localize(source: &dyn MessageSource, locale: &str, key: &str, args: &[String]) -> String {
    source
        .message(key, args, locale)
        .or_else(|| builtin_message(key).map(|pattern| format_message(pattern, args)))
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Instance, Value};

    fn source() -> InMemoryMessageSource {
        InMemoryMessageSource::new()
            .with_message("", "greeting", "Hello {0}, you are {1}")
            .with_message("de", "greeting", "Hallo {0}, du bist {1}")
            .with_message("", "plain", "Plain")
    }

    #[test]
    fn locale_falls_back_to_language_and_root() {
        let source = source();
        let args = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            source.message("greeting", &args, "de_DE").as_deref(),
            Some("Hallo a, du bist b")
        );
        assert_eq!(
            source.message("greeting", &args, "fr").as_deref(),
            Some("Hello a, you are b")
        );
        assert!(source.message("missing", &args, "en").is_none());
    }

    #[test]
    fn label_arguments_are_resolved() {
        let source = source();
        let mut evaluator = ExpressionEvaluator::new();
        evaluator.set_variable("current", Value::Object(Instance::new("Person").with("age", 42)));
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), "Jane".to_string());
        let field_parameters = ParameterSupport::hash(fields).expect("pattern");
        let support =
            LabelSupport::new(&source, "en", &evaluator).with_field_parameters(&field_parameters);

        let mut label = Label::new("greeting").with_params("#{name},${current.age}");
        support.set_label(&mut label);
        assert_eq!(label.value, "Hello Jane, you are 42");

        let mut quoted = Label::new("greeting").with_params("'x', 'y'");
        support.set_label(&mut quoted);
        assert_eq!(quoted.value, "Hello x, you are y");
    }

    #[test]
    fn quoted_commas_stay_in_one_argument() {
        assert_eq!(
            split_arguments("'a, b', ${x eq 'c, d'},#{name}"),
            vec!["'a, b'", " ${x eq 'c, d'}", "#{name}"]
        );
        let source = source();
        let evaluator = ExpressionEvaluator::new();
        let support = LabelSupport::new(&source, "en", &evaluator);
        let mut label = Label::new("greeting").with_params("'a, b', 'c'");
        support.set_label(&mut label);
        assert_eq!(label.value, "Hello a, b, you are c");
    }

    #[test]
    fn current_arguments_are_skipped_without_current() {
        let source = source();
        let evaluator = ExpressionEvaluator::new();
        let support = LabelSupport::new(&source, "en", &evaluator);
        let mut label = Label::new("greeting").with_params("'x',${current.age}");
        support.set_label(&mut label);
        assert_eq!(label.value, "Hello x, you are ${current.age}");
    }

    #[test]
    fn expression_labels_and_missing_keys() {
        let source = source();
        let mut parameters = BTreeMap::new();
        parameters.insert("name".to_string(), "Jane".to_string());
        let evaluator = ExpressionEvaluator::with_parameters(&parameters);
        let support = LabelSupport::new(&source, "en", &evaluator);

        let mut expression = Label::default().with_value("${name}");
        support.set_label(&mut expression);
        assert_eq!(expression.value, "Jane");

        let mut missing = Label::new("unknown.key");
        support.set_label(&mut missing);
        assert_eq!(missing.value, "unknown.key");

        assert_eq!(
            support.localize(INTERNAL_ERROR, &["7".to_string()]),
            "An internal error occurred, error ID: 7"
        );
    }
}
