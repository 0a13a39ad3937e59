use crate::ExpressionError;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

/// 占位符替换。
///
/// 每个实例持有按前后缀编译的正则；未知参数替换为空串，
/// 参数值按字面插入（值中的 `$` 不会被当作反向引用）。
#[derive(Debug, Clone)]
pub struct ParameterSupport {
    prefix: String,
    suffix: String,
    pattern: Regex,
    parameters: BTreeMap<String, String>,
}

impl ParameterSupport {
    pub fn new(
        prefix: &str,
        suffix: &str,
        parameters: BTreeMap<String, String>,
    ) -> Result<Self, ExpressionError> {
        let pattern = Regex::new(&format!(
            "{}(.+?){}",
            regex::escape(prefix),
            regex::escape(suffix)
        ))
        .map_err(|err| ExpressionError::Pattern(err.to_string()))?;
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            pattern,
            parameters,
        })
    }

    /// `${name}` 形式。
    pub fn dollar(parameters: BTreeMap<String, String>) -> Result<Self, ExpressionError> {
        Self::new("${", "}", parameters)
    }

    /// `#{name}` 形式（字段引用）。
    pub fn hash(parameters: BTreeMap<String, String>) -> Result<Self, ExpressionError> {
        Self::new("#{", "}", parameters)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    /// 替换全部占位符。
    pub fn replace(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |captures: &Captures| {
                self.parameters
                    .get(captures[1].trim())
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }

    /// 文本中出现的占位符名称（按出现顺序，去重）。
    pub fn placeholder_names(&self, text: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for captures in self.pattern.captures_iter(text) {
            let name = captures[1].trim().to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn contains_placeholder(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters() -> BTreeMap<String, String> {
        let mut parameters = BTreeMap::new();
        parameters.insert("id".to_string(), "7".to_string());
        parameters.insert("price".to_string(), "$1.50".to_string());
        parameters
    }

    #[test]
    fn replaces_known_and_blanks_unknown() {
        let support = ParameterSupport::dollar(parameters()).expect("support");
        assert_eq!(support.replace("/edit/${id}/${unknown}"), "/edit/7/");
    }

    #[test]
    fn dollar_in_value_is_literal() {
        let support = ParameterSupport::dollar(parameters()).expect("support");
        assert_eq!(support.replace("cost: ${price}"), "cost: $1.50");
    }

    #[test]
    fn hash_prefix_leaves_dollar_placeholders() {
        let support = ParameterSupport::hash(parameters()).expect("support");
        assert_eq!(support.replace("#{id}-${id}"), "7-${id}");
        assert_eq!(support.placeholder_names("#{id} #{name} #{id}"), vec!["id", "name"]);
    }
}
