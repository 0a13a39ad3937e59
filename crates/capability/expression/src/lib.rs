//! `${...}` 表达式语言与占位符替换。
//!
//! - `lexer` / `parser`：把表达式解析为语法树
//! - `evaluator`：基于变量表求值（严格模式报告未解析变量）
//! - `parameters`：前后缀可配置的占位符替换

mod evaluator;
mod lexer;
mod parameters;
mod parser;

pub use evaluator::ExpressionEvaluator;
pub use parameters::ParameterSupport;
pub use parser::{BinaryOp, Expr, UnaryOp, parse};

/// 表达式错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("syntax error in '{expression}': {message}")]
    Syntax { expression: String, message: String },
    #[error("unresolved variable: {0}")]
    UnresolvedVariable(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("invalid placeholder pattern: {0}")]
    Pattern(String),
}

/// 去掉外层 `${` `}`；不是完整包裹时原样返回。
pub fn strip_wrapper(expression: &str) -> &str {
    let trimmed = expression.trim();
    if trimmed.starts_with("${") && trimmed.ends_with('}') && is_single_wrapper(trimmed) {
        &trimmed[2..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// 判断字符串是否恰好是一个 `${...}`（外层括号配对到末尾）。
fn is_single_wrapper(text: &str) -> bool {
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
                    return index == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_full_wrapper() {
        assert_eq!(strip_wrapper("${a eq 1}"), "a eq 1");
        assert_eq!(strip_wrapper("  a eq 1 "), "a eq 1");
        assert_eq!(strip_wrapper("${a} and ${b}"), "${a} and ${b}");
    }
}
