use crate::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Decimal(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Question,
    Colon,
    Not,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Empty,
}

pub(crate) fn tokenize(expression: &str) -> Result<Vec<Token>, ExpressionError> {
    let syntax = |message: String| ExpressionError::Syntax {
        expression: expression.to_string(),
        message,
    };
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        if ch.is_whitespace() {
            index += 1;
            continue;
        }
        if ch.is_ascii_digit() {
            let start = index;
            let mut is_decimal = false;
            while index < chars.len()
                && (chars[index].is_ascii_digit()
                    || (chars[index] == '.'
                        && !is_decimal
                        && chars.get(index + 1).is_some_and(|next| next.is_ascii_digit())))
            {
                if chars[index] == '.' {
                    is_decimal = true;
                }
                index += 1;
            }
            let text: String = chars[start..index].iter().collect();
            let token = if is_decimal {
                text.parse::<f64>()
                    .map(Token::Decimal)
                    .map_err(|err| syntax(err.to_string()))?
            } else {
                text.parse::<i64>()
                    .map(Token::Int)
                    .map_err(|err| syntax(err.to_string()))?
            };
            tokens.push(token);
            continue;
        }
        if ch == '\'' || ch == '"' {
            let quote = ch;
            index += 1;
            let mut value = String::new();
            let mut closed = false;
            while index < chars.len() {
                let current = chars[index];
                if current == '\\' && index + 1 < chars.len() {
                    value.push(chars[index + 1]);
                    index += 2;
                    continue;
                }
                if current == quote {
                    closed = true;
                    index += 1;
                    break;
                }
                value.push(current);
                index += 1;
            }
            if !closed {
                return Err(syntax("unterminated string literal".to_string()));
            }
            tokens.push(Token::Str(value));
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let start = index;
            while index < chars.len()
                && (chars[index].is_alphanumeric() || chars[index] == '_' || chars[index] == '$')
            {
                index += 1;
            }
            let word: String = chars[start..index].iter().collect();
            tokens.push(match word.as_str() {
                "true" => Token::True,
                "false" => Token::False,
                "null" => Token::Null,
                "not" => Token::Not,
                "and" => Token::And,
                "or" => Token::Or,
                "eq" => Token::Eq,
                "ne" => Token::Ne,
                "lt" => Token::Lt,
                "gt" => Token::Gt,
                "le" => Token::Le,
                "ge" => Token::Ge,
                "div" => Token::Slash,
                "mod" => Token::Percent,
                "empty" => Token::Empty,
                _ => Token::Ident(word),
            });
            continue;
        }

        let next = chars.get(index + 1).copied();
        let (token, width) = match (ch, next) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('!', _) => (Token::Not, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('.', _) => (Token::Dot, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('?', _) => (Token::Question, 1),
            (':', _) => (Token::Colon, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            _ => return Err(syntax(format!("unexpected character '{}'", ch))),
        };
        tokens.push(token);
        index += width;
    }
    Ok(tokens)
}
