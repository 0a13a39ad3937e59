use crate::ExpressionError;
use crate::lexer::{Token, tokenize};
use domain::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// 语法树。
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// 表达式引用的根变量名（去重，按出现顺序）。
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(name) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Expr::Member(target, _) => target.collect_variables(names),
            Expr::Index(target, index) => {
                target.collect_variables(names);
                index.collect_variables(names);
            }
            Expr::Unary(_, operand) => operand.collect_variables(names),
            Expr::Binary(_, left, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::Ternary(condition, then, otherwise) => {
                condition.collect_variables(names);
                then.collect_variables(names);
                otherwise.collect_variables(names);
            }
        }
    }
}

/// 解析表达式；可带或不带 `${}` 外壳。
pub fn parse(expression: &str) -> Result<Expr, ExpressionError> {
    let source = crate::strip_wrapper(expression);
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExpressionError::Syntax {
            expression: expression.to_string(),
            message: "empty expression".to_string(),
        });
    }
    let mut parser = Parser {
        source: expression,
        tokens,
        position: 0,
    };
    let expr = parser.ternary()?;
    if parser.position < parser.tokens.len() {
        return Err(parser.error(format!(
            "unexpected token {:?}",
            parser.tokens[parser.position]
        )));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn error(&self, message: String) -> ExpressionError {
        ExpressionError::Syntax {
            expression: self.source.to_string(),
            message,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {:?}, found {:?}", expected, token))),
            None => Err(self.error(format!("expected {:?}, found end of input", expected))),
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExpressionError> {
        let condition = self.or()?;
        if self.peek() == Some(&Token::Question) {
            self.advance();
            let then = self.ternary()?;
            self.expect(Token::Colon)?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    fn or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.equality()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.equality()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Empty) => UnaryOp::Empty,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> Result<Expr, ExpressionError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    match self.advance() {
                        Some(Token::Ident(name)) => expr = Expr::Member(Box::new(expr), name),
                        Some(token) => {
                            return Err(self.error(format!(
                                "expected property name after '.', found {:?}",
                                token
                            )));
                        }
                        None => return Err(self.error("expected property name after '.'".into())),
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.ternary()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.advance() {
            Some(Token::Int(value)) => Ok(Expr::Literal(Value::Int(value))),
            Some(Token::Decimal(value)) => Ok(Expr::Literal(Value::Decimal(value))),
            Some(Token::Str(value)) => Ok(Expr::Literal(Value::Text(value))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                let expr = self.ternary()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(token) => Err(self.error(format!("unexpected token {:?}", token))),
            None => Err(self.error("unexpected end of input".to_string())),
        }
    }
}
