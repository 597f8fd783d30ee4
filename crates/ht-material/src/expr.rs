//! Safe arithmetic expressions in one variable `T` (°C).
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/') unary)*
//! unary := ('-' | '+') unary | power
//! power := atom ('^' unary)?
//! atom  := number | 'T' | 'pi' | 'e' | func '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! Functions: `sqrt exp ln log10 abs min max`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MaterialError, MaterialResult};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Sqrt,
    Exp,
    Ln,
    Log10,
    Abs,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        Some(match name {
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "ln" => Func::Ln,
            "log10" => Func::Log10,
            "abs" => Func::Abs,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Func::Min | Func::Max => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Num(f64),
    Var,
    Neg(Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

impl Node {
    fn eval(&self, t: f64) -> f64 {
        match self {
            Node::Num(v) => *v,
            Node::Var => t,
            Node::Neg(inner) => -inner.eval(t),
            Node::Bin(op, a, b) => {
                let (a, b) = (a.eval(t), b.eval(t));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                    BinOp::Pow => a.powf(b),
                }
            }
            Node::Call(f, args) => {
                let x = args[0].eval(t);
                match f {
                    Func::Sqrt => x.sqrt(),
                    Func::Exp => x.exp(),
                    Func::Ln => x.ln(),
                    Func::Log10 => x.log10(),
                    Func::Abs => x.abs(),
                    Func::Min => x.min(args[1].eval(t)),
                    Func::Max => x.max(args[1].eval(t)),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' | '-' | '*' | '/' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // exponent part: 1e-3, 2.5E+4
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| format!("bad number '{text}'"))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), String> {
        match self.next() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(format!("expected {want:?}, found {tok:?}")),
            None => Err(format!("expected {want:?}, found end of input")),
        }
    }

    fn expr(&mut self) -> Result<Node, String> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            let op = if op == '+' { BinOp::Add } else { BinOp::Sub };
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Node, String> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            let op = if op == '*' { BinOp::Mul } else { BinOp::Div };
            lhs = Node::Bin(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Node, String> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Node::Bin(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Node, String> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Node::Num(v)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "T" => Ok(Node::Var),
                "pi" => Ok(Node::Num(std::f64::consts::PI)),
                "e" => Ok(Node::Num(std::f64::consts::E)),
                _ => {
                    let func =
                        Func::lookup(&name).ok_or_else(|| format!("unknown name '{name}'"))?;
                    self.expect(Token::LParen)?;
                    let mut args = vec![self.expr()?];
                    while let Some(Token::Comma) = self.peek() {
                        self.pos += 1;
                        args.push(self.expr()?);
                    }
                    self.expect(Token::RParen)?;
                    if args.len() != func.arity() {
                        return Err(format!(
                            "'{name}' takes {} argument(s), got {}",
                            func.arity(),
                            args.len()
                        ));
                    }
                    Ok(Node::Call(func, args))
                }
            },
            Some(tok) => Err(format!("unexpected token {tok:?}")),
            None => Err("unexpected end of input".to_string()),
        }
    }
}

/// Parsed expression; serialized as its source text.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> MaterialResult<Self> {
        let fail = |reason: String| MaterialError::Expression {
            expression: source.to_string(),
            reason,
        };
        let tokens = tokenize(source).map_err(fail)?;
        if tokens.is_empty() {
            return Err(fail("empty expression".to_string()));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.expr().map_err(fail)?;
        if let Some(tok) = parser.peek() {
            return Err(fail(format!("trailing input at {tok:?}")));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn eval(&self, t_c: f64) -> f64 {
        self.root.eval(t_c)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({:?})", self.source)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<String> for Expression {
    type Error = MaterialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Expression::parse(&value)
    }
}

impl From<Expression> for String {
    fn from(value: Expression) -> Self {
        value.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, t: f64) -> f64 {
        Expression::parse(src).unwrap().eval(t)
    }

    #[test]
    fn linear_conductivity() {
        assert!((eval("42.5 - 0.015*T", 100.0) - 41.0).abs() < 1e-12);
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("2 + 3 * 4", 0.0), 14.0);
        assert_eq!(eval("(2 + 3) * 4", 0.0), 20.0);
        assert_eq!(eval("2 ^ 3 ^ 2", 0.0), 512.0);
        assert_eq!(eval("-2 ^ 2", 0.0), -4.0);
        assert_eq!(eval("10 - 4 - 3", 0.0), 3.0);
        assert_eq!(eval("8 / 4 / 2", 0.0), 1.0);
    }

    #[test]
    fn scientific_notation_and_functions() {
        assert!((eval("450 + 2.5e-1*T", 100.0) - 475.0).abs() < 1e-12);
        assert!((eval("sqrt(T)", 16.0) - 4.0).abs() < 1e-12);
        assert!((eval("max(0.3, min(0.9, 0.001*T))", 500.0) - 0.5).abs() < 1e-12);
        assert!((eval("log10(T) + ln(e)", 1000.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_unknown_names_and_garbage() {
        assert!(Expression::parse("foo(T)").is_err());
        assert!(Expression::parse("T +").is_err());
        assert!(Expression::parse("T $ 2").is_err());
        assert!(Expression::parse("").is_err());
        assert!(Expression::parse("(T").is_err());
        assert!(Expression::parse("min(T)").is_err());
        assert!(Expression::parse("T T").is_err());
    }

    #[test]
    fn serializes_as_source_text() {
        let expr = Expression::parse("500 + 0.2*T").unwrap();
        let text: String = expr.clone().into();
        assert_eq!(text, "500 + 0.2*T");
        let back = Expression::try_from(text).unwrap();
        assert_eq!(back, expr);
    }
}
