//! Filter query expressions.
//!
//! A small JMESPath-flavoured language evaluated against one dataset element
//! at a time.
//!
//! # Grammar
//!
//! ```text
//! query   := "[?" or "]" | or
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | compare
//! compare := operand ( ("==" | "!=" | "<" | "<=" | ">" | ">=") operand )?
//! operand := "(" or ")" | literal | call | path
//! literal := 'raw string' | "string" | `json` | number | true | false | null
//! call    := name "(" or ( "," or )* ")"
//! path    := "@" | name ( "." (name | digits) )*
//! ```
//!
//! Truthiness follows JMESPath: `false`, `null`, `""`, `[]` and `{}` are
//! false, everything else is true. Ordering comparisons accept two numbers or
//! two strings and yield `null` otherwise.
//!
//! Parentheses, `!` and call arguments nest at most 128 levels deep; deeper
//! input is a parse error.
//!
//! Functions: `contains(subject, search)`, `starts_with(s, prefix)`,
//! `ends_with(s, suffix)`, `length(x)`, `not_null(a, ...)`.

use crate::ir::{Segment, TemplatePath};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// Parse failure, with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset} in `{expression}`")]
pub struct QueryError {
    pub expression: String,
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Contains,
    StartsWith,
    EndsWith,
    Length,
    NotNull,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "contains" => Self::Contains,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "length" => Self::Length,
            "not_null" => Self::NotNull,
            _ => return None,
        })
    }

    /// Accepted argument counts as `(min, max)`.
    const fn arity(self) -> (usize, usize) {
        match self {
            Self::Contains | Self::StartsWith | Self::EndsWith => (2, 2),
            Self::Length => (1, 1),
            Self::NotNull => (1, usize::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(TemplatePath),
    Not(Box<Expr>),
    /// Operands of one `&&` chain.
    And(Vec<Expr>),
    /// Operands of one `||` chain.
    Or(Vec<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    expr: Expr,
}

impl Query {
    pub fn parse(source: &str) -> Result<Self, QueryError> {
        let mut parser = Parser {
            src: source,
            pos: 0,
            depth: 0,
        };
        parser.skip_ws();
        let wrapped = parser.eat("[?");
        let expr = parser.or()?;
        if wrapped && !parser.eat("]") {
            return Err(parser.error("expected `]` closing `[?`"));
        }
        parser.skip_ws();
        if parser.pos < source.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(Self { expr })
    }

    /// Whether `element` satisfies the query.
    pub fn matches(&self, element: &Value) -> bool {
        truthy(&eval(&self.expr, element))
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Deepest allowed nesting of `(`, `!` and call arguments.
const MAX_NESTING: usize = 128;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Current nesting level, bounded by `MAX_NESTING`.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError {
            expression: self.src.to_owned(),
            offset: self.pos,
            message: message.into(),
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, QueryError>) -> Result<T, QueryError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("expression nested deeper than {MAX_NESTING} levels")));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    /// Consume `token` (after whitespace) if it comes next.
    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Expr, QueryError> {
        let first = self.and()?;
        if !self.eat("||") {
            return Ok(first);
        }
        let mut operands = vec![first, self.and()?];
        while self.eat("||") {
            operands.push(self.and()?);
        }
        Ok(Expr::Or(operands))
    }

    fn and(&mut self) -> Result<Expr, QueryError> {
        let first = self.unary()?;
        if !self.eat("&&") {
            return Ok(first);
        }
        let mut operands = vec![first, self.unary()?];
        while self.eat("&&") {
            operands.push(self.unary()?);
        }
        Ok(Expr::And(operands))
    }

    fn unary(&mut self) -> Result<Expr, QueryError> {
        self.skip_ws();
        if self.rest().starts_with('!') && !self.rest().starts_with("!=") {
            self.pos += 1;
            let inner = self.nested(Self::unary)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, QueryError> {
        let lhs = self.operand()?;
        // Two-character operators first so `<=` is not read as `<`.
        const OPS: [(&str, CmpOp); 6] = [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ];
        for (token, op) in OPS {
            if self.eat(token) {
                let rhs = self.operand()?;
                return Ok(Expr::Compare(op, Box::new(lhs), Box::new(rhs)));
            }
        }
        Ok(lhs)
    }

    fn operand(&mut self) -> Result<Expr, QueryError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of expression")),
            Some('(') => {
                self.pos += 1;
                let inner = self.nested(Self::or)?;
                if !self.eat(")") {
                    return Err(self.error("expected `)`"));
                }
                Ok(inner)
            }
            Some(quote @ ('\'' | '"')) => self.string(quote).map(|s| Expr::Literal(Value::String(s))),
            Some('`') => self.json_literal(),
            Some('@') => {
                self.pos += 1;
                let mut path = TemplatePath::root();
                self.path_tail(&mut path)?;
                Ok(Expr::Path(path))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if is_name_start(c) => self.name_or_call(),
            Some(c) => Err(self.error(format!("unexpected character `{c}`"))),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, QueryError> {
        self.pos += 1;
        let src = self.src;
        let mut out = String::new();
        let mut chars = src[self.pos..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.pos += i + 1;
                    return Ok(out);
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn json_literal(&mut self) -> Result<Expr, QueryError> {
        self.pos += 1;
        let Some(end) = self.rest().find('`') else {
            return Err(self.error("unterminated JSON literal"));
        };
        let raw = &self.rest()[..end];
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|err| self.error(format!("invalid JSON literal: {err}")))?;
        self.pos += end + 1;
        Ok(Expr::Literal(value))
    }

    fn number(&mut self) -> Result<Expr, QueryError> {
        let len = self
            .rest()
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
            .map_or(self.rest().len(), |(i, _)| i);
        let raw = &self.rest()[..len];
        let value: Value = serde_json::from_str(raw)
            .map_err(|_| self.error(format!("invalid number `{raw}`")))?;
        self.pos += len;
        Ok(Expr::Literal(value))
    }

    fn name(&mut self) -> &str {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|(_, c)| !is_name_char(*c))
            .map_or(self.rest().len(), |(i, _)| i);
        self.pos += len;
        &self.src[start..start + len]
    }

    fn name_or_call(&mut self) -> Result<Expr, QueryError> {
        let start = self.pos;
        let name = self.name().to_owned();

        match name.as_str() {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }

        if self.rest().starts_with('(') {
            let Some(function) = Function::from_name(&name) else {
                self.pos = start;
                return Err(self.error(format!("unknown function `{name}`")));
            };
            self.pos += 1;
            let mut args = Vec::new();
            if !self.eat(")") {
                loop {
                    args.push(self.nested(Self::or)?);
                    if self.eat(")") {
                        break;
                    }
                    if !self.eat(",") {
                        return Err(self.error("expected `,` or `)`"));
                    }
                }
            }
            let (min, max) = function.arity();
            if args.len() < min || args.len() > max {
                self.pos = start;
                return Err(self.error(format!(
                    "`{name}` takes {} argument(s), got {}",
                    if min == max { min.to_string() } else { format!("at least {min}") },
                    args.len()
                )));
            }
            return Ok(Expr::Call(function, args));
        }

        let mut path = TemplatePath::root();
        path.push(Segment::Key(name.as_str().into()));
        self.path_tail(&mut path)?;
        Ok(Expr::Path(path))
    }

    /// Parse `.name` / `.0` segments following a path head.
    fn path_tail(&mut self, path: &mut TemplatePath) -> Result<(), QueryError> {
        while self.rest().starts_with('.') {
            self.pos += 1;
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    let digits = self.name().to_owned();
                    match digits.parse() {
                        Ok(index) => path.push(Segment::Index(index)),
                        Err(_) => path.push(Segment::Key(digits.as_str().into())),
                    }
                }
                Some(c) if is_name_start(c) => {
                    let key = self.name().to_owned();
                    path.push(Segment::Key(key.as_str().into()));
                }
                _ => return Err(self.error("expected field name after `.`")),
            }
        }
        Ok(())
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

// ============================================================================
// Evaluation
// ============================================================================

fn eval(expr: &Expr, element: &Value) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Path(path) => path.lookup(element).cloned().unwrap_or(Value::Null),
        Expr::Not(inner) => Value::Bool(!truthy(&eval(inner, element))),
        // JMESPath: `&&` yields the first falsy operand (or the last one),
        // `||` the first truthy operand (or the last one)
        Expr::And(operands) => short_circuit(operands, element, false),
        Expr::Or(operands) => short_circuit(operands, element, true),
        Expr::Compare(op, lhs, rhs) => compare(*op, &eval(lhs, element), &eval(rhs, element)),
        Expr::Call(function, args) => {
            let args: Vec<Value> = args.iter().map(|arg| eval(arg, element)).collect();
            call(*function, &args)
        }
    }
}

/// First operand whose truthiness equals `stop_on`, else the last operand.
fn short_circuit(operands: &[Expr], element: &Value, stop_on: bool) -> Value {
    let mut last = Value::Null;
    for operand in operands {
        last = eval(operand, element);
        if truthy(&last) == stop_on {
            break;
        }
    }
    last
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Value {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };

    let result = match op {
        CmpOp::Eq => return Value::Bool(loose_eq(lhs, rhs)),
        CmpOp::Ne => return Value::Bool(!loose_eq(lhs, rhs)),
        CmpOp::Lt => ordering.map(Ordering::is_lt),
        CmpOp::Le => ordering.map(Ordering::is_le),
        CmpOp::Gt => ordering.map(Ordering::is_gt),
        CmpOp::Ge => ordering.map(Ordering::is_ge),
    };
    result.map_or(Value::Null, Value::Bool)
}

/// Deep equality where `1` and `1.0` compare equal.
fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn call(function: Function, args: &[Value]) -> Value {
    match (function, args) {
        (Function::Contains, [Value::Array(items), needle]) => {
            Value::Bool(items.iter().any(|item| loose_eq(item, needle)))
        }
        (Function::Contains, [Value::String(s), Value::String(needle)]) => {
            Value::Bool(s.contains(needle.as_str()))
        }
        (Function::StartsWith, [Value::String(s), Value::String(prefix)]) => {
            Value::Bool(s.starts_with(prefix.as_str()))
        }
        (Function::EndsWith, [Value::String(s), Value::String(suffix)]) => {
            Value::Bool(s.ends_with(suffix.as_str()))
        }
        (Function::Length, [Value::String(s)]) => Value::from(s.chars().count()),
        (Function::Length, [Value::Array(items)]) => Value::from(items.len()),
        (Function::Length, [Value::Object(map)]) => Value::from(map.len()),
        (Function::NotNull, args) => args
            .iter()
            .find(|arg| !arg.is_null())
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
