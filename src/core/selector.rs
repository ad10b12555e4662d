//! Selector: compiled boolean cut over candidate features
//!
//! Expressions look like `pt > 2 && abs(eta) < 2.8`. They are tokenized with
//! a single anchored regex, parsed by recursive descent and checked against
//! the candidate kind's feature list when the selector is built. Evaluation
//! afterwards is pure arithmetic and cannot fail.
//!
//! Precedence, loosest first: `||`, `&&`, `!`, comparisons, `+ -`, `* /`,
//! unary `-`.

use std::marker::PhantomData;
use lazy_static::lazy_static;
use regex::Regex;
use crate::error::SelectorError;
use crate::types::Candidate;

lazy_static! {
    static ref RE_TOKEN: Regex = Regex::new(
        r"^\s*(?:(?P<num>(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)|(?P<ident>[A-Za-z_][A-Za-z0-9_]*)|(?P<sym>&&|\|\||==|!=|<=|>=|[<>!()+\-*/,]))"
    ).unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Sym(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number {}", n),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Sym(s) => write!(f, "'{}'", s),
        }
    }
}

fn tokenize(expr: &str) -> Result<Vec<Token>, SelectorError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while !expr[pos..].trim_start().is_empty() {
        let caps = RE_TOKEN.captures(&expr[pos..]).ok_or_else(|| SelectorError::BadCharacter {
            expr: expr.to_string(),
            offset: pos + (expr[pos..].len() - expr[pos..].trim_start().len()),
        })?;

        if let Some(m) = caps.name("num") {
            let value = m.as_str().parse::<f64>().map_err(|_| SelectorError::UnexpectedToken {
                expr: expr.to_string(),
                found: m.as_str().to_string(),
            })?;
            tokens.push(Token::Num(value));
        } else if let Some(m) = caps.name("ident") {
            tokens.push(Token::Ident(m.as_str().to_string()));
        } else if let Some(m) = caps.name("sym") {
            tokens.push(Token::Sym(m.as_str().to_string()));
        }

        // whole match includes the leading whitespace
        pos += caps.get(0).map(|m| m.end()).unwrap_or(expr.len() - pos);
    }

    Ok(tokens)
}

// =============================================================================
// AST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Or,
    And,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Abs,
    Sqrt,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        match name {
            "abs" => Some(Func::Abs),
            "sqrt" => Some(Func::Sqrt),
            "min" => Some(Func::Min),
            "max" => Some(Func::Max),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Func::Abs | Func::Sqrt => 1,
            Func::Min | Func::Max => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Const(f64),
    Feature(&'static str),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

fn truthy(x: f64) -> bool {
    x != 0.0 && !x.is_nan()
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Expr {
    fn eval<C: Candidate>(&self, c: &C) -> f64 {
        match self {
            Expr::Const(v) => *v,
            Expr::Feature(name) => c.feature(name).unwrap_or(f64::NAN),
            Expr::Neg(e) => -e.eval(c),
            Expr::Not(e) => flag(!truthy(e.eval(c))),
            Expr::Binary(op, l, r) => match op {
                BinOp::Or => flag(truthy(l.eval(c)) || truthy(r.eval(c))),
                BinOp::And => flag(truthy(l.eval(c)) && truthy(r.eval(c))),
                BinOp::Lt => flag(l.eval(c) < r.eval(c)),
                BinOp::Le => flag(l.eval(c) <= r.eval(c)),
                BinOp::Gt => flag(l.eval(c) > r.eval(c)),
                BinOp::Ge => flag(l.eval(c) >= r.eval(c)),
                BinOp::Eq => flag(l.eval(c) == r.eval(c)),
                BinOp::Ne => flag(l.eval(c) != r.eval(c)),
                BinOp::Add => l.eval(c) + r.eval(c),
                BinOp::Sub => l.eval(c) - r.eval(c),
                BinOp::Mul => l.eval(c) * r.eval(c),
                BinOp::Div => l.eval(c) / r.eval(c),
            },
            Expr::Call(func, args) => match func {
                Func::Abs => args[0].eval(c).abs(),
                Func::Sqrt => args[0].eval(c).sqrt(),
                Func::Min => args[0].eval(c).min(args[1].eval(c)),
                Func::Max => args[0].eval(c).max(args[1].eval(c)),
            },
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

struct Parser<'a> {
    expr: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    kind: &'static str,
    features: &'static [&'static str],
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn unexpected(&self, tok: Option<&Token>) -> SelectorError {
        SelectorError::UnexpectedToken {
            expr: self.expr.to_string(),
            found: tok.map(|t| t.to_string()).unwrap_or_else(|| "end of expression".to_string()),
        }
    }

    /// Consume `sym` (or keyword `word`) if it is next
    fn eat(&mut self, sym: &str, word: Option<&str>) -> bool {
        let hit = match self.peek() {
            Some(Token::Sym(s)) => s == sym,
            Some(Token::Ident(s)) => word.map_or(false, |w| s == w),
            _ => false,
        };
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn expect(&mut self, sym: &str) -> Result<(), SelectorError> {
        if self.eat(sym, None) {
            Ok(())
        } else {
            Err(self.unexpected(self.peek()))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, SelectorError> {
        let mut lhs = self.parse_and()?;
        while self.eat("||", Some("or")) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SelectorError> {
        let mut lhs = self.parse_not()?;
        while self.eat("&&", Some("and")) {
            let rhs = self.parse_not()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, SelectorError> {
        if self.eat("!", Some("not")) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, SelectorError> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Some(Token::Sym(s)) => match s.as_str() {
                "<" => Some(BinOp::Lt),
                "<=" => Some(BinOp::Le),
                ">" => Some(BinOp::Gt),
                ">=" => Some(BinOp::Ge),
                "==" => Some(BinOp::Eq),
                "!=" => Some(BinOp::Ne),
                _ => None,
            },
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let rhs = self.parse_add()?;
                Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn parse_add(&mut self) -> Result<Expr, SelectorError> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = if self.eat("+", None) {
                BinOp::Add
            } else if self.eat("-", None) {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr, SelectorError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat("*", None) {
                BinOp::Mul
            } else if self.eat("/", None) {
                BinOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, SelectorError> {
        if self.eat("-", None) {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SelectorError> {
        match self.next() {
            Some(Token::Num(v)) => Ok(Expr::Const(v)),
            Some(Token::Sym(s)) if s == "(" => {
                let inner = self.parse_or()?;
                self.expect(")")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.eat("(", None) {
                    let args = self.parse_args()?;
                    match Func::lookup(&name) {
                        Some(func) if func.arity() == args.len() => Ok(Expr::Call(func, args)),
                        Some(func) => Err(SelectorError::Arity {
                            name,
                            expected: func.arity(),
                            got: args.len(),
                        }),
                        // accessor call syntax: pt()
                        None if args.is_empty() && self.resolve(&name).is_some() => {
                            self.feature(&name)
                        }
                        None => Err(SelectorError::UnknownFunction(name)),
                    }
                } else {
                    self.feature(&name)
                }
            }
            other => {
                self.pos -= 1;
                Err(self.unexpected(other.as_ref()))
            }
        }
    }

    /// Arguments after an opening parenthesis, closing parenthesis included
    fn parse_args(&mut self) -> Result<Vec<Expr>, SelectorError> {
        let mut args = Vec::new();
        if self.eat(")", None) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            if self.eat(")", None) {
                return Ok(args);
            }
            self.expect(",")?;
        }
    }

    fn resolve(&self, name: &str) -> Option<&'static str> {
        self.features.iter().copied().find(|f| *f == name)
    }

    fn feature(&self, name: &str) -> Result<Expr, SelectorError> {
        self.resolve(name).map(Expr::Feature).ok_or_else(|| SelectorError::UnknownFeature {
            kind: self.kind,
            name: name.to_string(),
        })
    }
}

// =============================================================================
// SELECTOR
// =============================================================================

/// Compiled cut for candidates of kind `C`
pub struct Selector<C> {
    expr: String,
    /// `None` selects everything
    root: Option<Expr>,
    _kind: PhantomData<fn(&C) -> bool>,
}

impl<C> Clone for Selector<C> {
    fn clone(&self) -> Self {
        Self { expr: self.expr.clone(), root: self.root.clone(), _kind: PhantomData }
    }
}

impl<C> std::fmt::Debug for Selector<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector").field("expr", &self.expr).finish()
    }
}

impl<C: Candidate> Selector<C> {
    /// Compile `expr`; an empty expression selects every candidate
    pub fn new(expr: &str) -> Result<Self, SelectorError> {
        let tokens = tokenize(expr)?;
        let root = if tokens.is_empty() {
            None
        } else {
            let mut parser = Parser {
                expr,
                tokens,
                pos: 0,
                kind: C::KIND,
                features: C::feature_names(),
            };
            let root = parser.parse_or()?;
            if parser.pos < parser.tokens.len() {
                return Err(parser.unexpected(parser.peek()));
            }
            Some(root)
        };

        Ok(Self {
            expr: expr.trim().to_string(),
            root,
            _kind: PhantomData,
        })
    }

    /// Selector that keeps every candidate
    pub fn all() -> Self {
        Self { expr: String::new(), root: None, _kind: PhantomData }
    }

    /// Does `candidate` pass the cut?
    pub fn select(&self, candidate: &C) -> bool {
        match &self.root {
            Some(root) => truthy(root.eval(candidate)),
            None => true,
        }
    }

    /// Source expression, trimmed
    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// True when no cut is applied
    pub fn is_pass_all(&self) -> bool {
        self.root.is_none()
    }
}

// =============================================================================
// TESTS
// =============================================================================
