//! PEP 508 environment markers (`python_version < "3.8" and extra == "tls"`).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::name::normalize;
use crate::specifier::Specifier;
use crate::version::Version;

/// Marker variables whose values compare as PEP 440 versions.
const VERSION_VARIABLES: &[&str] = &[
    "python_version",
    "python_full_version",
    "implementation_version",
];

const STRING_VARIABLES: &[&str] = &[
    "os_name",
    "sys_platform",
    "platform_system",
    "platform_machine",
    "platform_release",
    "platform_version",
    "platform_python_implementation",
    "implementation_name",
];

/// The interpreter environment markers are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerEnvironment {
    pub python_version: String,
    pub python_full_version: String,
    pub implementation_version: String,
    pub implementation_name: String,
    pub platform_python_implementation: String,
    pub os_name: String,
    pub sys_platform: String,
    pub platform_system: String,
    pub platform_machine: String,
    pub platform_release: String,
    pub platform_version: String,
}

impl Default for MarkerEnvironment {
    /// A CPython 3.12 interpreter on the host operating system.
    fn default() -> Self {
        let (sys_platform, platform_system, os_name) = match std::env::consts::OS {
            "macos" => ("darwin", "Darwin", "posix"),
            "windows" => ("win32", "Windows", "nt"),
            "linux" => ("linux", "Linux", "posix"),
            other => (other, other, "posix"),
        };
        Self {
            python_version: "3.12".to_string(),
            python_full_version: "3.12.0".to_string(),
            implementation_version: "3.12.0".to_string(),
            implementation_name: "cpython".to_string(),
            platform_python_implementation: "CPython".to_string(),
            os_name: os_name.to_string(),
            sys_platform: sys_platform.to_string(),
            platform_system: platform_system.to_string(),
            platform_machine: std::env::consts::ARCH.to_string(),
            platform_release: String::new(),
            platform_version: String::new(),
        }
    }
}

impl MarkerEnvironment {
    /// Set `python_version` (`X.Y`) and the derived full/implementation versions.
    pub fn with_python_version(mut self, version: &str) -> Self {
        let version = version.trim();
        let full = if version.split('.').count() >= 3 {
            version.to_string()
        } else {
            format!("{version}.0")
        };
        self.python_version = version.split('.').take(2).collect::<Vec<_>>().join(".");
        self.python_full_version = full.clone();
        self.implementation_version = full;
        self
    }

    fn get(&self, variable: &str) -> Option<&str> {
        let value = match variable {
            "python_version" => &self.python_version,
            "python_full_version" => &self.python_full_version,
            "implementation_version" => &self.implementation_version,
            "implementation_name" => &self.implementation_name,
            "platform_python_implementation" => &self.platform_python_implementation,
            "os_name" => &self.os_name,
            "sys_platform" => &self.sys_platform,
            "platform_system" => &self.platform_system,
            "platform_machine" => &self.platform_machine,
            "platform_release" => &self.platform_release,
            "platform_version" => &self.platform_version,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOperator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
    Compatible,
    ArbitraryEqual,
    In,
    NotIn,
}

impl MarkerOperator {
    fn as_str(self) -> &'static str {
        match self {
            MarkerOperator::Equal => "==",
            MarkerOperator::NotEqual => "!=",
            MarkerOperator::LessEqual => "<=",
            MarkerOperator::GreaterEqual => ">=",
            MarkerOperator::Less => "<",
            MarkerOperator::Greater => ">",
            MarkerOperator::Compatible => "~=",
            MarkerOperator::ArbitraryEqual => "===",
            MarkerOperator::In => "in",
            MarkerOperator::NotIn => "not in",
        }
    }

    /// Operator with its operands swapped (`"3.8" < python_version`).
    fn flipped(self) -> Self {
        match self {
            MarkerOperator::LessEqual => MarkerOperator::GreaterEqual,
            MarkerOperator::GreaterEqual => MarkerOperator::LessEqual,
            MarkerOperator::Less => MarkerOperator::Greater,
            MarkerOperator::Greater => MarkerOperator::Less,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    Variable(String),
    Literal(String),
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Variable(name) => f.write_str(name),
            MarkerValue::Literal(value) => write!(f, "\"{value}\""),
        }
    }
}

/// A parsed marker expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerTree {
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
    Expression {
        lhs: MarkerValue,
        op: MarkerOperator,
        rhs: MarkerValue,
    },
}

impl MarkerTree {
    pub fn parse(marker: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(marker)?;
        let mut parser = Parser {
            source: marker,
            tokens,
            pos: 0,
        };
        let tree = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(tree)
    }

    /// Evaluate against `env`; `extra == "x"` is true when `x` is in `extras`.
    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &BTreeSet<String>) -> bool {
        match self {
            MarkerTree::And(items) => items.iter().all(|m| m.evaluate(env, extras)),
            MarkerTree::Or(items) => items.iter().any(|m| m.evaluate(env, extras)),
            MarkerTree::Expression { lhs, op, rhs } => evaluate_expression(lhs, *op, rhs, env, extras),
        }
    }

    /// Whether any `extra` comparison appears in the tree.
    pub fn mentions_extra(&self) -> bool {
        match self {
            MarkerTree::And(items) | MarkerTree::Or(items) => items.iter().any(MarkerTree::mentions_extra),
            MarkerTree::Expression { lhs, rhs, .. } => [lhs, rhs]
                .iter()
                .any(|v| matches!(v, MarkerValue::Variable(name) if name == "extra")),
        }
    }
}

impl fmt::Display for MarkerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerTree::And(items) | MarkerTree::Or(items) => {
                let joiner = if matches!(self, MarkerTree::And(_)) { " and " } else { " or " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    if matches!(item, MarkerTree::Expression { .. }) {
                        write!(f, "{item}")?;
                    } else {
                        write!(f, "({item})")?;
                    }
                }
                Ok(())
            }
            MarkerTree::Expression { lhs, op, rhs } => write!(f, "{lhs} {} {rhs}", op.as_str()),
        }
    }
}

fn evaluate_expression(
    lhs: &MarkerValue,
    op: MarkerOperator,
    rhs: &MarkerValue,
    env: &MarkerEnvironment,
    extras: &BTreeSet<String>,
) -> bool {
    match (lhs, rhs) {
        (MarkerValue::Variable(var), MarkerValue::Literal(lit)) if var == "extra" => {
            compare_extra(op, lit, extras)
        }
        (MarkerValue::Literal(lit), MarkerValue::Variable(var)) if var == "extra" => {
            compare_extra(op.flipped(), lit, extras)
        }
        (MarkerValue::Variable(var), MarkerValue::Literal(lit)) => {
            let value = env.get(var).unwrap_or_default();
            compare(var, value, op, lit)
        }
        (MarkerValue::Literal(lit), MarkerValue::Variable(var)) => {
            let value = env.get(var).unwrap_or_default();
            match op {
                MarkerOperator::In => value.contains(lit.as_str()),
                MarkerOperator::NotIn => !value.contains(lit.as_str()),
                _ => compare(var, value, op.flipped(), lit),
            }
        }
        (MarkerValue::Literal(a), MarkerValue::Literal(b)) => compare_strings(a, op, b),
        (MarkerValue::Variable(a), MarkerValue::Variable(b)) => {
            let a = env.get(a).unwrap_or_default();
            let b = env.get(b).unwrap_or_default();
            compare_strings(a, op, b)
        }
    }
}

fn compare_extra(op: MarkerOperator, literal: &str, extras: &BTreeSet<String>) -> bool {
    let wanted = normalize(literal);
    match op {
        MarkerOperator::Equal | MarkerOperator::ArbitraryEqual => extras.contains(&wanted),
        MarkerOperator::NotEqual => !extras.contains(&wanted),
        _ => false,
    }
}

/// Compare an environment value (left) against a literal (right).
fn compare(variable: &str, value: &str, op: MarkerOperator, literal: &str) -> bool {
    if VERSION_VARIABLES.contains(&variable) {
        if let Some(result) = compare_versions(value, op, literal) {
            return result;
        }
    }
    compare_strings(value, op, literal)
}

fn compare_versions(value: &str, op: MarkerOperator, literal: &str) -> Option<bool> {
    if matches!(op, MarkerOperator::In | MarkerOperator::NotIn) {
        return None;
    }
    let candidate = Version::parse(value).ok()?;
    let clause = Specifier::parse(&format!("{}{}", op.as_str(), literal)).ok()?;
    Some(clause.contains(&candidate))
}

fn compare_strings(lhs: &str, op: MarkerOperator, rhs: &str) -> bool {
    match op {
        MarkerOperator::Equal | MarkerOperator::ArbitraryEqual => lhs == rhs,
        MarkerOperator::NotEqual => lhs != rhs,
        MarkerOperator::Less => lhs < rhs,
        MarkerOperator::LessEqual => lhs <= rhs,
        MarkerOperator::Greater => lhs > rhs,
        MarkerOperator::GreaterEqual => lhs >= rhs,
        MarkerOperator::Compatible => false,
        MarkerOperator::In => rhs.contains(lhs),
        MarkerOperator::NotIn => !rhs.contains(lhs),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Op(MarkerOperator),
    Ident(String),
    Str(String),
}

fn tokenize(marker: &str) -> Result<Vec<Token>, ParseError> {
    let invalid = |reason: String| ParseError::InvalidMarker {
        marker: marker.to_string(),
        reason,
    };
    let chars: Vec<char> = marker.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ch)
                    .ok_or_else(|| invalid("unterminated string".to_string()))?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            '<' | '>' | '=' | '!' | '~' => {
                let start = i;
                while i < chars.len() && matches!(chars[i], '<' | '>' | '=' | '!' | '~') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let op = match text.as_str() {
                    "==" => MarkerOperator::Equal,
                    "!=" => MarkerOperator::NotEqual,
                    "<=" => MarkerOperator::LessEqual,
                    ">=" => MarkerOperator::GreaterEqual,
                    "<" => MarkerOperator::Less,
                    ">" => MarkerOperator::Greater,
                    "~=" => MarkerOperator::Compatible,
                    "===" => MarkerOperator::ArbitraryEqual,
                    other => return Err(invalid(format!("unknown operator {other:?}"))),
                };
                tokens.push(Token::Op(op));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '.')) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "in" => Token::Op(MarkerOperator::In),
                    "not" => {
                        let mut j = i;
                        while j < chars.len() && chars[j].is_whitespace() {
                            j += 1;
                        }
                        if chars.get(j) != Some(&'i') || chars.get(j + 1) != Some(&'n') {
                            return Err(invalid("expected 'in' after 'not'".to_string()));
                        }
                        i = j + 2;
                        Token::Op(MarkerOperator::NotIn)
                    }
                    // Legacy dotted spellings from setuptools-era metadata.
                    "os.name" => Token::Ident("os_name".to_string()),
                    "sys.platform" => Token::Ident("sys_platform".to_string()),
                    "platform.version" => Token::Ident("platform_version".to_string()),
                    "platform.machine" => Token::Ident("platform_machine".to_string()),
                    "platform.python_implementation" => {
                        Token::Ident("platform_python_implementation".to_string())
                    }
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            other => return Err(invalid(format!("unexpected character {other:?}"))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> ParseError {
        ParseError::InvalidMarker {
            marker: self.source.to_string(),
            reason: reason.to_string(),
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn parse_or(&mut self) -> Result<MarkerTree, ParseError> {
        let mut items = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            MarkerTree::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<MarkerTree, ParseError> {
        let mut items = vec![self.parse_atom()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            items.push(self.parse_atom()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            MarkerTree::And(items)
        })
    }

    fn parse_atom(&mut self) -> Result<MarkerTree, ParseError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            if self.next() != Some(Token::RParen) {
                return Err(self.error("expected ')'"));
            }
            return Ok(inner);
        }
        let lhs = self.parse_value()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            _ => return Err(self.error("expected a comparison operator")),
        };
        let rhs = self.parse_value()?;
        Ok(MarkerTree::Expression { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<MarkerValue, ParseError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(MarkerValue::Literal(s)),
            Some(Token::Ident(name)) => {
                if name == "extra"
                    || VERSION_VARIABLES.contains(&name.as_str())
                    || STRING_VARIABLES.contains(&name.as_str())
                {
                    Ok(MarkerValue::Variable(name))
                } else {
                    Err(self.error(&format!("unknown marker variable {name:?}")))
                }
            }
            _ => Err(self.error("expected a marker variable or quoted string")),
        }
    }
}
