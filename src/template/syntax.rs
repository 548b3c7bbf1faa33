//! Template tokenizer and parser.
//!
//! Two tag forms are recognized inside otherwise literal text:
//!
//! ```text
//! {{ page.title | makeUppercase }}     output, HTML-escaped unless `| safe` is last
//! {% collection "posts" %}             shortcode call
//! ```
//!
//! Values are string literals (single or double quoted), integers, or dotted
//! variable paths (`page.url`, `posts.0.title`). Shortcode arguments are
//! separated by whitespace or commas.
//!
//! A dash just inside a delimiter (`{{-`, `-}}`, `{%-`, `-%}`) trims the
//! whitespace of the text on that side of the tag.

use super::TemplateError;
use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(-?)(.*?)(-?)\}\}|\{%(-?)(.*?)(-?)%\}").expect("valid tag regex")
});

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:"((?:[^"\\]|\\.)*)"|'([^']*)'|(\|)|(,)|(-?[0-9]+)\b|([A-Za-z_][A-Za-z0-9_.\-]*))"#)
        .expect("valid token regex")
});

/// A value inside a tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(String),
    Int(i64),
    /// Dotted path into the render context.
    Var(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Output { value: Arg, filters: Vec<String> },
    Shortcode { name: String, args: Vec<Arg> },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Value(Arg),
    Ident(String),
    Pipe,
    Comma,
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

fn tokenize(expr: &str, line: usize) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = expr;
    while !rest.trim().is_empty() {
        let caps = TOKEN.captures(rest).ok_or_else(|| TemplateError::Syntax {
            line,
            message: format!("unexpected input '{}'", rest.trim()),
        })?;
        let token = if let Some(s) = caps.get(1) {
            Token::Value(Arg::Str(s.as_str().replace("\\\"", "\"")))
        } else if let Some(s) = caps.get(2) {
            Token::Value(Arg::Str(s.as_str().to_string()))
        } else if caps.get(3).is_some() {
            Token::Pipe
        } else if caps.get(4).is_some() {
            Token::Comma
        } else if let Some(n) = caps.get(5) {
            let value = n.as_str().parse().map_err(|_| TemplateError::Syntax {
                line,
                message: format!("number out of range '{}'", n.as_str()),
            })?;
            Token::Value(Arg::Int(value))
        } else {
            let id = caps.get(6).map_or("", |m| m.as_str());
            Token::Ident(id.to_string())
        };
        tokens.push(token);
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
    }
    Ok(tokens)
}

fn var(path: &str) -> Arg {
    Arg::Var(path.split('.').map(String::from).collect())
}

fn parse_output(expr: &str, line: usize) -> Result<Node, TemplateError> {
    let mut tokens = tokenize(expr, line)?.into_iter();
    let value = match tokens.next() {
        Some(Token::Value(arg)) => arg,
        Some(Token::Ident(id)) => var(&id),
        _ => {
            return Err(TemplateError::Syntax {
                line,
                message: "expected a value in output tag".to_string(),
            });
        }
    };
    let mut filters = Vec::new();
    while let Some(token) = tokens.next() {
        match (token, tokens.next()) {
            (Token::Pipe, Some(Token::Ident(name))) => filters.push(name),
            _ => {
                return Err(TemplateError::Syntax {
                    line,
                    message: "expected '| filterName'".to_string(),
                });
            }
        }
    }
    Ok(Node::Output { value, filters })
}

fn parse_shortcode(expr: &str, line: usize) -> Result<Node, TemplateError> {
    let mut tokens = tokenize(expr, line)?.into_iter();
    let name = match tokens.next() {
        Some(Token::Ident(name)) => name,
        _ => {
            return Err(TemplateError::Syntax {
                line,
                message: "expected a shortcode name".to_string(),
            });
        }
    };
    let mut args = Vec::new();
    for token in tokens {
        match token {
            Token::Value(arg) => args.push(arg),
            Token::Ident(id) => args.push(var(&id)),
            Token::Comma => {}
            Token::Pipe => {
                return Err(TemplateError::Syntax {
                    line,
                    message: format!("filters are not allowed in shortcode '{name}'"),
                });
            }
        }
    }
    Ok(Node::Shortcode { name, args })
}

/// Literal text between two tags. Errors on a stray opening delimiter.
fn push_text(
    nodes: &mut Vec<Node>,
    source: &str,
    start: usize,
    end: usize,
    trim_start: bool,
    trim_end: bool,
) -> Result<(), TemplateError> {
    let raw = &source[start..end];
    if let Some(inner) = raw.find("{{").or_else(|| raw.find("{%")) {
        return Err(TemplateError::Syntax {
            line: line_of(source, start + inner),
            message: "unclosed tag".to_string(),
        });
    }
    let mut text = raw;
    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
    Ok(())
}

/// Parse template source into nodes.
pub fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    let mut last = 0;
    let mut trim_next = false;
    for caps in TAG.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        let dash = |i: usize| caps.get(i).is_some_and(|m| !m.as_str().is_empty());
        let (trim_before, trim_after) = if caps.get(2).is_some() {
            (dash(1), dash(3))
        } else {
            (dash(4), dash(6))
        };
        push_text(&mut nodes, source, last, whole.start(), trim_next, trim_before)?;
        let line = line_of(source, whole.start());
        let node = match (caps.get(2), caps.get(5)) {
            (Some(expr), _) => parse_output(expr.as_str(), line)?,
            (_, Some(expr)) => parse_shortcode(expr.as_str(), line)?,
            _ => continue,
        };
        nodes.push(node);
        last = whole.end();
        trim_next = trim_after;
    }
    push_text(&mut nodes, source, last, source.len(), trim_next, false)?;
    Ok(nodes)
}
