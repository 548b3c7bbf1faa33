//! The template language.
//!
//! A deliberately small language: literal text, `{{ value | filter }}`
//! outputs, and `{% shortcode args %}` calls. There are no loops or
//! conditionals; anything structural (navigation, collection listings) is a
//! shortcode rendered in Rust.
//!
//! ## Context
//!
//! Values are looked up by dotted path in a JSON object. The renderer builds
//! it from the page's cascaded data plus:
//!
//! | Key | Value |
//! |-----|-------|
//! | `page` | `url`, `inputPath`, `fileSlug`, `date`, `outputPath` |
//! | `site` | the `[site]` config section |
//! | `collections` | name → list of `{url, title, date, inputPath, fileSlug}` |
//! | `content` | rendered inner content (layouts only) |
//! | *global data* | each `_data/<name>.json` as `<name>` |
//!
//! Undefined paths render as the empty string. Output is HTML-escaped unless
//! the last filter is `safe`.

pub mod filters;
pub mod shortcodes;
pub mod syntax;

use crate::collections::Collections;
use crate::navigation::Navigation;
use crate::types::Page;
use chrono::{DateTime, Local};
use maud::html;
use serde_json::Value;
use std::collections::HashMap;
use syntax::{Arg, Node};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),
    #[error("unknown shortcode '{0}'")]
    UnknownShortcode(String),
    #[error("filter '{name}': {message}")]
    Filter { name: String, message: String },
    #[error("shortcode '{name}': {message}")]
    Shortcode { name: String, message: String },
}

/// The filter that disables output escaping.
pub const SAFE: &str = "safe";

/// Site-wide state available to filters and shortcodes while rendering one page.
#[derive(Clone, Copy)]
pub struct RenderEnv<'a> {
    pub build_time: DateTime<Local>,
    pub pages: &'a [Page],
    pub collections: &'a Collections,
    pub navigation: &'a Navigation,
    /// URL of the page being rendered.
    pub page_url: Option<&'a str>,
    /// Navigation key of the page being rendered.
    pub nav_key: Option<&'a str>,
}

pub type FilterFn = Box<dyn Fn(Value, &RenderEnv<'_>) -> Result<Value, String> + Send + Sync>;
pub type ShortcodeFn =
    Box<dyn Fn(&[Value], &RenderEnv<'_>) -> Result<String, String> + Send + Sync>;

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: syntax::parse(source)?,
        })
    }
}

/// Filters and shortcodes by name.
pub struct Registry {
    filters: HashMap<String, FilterFn>,
    shortcodes: HashMap<String, ShortcodeFn>,
}

impl Registry {
    /// An empty registry; `safe` is always understood.
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
            shortcodes: HashMap::new(),
        }
    }

    /// Registry with the built-in filters and shortcodes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        filters::register(&mut registry);
        shortcodes::register(&mut registry);
        registry
    }

    pub fn add_filter<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(Value, &RenderEnv<'_>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.filters.insert(name.to_string(), Box::new(filter));
    }

    pub fn add_shortcode<F>(&mut self, name: &str, shortcode: F)
    where
        F: Fn(&[Value], &RenderEnv<'_>) -> Result<String, String> + Send + Sync + 'static,
    {
        self.shortcodes.insert(name.to_string(), Box::new(shortcode));
    }

    /// Render a parsed template against a context object.
    pub fn render(
        &self,
        template: &Template,
        context: &Value,
        env: &RenderEnv<'_>,
    ) -> Result<String, TemplateError> {
        let mut out = String::new();
        for node in &template.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output { value, filters } => {
                    let mut value = resolve(value, context);
                    for name in filters.iter().filter(|n| *n != SAFE) {
                        let filter = self
                            .filters
                            .get(name)
                            .ok_or_else(|| TemplateError::UnknownFilter(name.clone()))?;
                        value = filter(value, env).map_err(|message| TemplateError::Filter {
                            name: name.clone(),
                            message,
                        })?;
                    }
                    let text = to_text(&value);
                    if filters.last().is_some_and(|f| f == SAFE) {
                        out.push_str(&text);
                    } else {
                        out.push_str(&escape(&text));
                    }
                }
                Node::Shortcode { name, args } => {
                    let shortcode = self
                        .shortcodes
                        .get(name)
                        .ok_or_else(|| TemplateError::UnknownShortcode(name.clone()))?;
                    let args: Vec<Value> = args.iter().map(|a| resolve(a, context)).collect();
                    let html = shortcode(&args, env).map_err(|message| TemplateError::Shortcode {
                        name: name.clone(),
                        message,
                    })?;
                    out.push_str(&html);
                }
            }
        }
        Ok(out)
    }

    /// Parse and render in one step.
    pub fn render_str(
        &self,
        source: &str,
        context: &Value,
        env: &RenderEnv<'_>,
    ) -> Result<String, TemplateError> {
        self.render(&Template::parse(source)?, context, env)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn resolve(arg: &Arg, context: &Value) -> Value {
    match arg {
        Arg::Str(s) => Value::String(s.clone()),
        Arg::Int(n) => Value::from(*n),
        Arg::Var(path) => lookup(context, path).cloned().unwrap_or(Value::Null),
    }
}

/// Follow a dotted path through objects and arrays.
pub fn lookup<'v, S: AsRef<str>>(context: &'v Value, path: &[S]) -> Option<&'v Value> {
    path.iter().try_fold(context, |value, key| {
        let key = key.as_ref();
        match value {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Text form of a value: strings as-is, null as empty, other values as JSON.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestEnv;
    use serde_json::json;

    fn render(source: &str, context: Value) -> Result<String, TemplateError> {
        let env = TestEnv::default();
        Registry::with_builtins().render_str(source, &context, &env.env())
    }

    #[test]
    fn text_passes_through() {
        assert_eq!(render("<p>plain</p>", json!({})).unwrap(), "<p>plain</p>");
    }

    #[test]
    fn outputs_are_escaped() {
        let out = render("{{ title }}", json!({ "title": "<b>&</b>" })).unwrap();
        assert_eq!(out, "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn safe_disables_escaping() {
        let out = render("{{ content | safe }}", json!({ "content": "<p>hi</p>" })).unwrap();
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn safe_must_be_last_to_apply() {
        let out = render("{{ t | safe | makeUppercase }}", json!({ "t": "<i>" })).unwrap();
        assert_eq!(out, "&lt;I&gt;");
    }

    #[test]
    fn nested_paths_and_array_indices() {
        let ctx = json!({ "page": { "url": "/a/" }, "list": ["x", "y"] });
        assert_eq!(render("{{ page.url }} {{ list.1 }}", ctx).unwrap(), "/a/ y");
    }

    #[test]
    fn undefined_renders_empty() {
        assert_eq!(render("[{{ nope.deeper }}]", json!({})).unwrap(), "[]");
    }

    #[test]
    fn numbers_and_bools_render_as_text() {
        let out = render("{{ n }} {{ b }}", json!({ "n": 3, "b": true })).unwrap();
        assert_eq!(out, "3 true");
    }

    #[test]
    fn unknown_filter_is_error() {
        assert!(matches!(
            render("{{ t | nope }}", json!({ "t": "x" })),
            Err(TemplateError::UnknownFilter(name)) if name == "nope"
        ));
    }

    #[test]
    fn unknown_shortcode_is_error() {
        assert!(matches!(
            render("{% nope %}", json!({})),
            Err(TemplateError::UnknownShortcode(_))
        ));
    }

    #[test]
    fn custom_filter_and_shortcode() {
        let mut registry = Registry::empty();
        registry.add_filter("twice", |v, _| Ok(Value::String(to_text(&v).repeat(2))));
        registry.add_shortcode("hello", |args, _| {
            Ok(format!("hello {}", args.first().map(to_text).unwrap_or_default()))
        });
        let env = TestEnv::default();
        let out = registry
            .render_str("{{ 'ab' | twice }} {% hello name %}", &json!({ "name": "you" }), &env.env())
            .unwrap();
        assert_eq!(out, "abab hello you");
    }

    #[test]
    fn lookup_follows_paths() {
        let ctx = json!({ "a": { "b": [1, { "c": "deep" }] } });
        assert_eq!(lookup(&ctx, &["a", "b", "1", "c"]), Some(&json!("deep")));
        assert_eq!(lookup(&ctx, &["a", "x"]), None);
    }
}
