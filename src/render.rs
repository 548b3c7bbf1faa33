//! Page rendering.
//!
//! Turns one routed [`Page`] into its output text:
//!
//! 1. The body is run through the template language (per-format switch in
//!    `[templates]`).
//! 2. Markdown is converted to HTML.
//! 3. The `layout` chain is applied. Each layout receives the inner result
//!    as `content` and may name its own `layout` in front matter.
//!
//! Layouts are looked up in the includes directory first, by name with or
//! without `.html`. When no file matches, `base` and `post` (optionally
//! written `layouts/base`, `layouts/post.html`, ...) fall back to built-in
//! layouts rendered with Maud, so a site works without any includes.
//!
//! JSON templates skip markdown and layouts.

use crate::config::SiteConfig;
use crate::front_matter::{self, FrontMatterError};
use crate::scan::{TemplateFormat, relative_path};
use crate::template::filters::POST_DATE_FORMAT;
use crate::template::shortcodes::{render_breadcrumbs, render_nav};
use crate::template::{Registry, RenderEnv, Template, TemplateError, lookup, to_text};
use crate::types::Page;
use chrono::Datelike;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Options, Parser, html as md_html};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

/// Longest allowed layout chain; deeper chains are treated as cycles.
const MAX_LAYOUT_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("{path}: {source}")]
    Template {
        path: String,
        #[source]
        source: TemplateError,
    },
    #[error("{path}: layout front matter: {source}")]
    LayoutFrontMatter {
        path: String,
        #[source]
        source: FrontMatterError,
    },
    #[error("{path}: layout '{layout}' not found")]
    LayoutNotFound { path: String, layout: String },
    #[error("{path}: layout chain through '{layout}' is circular")]
    LayoutCycle { path: String, layout: String },
}

/// A layout file from the includes directory.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: String,
    data: Map<String, Value>,
    parent: Option<String>,
    template: Template,
}

/// Layout files keyed by includes-relative path.
#[derive(Debug, Default)]
pub struct Layouts {
    map: HashMap<String, Layout>,
}

impl Layouts {
    /// Load every `.html` file under `dir`. A missing directory is empty.
    pub fn load(dir: &Path) -> Result<Self, RenderError> {
        let mut map = HashMap::new();
        if !dir.is_dir() {
            return Ok(Self { map });
        }
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "html") {
                continue;
            }
            let name = relative_path(path, dir);
            let source = fs::read_to_string(path)?;
            let (raw, body) = front_matter::split(&source);
            let data = match raw {
                Some(yaml) => front_matter::parse_yaml(yaml).map_err(|source| {
                    RenderError::LayoutFrontMatter {
                        path: name.clone(),
                        source,
                    }
                })?,
                None => Map::new(),
            };
            let parent = data.get("layout").and_then(Value::as_str).map(String::from);
            let template = Template::parse(body).map_err(|source| RenderError::Template {
                path: name.clone(),
                source,
            })?;
            tracing::debug!(layout = %name, "loaded layout");
            map.insert(
                name.clone(),
                Layout {
                    name,
                    data,
                    parent,
                    template,
                },
            );
        }
        Ok(Self { map })
    }

    /// Find a layout by name, with or without the `.html` extension.
    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.map
            .get(name)
            .or_else(|| self.map.get(&format!("{name}.html")))
    }
}

/// Layouts rendered in Rust when the includes directory has no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinLayout {
    Base,
    Post,
}

impl BuiltinLayout {
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("layouts/").unwrap_or(name);
        let name = name.strip_suffix(".html").unwrap_or(name);
        match name {
            "base" => Some(BuiltinLayout::Base),
            "post" => Some(BuiltinLayout::Post),
            _ => None,
        }
    }
}

/// Public URLs of compiled assets, linked from the built-in base layout.
#[derive(Debug, Clone, Default)]
pub struct AssetLinks {
    pub stylesheets: Vec<String>,
    pub script: Option<String>,
}

pub struct Renderer<'a> {
    pub registry: &'a Registry,
    pub layouts: &'a Layouts,
    pub config: &'a SiteConfig,
    pub assets: &'a AssetLinks,
}

impl Renderer<'_> {
    fn engine_enabled(&self, format: TemplateFormat) -> bool {
        let templates = &self.config.templates;
        match format {
            TemplateFormat::Markdown => templates.markdown_engine,
            TemplateFormat::Html => templates.html_engine,
            TemplateFormat::Json => templates.data_engine,
        }
    }

    /// Render a page's final output text.
    pub fn render_page(
        &self,
        page: &Page,
        context: &Value,
        env: &RenderEnv<'_>,
    ) -> Result<String, RenderError> {
        let path = page.item.input_path.as_str();
        let template_error = |source| RenderError::Template {
            path: path.to_string(),
            source,
        };

        let mut content = if self.engine_enabled(page.item.format) {
            self.registry
                .render_str(&page.item.body, context, env)
                .map_err(template_error)?
        } else {
            page.item.body.clone()
        };

        match page.item.format {
            TemplateFormat::Json => return Ok(content),
            TemplateFormat::Markdown => content = markdown_to_html(&content),
            TemplateFormat::Html => {}
        }

        let mut next = page.item.front_matter.layout.clone();
        let mut layered = context.clone();
        let mut depth = 0;
        while let Some(name) = next.take() {
            depth += 1;
            if depth > MAX_LAYOUT_DEPTH {
                return Err(RenderError::LayoutCycle {
                    path: path.to_string(),
                    layout: name,
                });
            }
            if let Some(layout) = self.layouts.get(&name) {
                layered = front_matter::merge_data(Value::Object(layout.data.clone()), layered);
                let layout_context = with_content(layered.clone(), &content);
                content = self
                    .registry
                    .render(&layout.template, &layout_context, env)
                    .map_err(template_error)?;
                next = layout.parent.clone();
            } else if let Some(builtin) = BuiltinLayout::from_name(&name) {
                content = self.render_builtin(builtin, page, context, &content, env);
            } else {
                return Err(RenderError::LayoutNotFound {
                    path: path.to_string(),
                    layout: name,
                });
            }
        }
        Ok(content)
    }

    fn render_builtin(
        &self,
        layout: BuiltinLayout,
        page: &Page,
        context: &Value,
        content: &str,
        env: &RenderEnv<'_>,
    ) -> String {
        let title = page_title(page, context);
        let body = match layout {
            BuiltinLayout::Base => PreEscaped(content.to_string()),
            BuiltinLayout::Post => post_article(page, &title, content, env),
        };
        base_document(self.config, self.assets, &title, body, env).into_string()
    }
}

fn with_content(mut context: Value, content: &str) -> Value {
    if let Value::Object(map) = &mut context {
        map.insert("content".to_string(), Value::String(content.to_string()));
    }
    context
}

/// `pageTitle`, else `title`, else the page's derived title.
fn page_title(page: &Page, context: &Value) -> String {
    ["pageTitle", "title"]
        .iter()
        .filter_map(|key| lookup(context, &[key]).map(to_text))
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| page.title())
}

pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    md_html::push_html(&mut html, parser);
    html
}

/// Full HTML document with site header, navigation, and footer.
fn base_document(
    config: &SiteConfig,
    assets: &AssetLinks,
    title: &str,
    content: Markup,
    env: &RenderEnv<'_>,
) -> Markup {
    let site_title = config.site.title.as_str();
    let full_title = if title.is_empty() || title == site_title {
        site_title.to_string()
    } else {
        format!("{title} | {site_title}")
    };
    html! {
        (DOCTYPE)
        html lang=(config.site.language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (full_title) }
                @for href in &assets.stylesheets {
                    link rel="stylesheet" href=(href);
                }
                @if let Some(src) = &assets.script {
                    script src=(src) defer {}
                }
            }
            body {
                (site_header(site_title, render_nav(env.navigation.tree(), env.page_url)))
                main { (content) }
                footer.site-footer {
                    "© " (env.build_time.year()) " " (site_title)
                }
            }
        }
    }
}

fn site_header(site_title: &str, nav: Markup) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (site_title) }
            nav.site-nav { (nav) }
        }
    }
}

fn post_article(page: &Page, title: &str, content: &str, env: &RenderEnv<'_>) -> Markup {
    let trail = env
        .nav_key
        .map(|key| env.navigation.breadcrumbs(key, false))
        .unwrap_or_default();
    let date = page.item.date;
    html! {
        (render_breadcrumbs(&trail))
        article.post {
            header {
                h1 { (title) }
                @if let Some(date) = date {
                    time datetime=(date.format("%Y-%m-%d").to_string()) {
                        (date.format(POST_DATE_FORMAT).to_string())
                    }
                }
                @if !page.item.front_matter.tags.is_empty() {
                    ul.tags {
                        @for tag in &page.item.front_matter.tags {
                            li { (tag) }
                        }
                    }
                }
            }
            div.post-body { (PreEscaped(content)) }
        }
    }
}

/// Template context for one page.
///
/// Global data sits at the bottom, then `site` and `collections`, then the
/// page's own cascaded data, then the computed `page` object.
pub fn page_context(
    page: &Page,
    global_data: &Map<String, Value>,
    config: &SiteConfig,
    collections: &Value,
) -> Value {
    let mut context = global_data.clone();
    context.insert("site".to_string(), json!(config.site));
    context.insert("collections".to_string(), collections.clone());
    let mut context =
        front_matter::merge_data(Value::Object(context), Value::Object(page.item.data.clone()));

    let item = &page.item;
    if let Value::Object(map) = &mut context {
        map.insert(
            "page".to_string(),
            json!({
                "url": page.url,
                "inputPath": format!("./{}/{}", config.dir.input, item.input_path),
                "fileSlug": item.file_slug,
                "date": item.date.map(|d| d.format("%Y-%m-%d").to_string()),
                "outputPath": page.output_path,
            }),
        );
        map.entry("title".to_string())
            .or_insert_with(|| Value::String(item.title()));
    }
    context
}

/// Collections as template data: name → list of page summaries.
pub fn collections_context(pages: &[Page], collections: &crate::collections::Collections) -> Value {
    let mut map = Map::new();
    for name in collections.names() {
        let entries: Vec<Value> = collections
            .get(name)
            .iter()
            .map(|&i| {
                let page = &pages[i];
                json!({
                    "url": page.url,
                    "title": page.title(),
                    "date": page.item.date.map(|d| d.format("%Y-%m-%d").to_string()),
                    "inputPath": page.item.input_path,
                    "fileSlug": page.item.file_slug,
                })
            })
            .collect();
        map.insert(name.to_string(), Value::Array(entries));
    }
    Value::Object(map)
}
