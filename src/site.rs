//! One full site build.
//!
//! ```text
//! scan → resolve drafts → route → collections + navigation
//!      → render pages (parallel) → clean → passthrough copy
//!      → write pages → compile assets
//! ```
//!
//! Every stage up to rendering leaves the output directory alone. `check`
//! runs exactly those stages and writes nothing.
//!
//! ## Routing
//!
//! | Input | URL | Output file |
//! |-------|-----|-------------|
//! | `index.md` | `/` | `index.html` |
//! | `about.md` | `/about/` | `about/index.html` |
//! | `posts/2024-01-15-hello.md` | `/posts/hello/` | `posts/hello/index.html` |
//! | `feed.json` | `/feed.json` | `feed.json` |
//! | `permalink: /blog/{{ page.fileSlug }}/` | `/blog/hello/` | `blog/hello/index.html` |
//! | `permalink: false`, or a hidden draft | none | none |

use crate::assets::{self, AssetError, CompiledAsset};
use crate::collections::{CollectionError, Collections};
use crate::config::SiteConfig;
use crate::drafts::{self, Resolved};
use crate::front_matter::Permalink;
use crate::mode::BuildContext;
use crate::navigation::Navigation;
use crate::passthrough::{self, PassthroughError};
use crate::render::{self, Layouts, RenderError, Renderer};
use crate::scan::{self, ContentItem, ScanError, TemplateFormat};
use crate::template::{Registry, RenderEnv, TemplateError};
use crate::types::{NavItem, Page};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Collections failed: {0}")]
    Collection(#[from] CollectionError),
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("Asset compilation failed: {0}")]
    Asset(#[from] AssetError),
    #[error("Passthrough copy failed: {0}")]
    Passthrough(#[from] PassthroughError),
    #[error("{path}: permalink: {source}")]
    Permalink {
        path: String,
        #[source]
        source: TemplateError,
    },
    #[error("{path}: invalid permalink '{permalink}'")]
    InvalidPermalink { path: String, permalink: String },
    #[error("output '{output}' is written by both {first} and {second}")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },
    #[error("refusing to clean {0}: it contains the project root")]
    UnsafeClean(PathBuf),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Remove the output directory before building.
    pub clean: bool,
}

/// One written page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutput {
    pub input: String,
    pub url: String,
    pub output: String,
}

/// Summary of a build (or a check, with nothing written).
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub drafts_enabled: bool,
    pub pages: Vec<PageOutput>,
    /// Items with `permalink: false`.
    pub not_routed: Vec<String>,
    /// Drafts hidden from this build.
    pub drafts_hidden: Vec<String>,
    pub collections: Vec<(String, usize)>,
    pub navigation: Vec<NavItem>,
    pub assets: Vec<CompiledAsset>,
    pub copied: usize,
}

/// Everything known about the site before anything is rendered.
pub struct SiteIndex {
    pub pages: Vec<Page>,
    pub collections: Collections,
    pub navigation: Navigation,
    pub global_data: Map<String, Value>,
    pub manifest: scan::Manifest,
}

/// Default URL of an item without an authored permalink.
pub fn default_url(item: &ContentItem) -> String {
    if item.format == TemplateFormat::Json {
        return format!("/{}", item.input_path);
    }
    let dir = match item.input_path.rsplit_once('/') {
        Some((dir, _)) => format!("/{dir}/"),
        None => "/".to_string(),
    };
    if item.file_slug == "index" {
        dir
    } else {
        format!("{dir}{}/", item.file_slug)
    }
}

/// Output file for a URL: directory URLs get `index.html`.
pub fn output_for_url(url: &str) -> String {
    let path = url.trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        format!("{path}index.html")
    } else {
        path.to_string()
    }
}

/// Normalize an expanded permalink into a URL, rejecting escapes.
fn permalink_url(path: &str, permalink: &str) -> Result<String, BuildError> {
    let trimmed = permalink.trim();
    let invalid = || BuildError::InvalidPermalink {
        path: path.to_string(),
        permalink: permalink.to_string(),
    };
    if trimmed.is_empty() || trimmed.contains("://") {
        return Err(invalid());
    }
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(invalid());
    }
    Ok(if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    })
}

/// Route one resolved item to `(url, output path)`, or `None` when it must
/// not be written.
fn route(
    item: &ContentItem,
    resolved: &Resolved,
    registry: &Registry,
    context: &Value,
    env: &RenderEnv<'_>,
) -> Result<Option<(String, String)>, BuildError> {
    let url = match &resolved.permalink {
        Some(Permalink::Enabled(false)) => return Ok(None),
        None | Some(Permalink::Enabled(true)) => default_url(item),
        Some(Permalink::Path(template)) => {
            let expanded = registry
                .render_str(template, context, env)
                .map_err(|source| BuildError::Permalink {
                    path: item.input_path.clone(),
                    source,
                })?;
            permalink_url(&item.input_path, &expanded)?
        }
    };
    let output = output_for_url(&url);
    Ok(Some((url, output)))
}

/// Scan, resolve, route, and index the site.
pub fn prepare(
    root: &Path,
    config: &SiteConfig,
    ctx: &BuildContext,
    registry: &Registry,
) -> Result<SiteIndex, BuildError> {
    tracing::debug!(mode = %ctx.run_mode(), drafts = ctx.drafts_enabled(), "preparing site");
    let mut manifest = scan::scan(root, config)?;
    let items = std::mem::take(&mut manifest.items);

    let empty_collections = Collections::default();
    let empty_navigation = Navigation::default();
    let routing_env = RenderEnv {
        build_time: ctx.build_time,
        pages: &[],
        collections: &empty_collections,
        navigation: &empty_navigation,
        page_url: None,
        nav_key: None,
    };
    let no_collections = Value::Object(Map::new());

    let mut pages: Vec<Page> = Vec::with_capacity(items.len());
    let mut outputs: HashMap<String, String> = HashMap::new();
    for item in items {
        let resolved = drafts::resolve(&item.front_matter, ctx.drafts_enabled());
        let mut page = Page {
            item,
            resolved,
            url: None,
            output_path: None,
        };
        let context = render::page_context(&page, &manifest.global_data, config, &no_collections);
        if let Some((url, output)) = route(&page.item, &page.resolved, registry, &context, &routing_env)? {
            if let Some(first) = outputs.insert(output.clone(), page.item.input_path.clone()) {
                return Err(BuildError::DuplicateOutput {
                    output,
                    first,
                    second: page.item.input_path.clone(),
                });
            }
            page.url = Some(url);
            page.output_path = Some(output);
        } else if page.is_hidden_draft() {
            tracing::debug!(page = %page.item.input_path, "draft hidden");
        }
        pages.push(page);
    }

    let collections = Collections::build(&pages, &config.collections.0)?;
    let navigation = Navigation::build(&pages);
    let global_data = std::mem::take(&mut manifest.global_data);

    Ok(SiteIndex {
        pages,
        collections,
        navigation,
        global_data,
        manifest,
    })
}

/// Render every routed page in parallel, returning `(page index, output text)`.
fn render_pages(
    index: &SiteIndex,
    config: &SiteConfig,
    ctx: &BuildContext,
    registry: &Registry,
    layouts: &Layouts,
) -> Result<Vec<(usize, String)>, BuildError> {
    let assets = assets::links(&index.manifest, config);
    let renderer = Renderer {
        registry,
        layouts,
        config,
        assets: &assets,
    };
    let collections_value = render::collections_context(&index.pages, &index.collections);

    index
        .pages
        .par_iter()
        .enumerate()
        .filter(|(_, page)| page.url.is_some())
        .map(|(i, page)| -> Result<(usize, String), BuildError> {
            let env = RenderEnv {
                build_time: ctx.build_time,
                pages: &index.pages,
                collections: &index.collections,
                navigation: &index.navigation,
                page_url: page.url.as_deref(),
                nav_key: page.nav_key(),
            };
            let context = render::page_context(page, &index.global_data, config, &collections_value);
            let text = renderer.render_page(page, &context, &env)?;
            Ok((i, text))
        })
        .collect()
}

fn report_for(index: &SiteIndex, config: &SiteConfig, root: &Path, ctx: &BuildContext) -> BuildReport {
    let mut report = BuildReport {
        output_dir: config.dir.output_dir(root),
        drafts_enabled: ctx.drafts_enabled(),
        collections: index.collections.sizes(),
        navigation: index.navigation.tree().to_vec(),
        ..BuildReport::default()
    };
    for page in &index.pages {
        match (&page.url, &page.output_path) {
            (Some(url), Some(output)) => report.pages.push(PageOutput {
                input: page.item.input_path.clone(),
                url: url.clone(),
                output: output.clone(),
            }),
            _ if page.is_hidden_draft() => report.drafts_hidden.push(page.item.input_path.clone()),
            _ => report.not_routed.push(page.item.input_path.clone()),
        }
    }
    report
}

/// Validate the site without writing anything: every page is scanned,
/// routed, and rendered in memory.
pub fn check(root: &Path, config: &SiteConfig, ctx: &BuildContext) -> Result<BuildReport, BuildError> {
    let registry = Registry::with_builtins();
    let index = prepare(root, config, ctx, &registry)?;
    let layouts = Layouts::load(&config.dir.includes_dir(root))?;
    render_pages(&index, config, ctx, &registry, &layouts)?;
    Ok(report_for(&index, config, root, ctx))
}

fn clean_output(root: &Path, output: &Path) -> Result<(), BuildError> {
    if !output.exists() {
        return Ok(());
    }
    let output_abs = fs::canonicalize(output)?;
    let root_abs = fs::canonicalize(root)?;
    if root_abs.starts_with(&output_abs) {
        return Err(BuildError::UnsafeClean(output.to_path_buf()));
    }
    fs::remove_dir_all(output)?;
    tracing::info!(dir = %output.display(), "cleaned output directory");
    Ok(())
}

/// Run one full build and write the site.
pub fn build(
    root: &Path,
    config: &SiteConfig,
    ctx: &BuildContext,
    options: BuildOptions,
) -> Result<BuildReport, BuildError> {
    let registry = Registry::with_builtins();
    let index = prepare(root, config, ctx, &registry)?;
    let layouts = Layouts::load(&config.dir.includes_dir(root))?;
    let output_dir = config.dir.output_dir(root);

    // Render before touching the output so a template error leaves the
    // previous build in place.
    let rendered = render_pages(&index, config, ctx, &registry, &layouts)?;

    if options.clean {
        clean_output(root, &output_dir)?;
    }
    fs::create_dir_all(&output_dir)?;

    let copied = passthrough::copy(root, config)?;

    for (i, text) in &rendered {
        let Some(output) = index.pages[*i].output_path.as_deref() else {
            continue;
        };
        let dest = output_dir.join(output);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, text)?;
        tracing::debug!(output = %output, "wrote page");
    }

    let compiled = assets::compile_all(&index.manifest, &config.dir.input_dir(root), &output_dir, config)?;

    let mut report = report_for(&index, config, root, ctx);
    report.copied = copied.len();
    report.assets = compiled;
    tracing::info!(
        pages = report.pages.len(),
        drafts_hidden = report.drafts_hidden.len(),
        assets = report.assets.len(),
        copied = report.copied,
        "build complete"
    );
    Ok(report)
}
