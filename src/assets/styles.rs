//! SCSS compilation.
//!
//! Each stylesheet goes through two steps:
//!
//! 1. the external compiler (stock `sass`), run as
//!    `sass --no-source-map --load-path <dir> <file>` with CSS read from stdout
//! 2. lightningcss: parse, lower for the browserslist targets, and print
//!    (minified unless `[styles] minify = false`)
//!
//! Partials (`_name.scss`) are never compiled on their own; the scanner
//! leaves them out.

use super::AssetError;
use crate::config::StylesConfig;
use crate::exec::Cmd;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(?:use|import|forward)\s+["']([^"']+)["']"#).expect("valid import regex")
});

/// Output path for a stylesheet: same relative path, `.css` extension.
pub fn output_path(input_rel: &str) -> String {
    match input_rel.strip_suffix(".scss") {
        Some(stem) => format!("{stem}.css"),
        None => format!("{input_rel}.css"),
    }
}

/// Compile one stylesheet to final CSS.
pub fn compile(input_dir: &Path, input_rel: &str, config: &StylesConfig) -> Result<String, AssetError> {
    let file = input_dir.join(input_rel);
    let load_path = file.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let css = Cmd::from_slice(&config.command)
        .arg("--no-source-map")
        .arg("--load-path")
        .arg(&load_path)
        .arg(&file)
        .run_to_string()?;
    transform(&css, input_rel, &config.browserslist, config.minify)
}

/// Resolve browserslist targets. An empty query means no lowering.
pub fn targets(query: &str) -> Result<Targets, AssetError> {
    if query.trim().is_empty() {
        return Ok(Targets::default());
    }
    let browsers = Browsers::from_browserslist([query]).map_err(|e| AssetError::Browserslist {
        query: query.to_string(),
        message: e.to_string(),
    })?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Parse, lower, and print CSS with lightningcss.
pub fn transform(css: &str, filename: &str, browserslist: &str, minify: bool) -> Result<String, AssetError> {
    let css_error = |message: String| AssetError::Css {
        path: filename.to_string(),
        message,
    };
    let targets = targets(browserslist)?;

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| css_error(e.to_string()))?;

    if minify {
        sheet
            .minify(MinifyOptions {
                targets: targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| css_error(e.to_string()))?;
    }

    let result = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;
    Ok(result.code)
}

/// Files a stylesheet pulls in through `@use`, `@forward`, or `@import`.
///
/// Targets are resolved the way Sass does for local files: `name.scss`,
/// `_name.scss`, then `name/_index.scss`. Built-in modules (`sass:math`),
/// URLs, and unresolvable targets are skipped. Paths are input-relative.
pub fn dependencies(input_dir: &Path, input_rel: &str, source: &str) -> Vec<String> {
    let dir = input_dir
        .join(input_rel)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input_dir.to_path_buf());

    let mut deps: Vec<String> = IMPORT
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|target| !target.starts_with("sass:") && !target.contains("://"))
        .filter_map(|target| resolve_import(&dir, target))
        .map(|path| crate::scan::relative_path(&path, input_dir))
        .collect();
    deps.sort();
    deps.dedup();
    deps
}

fn resolve_import(dir: &Path, target: &str) -> Option<PathBuf> {
    let (parent, name) = match target.rsplit_once('/') {
        Some((parent, name)) => (dir.join(parent), name),
        None => (dir.to_path_buf(), target),
    };
    let name = name.strip_suffix(".scss").unwrap_or(name);
    let candidates = [
        parent.join(format!("{name}.scss")),
        parent.join(format!("_{name}.scss")),
        parent.join(name).join("_index.scss"),
        parent.join(name).join("index.scss"),
    ];
    candidates.into_iter().find(|p| p.is_file())
}
