//! Stylesheet and script compilation.
//!
//! Both run external tools through [`crate::exec`] and write their results
//! into the output directory at the input-relative path (stylesheets with a
//! `.css` extension). Compilation runs after passthrough copy, so compiled
//! files replace any raw copies of the same path.

pub mod scripts;
pub mod styles;

use crate::config::SiteConfig;
use crate::exec::ExecError;
use crate::render::AssetLinks;
use crate::scan::Manifest;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("{path}: CSS error: {message}")]
    Css { path: String, message: String },
    #[error("invalid browserslist query '{query}': {message}")]
    Browserslist { query: String, message: String },
    #[error("script entry not found: {0}")]
    MissingEntry(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stylesheet,
    Script,
}

/// One compiled output file.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledAsset {
    pub kind: AssetKind,
    pub input: String,
    pub output: String,
    pub bytes: usize,
    /// Stylesheet imports, input-relative.
    pub dependencies: Vec<String>,
}

/// Public URLs of the assets this build will produce.
pub fn links(manifest: &Manifest, config: &SiteConfig) -> AssetLinks {
    let stylesheets = if config.styles.enabled {
        manifest
            .stylesheets
            .iter()
            .map(|s| format!("/{}", styles::output_path(s)))
            .collect()
    } else {
        Vec::new()
    };
    let script = manifest
        .scripts
        .iter()
        .find(|s| config.scripts.enabled && scripts::is_entry(s, &config.scripts))
        .map(|s| format!("/{s}"));
    AssetLinks {
        stylesheets,
        script,
    }
}

fn write_output(output_dir: &Path, rel: &str, bytes: &[u8]) -> Result<(), AssetError> {
    let dest = output_dir.join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, bytes)?;
    Ok(())
}

/// Compile every stylesheet and the script entry.
pub fn compile_all(
    manifest: &Manifest,
    input_dir: &Path,
    output_dir: &Path,
    config: &SiteConfig,
) -> Result<Vec<CompiledAsset>, AssetError> {
    let mut compiled: Vec<CompiledAsset> = Vec::new();

    if config.styles.enabled {
        let sheets = manifest
            .stylesheets
            .par_iter()
            .map(|rel| -> Result<CompiledAsset, AssetError> {
                let source = fs::read_to_string(input_dir.join(rel))?;
                let css = styles::compile(input_dir, rel, &config.styles)?;
                let output = styles::output_path(rel);
                write_output(output_dir, &output, css.as_bytes())?;
                tracing::info!(input = %rel, output = %output, "compiled stylesheet");
                Ok(CompiledAsset {
                    kind: AssetKind::Stylesheet,
                    input: rel.clone(),
                    output,
                    bytes: css.len(),
                    dependencies: styles::dependencies(input_dir, rel, &source),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        compiled.extend(sheets);
    }

    if config.scripts.enabled {
        let entry = manifest
            .scripts
            .iter()
            .find(|s| scripts::is_entry(s, &config.scripts));
        match entry {
            Some(rel) => {
                let bundle = scripts::bundle(input_dir, &config.scripts)?;
                write_output(output_dir, rel, &bundle)?;
                tracing::info!(input = %rel, "bundled script");
                compiled.push(CompiledAsset {
                    kind: AssetKind::Script,
                    input: rel.clone(),
                    output: rel.clone(),
                    bytes: bundle.len(),
                    dependencies: Vec::new(),
                });
            }
            None if !manifest.scripts.is_empty() => {
                tracing::debug!(entry = %config.scripts.entry, "no script entry, nothing bundled");
            }
            None => {}
        }
    }

    Ok(compiled)
}
