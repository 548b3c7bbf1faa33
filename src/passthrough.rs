//! Passthrough copy.
//!
//! Each `passthrough` entry is a file, a directory, or a glob, relative to
//! the project root. Matching files are copied verbatim into the output
//! directory. Paths under the input directory lose that prefix, so the stock
//! entry `src/assets` lands at `dist/assets`.

use crate::config::{GLOB_OPTIONS, SiteConfig};
use crate::scan::relative_path;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PassthroughError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("passthrough '{entry}': invalid glob: {source}")]
    Glob {
        entry: String,
        #[source]
        source: glob::PatternError,
    },
}

/// A copied file, both paths relative to their roots.
#[derive(Debug, Clone, PartialEq)]
pub struct Copied {
    pub from: String,
    pub to: String,
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

/// Resolve every passthrough entry to `(source file, output-relative path)`.
pub fn plan(root: &Path, config: &SiteConfig) -> Result<Vec<(PathBuf, String)>, PassthroughError> {
    let input = config.dir.input_dir(root);
    let output = config.dir.output_dir(root);
    let destination = |file: &Path| {
        if file.starts_with(&input) {
            relative_path(file, &input)
        } else {
            relative_path(file, root)
        }
    };

    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for entry in &config.passthrough.0 {
        let entry = entry.trim_start_matches("./");
        if is_glob(entry) {
            let matcher = Pattern::new(entry).map_err(|source| PassthroughError::Glob {
                entry: entry.to_string(),
                source,
            })?;
            for item in WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| e.path() != output) {
                let item = item?;
                if item.file_type().is_file() && matcher.matches_with(&relative_path(item.path(), root), GLOB_OPTIONS) {
                    files.push((item.path().to_path_buf(), destination(item.path())));
                }
            }
            continue;
        }

        let path = root.join(entry);
        if path.is_file() {
            files.push((path.clone(), destination(&path)));
        } else if path.is_dir() {
            for item in WalkDir::new(&path).sort_by_file_name() {
                let item = item?;
                if item.file_type().is_file() {
                    files.push((item.path().to_path_buf(), destination(item.path())));
                }
            }
        } else {
            tracing::warn!(entry = %entry, "passthrough entry matches nothing");
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Copy passthrough files into the output directory.
pub fn copy(root: &Path, config: &SiteConfig) -> Result<Vec<Copied>, PassthroughError> {
    let output = config.dir.output_dir(root);
    let mut copied = Vec::new();
    for (source, rel) in plan(root, config)? {
        let dest = output.join(&rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &dest)?;
        tracing::debug!(from = %source.display(), to = %rel, "copied");
        copied.push(Copied {
            from: relative_path(&source, root),
            to: rel,
        });
    }
    Ok(copied)
}
