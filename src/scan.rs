//! Input directory scanning.
//!
//! Walks the input directory and produces a [`Manifest`] describing every
//! page template, stylesheet, and script, plus the global data. Nothing is
//! rendered here; the manifest is a pure description of the source tree.
//!
//! ## Directory Structure
//!
//! ```text
//! src/                             # Input directory
//! ├── _includes/                   # Layouts (skipped here, read by the renderer)
//! ├── _data/
//! │   └── site.json                # Global data → `site`
//! ├── assets/
//! │   ├── css/style.scss           # Stylesheet
//! │   ├── css/_vars.scss           # Partial (not compiled on its own)
//! │   └── js/index.js              # Script entry
//! ├── posts/
//! │   ├── posts.json               # Directory data for every file below posts/
//! │   ├── 2024-03-09-hello.md      # Dated post
//! │   └── draft-idea.md
//! ├── manifest.json                # JSON template
//! └── index.md
//! ```
//!
//! ## Data Cascade
//!
//! For each template, directory data files are merged from the outermost
//! directory inwards, then the template's own front matter is merged on top
//! (see [`front_matter::merge_data`]).
//!
//! ## Dates
//!
//! `date` from the cascade wins; otherwise a `YYYY-MM-DD-` filename prefix is
//! used; otherwise the item is undated.

use crate::config::SiteConfig;
use crate::front_matter::{self, FrontMatter, FrontMatterError};
use crate::naming::parse_entry_name;
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("input directory not found: {0}")]
    MissingInput(PathBuf),
    #[error("{path}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
    #[error("{path}: invalid JSON data: {source}")]
    DataFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: invalid date '{value}'")]
    InvalidDate { path: PathBuf, value: String },
}

/// Page template formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Markdown,
    Html,
    Json,
}

impl TemplateFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "md" => Some(TemplateFormat::Markdown),
            "html" => Some(TemplateFormat::Html),
            "json" => Some(TemplateFormat::Json),
            _ => None,
        }
    }
}

/// A page template with its cascaded data.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    /// Path relative to the input directory, `/`-separated.
    pub input_path: String,
    pub format: TemplateFormat,
    /// File stem without a date prefix.
    pub file_slug: String,
    pub date: Option<NaiveDate>,
    /// Merged cascade data as authored (directory data + front matter).
    pub data: Map<String, Value>,
    /// Typed view of `data`.
    #[serde(skip)]
    pub front_matter: FrontMatter,
    /// Template body without front matter.
    pub body: String,
}

impl ContentItem {
    /// Display title: authored `title`, else the slug with dashes as spaces.
    pub fn title(&self) -> String {
        self.front_matter
            .title
            .clone()
            .unwrap_or_else(|| parse_entry_name(&self.file_slug).display_title)
    }
}

/// Scan result.
#[derive(Debug, Default, Serialize)]
pub struct Manifest {
    pub items: Vec<ContentItem>,
    /// Stylesheets to compile (partials excluded), input-relative.
    pub stylesheets: Vec<String>,
    /// Every script found, input-relative.
    pub scripts: Vec<String>,
    /// `_data/<name>.json` contents keyed by `<name>`.
    pub global_data: Map<String, Value>,
}

/// Scan the input directory described by `config`.
pub fn scan(root: &Path, config: &SiteConfig) -> Result<Manifest, ScanError> {
    let input = config.dir.input_dir(root);
    if !input.is_dir() {
        return Err(ScanError::MissingInput(input));
    }
    let skip = SkipDirs {
        includes: config.dir.includes_dir(root),
        data: config.dir.data_dir(root),
        output: config.dir.output_dir(root),
    };

    let mut manifest = Manifest {
        global_data: load_global_data(&skip.data)?,
        ..Manifest::default()
    };
    let mut cascade = DirectoryData::default();

    let walker = WalkDir::new(&input)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !skip.skips(e.path()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let rel = relative_path(path, &input);
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "scss" => {
                if !file_name(path).starts_with('_') {
                    manifest.stylesheets.push(rel);
                }
            }
            "js" => manifest.scripts.push(rel),
            _ if config.is_template_format(&ext) => {
                if ext == "json" && DirectoryData::is_data_file(path) {
                    continue;
                }
                if let Some(format) = TemplateFormat::from_extension(&ext) {
                    let data = cascade.for_template(path, &input)?;
                    manifest.items.push(read_item(path, rel, format, data)?);
                }
            }
            _ => {}
        }
    }

    tracing::debug!(
        items = manifest.items.len(),
        stylesheets = manifest.stylesheets.len(),
        scripts = manifest.scripts.len(),
        "scan complete"
    );
    Ok(manifest)
}

/// Directories excluded from the template walk.
struct SkipDirs {
    includes: PathBuf,
    data: PathBuf,
    output: PathBuf,
}

impl SkipDirs {
    fn skips(&self, path: &Path) -> bool {
        let name = file_name(path);
        name.starts_with('.')
            || name == "node_modules"
            || path == self.includes
            || path == self.data
            || path == self.output
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Input-relative path with `/` separators.
pub fn relative_path(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_json(path: &Path) -> Result<Value, ScanError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ScanError::DataFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `_data/*.json` into a map keyed by file stem.
fn load_global_data(data_dir: &Path) -> Result<Map<String, Value>, ScanError> {
    let mut data = Map::new();
    if !data_dir.is_dir() {
        return Ok(data);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();
    for path in files {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        data.insert(stem, read_json(&path)?);
    }
    Ok(data)
}

/// Memoized directory data files (`<dir>/<dir>.json`).
#[derive(Default)]
struct DirectoryData {
    cache: HashMap<PathBuf, Option<Value>>,
}

impl DirectoryData {
    /// A JSON file named after its parent directory is directory data.
    fn is_data_file(path: &Path) -> bool {
        let stem = path.file_stem().map(|s| s.to_string_lossy());
        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy());
        matches!((stem, parent), (Some(s), Some(p)) if s == p)
    }

    fn load(&mut self, dir: &Path) -> Result<Option<Value>, ScanError> {
        if let Some(cached) = self.cache.get(dir) {
            return Ok(cached.clone());
        }
        let value = match dir.file_name() {
            Some(name) => {
                let file = dir.join(format!("{}.json", name.to_string_lossy()));
                if file.is_file() {
                    Some(read_json(&file)?)
                } else {
                    None
                }
            }
            None => None,
        };
        self.cache.insert(dir.to_path_buf(), value.clone());
        Ok(value)
    }

    /// Merged directory data for a template, outermost directory first.
    fn for_template(&mut self, path: &Path, input: &Path) -> Result<Value, ScanError> {
        let mut dirs: Vec<&Path> = path
            .ancestors()
            .skip(1)
            .take_while(|d| d.starts_with(input) && *d != input)
            .collect();
        dirs.reverse();

        let mut merged = Value::Object(Map::new());
        for dir in dirs {
            if let Some(data) = self.load(dir)? {
                merged = front_matter::merge_data(merged, data);
            }
        }
        Ok(merged)
    }
}

/// Parse an authored date: `YYYY-MM-DD` or RFC 3339.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
}

fn read_item(
    path: &Path,
    input_path: String,
    format: TemplateFormat,
    directory_data: Value,
) -> Result<ContentItem, ScanError> {
    let source = fs::read_to_string(path)?;
    let fm_error = |source| ScanError::FrontMatter {
        path: path.to_path_buf(),
        source,
    };

    let (data, body) = match format {
        TemplateFormat::Json => (directory_data, source),
        TemplateFormat::Markdown | TemplateFormat::Html => {
            let (raw, body) = front_matter::split(&source);
            let own = match raw {
                Some(yaml) => front_matter::parse_yaml(yaml).map_err(fm_error)?,
                None => Map::new(),
            };
            let body = body.to_string();
            (front_matter::merge_data(directory_data, Value::Object(own)), body)
        }
    };

    let front_matter = front_matter::from_data(data.clone()).map_err(fm_error)?;
    let data = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let parsed = parse_entry_name(&stem);

    let date = match &front_matter.date {
        Some(value) => Some(parse_date(value).ok_or_else(|| ScanError::InvalidDate {
            path: path.to_path_buf(),
            value: value.clone(),
        })?),
        None => parsed.date,
    };

    Ok(ContentItem {
        input_path,
        format,
        file_slug: parsed.slug,
        date,
        data,
        front_matter,
        body,
    })
}
