//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the project root (next to the input directory) and is optional: stock
//! defaults cover a conventional layout.
//!
//! ## Project Layout
//!
//! ```text
//! my-blog/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── README.md                # Imported by `simple-press readme`
//! └── src/                     # Input directory
//!     ├── _includes/           # Layouts
//!     ├── _data/               # Global data (site.json → `site`)
//!     ├── assets/              # Passthrough copy, SCSS, JS entry
//!     ├── posts/
//!     │   ├── posts.json       # Directory data for every post
//!     │   └── 2024-03-09-hello.md
//!     └── index.md
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! passthrough = ["src/assets"]   # Copied verbatim into the output directory
//!
//! [site]
//! title = "My Blog"
//! language = "en"
//!
//! [dir]
//! input = "src"
//! output = "dist"
//! includes = "_includes"          # Relative to input
//! data = "_data"                  # Relative to input
//!
//! [templates]
//! formats = ["md", "html", "json"]
//! markdown_engine = true          # Run template syntax before markdown
//! html_engine = true
//! data_engine = true
//!
//! [[collections]]
//! name = "posts"
//! glob = "posts/*.md"
//!
//! [styles]
//! enabled = true
//! command = ["sass"]
//! browserslist = "> 0.2% and not dead"
//! minify = true
//!
//! [scripts]
//! enabled = true
//! command = ["esbuild"]
//! entry = "assets/js/index.js"
//! target = "es2020"
//! minify = true
//!
//! [watch]
//! targets = ["src/assets/**/*.svg"]
//! debounce_ms = 150
//!
//! [server]
//! interface = "127.0.0.1"
//! port = 8080
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file in the project root.
pub const CONFIG_FILE: &str = "config.toml";

/// Matching rules for every configured glob: `*` and `?` stay within one
/// path segment, `**` crosses directories.
pub const GLOB_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site-wide metadata exposed to templates as `site`.
    pub site: SiteMeta,
    /// Input/output directory layout.
    pub dir: DirConfig,
    /// Files, directories, or globs (relative to the project root) copied
    /// verbatim into the output directory.
    pub passthrough: PassthroughList,
    /// Template formats and preprocessing.
    pub templates: TemplatesConfig,
    /// Glob-selected collections.
    pub collections: CollectionList,
    /// SCSS compilation.
    pub styles: StylesConfig,
    /// JavaScript bundling.
    pub scripts: ScriptsConfig,
    /// Extra watch targets and debounce.
    pub watch: WatchConfig,
    /// Development server.
    pub server: ServerConfig,
}

/// Passthrough entries. A newtype so the stock default is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassthroughList(pub Vec<String>);

impl Default for PassthroughList {
    fn default() -> Self {
        Self(vec!["src/assets".to_string()])
    }
}

/// Configured collections. A newtype so the stock default holds `posts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionList(pub Vec<CollectionConfig>);

impl Default for CollectionList {
    fn default() -> Self {
        Self(vec![CollectionConfig {
            name: "posts".to_string(),
            glob: "posts/*.md".to_string(),
        }])
    }
}

/// Site-wide metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    /// Site title, used by the built-in layouts.
    pub title: String,
    /// `lang` attribute of generated documents.
    pub language: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Directory layout. `includes` and `data` are relative to `input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirConfig {
    pub input: String,
    pub output: String,
    pub includes: String,
    pub data: String,
}

impl Default for DirConfig {
    fn default() -> Self {
        Self {
            input: "src".to_string(),
            output: "dist".to_string(),
            includes: "_includes".to_string(),
            data: "_data".to_string(),
        }
    }
}

impl DirConfig {
    pub fn input_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.input)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.output)
    }

    pub fn includes_dir(&self, root: &Path) -> PathBuf {
        self.input_dir(root).join(&self.includes)
    }

    pub fn data_dir(&self, root: &Path) -> PathBuf {
        self.input_dir(root).join(&self.data)
    }
}

/// Template formats rendered as pages, and which bodies run through the
/// template language before their format-specific processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Extensions treated as page templates (`md`, `html`, `json`).
    pub formats: Vec<String>,
    /// Expand template syntax in markdown before converting it.
    pub markdown_engine: bool,
    /// Expand template syntax in HTML templates.
    pub html_engine: bool,
    /// Expand template syntax in JSON templates.
    pub data_engine: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            formats: vec!["md".to_string(), "html".to_string(), "json".to_string()],
            markdown_engine: true,
            html_engine: true,
            data_engine: true,
        }
    }
}

/// A named collection selected by a glob on input-relative paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    pub name: String,
    pub glob: String,
}

/// SCSS → CSS settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    pub enabled: bool,
    /// Stylesheet compiler command; input arguments are appended.
    pub command: Vec<String>,
    /// Browserslist query resolving the CSS transform targets.
    pub browserslist: String,
    pub minify: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["sass".to_string()],
            browserslist: "> 0.2% and not dead".to_string(),
            minify: true,
        }
    }
}

/// JavaScript bundling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsConfig {
    pub enabled: bool,
    /// Bundler command; entry and flags are appended.
    pub command: Vec<String>,
    /// Entry point relative to the input directory. Other scripts are not
    /// compiled.
    pub entry: String,
    /// Bundler language target.
    pub target: String,
    pub minify: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["esbuild".to_string()],
            entry: "assets/js/index.js".to_string(),
            target: "es2020".to_string(),
            minify: true,
        }
    }
}

/// Watch settings for `watch` and `serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Globs relative to the project root, watched in addition to the input
    /// directory and the config file.
    pub targets: Vec<String>,
    /// Quiet period after the last change before rebuilding.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                "src/assets/**/*.svg".to_string(),
                "src/assets/**/*.webp".to_string(),
                "src/assets/**/*.png".to_string(),
                "src/assets/**/*.jpeg".to_string(),
                "src/assets/css/*.scss".to_string(),
                "src/assets/js/*.js".to_string(),
            ],
            debounce_ms: 150,
        }
    }
}

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub interface: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
        }
    }
}

impl SiteConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.input.is_empty() || self.dir.output.is_empty() {
            return Err(ConfigError::Validation(
                "dir.input and dir.output must not be empty".into(),
            ));
        }
        if self.dir.input == self.dir.output {
            return Err(ConfigError::Validation(
                "dir.input and dir.output must differ".into(),
            ));
        }
        for format in &self.templates.formats {
            if !matches!(format.as_str(), "md" | "html" | "json") {
                return Err(ConfigError::Validation(format!(
                    "templates.formats: unsupported format '{format}'"
                )));
            }
        }
        let mut names = std::collections::HashSet::new();
        for collection in &self.collections.0 {
            if collection.name.is_empty() || collection.name == "all" {
                return Err(ConfigError::Validation(format!(
                    "collections: invalid name '{}'",
                    collection.name
                )));
            }
            if !names.insert(collection.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "collections: duplicate name '{}'",
                    collection.name
                )));
            }
            glob::Pattern::new(&collection.glob).map_err(|e| {
                ConfigError::Validation(format!("collections.{}: {e}", collection.name))
            })?;
        }
        for target in &self.watch.targets {
            glob::Pattern::new(target)
                .map_err(|e| ConfigError::Validation(format!("watch.targets: {e}")))?;
        }
        if self.styles.enabled && self.styles.command.is_empty() {
            return Err(ConfigError::Validation(
                "styles.command must not be empty".into(),
            ));
        }
        if self.scripts.enabled && (self.scripts.command.is_empty() || self.scripts.entry.is_empty())
        {
            return Err(ConfigError::Validation(
                "scripts.command and scripts.entry must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Whether the given extension is a configured page template format.
    pub fn is_template_format(&self, ext: &str) -> bool {
        self.templates.formats.iter().any(|f| f == ext)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file path.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-press configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# Files, directories, or globs (relative to this file) copied verbatim into
# the output directory. The input directory prefix is stripped:
# src/assets/img/a.png -> dist/assets/img/a.png
passthrough = ["src/assets"]

# ---------------------------------------------------------------------------
# Site metadata (available to templates as `site`)
# ---------------------------------------------------------------------------
[site]
title = "My Blog"
language = "en"

# ---------------------------------------------------------------------------
# Directories
# ---------------------------------------------------------------------------
[dir]
input = "src"
output = "dist"
# Layouts, relative to the input directory.
includes = "_includes"
# Global data files (*.json), relative to the input directory.
data = "_data"

# ---------------------------------------------------------------------------
# Templates
# ---------------------------------------------------------------------------
[templates]
# Extensions rendered as pages.
formats = ["md", "html", "json"]
# Expand {{ }} and {% %} syntax before format-specific processing.
markdown_engine = true
html_engine = true
data_engine = true

# ---------------------------------------------------------------------------
# Collections (globs relative to the input directory)
# Every tag also forms a collection; `all` holds every listed page.
# ---------------------------------------------------------------------------
[[collections]]
name = "posts"
glob = "posts/*.md"

# ---------------------------------------------------------------------------
# Stylesheets: *.scss (except _partials) -> *.css
# ---------------------------------------------------------------------------
[styles]
enabled = true
command = ["sass"]
browserslist = "> 0.2% and not dead"
minify = true

# ---------------------------------------------------------------------------
# Scripts: a single bundled entry point
# ---------------------------------------------------------------------------
[scripts]
enabled = true
command = ["esbuild"]
entry = "assets/js/index.js"
target = "es2020"
minify = true

# ---------------------------------------------------------------------------
# Watch mode
# ---------------------------------------------------------------------------
[watch]
# Extra globs (relative to this file) that trigger a rebuild.
targets = [
  "src/assets/**/*.svg",
  "src/assets/**/*.webp",
  "src/assets/**/*.png",
  "src/assets/**/*.jpeg",
  "src/assets/css/*.scss",
  "src/assets/js/*.js",
]
debounce_ms = 150

# ---------------------------------------------------------------------------
# Development server
# ---------------------------------------------------------------------------
[server]
interface = "127.0.0.1"
port = 8080
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_conventional_dirs() {
        let config = SiteConfig::default();
        assert_eq!(config.dir.input, "src");
        assert_eq!(config.dir.output, "dist");
        assert_eq!(config.dir.includes, "_includes");
        assert_eq!(config.passthrough.0, vec!["src/assets"]);
    }

    #[test]
    fn default_config_has_posts_collection() {
        let config = SiteConfig::default();
        assert_eq!(config.collections.0.len(), 1);
        assert_eq!(config.collections.0[0].name, "posts");
        assert_eq!(config.collections.0[0].glob, "posts/*.md");
    }

    #[test]
    fn parse_partial_config() {
        let config: SiteConfig = toml::from_str(
            r#"
[dir]
output = "public"
"#,
        )
        .unwrap();
        assert_eq!(config.dir.output, "public");
        assert_eq!(config.dir.input, "src");
        assert_eq!(config.styles.browserslist, "> 0.2% and not dead");
    }

    #[test]
    fn template_formats() {
        let config = SiteConfig::default();
        assert!(config.is_template_format("md"));
        assert!(config.is_template_format("json"));
        assert!(!config.is_template_format("scss"));
    }

    #[test]
    fn dir_helpers_join_root() {
        let config = SiteConfig::default();
        let root = Path::new("/site");
        assert_eq!(config.dir.input_dir(root), Path::new("/site/src"));
        assert_eq!(config.dir.output_dir(root), Path::new("/site/dist"));
        assert_eq!(config.dir.includes_dir(root), Path::new("/site/src/_includes"));
        assert_eq!(config.dir.data_dir(root), Path::new("/site/src/_data"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.title, "My Blog");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
passthrough = ["src/fonts", "src/favicon.ico"]

[site]
title = "Notes"

[server]
port = 9000
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.site.title, "Notes");
        assert_eq!(config.site.language, "en");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.passthrough.0, vec!["src/fonts", "src/favicon.ico"]);
    }

    #[test]
    fn load_config_replaces_collection_list() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[[collections]]
name = "notes"
glob = "notes/**/*.md"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let names: Vec<&str> = config.collections.0.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["notes"]);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[server]
interface = "127.0.0.1"
port = 8080
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[server]\nport = 3000").unwrap();
        let merged = merge_toml(base, overlay);
        let server = merged.get("server").unwrap();
        assert_eq!(server.get("port").unwrap().as_integer(), Some(3000));
        assert_eq!(server.get("interface").unwrap().as_str(), Some("127.0.0.1"));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let base: toml::Value = toml::from_str(r#"passthrough = ["a", "b"]"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"passthrough = ["c"]"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("passthrough").unwrap().as_array().unwrap().len(), 1);
    }

    // =========================================================================
    // Unknown key rejection and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[dir]\ninptu = \"src\"");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[images]\nquality = 90");
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_same_input_and_output() {
        let mut config = SiteConfig::default();
        config.dir.output = "src".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_unsupported_format() {
        let mut config = SiteConfig::default();
        config.templates.formats.push("njk".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("njk"));
    }

    #[test]
    fn validate_rejects_reserved_collection_name() {
        let mut config = SiteConfig::default();
        config.collections.0.push(CollectionConfig {
            name: "all".to_string(),
            glob: "**/*.md".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_glob() {
        let mut config = SiteConfig::default();
        config.watch.targets.push("src/[".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_style_command() {
        let mut config = SiteConfig::default();
        config.styles.command.clear();
        assert!(config.validate().is_err());
        config.styles.enabled = false;
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.dir, defaults.dir);
        assert_eq!(config.templates, defaults.templates);
        assert_eq!(config.collections, defaults.collections);
        assert_eq!(config.styles, defaults.styles);
        assert_eq!(config.scripts, defaults.scripts);
        assert_eq!(config.watch, defaults.watch);
        assert_eq!(config.server, defaults.server);
        assert_eq!(config.passthrough, defaults.passthrough);
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        for key in ["site", "dir", "templates", "styles", "scripts", "watch", "server"] {
            assert!(val.get(key).is_some(), "missing section {key}");
        }
    }
}
