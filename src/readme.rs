//! Import the project README as a site page.
//!
//! `<root>/README.md` is copied to `<input>/README.md` with front matter that
//! puts it in the built-in base layout and third in the navigation.

use crate::config::SiteConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadmeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no README.md at {0}")]
    Missing(PathBuf),
}

const FRONT_MATTER: &str = "---
layout: layouts/base.html
pageTitle: README the page
eleventyNavigation:
  key: readme
  title: README
  order: 3
---
";

/// README contents with the page front matter prepended.
pub fn with_front_matter(readme: &str) -> String {
    format!("{FRONT_MATTER}\n{readme}")
}

/// Copy the README into the input directory. Returns the written path.
pub fn import(root: &Path, config: &SiteConfig) -> Result<PathBuf, ReadmeError> {
    let source = root.join("README.md");
    if !source.is_file() {
        return Err(ReadmeError::Missing(source));
    }
    let readme = fs::read_to_string(&source)?;
    let input = config.dir.input_dir(root);
    fs::create_dir_all(&input)?;
    let destination = input.join("README.md");
    fs::write(&destination, with_front_matter(&readme))?;
    tracing::info!(to = %destination.display(), "copied README.md with front matter");
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_matter;
    use tempfile::TempDir;

    #[test]
    fn front_matter_parses() {
        let text = with_front_matter("# Hello\n");
        let (yaml, body) = front_matter::split(&text);
        let data = front_matter::parse_yaml(yaml.unwrap()).unwrap();
        let fm = front_matter::from_data(serde_json::Value::Object(data)).unwrap();

        assert_eq!(fm.layout.as_deref(), Some("layouts/base.html"));
        let nav = fm.navigation.unwrap();
        assert_eq!(nav.key, "readme");
        assert_eq!(nav.title.as_deref(), Some("README"));
        assert_eq!(nav.order, Some(3));
        assert!(body.contains("# Hello"));
    }

    #[test]
    fn import_writes_into_input_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("README.md"), "# Project\n").unwrap();

        let written = import(tmp.path(), &SiteConfig::default()).unwrap();
        assert_eq!(written, tmp.path().join("src/README.md"));
        let text = fs::read_to_string(written).unwrap();
        assert!(text.starts_with("---\nlayout: layouts/base.html\n"));
        assert!(text.ends_with("# Project\n"));
    }

    #[test]
    fn missing_readme_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = import(tmp.path(), &SiteConfig::default());
        assert!(matches!(result, Err(ReadmeError::Missing(_))));
    }
}
