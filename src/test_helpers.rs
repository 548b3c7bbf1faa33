//! Shared test utilities.
//!
//! Fixture setup, manifest lookups, page builders, and navigation tree
//! assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let manifest = scan(tmp.path(), &SiteConfig::default()).unwrap();
//! let post = find_item(&manifest, "posts/2024-01-15-first-post.md");
//!
//! let nav = Navigation::build(&pages);
//! assert_nav_shape(nav.tree(), &[
//!     ("home", &[]),
//!     ("about", &["first-post"]),
//! ]);
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::collections::Collections;
use crate::drafts::Resolved;
use crate::front_matter::{FrontMatter, NavEntry};
use crate::naming::parse_entry_name;
use crate::navigation::Navigation;
use crate::scan::{ContentItem, Manifest, TemplateFormat, parse_date};
use crate::site::default_url;
use crate::template::RenderEnv;
use crate::types::{NavItem, Page};
use chrono::{DateTime, Local, TimeZone};
use serde_json::Map;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Manifest lookups (panic with a clear message on miss)
// =========================================================================

/// Find a content item by input path. Panics if not found.
pub fn find_item<'a>(manifest: &'a Manifest, input_path: &str) -> &'a ContentItem {
    manifest
        .items
        .iter()
        .find(|i| i.input_path == input_path)
        .unwrap_or_else(|| {
            let paths = input_paths(manifest);
            panic!("item '{input_path}' not found. Available: {paths:?}")
        })
}

/// All input paths in manifest order.
pub fn input_paths(manifest: &Manifest) -> Vec<&str> {
    manifest.items.iter().map(|i| i.input_path.as_str()).collect()
}

// =========================================================================
// Builders
// =========================================================================

/// A routed, listed page at its default URL.
pub fn page(input_path: &str, date: Option<&str>, tags: &[&str]) -> Page {
    let file_name = input_path.rsplit('/').next().unwrap_or(input_path);
    let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, "md"));
    let format = TemplateFormat::from_extension(ext).unwrap_or(TemplateFormat::Markdown);
    let parsed = parse_entry_name(stem);
    let item = ContentItem {
        input_path: input_path.to_string(),
        format,
        file_slug: parsed.slug,
        date: date.and_then(parse_date).or(parsed.date),
        data: Map::new(),
        front_matter: FrontMatter {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..FrontMatter::default()
        },
        body: String::new(),
    };
    let url = default_url(&item);
    Page {
        output_path: Some(crate::site::output_for_url(&url)),
        url: Some(url),
        item,
        resolved: Resolved::default(),
    }
}

pub fn nav_entry(key: &str, parent: Option<&str>) -> NavEntry {
    NavEntry {
        key: key.to_string(),
        parent: parent.map(String::from),
        ..NavEntry::default()
    }
}

/// Owns everything a [`RenderEnv`] borrows.
pub struct TestEnv {
    pub build_time: DateTime<Local>,
    pub pages: Vec<Page>,
    pub collections: Collections,
    pub navigation: Navigation,
}

impl TestEnv {
    pub fn with_pages(pages: Vec<Page>) -> Self {
        let collections = Collections::build(&pages, &[]).unwrap();
        let navigation = Navigation::build(&pages);
        Self {
            build_time: fixed_build_time(),
            pages,
            collections,
            navigation,
        }
    }

    pub fn env(&self) -> RenderEnv<'_> {
        RenderEnv {
            build_time: self.build_time,
            pages: &self.pages,
            collections: &self.collections,
            navigation: &self.navigation,
            page_url: None,
            nav_key: None,
        }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::with_pages(Vec::new())
    }
}

/// 2026-10-17 12:00 local time.
pub fn fixed_build_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

// =========================================================================
// Navigation helpers
// =========================================================================

/// Keys of a list of nav items, in order.
pub fn nav_keys(items: &[NavItem]) -> Vec<&str> {
    items.iter().map(|n| n.key.as_str()).collect()
}

/// Child keys under a given nav parent. Panics if parent not found.
pub fn nav_children_keys<'a>(items: &'a [NavItem], parent_key: &str) -> Vec<&'a str> {
    items
        .iter()
        .find(|n| n.key == parent_key)
        .map(|n| nav_keys(&n.children))
        .unwrap_or_else(|| {
            let keys = nav_keys(items);
            panic!("nav item '{parent_key}' not found. Available: {keys:?}")
        })
}

/// Assert that a navigation tree matches an expected shape.
///
/// Each entry is `(key, children)`. Use `&[]` for leaf nodes.
pub fn assert_nav_shape(items: &[NavItem], expected: &[(&str, &[&str])]) {
    let actual = nav_keys(items);
    let expected_keys: Vec<&str> = expected.iter().map(|(k, _)| *k).collect();
    assert_eq!(actual, expected_keys, "nav top-level keys mismatch");

    for (key, children) in expected {
        let actual_children = nav_children_keys(items, key);
        assert_eq!(
            actual_children,
            children.to_vec(),
            "nav children of '{key}' mismatch"
        );
    }
}
