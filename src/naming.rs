//! Filename parsing for content files.
//!
//! Posts commonly carry their publication date in the filename:
//! `2024-03-09-hello-world.md`. This module splits such a stem into the date
//! and the remaining slug, and derives display titles from slugs.
//!
//! ## Examples
//!
//! - `2024-03-09-hello-world` → date=2024-03-09, slug="hello-world"
//! - `hello-world` → date=None, slug="hello-world"
//! - `2024-13-40-bad` → date=None, slug="2024-13-40-bad" (not a valid date)
//! - `index` → date=None, slug="index"

use chrono::NaiveDate;

/// Result of parsing a content file stem like `2024-03-09-hello-world`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Date prefix if present and valid.
    pub date: Option<NaiveDate>,
    /// Stem with the date prefix removed. The full input when undated.
    pub slug: String,
    /// Slug with dashes converted to spaces.
    pub display_title: String,
}

/// Length of a `YYYY-MM-DD` prefix.
const DATE_PREFIX_LEN: usize = 10;

/// Parse a file stem following the optional `YYYY-MM-DD-slug` convention.
pub fn parse_entry_name(stem: &str) -> ParsedName {
    let has_prefix = stem.len() > DATE_PREFIX_LEN
        && stem.is_char_boundary(DATE_PREFIX_LEN)
        && stem.as_bytes()[DATE_PREFIX_LEN] == b'-';
    if has_prefix {
        let date = NaiveDate::parse_from_str(&stem[..DATE_PREFIX_LEN], "%Y-%m-%d").ok();
        let slug = &stem[DATE_PREFIX_LEN + 1..];
        if let (Some(date), false) = (date, slug.is_empty()) {
            return ParsedName {
                date: Some(date),
                slug: slug.to_string(),
                display_title: slug.replace('-', " "),
            };
        }
    }
    ParsedName {
        date: None,
        slug: stem.to_string(),
        display_title: stem.replace('-', " "),
    }
}

/// Turn arbitrary text into a URL-safe slug.
///
/// Lowercases, replaces runs of non-alphanumeric characters with a single
/// dash, and trims dashes from both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
