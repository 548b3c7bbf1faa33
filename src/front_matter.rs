//! Front matter parsing and the data cascade.
//!
//! Markdown and HTML templates may start with a YAML block delimited by `---`
//! lines. Its keys are merged on top of directory data (see
//! [`merge_data`]) and the result is deserialized into [`FrontMatter`].
//!
//! ```text
//! ---
//! title: Hello
//! date: 2024-03-09
//! tags: [rust, web]
//! draft: true
//! eleventyNavigation:
//!   key: hello
//!   parent: blog
//! ---
//! # Body starts here
//! ```
//!
//! The key names `eleventyExcludeFromCollections` and `eleventyNavigation`
//! are kept as-is so existing content works unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid front matter field: {0}")]
    Field(#[from] serde_json::Error),
    #[error("front matter must be a mapping")]
    NotAMapping,
}

/// Routing directive for a content item.
///
/// `Enabled(false)` means "do not write output"; `Enabled(true)` asks for the
/// default route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Permalink {
    Enabled(bool),
    Path(String),
}

impl Permalink {
    /// True when the item must not be routed.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Permalink::Enabled(false))
    }
}

/// Hierarchical navigation entry (`eleventyNavigation`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavEntry {
    pub key: String,
    pub title: Option<String>,
    pub parent: Option<String>,
    pub order: Option<i64>,
    /// Overrides the page URL, e.g. for external links.
    pub url: Option<String>,
}

/// Authored data of a content item after the data cascade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    /// Publication date as authored (`2024-03-09` or RFC 3339).
    #[serde(deserialize_with = "deserialize_scalar_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "deserialize_truthy")]
    pub draft: Option<bool>,
    pub permalink: Option<Permalink>,
    #[serde(rename = "eleventyExcludeFromCollections")]
    pub exclude_from_collections: Option<bool>,
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    pub layout: Option<String>,
    #[serde(rename = "eleventyNavigation")]
    pub navigation: Option<NavEntry>,
    /// Every other key, available to templates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FrontMatter {
    /// `draft` is treated as false when absent.
    pub fn is_draft(&self) -> bool {
        self.draft.unwrap_or(false)
    }
}

/// Tags may be a single string or a list; `null` is empty.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<Tags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tags::One(tag)) => vec![tag],
        Some(Tags::Many(tags)) => tags,
    })
}

/// Any scalar counts: `false`, `0`, `""` and `null` are false, everything
/// else (including the string `"false"`) is true.
fn deserialize_truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Some(Value::String(s)) => Some(!s.is_empty()),
        Some(_) => Some(true),
    })
}

/// Dates may arrive as strings or, from JSON data files, as numbers.
fn deserialize_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Split a template source into its raw front matter block and body.
///
/// Returns `(None, source)` when the source does not open with `---`.
pub fn split(source: &str) -> (Option<&str>, &str) {
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return (None, source);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, source)
}

/// Parse a raw YAML block into a JSON object.
pub fn parse_yaml(yaml: &str) -> Result<Map<String, Value>, FrontMatterError> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(FrontMatterError::NotAMapping),
    }
}

/// Deep-merge `overlay` on top of `base`.
///
/// - Objects merge key by key.
/// - Arrays concatenate, skipping values already present.
/// - Anything else in `overlay` replaces `base`.
pub fn merge_data(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_data(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (Value::Array(mut base_items), Value::Array(overlay_items)) => {
            for item in overlay_items {
                if !base_items.contains(&item) {
                    base_items.push(item);
                }
            }
            Value::Array(base_items)
        }
        (_, overlay) => overlay,
    }
}

/// Deserialize merged data into [`FrontMatter`].
pub fn from_data(data: Value) -> Result<FrontMatter, FrontMatterError> {
    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_extracts_front_matter() {
        let (fm, body) = split("---\ntitle: Hi\n---\n# Body\n");
        assert_eq!(fm, Some("title: Hi\n"));
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn split_without_front_matter() {
        let (fm, body) = split("# Just markdown\n");
        assert_eq!(fm, None);
        assert_eq!(body, "# Just markdown\n");
    }

    #[test]
    fn split_unterminated_block_is_body() {
        let source = "---\ntitle: Hi\nno closing line\n";
        let (fm, body) = split(source);
        assert_eq!(fm, None);
        assert_eq!(body, source);
    }

    #[test]
    fn split_handles_crlf() {
        let (fm, body) = split("---\r\ntitle: Hi\r\n---\r\nBody");
        assert_eq!(fm, Some("title: Hi\r\n"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn split_empty_block() {
        let (fm, body) = split("---\n---\nBody");
        assert_eq!(fm, Some(""));
        assert_eq!(body, "Body");
    }

    #[test]
    fn parse_full_front_matter() {
        let map = parse_yaml(
            "title: Hello\ndate: 2024-03-09\ndraft: true\npermalink: /x/\ntags: rust\n\
             eleventyExcludeFromCollections: false\neleventyNavigation:\n  key: hello\n  order: 2\n\
             subtitle: extra",
        )
        .unwrap();
        let fm = from_data(Value::Object(map)).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Hello"));
        assert_eq!(fm.date.as_deref(), Some("2024-03-09"));
        assert!(fm.is_draft());
        assert_eq!(fm.permalink, Some(Permalink::Path("/x/".to_string())));
        assert_eq!(fm.tags, vec!["rust"]);
        assert_eq!(fm.exclude_from_collections, Some(false));
        let nav = fm.navigation.unwrap();
        assert_eq!(nav.key, "hello");
        assert_eq!(nav.order, Some(2));
        assert_eq!(fm.extra.get("subtitle"), Some(&json!("extra")));
    }

    #[test]
    fn permalink_false_is_disabled() {
        let fm = from_data(json!({ "permalink": false })).unwrap();
        assert!(fm.permalink.unwrap().is_disabled());
        assert!(!Permalink::Path("/a/".into()).is_disabled());
        assert!(!Permalink::Enabled(true).is_disabled());
    }

    #[test]
    fn absent_fields_default() {
        let fm = from_data(json!({})).unwrap();
        assert!(!fm.is_draft());
        assert_eq!(fm.draft, None);
        assert_eq!(fm.permalink, None);
        assert_eq!(fm.exclude_from_collections, None);
        assert!(fm.tags.is_empty());
    }

    #[test]
    fn draft_accepts_truthy_scalars() {
        for (value, expected) in [
            (json!("yes"), Some(true)),
            (json!(1), Some(true)),
            (json!("false"), Some(true)),
            (json!(""), Some(false)),
            (json!(0), Some(false)),
            (json!(false), Some(false)),
            (Value::Null, None),
        ] {
            let fm = from_data(json!({ "draft": value })).unwrap();
            assert_eq!(fm.draft, expected, "draft: {value}");
        }
        let map = parse_yaml("draft: yes please").unwrap();
        assert!(from_data(Value::Object(map)).unwrap().is_draft());
    }

    #[test]
    fn null_tags_are_empty() {
        let fm = from_data(json!({ "tags": null })).unwrap();
        assert!(fm.tags.is_empty());
    }

    #[test]
    fn non_mapping_yaml_is_error() {
        assert!(matches!(
            parse_yaml("- a\n- b"),
            Err(FrontMatterError::NotAMapping)
        ));
    }

    #[test]
    fn merge_data_overrides_scalars_and_merges_objects() {
        let base = json!({ "layout": "post", "meta": { "a": 1, "b": 2 } });
        let overlay = json!({ "layout": "page", "meta": { "b": 3 } });
        let merged = merge_data(base, overlay);
        assert_eq!(merged, json!({ "layout": "page", "meta": { "a": 1, "b": 3 } }));
    }

    #[test]
    fn merge_data_concatenates_arrays_without_duplicates() {
        let merged = merge_data(json!({ "tags": ["posts"] }), json!({ "tags": ["rust", "posts"] }));
        assert_eq!(merged, json!({ "tags": ["posts", "rust"] }));
    }
}
