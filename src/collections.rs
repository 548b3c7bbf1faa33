//! Collections: grouped, ordered lists of pages.
//!
//! Three kinds, all built from the same listed pages (routable and not
//! excluded):
//!
//! - `all`: every listed page
//! - one per tag, named after the tag
//! - one per configured `[[collections]]` entry, selecting by glob on the
//!   input-relative path (stock: `posts` = `posts/*.md`)
//!
//! Each collection is sorted by date (undated first), then input path.
//! A configured collection and a tag with the same name share one list.

use crate::config::{CollectionConfig, GLOB_OPTIONS};
use crate::types::Page;
use glob::Pattern;
use std::collections::BTreeMap;
use thiserror::Error;

pub const ALL: &str = "all";

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("collection '{name}': invalid glob: {source}")]
    Glob {
        name: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Named collections holding indices into the page list they were built from.
#[derive(Debug, Default, Clone)]
pub struct Collections {
    map: BTreeMap<String, Vec<usize>>,
}

impl Collections {
    pub fn build(pages: &[Page], configured: &[CollectionConfig]) -> Result<Self, CollectionError> {
        let matchers = configured
            .iter()
            .map(|c| {
                Pattern::new(&c.glob)
                    .map(|p| (c.name.clone(), p))
                    .map_err(|source| CollectionError::Glob {
                        name: c.name.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut map: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        map.insert(ALL.to_string(), Vec::new());
        for (name, _) in &matchers {
            map.entry(name.clone()).or_default();
        }

        for (idx, page) in pages.iter().enumerate() {
            if !page.is_listed() {
                continue;
            }
            let mut names: Vec<&str> = vec![ALL];
            names.extend(page.item.front_matter.tags.iter().map(String::as_str));
            for (name, matcher) in &matchers {
                if matcher.matches_with(&page.item.input_path, GLOB_OPTIONS) {
                    names.push(name);
                }
            }
            names.sort_unstable();
            names.dedup();
            for name in names {
                map.entry(name.to_string()).or_default().push(idx);
            }
        }

        for members in map.values_mut() {
            members.sort_by(|&a, &b| {
                let (a, b) = (&pages[a].item, &pages[b].item);
                a.date.cmp(&b.date).then_with(|| a.input_path.cmp(&b.input_path))
            });
        }

        Ok(Self { map })
    }

    /// Page indices of a collection, empty when it does not exist.
    pub fn get(&self, name: &str) -> &[usize] {
        self.map.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// `(name, size)` pairs in name order.
    pub fn sizes(&self) -> Vec<(String, usize)> {
        self.map.iter().map(|(k, v)| (k.clone(), v.len())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::page;

    fn posts_config() -> Vec<CollectionConfig> {
        vec![CollectionConfig {
            name: "posts".to_string(),
            glob: "posts/*.md".to_string(),
        }]
    }

    fn paths<'a>(pages: &'a [Page], collections: &Collections, name: &str) -> Vec<&'a str> {
        collections
            .get(name)
            .iter()
            .map(|&i| pages[i].item.input_path.as_str())
            .collect()
    }

    #[test]
    fn glob_collection_sorted_by_date() {
        let pages = vec![
            page("posts/b.md", Some("2024-02-01"), &[]),
            page("posts/a.md", Some("2024-03-01"), &[]),
            page("about.md", None, &[]),
        ];
        let c = Collections::build(&pages, &posts_config()).unwrap();
        assert_eq!(paths(&pages, &c, "posts"), vec!["posts/b.md", "posts/a.md"]);
    }

    #[test]
    fn glob_star_stays_within_one_directory() {
        let pages = vec![page("posts/a.md", None, &[]), page("posts/old/b.md", None, &[])];
        let c = Collections::build(&pages, &posts_config()).unwrap();
        assert_eq!(paths(&pages, &c, "posts"), vec!["posts/a.md"]);
    }

    #[test]
    fn all_holds_every_listed_page_undated_first() {
        let pages = vec![
            page("posts/b.md", Some("2024-02-01"), &[]),
            page("about.md", None, &[]),
        ];
        let c = Collections::build(&pages, &[]).unwrap();
        assert_eq!(paths(&pages, &c, ALL), vec!["about.md", "posts/b.md"]);
    }

    #[test]
    fn tags_form_collections() {
        let pages = vec![
            page("x.md", None, &["rust", "web"]),
            page("y.md", None, &["rust"]),
        ];
        let c = Collections::build(&pages, &[]).unwrap();
        assert_eq!(paths(&pages, &c, "rust"), vec!["x.md", "y.md"]);
        assert_eq!(paths(&pages, &c, "web"), vec!["x.md"]);
    }

    #[test]
    fn tag_and_glob_with_same_name_do_not_duplicate() {
        let pages = vec![page("posts/a.md", None, &["posts"])];
        let c = Collections::build(&pages, &posts_config()).unwrap();
        assert_eq!(c.get("posts").len(), 1);
    }

    #[test]
    fn unrouted_and_excluded_pages_left_out() {
        let mut hidden = page("posts/draft.md", None, &["rust"]);
        hidden.url = None;
        let mut excluded = page("posts/excluded.md", None, &["rust"]);
        excluded.resolved.exclude_from_collections = Some(true);
        let pages = vec![hidden, excluded, page("posts/ok.md", None, &["rust"])];

        let c = Collections::build(&pages, &posts_config()).unwrap();
        for name in [ALL, "posts", "rust"] {
            assert_eq!(paths(&pages, &c, name), vec!["posts/ok.md"], "collection {name}");
        }
    }

    #[test]
    fn configured_collection_exists_even_when_empty() {
        let c = Collections::build(&[], &posts_config()).unwrap();
        assert!(c.contains("posts"));
        assert!(c.get("posts").is_empty());
        assert!(c.get("missing").is_empty());
    }

    #[test]
    fn sizes_in_name_order() {
        let pages = vec![page("posts/a.md", None, &["zeta"])];
        let c = Collections::build(&pages, &posts_config()).unwrap();
        assert_eq!(
            c.sizes(),
            vec![
                ("all".to_string(), 1),
                ("posts".to_string(), 1),
                ("zeta".to_string(), 1)
            ]
        );
    }

    #[test]
    fn bad_glob_is_error() {
        let config = vec![CollectionConfig {
            name: "broken".to_string(),
            glob: "posts/[".to_string(),
        }];
        assert!(matches!(
            Collections::build(&[], &config),
            Err(CollectionError::Glob { .. })
        ));
    }
}
