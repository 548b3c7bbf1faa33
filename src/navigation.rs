//! Hierarchical navigation from `eleventyNavigation` front matter.
//!
//! ```yaml
//! eleventyNavigation:
//!   key: intro
//!   parent: docs
//!   order: 1
//! ```
//!
//! Entries form a tree by `parent` key. Siblings sort by `order` (entries
//! without one go last), then by key. Entries whose parent does not exist are
//! dropped with a warning, as are duplicate keys after the first and entries
//! caught in a parent cycle.
//!
//! Only listed pages take part, so hidden drafts never appear in a one-shot
//! build's navigation.

use crate::types::{NavItem, Page};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone)]
struct Entry {
    title: String,
    url: Option<String>,
    parent: Option<String>,
    order: Option<i64>,
}

/// Navigation tree plus a flat index for breadcrumbs.
#[derive(Debug, Default, Clone)]
pub struct Navigation {
    roots: Vec<NavItem>,
    entries: BTreeMap<String, Entry>,
}

impl Navigation {
    pub fn build(pages: &[Page]) -> Self {
        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
        for page in pages.iter().filter(|p| p.is_listed()) {
            let Some(nav) = &page.item.front_matter.navigation else {
                continue;
            };
            if nav.key.is_empty() {
                tracing::warn!(page = %page.item.input_path, "navigation entry without key ignored");
                continue;
            }
            if entries.contains_key(&nav.key) {
                tracing::warn!(key = %nav.key, page = %page.item.input_path, "duplicate navigation key ignored");
                continue;
            }
            entries.insert(
                nav.key.clone(),
                Entry {
                    title: nav.title.clone().unwrap_or_else(|| page.title()),
                    url: nav.url.clone().or_else(|| page.url.clone()),
                    parent: nav.parent.clone().filter(|p| !p.is_empty()),
                    order: nav.order,
                },
            );
        }

        for (key, entry) in &entries {
            if let Some(parent) = entry.parent.as_ref().filter(|p| !entries.contains_key(*p)) {
                tracing::warn!(key = %key, parent = %parent, "navigation parent not found, entry dropped");
            }
        }

        let roots = children_of(&entries, None);
        for key in unreachable(&entries, &roots) {
            let parent = entries.get(&key).and_then(|e| e.parent.as_ref());
            if let Some(parent) = parent.filter(|p| entries.contains_key(*p)) {
                tracing::warn!(key = %key, parent = %parent, "navigation entry not reachable from a root, dropped");
            }
        }
        Self { roots, entries }
    }

    /// Top-level items with their nested children.
    pub fn tree(&self) -> &[NavItem] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Ancestors of `key` from the root down, optionally ending with `key`.
    ///
    /// Unknown keys yield an empty trail.
    pub fn breadcrumbs(&self, key: &str, include_self: bool) -> Vec<NavItem> {
        let mut trail = Vec::new();
        let mut seen = HashSet::new();
        let mut current = match self.entries.get(key) {
            Some(entry) if include_self => Some((key.to_string(), entry)),
            Some(entry) => entry
                .parent
                .as_ref()
                .and_then(|p| self.entries.get(p).map(|e| (p.clone(), e))),
            None => None,
        };
        while let Some((k, entry)) = current {
            if !seen.insert(k.clone()) {
                break;
            }
            trail.push(NavItem {
                key: k,
                title: entry.title.clone(),
                url: entry.url.clone(),
                children: Vec::new(),
            });
            current = entry
                .parent
                .as_ref()
                .and_then(|p| self.entries.get(p).map(|e| (p.clone(), e)));
        }
        trail.reverse();
        trail
    }
}

/// Keys that did not make it into the tree, in key order.
fn unreachable(entries: &BTreeMap<String, Entry>, roots: &[NavItem]) -> Vec<String> {
    fn collect<'a>(items: &'a [NavItem], seen: &mut HashSet<&'a str>) {
        for item in items {
            seen.insert(item.key.as_str());
            collect(&item.children, seen);
        }
    }
    let mut seen = HashSet::new();
    collect(roots, &mut seen);
    entries
        .keys()
        .filter(|k| !seen.contains(k.as_str()))
        .cloned()
        .collect()
}

fn children_of(entries: &BTreeMap<String, Entry>, parent: Option<&str>) -> Vec<NavItem> {
    let mut siblings: Vec<(&String, &Entry)> = entries
        .iter()
        .filter(|(_, e)| e.parent.as_deref() == parent)
        .collect();
    siblings.sort_by(|(ka, a), (kb, b)| {
        let oa = a.order.unwrap_or(i64::MAX);
        let ob = b.order.unwrap_or(i64::MAX);
        oa.cmp(&ob).then_with(|| ka.cmp(kb))
    });
    siblings
        .into_iter()
        .map(|(key, entry)| NavItem {
            key: key.clone(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            children: children_of(entries, Some(key)),
        })
        .collect()
}
