//! Types shared between the build stages.
//!
//! A [`Page`] is a scanned [`ContentItem`] after draft resolution and routing.
//! Collections, navigation, and the renderer all read pages; none of them
//! mutate one.

use crate::drafts::Resolved;
use crate::scan::ContentItem;
use serde::{Deserialize, Serialize};

/// A content item with its effective routing values.
#[derive(Debug, Clone)]
pub struct Page {
    pub item: ContentItem,
    pub resolved: Resolved,
    /// Public URL, `None` when the item is not routable.
    pub url: Option<String>,
    /// Output file path relative to the output directory.
    pub output_path: Option<String>,
}

impl Page {
    /// Routable and not excluded: eligible for collections and navigation.
    pub fn is_listed(&self) -> bool {
        self.url.is_some() && !self.resolved.is_excluded()
    }

    /// Hidden by the draft rule in this build.
    pub fn is_hidden_draft(&self) -> bool {
        self.resolved.hidden_draft
    }

    pub fn title(&self) -> String {
        self.item.title()
    }

    /// Navigation key from `eleventyNavigation`, if any.
    pub fn nav_key(&self) -> Option<&str> {
        self.item
            .front_matter
            .navigation
            .as_ref()
            .map(|n| n.key.as_str())
            .filter(|k| !k.is_empty())
    }
}

/// Navigation tree item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavItem {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}
