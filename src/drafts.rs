//! Draft handling.
//!
//! A content item marked `draft: true` is hidden from one-shot builds: it gets
//! no output file and appears in no collection. When drafts are enabled (watch
//! and serve modes, or `BUILD_DRAFTS`), the authored values pass through
//! untouched.
//!
//! Resolution runs once per item, after the data cascade has produced its
//! final [`FrontMatter`] and before routing.

use crate::front_matter::{FrontMatter, Permalink};

/// Effective routing and listing values for one item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolved {
    /// `Some(Permalink::Enabled(false))` when the item must not be written.
    pub permalink: Option<Permalink>,
    /// `Some(true)` when the item must stay out of every collection.
    pub exclude_from_collections: Option<bool>,
    /// Hidden by the draft rule rather than by its authored values.
    pub hidden_draft: bool,
}

impl Resolved {
    pub fn is_routable(&self) -> bool {
        !self.permalink.as_ref().is_some_and(Permalink::is_disabled)
    }

    pub fn is_excluded(&self) -> bool {
        self.exclude_from_collections.unwrap_or(false)
    }
}

/// Whether an item is hidden by the draft rule.
fn hidden(front_matter: &FrontMatter, drafts_enabled: bool) -> bool {
    front_matter.is_draft() && !drafts_enabled
}

/// Effective permalink: disabled for hidden drafts, authored value otherwise.
pub fn effective_permalink(front_matter: &FrontMatter, drafts_enabled: bool) -> Option<Permalink> {
    if hidden(front_matter, drafts_enabled) {
        return Some(Permalink::Enabled(false));
    }
    front_matter.permalink.clone()
}

/// Effective exclusion: forced for hidden drafts, authored value otherwise.
pub fn effective_exclusion(front_matter: &FrontMatter, drafts_enabled: bool) -> Option<bool> {
    if hidden(front_matter, drafts_enabled) {
        return Some(true);
    }
    front_matter.exclude_from_collections
}

/// Resolve both effective values for an item.
pub fn resolve(front_matter: &FrontMatter, drafts_enabled: bool) -> Resolved {
    Resolved {
        permalink: effective_permalink(front_matter, drafts_enabled),
        exclude_from_collections: effective_exclusion(front_matter, drafts_enabled),
        hidden_draft: hidden(front_matter, drafts_enabled),
    }
}
