//! Data models for harvested feed items.
//!
//! An [`Item`] is identified by its link alone. A [`Collection`] is the
//! ordered, duplicate-free sequence of items persisted across runs, newest
//! first. Ordinals are derived from position and are recomputed every time a
//! collection is rendered, so they are labels and never identities.

use crate::error::{FeedError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Position-derived display number. Oldest item is 1, newest is `N`.
pub type Ordinal = usize;

/// Fallback preview image, substituted at render time only.
pub const PLACEHOLDER_THUMB: &str =
    "https://via.placeholder.com/280x280/1a1a2e/00d4ff?text=No+Image";

/// One harvested post reference.
///
/// Equality and hashing use `link` only; two items with the same link are the
/// same item whatever their thumbnails say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub link: String,
    /// Preview image as observed at capture time. May be empty.
    #[serde(default)]
    pub thumb: String,
}

impl Item {
    /// Build an item, rejecting an empty link.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidItem`] when `link` is blank.
    pub fn new(link: impl Into<String>, thumb: impl Into<String>) -> Result<Self> {
        let link = link.into();
        if link.trim().is_empty() {
            return Err(FeedError::invalid_item("link must not be empty"));
        }
        Ok(Self {
            link,
            thumb: thumb.into(),
        })
    }

    /// The identity key.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.link
    }

    /// Thumbnail for display, falling back to [`PLACEHOLDER_THUMB`].
    #[must_use]
    pub fn thumb_or_placeholder(&self) -> &str {
        if self.thumb.trim().is_empty() {
            PLACEHOLDER_THUMB
        } else {
            &self.thumb
        }
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.link.hash(state);
    }
}

/// Ordered, duplicate-free items, newest first.
///
/// The only mutation is [`Collection::prepend`], which places a block of new
/// items ahead of everything already known. Existing items never move
/// relative to each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Collection {
    items: Vec<Item>,
}

impl Collection {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a collection from stored items, checking the identity invariant.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidItem`] for an empty link or
    /// [`FeedError::DuplicateIdentity`] when a link repeats.
    pub fn from_items(items: Vec<Item>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.link.trim().is_empty() {
                return Err(FeedError::invalid_item("stored item has an empty link"));
            }
            if !seen.insert(item.link.as_str()) {
                return Err(FeedError::DuplicateIdentity {
                    link: item.link.clone(),
                });
            }
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    #[must_use]
    pub fn newest(&self) -> Option<&Item> {
        self.items.first()
    }

    #[must_use]
    pub fn oldest(&self) -> Option<&Item> {
        self.items.last()
    }

    /// Snapshot of every link currently in the collection.
    #[must_use]
    pub fn known_identities(&self) -> HashSet<String> {
        self.items.iter().map(|item| item.link.clone()).collect()
    }

    #[must_use]
    pub fn contains(&self, link: &str) -> bool {
        self.items.iter().any(|item| item.link == link)
    }

    /// Merge a run's new items: `new ++ self`.
    ///
    /// This is concatenation, not a set union. The new block keeps its own
    /// discovery order and lands ahead of every known item.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::DuplicateIdentity`] if a new item repeats a link
    /// already known or repeats within the block, and
    /// [`FeedError::InvalidItem`] for an empty link. Nothing is merged then.
    pub fn prepend(&self, new_items: Vec<Item>) -> Result<Self> {
        let mut seen = self.known_identities();
        for item in &new_items {
            if item.link.trim().is_empty() {
                return Err(FeedError::invalid_item("new item has an empty link"));
            }
            if !seen.insert(item.link.clone()) {
                return Err(FeedError::DuplicateIdentity {
                    link: item.link.clone(),
                });
            }
        }

        let mut merged = new_items;
        merged.extend(self.items.iter().cloned());
        Ok(Self { items: merged })
    }

    /// Ordinal of the item at `index` for the current size (`N - index`).
    #[must_use]
    pub fn ordinal_at(&self, index: usize) -> Option<Ordinal> {
        (index < self.items.len()).then(|| ordinal_for(index, self.items.len()))
    }

    /// Item currently carrying `ordinal`.
    #[must_use]
    pub fn item_by_ordinal(&self, ordinal: Ordinal) -> Option<&Item> {
        if ordinal == 0 || ordinal > self.items.len() {
            return None;
        }
        self.items.get(self.items.len() - ordinal)
    }

    /// Items paired with their ordinals, newest first.
    pub fn with_ordinals(&self) -> impl Iterator<Item = (Ordinal, &Item)> {
        let total = self.items.len();
        self.items
            .iter()
            .enumerate()
            .map(move |(index, item)| (ordinal_for(index, total), item))
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let items = Vec::<Item>::deserialize(deserializer)?;
        Self::from_items(items).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Ordinal for discovery index `index` in a collection of `total` items.
#[must_use]
pub const fn ordinal_for(index: usize, total: usize) -> Ordinal {
    total - index
}

/// Why an extraction loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A known identity was seen; everything further down is already stored.
    Boundary,
    /// The content size stopped changing for the configured number of rounds.
    Stable,
    /// The hard round ceiling was reached.
    RoundCeiling,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boundary => write!(f, "reached known items"),
            Self::Stable => write!(f, "feed stopped growing"),
            Self::RoundCeiling => write!(f, "round ceiling reached"),
        }
    }
}

/// File locations of the two derived artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub document: std::path::PathBuf,
    pub backup: std::path::PathBuf,
}

/// Outcome of one `run_extraction` call.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Items prepended by this run.
    pub added: usize,
    /// Collection size after the run.
    pub total: usize,
    pub stop: StopReason,
    /// Scroll rounds the extractor performed.
    pub rounds: usize,
    /// How far the ordinal shown at each previously occupied position moved
    /// up. Items that were already stored keep their own ordinals.
    pub position_shift: usize,
    /// `None` when nothing new was found and no artifact was rewritten.
    pub artifacts: Option<ArtifactPaths>,
}

impl RunReport {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.added == 0
    }
}

/// Outcome of `clear_all`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClearReport {
    pub removed: usize,
}

/// Summary for `feedfold stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub total: usize,
    pub newest: Option<String>,
    pub oldest: Option<String>,
    pub missing_thumbs: usize,
    pub revision: i64,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub folders: usize,
    pub tagged_ordinals: usize,
    /// Folder entries whose ordinal exceeds the collection size.
    pub dangling_ordinals: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str) -> Item {
        Item::new(link, "").unwrap()
    }

    #[test]
    fn identity_ignores_thumb() {
        let a = Item::new("https://x.test/p/1/", "https://cdn/a.jpg").unwrap();
        let b = Item::new("https://x.test/p/1/", "https://cdn/b.jpg").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.identity(), "https://x.test/p/1/");
    }

    #[test]
    fn empty_link_rejected() {
        assert!(matches!(
            Item::new("  ", "thumb"),
            Err(FeedError::InvalidItem { .. })
        ));
    }

    #[test]
    fn placeholder_resolved_at_render_time_only() {
        let it = item("https://x.test/p/1/");
        assert!(it.thumb.is_empty());
        assert_eq!(it.thumb_or_placeholder(), PLACEHOLDER_THUMB);
    }

    #[test]
    fn merge_order_puts_new_block_first() {
        let prior = Collection::from_items(vec![item("b"), item("a")]).unwrap();
        let merged = prior.prepend(vec![item("d"), item("c")]).unwrap();
        let links: Vec<&str> = merged.iter().map(Item::identity).collect();
        assert_eq!(links, ["d", "c", "b", "a"]);
    }

    #[test]
    fn prepend_rejects_known_identity() {
        let prior = Collection::from_items(vec![item("b"), item("a")]).unwrap();
        let err = prior.prepend(vec![item("c"), item("a")]).unwrap_err();
        assert!(matches!(err, FeedError::DuplicateIdentity { link } if link == "a"));
    }

    #[test]
    fn prepend_rejects_repeat_within_block() {
        let prior = Collection::new();
        assert!(prior.prepend(vec![item("c"), item("c")]).is_err());
    }

    #[test]
    fn from_items_rejects_duplicates() {
        assert!(Collection::from_items(vec![item("a"), item("a")]).is_err());
    }

    #[test]
    fn ordinals_count_down_from_total() {
        let c = Collection::from_items(vec![item("c"), item("b"), item("a")]).unwrap();
        assert_eq!(c.ordinal_at(0), Some(3));
        assert_eq!(c.ordinal_at(2), Some(1));
        assert_eq!(c.ordinal_at(3), None);
        assert_eq!(c.item_by_ordinal(1).map(Item::identity), Some("a"));
        assert_eq!(c.item_by_ordinal(0), None);
        assert_eq!(c.item_by_ordinal(4), None);
    }

    #[test]
    fn prepend_shifts_positions_not_items() {
        let before = Collection::from_items(vec![item("b"), item("a")]).unwrap();
        let after = before.prepend(vec![item("e"), item("d"), item("c")]).unwrap();

        // Every position now carries an ordinal three higher.
        assert_eq!(before.ordinal_at(0), Some(2));
        assert_eq!(after.ordinal_at(0), Some(5));
        assert_eq!(before.ordinal_at(1), Some(1));
        assert_eq!(after.ordinal_at(1), Some(4));

        // The items that were already there keep theirs.
        let ordinal_of = |c: &Collection, link: &str| {
            c.with_ordinals()
                .find(|(_, it)| it.link == link)
                .map(|(o, _)| o)
        };
        assert_eq!(ordinal_of(&before, "b"), ordinal_of(&after, "b"));
        assert_eq!(ordinal_of(&after, "c"), Some(3));
    }

    #[test]
    fn rebuilt_collection_reassigns_ordinals() {
        // After a wipe, ordinal 2 labels whatever is harvested second-oldest.
        let first = Collection::from_items(vec![item("b"), item("a")]).unwrap();
        let rebuilt = Collection::from_items(vec![item("y"), item("x")]).unwrap();
        assert_eq!(first.item_by_ordinal(2).map(Item::identity), Some("b"));
        assert_eq!(rebuilt.item_by_ordinal(2).map(Item::identity), Some("y"));
    }

    #[test]
    fn deserialize_checks_invariant() {
        let bad = r#"[{"link":"a","thumb":""},{"link":"a","thumb":"x"}]"#;
        assert!(serde_json::from_str::<Collection>(bad).is_err());

        let good = r#"[{"link":"b"},{"link":"a","thumb":"x"}]"#;
        let c: Collection = serde_json::from_str(good).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.items()[0].thumb, "");
    }
}
