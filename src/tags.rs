//! Folder tags over ordinals.
//!
//! The tag store maps folder names to sets of ordinals. It is a persistence
//! domain of its own: it is never derived from the collection, survives a
//! collection wipe, and is never updated by a run. A folder entry labels
//! whichever item currently holds that ordinal. Prepending keeps existing
//! items on their ordinals, but a cleared and re-harvested collection hands
//! the same numbers to different items.

use crate::error::{FeedError, Result};
use crate::model::Ordinal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Reserved filter name that matches every item.
pub const ALL_FOLDER: &str = "all";

/// Outcome of a membership toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub added: usize,
    pub removed: usize,
}

/// How much of a selection a folder already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    All,
    Some,
    None,
}

/// Folder name → ordinals, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagStore {
    folders: BTreeMap<String, Vec<Ordinal>>,
}

impl TagStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            folders: BTreeMap::new(),
        }
    }

    /// Load from a JSON file; a missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No tag file, starting empty");
            return Ok(Self::new());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| FeedError::path_error("read", path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Rewrite the JSON file in full.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::PersistenceFault`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let fail = |e: &dyn std::fmt::Display| FeedError::persistence("tag store", e);
        let json = serde_json::to_string_pretty(self).map_err(|e| fail(&e))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| fail(&e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail(&e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| fail(&e))?;
        tmp.persist(path).map_err(|e| fail(&e.error))?;
        debug!(path = %path.display(), folders = self.folders.len(), "Saved tag store");
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.folders.keys().map(String::as_str)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.folders.contains_key(name)
    }

    #[must_use]
    pub fn members(&self, name: &str) -> Option<&[Ordinal]> {
        self.folders.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, name: &str, ordinal: Ordinal) -> bool {
        self.folders
            .get(name)
            .is_some_and(|members| members.contains(&ordinal))
    }

    /// Distinct ordinals referenced by any folder.
    #[must_use]
    pub fn tagged_ordinals(&self) -> BTreeSet<Ordinal> {
        self.folders.values().flatten().copied().collect()
    }

    /// Create an empty folder.
    ///
    /// # Errors
    ///
    /// Rejects an empty or reserved name and a name that already exists.
    pub fn create_folder(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FeedError::InvalidFolderName {
                name: name.to_string(),
                reason: "name must not be empty",
            });
        }
        if name == ALL_FOLDER {
            return Err(FeedError::InvalidFolderName {
                name: name.to_string(),
                reason: "'all' is reserved for the unfiltered view",
            });
        }
        if self.folders.contains_key(name) {
            return Err(FeedError::FolderExists {
                name: name.to_string(),
            });
        }
        self.folders.insert(name.to_string(), Vec::new());
        info!(folder = name, "Created folder");
        Ok(())
    }

    /// Delete a folder and its memberships. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::FolderNotFound`] if there is no such folder.
    pub fn delete_folder(&mut self, name: &str) -> Result<Vec<Ordinal>> {
        let removed = self
            .folders
            .remove(name)
            .ok_or_else(|| FeedError::FolderNotFound {
                name: name.to_string(),
            })?;
        info!(folder = name, members = removed.len(), "Deleted folder");
        Ok(removed)
    }

    /// Flip membership of every (folder, ordinal) pair.
    ///
    /// A present pair is removed, an absent pair is added, so applying the
    /// same selection twice restores the original state. All folders are
    /// checked before anything changes.
    ///
    /// # Errors
    ///
    /// Rejects an empty folder or ordinal selection and unknown folders.
    pub fn toggle_membership(
        &mut self,
        folder_names: &BTreeSet<String>,
        ordinals: &BTreeSet<Ordinal>,
    ) -> Result<ToggleOutcome> {
        if folder_names.is_empty() {
            return Err(FeedError::EmptySelection { what: "no folder chosen" });
        }
        if ordinals.is_empty() {
            return Err(FeedError::EmptySelection { what: "no item chosen" });
        }
        if let Some(missing) = folder_names.iter().find(|name| !self.exists(name)) {
            return Err(FeedError::FolderNotFound {
                name: missing.clone(),
            });
        }

        let mut outcome = ToggleOutcome::default();
        for name in folder_names {
            let Some(members) = self.folders.get_mut(name) else {
                continue;
            };
            for &ordinal in ordinals {
                if let Some(pos) = members.iter().position(|&o| o == ordinal) {
                    members.remove(pos);
                    outcome.removed += 1;
                } else {
                    members.push(ordinal);
                    outcome.added += 1;
                }
            }
        }
        info!(
            folders = folder_names.len(),
            added = outcome.added,
            removed = outcome.removed,
            "Toggled folder membership"
        );
        Ok(outcome)
    }

    /// Whether `name` holds all, some, or none of `selection`.
    #[must_use]
    pub fn coverage(&self, name: &str, selection: &BTreeSet<Ordinal>) -> Coverage {
        let held = selection
            .iter()
            .filter(|&&ordinal| self.contains(name, ordinal))
            .count();
        if !selection.is_empty() && held == selection.len() {
            Coverage::All
        } else if held > 0 {
            Coverage::Some
        } else {
            Coverage::None
        }
    }

    /// Entries pointing past the end of a collection of `total` items.
    #[must_use]
    pub fn dangling(&self, total: usize) -> usize {
        self.folders
            .values()
            .flatten()
            .filter(|&&ordinal| ordinal == 0 || ordinal > total)
            .count()
    }
}

/// Inclusive ordinal bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrdinalRange {
    pub from: Ordinal,
    pub to: Ordinal,
}

impl OrdinalRange {
    /// Validate user-entered bounds.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidRange`] when a bound is missing or zero,
    /// or when `from > to`.
    pub fn new(from: Option<Ordinal>, to: Option<Ordinal>) -> Result<Self> {
        let (Some(from), Some(to)) = (from, to) else {
            return Err(FeedError::invalid_range("both bounds are required"));
        };
        if from == 0 || to == 0 {
            return Err(FeedError::invalid_range("ordinals start at 1"));
        }
        if from > to {
            return Err(FeedError::invalid_range(format!(
                "from ({from}) is greater than to ({to})"
            )));
        }
        Ok(Self { from, to })
    }

    #[must_use]
    pub const fn contains(&self, ordinal: Ordinal) -> bool {
        ordinal >= self.from && ordinal <= self.to
    }
}

/// Parse ordinal selections such as `3`, `2-5`, or `1,4,9-12` against a
/// collection of `total` items.
///
/// # Errors
///
/// Returns [`FeedError::InvalidArgument`] for a token that is not a positive
/// number, and [`FeedError::InvalidRange`] for a reversed span or an ordinal
/// past `total`. Bounds are checked before a span is expanded.
pub fn parse_selection<S: AsRef<str>>(parts: &[S], total: usize) -> Result<BTreeSet<Ordinal>> {
    let number = |token: &str| -> Result<Ordinal> {
        let n = match token.trim().parse::<Ordinal>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(FeedError::invalid_argument(format!(
                    "'{token}' is not an ordinal (expected a number from 1)"
                )));
            }
        };
        if n > total {
            return Err(FeedError::invalid_range(format!(
                "#{n} is past the last item (collection has {total})"
            )));
        }
        Ok(n)
    };

    let mut selection = BTreeSet::new();
    for token in parts
        .iter()
        .flat_map(|part| part.as_ref().split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if let Some((from, to)) = token.split_once('-') {
            let range = OrdinalRange::new(Some(number(from)?), Some(number(to)?))?;
            selection.extend(range.from..=range.to);
        } else {
            selection.insert(number(token)?);
        }
    }
    Ok(selection)
}

/// The active view filter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Filter {
    #[default]
    All,
    Folder(String),
    Range(OrdinalRange),
}

/// A tag store plus the filter currently applied to the gallery.
#[derive(Debug, Clone, Default)]
pub struct TagSession {
    store: TagStore,
    active: Filter,
}

impl TagSession {
    #[must_use]
    pub fn new(store: TagStore) -> Self {
        Self {
            store,
            active: Filter::All,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &TagStore {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut TagStore {
        &mut self.store
    }

    #[must_use]
    pub fn into_store(self) -> TagStore {
        self.store
    }

    #[must_use]
    pub const fn active(&self) -> &Filter {
        &self.active
    }

    /// Delete a folder; a filter on that folder falls back to "all".
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::FolderNotFound`] if there is no such folder.
    pub fn delete_folder(&mut self, name: &str) -> Result<Vec<Ordinal>> {
        let removed = self.store.delete_folder(name)?;
        if matches!(&self.active, Filter::Folder(active) if active == name) {
            self.active = Filter::All;
        }
        Ok(removed)
    }

    /// Show one folder, or everything for [`ALL_FOLDER`].
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::FolderNotFound`] for an unknown folder.
    pub fn filter_by_folder(&mut self, name: &str) -> Result<()> {
        if name == ALL_FOLDER {
            self.active = Filter::All;
            return Ok(());
        }
        if !self.store.exists(name) {
            return Err(FeedError::FolderNotFound {
                name: name.to_string(),
            });
        }
        self.active = Filter::Folder(name.to_string());
        Ok(())
    }

    /// Show an inclusive ordinal range. The filter is unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidRange`] for missing or reversed bounds.
    pub fn filter_by_range(&mut self, from: Option<Ordinal>, to: Option<Ordinal>) -> Result<()> {
        self.active = Filter::Range(OrdinalRange::new(from, to)?);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.active = Filter::All;
    }

    #[must_use]
    pub fn matches(&self, ordinal: Ordinal) -> bool {
        match &self.active {
            Filter::All => true,
            Filter::Folder(name) => self.store.contains(name, ordinal),
            Filter::Range(range) => range.contains(ordinal),
        }
    }

    /// Visible ordinals for a collection of `total` items, newest first.
    #[must_use]
    pub fn visible(&self, total: usize) -> Vec<Ordinal> {
        (1..=total).rev().filter(|&o| self.matches(o)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn ords(list: &[Ordinal]) -> BTreeSet<Ordinal> {
        list.iter().copied().collect()
    }

    #[test]
    fn create_rejects_empty_reserved_and_duplicate() {
        let mut store = TagStore::new();
        assert!(matches!(
            store.create_folder("   "),
            Err(FeedError::InvalidFolderName { .. })
        ));
        assert!(matches!(
            store.create_folder("all"),
            Err(FeedError::InvalidFolderName { .. })
        ));
        store.create_folder("travel").unwrap();
        assert!(matches!(
            store.create_folder("travel"),
            Err(FeedError::FolderExists { .. })
        ));
        assert_eq!(store.members("travel"), Some(&[][..]));
    }

    #[test]
    fn toggle_twice_round_trips() {
        let mut store = TagStore::new();
        store.create_folder("f").unwrap();
        store.toggle_membership(&names(&["f"]), &ords(&[3])).unwrap();
        let before = store.clone();

        let first = store.toggle_membership(&names(&["f"]), &ords(&[7])).unwrap();
        assert_eq!(first, ToggleOutcome { added: 1, removed: 0 });
        let second = store.toggle_membership(&names(&["f"]), &ords(&[7])).unwrap();
        assert_eq!(second, ToggleOutcome { added: 0, removed: 1 });

        assert_eq!(store, before);
    }

    #[test]
    fn toggle_mixed_selection_counts_both_directions() {
        let mut store = TagStore::new();
        store.create_folder("a").unwrap();
        store.create_folder("b").unwrap();
        store.toggle_membership(&names(&["a"]), &ords(&[1])).unwrap();

        let outcome = store
            .toggle_membership(&names(&["a", "b"]), &ords(&[1, 2]))
            .unwrap();
        assert_eq!(outcome, ToggleOutcome { added: 3, removed: 1 });
        assert_eq!(store.members("a"), Some(&[2][..]));
        assert_eq!(store.members("b"), Some(&[1, 2][..]));
    }

    #[test]
    fn toggle_validates_before_mutating() {
        let mut store = TagStore::new();
        store.create_folder("a").unwrap();
        let err = store
            .toggle_membership(&names(&["a", "ghost"]), &ords(&[1]))
            .unwrap_err();
        assert!(matches!(err, FeedError::FolderNotFound { name } if name == "ghost"));
        assert_eq!(store.members("a"), Some(&[][..]));

        assert!(store.toggle_membership(&names(&["a"]), &ords(&[])).is_err());
        assert!(store.toggle_membership(&names(&[]), &ords(&[1])).is_err());
    }

    #[test]
    fn coverage_reports_all_some_none() {
        let mut store = TagStore::new();
        store.create_folder("f").unwrap();
        store.toggle_membership(&names(&["f"]), &ords(&[1, 2])).unwrap();
        assert_eq!(store.coverage("f", &ords(&[1, 2])), Coverage::All);
        assert_eq!(store.coverage("f", &ords(&[2, 3])), Coverage::Some);
        assert_eq!(store.coverage("f", &ords(&[4])), Coverage::None);
    }

    #[test]
    fn delete_resets_active_filter() {
        let mut session = TagSession::new(TagStore::new());
        session.store_mut().create_folder("f").unwrap();
        session.store_mut().create_folder("g").unwrap();

        session.filter_by_folder("g").unwrap();
        session.delete_folder("f").unwrap();
        assert_eq!(session.active(), &Filter::Folder("g".into()));

        session.delete_folder("g").unwrap();
        assert_eq!(session.active(), &Filter::All);
        assert!(session.delete_folder("g").is_err());
    }

    #[test]
    fn folder_filter_is_exact_membership() {
        let mut session = TagSession::new(TagStore::new());
        session.store_mut().create_folder("f").unwrap();
        session
            .store_mut()
            .toggle_membership(&names(&["f"]), &ords(&[2, 9]))
            .unwrap();

        session.filter_by_folder("f").unwrap();
        assert_eq!(session.visible(10), [9, 2]);

        session.filter_by_folder(ALL_FOLDER).unwrap();
        assert_eq!(session.visible(3), [3, 2, 1]);

        assert!(session.filter_by_folder("missing").is_err());
    }

    #[test]
    fn range_filter_validity() {
        let mut session = TagSession::new(TagStore::new());
        assert!(matches!(
            session.filter_by_range(Some(5), Some(2)),
            Err(FeedError::InvalidRange { .. })
        ));
        assert_eq!(session.active(), &Filter::All);
        assert!(session.filter_by_range(None, Some(2)).is_err());
        assert!(session.filter_by_range(Some(0), Some(2)).is_err());

        session.filter_by_range(Some(2), Some(5)).unwrap();
        assert_eq!(session.visible(10), [5, 4, 3, 2]);

        session.reset();
        assert_eq!(session.visible(2), [2, 1]);
    }

    #[test]
    fn dangling_counts_entries_past_the_end() {
        let mut store = TagStore::new();
        store.create_folder("f").unwrap();
        store.create_folder("g").unwrap();
        store.toggle_membership(&names(&["f"]), &ords(&[1, 4])).unwrap();
        store.toggle_membership(&names(&["g"]), &ords(&[4, 7])).unwrap();
        assert_eq!(store.dangling(4), 1);
        assert_eq!(store.dangling(0), 4);
        assert_eq!(store.tagged_ordinals(), ords(&[1, 4, 7]));
    }

    #[test]
    fn selection_accepts_lists_and_spans() {
        assert_eq!(parse_selection(&["1,4", "9-11"], 11).unwrap(), ords(&[1, 4, 9, 10, 11]));
        assert_eq!(parse_selection(&["3", "3"], 3).unwrap(), ords(&[3]));
        assert!(parse_selection::<&str>(&[], 0).unwrap().is_empty());
        assert!(matches!(
            parse_selection(&["5-2"], 9),
            Err(FeedError::InvalidRange { .. })
        ));
        assert!(parse_selection(&["0"], 9).is_err());
        assert!(parse_selection(&["x"], 9).is_err());
    }

    #[test]
    fn selection_is_bounded_by_collection_size() {
        assert!(matches!(
            parse_selection(&["999"], 2),
            Err(FeedError::InvalidRange { .. })
        ));
        assert!(matches!(
            parse_selection(&["1-2,3"], 2),
            Err(FeedError::InvalidRange { .. })
        ));
        assert!(matches!(parse_selection(&["1"], 0), Err(FeedError::InvalidRange { .. })));

        // A huge span fails on its bound instead of being expanded.
        let started = std::time::Instant::now();
        let err = parse_selection(&[format!("1-{}", usize::MAX)], 2).unwrap_err();
        assert!(matches!(err, FeedError::InvalidRange { .. }));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn file_round_trip_uses_plain_object_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folders.json");
        assert!(TagStore::load(&path).unwrap().is_empty());

        let mut store = TagStore::new();
        store.create_folder("travel").unwrap();
        store
            .toggle_membership(&names(&["travel"]), &ords(&[12, 3]))
            .unwrap();
        store.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "travel": [3, 12] }));
        assert_eq!(TagStore::load(&path).unwrap(), store);
    }
}
