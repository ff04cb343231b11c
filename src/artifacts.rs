//! Derived artifact outputs.
//!
//! Two files at fixed names, overwritten on every successful run: the
//! browsable gallery and a JSON backup mirroring the collection. Neither is
//! versioned; both can be rebuilt from the collection at any time.

use crate::error::{FeedError, Result};
use crate::model::Collection;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the rendered gallery.
pub const DOCUMENT_FILE: &str = "collection_master.html";

/// File name of the raw JSON backup.
pub const BACKUP_FILE: &str = "collection_backup.json";

/// Persists named output bytes with overwrite semantics.
pub trait ArtifactSink: Send {
    /// Write `bytes` under `name`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::PersistenceFault`] if the write fails.
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Writes artifacts into one directory, replacing files atomically.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.dir.join(DOCUMENT_FILE)
    }

    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }
}

impl ArtifactSink for DirSink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.dir.join(name);
        let fail = |e: &dyn std::fmt::Display| FeedError::persistence(target.display().to_string(), e);

        std::fs::create_dir_all(&self.dir).map_err(|e| fail(&e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| fail(&e))?;
        tmp.write_all(bytes).map_err(|e| fail(&e))?;
        tmp.as_file().sync_all().map_err(|e| fail(&e))?;
        tmp.persist(&target).map_err(|e| fail(&e.error))?;

        debug!(path = %target.display(), bytes = bytes.len(), "Wrote artifact");
        Ok(target)
    }
}

/// Pretty-printed JSON array of `{link, thumb}` objects.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn backup_json(collection: &Collection) -> Result<String> {
    Ok(serde_json::to_string_pretty(collection)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    #[test]
    fn dir_sink_overwrites_fixed_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirSink::new(dir.path().join("out"));

        let first = sink.write(DOCUMENT_FILE, b"one").unwrap();
        let second = sink.write(DOCUMENT_FILE, b"two").unwrap();

        assert_eq!(first, second);
        assert_eq!(first, sink.document_path());
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "two");
        let entries = std::fs::read_dir(sink.dir()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn backup_mirrors_collection_order() {
        let collection = Collection::from_items(vec![
            Item::new("b", "b.jpg").unwrap(),
            Item::new("a", "").unwrap(),
        ])
        .unwrap();
        let json = backup_json(&collection).unwrap();
        let parsed: Vec<Item> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].link, "b");
        assert_eq!(parsed[0].thumb, "b.jpg");
        assert_eq!(parsed[1].link, "a");
        assert!(json.contains('\n'));
    }
}
