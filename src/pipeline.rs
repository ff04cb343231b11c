//! Merge-and-persist pipeline.
//!
//! [`Harvester`] orchestrates one run: load the collection, hand the known
//! identities to the page host, prepend whatever comes back, overwrite the
//! store, and regenerate both artifacts. Nothing is written unless the host
//! returns successfully and reports at least one new item.
//!
//! The collection write and the artifact writes are not transactional. If an
//! artifact write fails after the store was saved, the store is ahead of the
//! gallery until the next successful run or `render`.

use crate::artifacts::{ArtifactSink, BACKUP_FILE, DOCUMENT_FILE, backup_json};
use crate::error::{FeedError, Result};
use crate::extractor::ExtractPolicy;
use crate::host::{ExtractionRequest, PageHost, submit};
use crate::logging::OperationGuard;
use crate::model::{ArtifactPaths, ClearReport, Collection, CollectionStats, RunReport};
use crate::render::{GalleryRenderer, RenderOptions};
use crate::storage::Storage;
use crate::tags::TagStore;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Receives short progress and outcome text for the user.
pub trait StatusSink: Send + Sync {
    /// A stage of the run started.
    fn update(&self, message: &str);

    /// The run finished successfully.
    fn success(&self, message: &str);

    /// The run failed. `label` is the error's outcome class.
    fn failure(&self, label: &str, message: &str);
}

/// Discards all status text.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatus;

impl StatusSink for NullStatus {
    fn update(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn failure(&self, _label: &str, _message: &str) {}
}

/// Exclusive run permit backed by an advisory file lock.
///
/// Released when dropped.
#[derive(Debug)]
pub struct RunGuard {
    file: File,
    path: PathBuf,
}

impl RunGuard {
    /// Take the lock at `path` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::RunInProgress`] if another process or handle
    /// holds the lock.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| FeedError::path_error("create directory", parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| FeedError::path_error("open lock", &path, e))?;
        if file.try_lock_exclusive().is_err() {
            return Err(FeedError::RunInProgress { lock: path });
        }
        debug!(lock = %path.display(), "Acquired run lock");
        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(lock = %self.path.display(), error = %e, "Failed to release run lock");
        }
    }
}

/// Lock file used for a given store path.
#[must_use]
pub fn lock_path_for(store: &Path) -> PathBuf {
    let mut name = store.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Runs extractions against one collection store and artifact sink.
pub struct Harvester<A> {
    storage: Storage,
    sink: A,
    policy: ExtractPolicy,
    lock_path: Option<PathBuf>,
    tags_path: Option<PathBuf>,
    title: String,
}

impl<A> std::fmt::Debug for Harvester<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("storage", &self.storage)
            .field("policy", &self.policy)
            .field("lock_path", &self.lock_path)
            .field("tags_path", &self.tags_path)
            .finish_non_exhaustive()
    }
}

impl<A: ArtifactSink> Harvester<A> {
    /// A harvester with default policy. The run lock defaults to
    /// `<store>.lock` for file-backed storage.
    pub fn new(storage: Storage, sink: A) -> Self {
        let lock_path = storage.path().map(lock_path_for);
        Self {
            storage,
            sink,
            policy: ExtractPolicy::default(),
            lock_path,
            tags_path: None,
            title: RenderOptions::default().title,
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: ExtractPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    /// Folder file used to seed the gallery. Runs never modify it.
    #[must_use]
    pub fn with_tags(mut self, path: impl Into<PathBuf>) -> Self {
        self.tags_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub const fn policy(&self) -> &ExtractPolicy {
        &self.policy
    }

    fn guard(&self) -> Result<Option<RunGuard>> {
        self.lock_path.as_ref().map(RunGuard::acquire).transpose()
    }

    fn load_tags(&self) -> Result<TagStore> {
        self.tags_path
            .as_deref()
            .map_or_else(|| Ok(TagStore::new()), TagStore::load)
    }

    /// Run one extraction pass and merge its result.
    ///
    /// # Errors
    ///
    /// Any host, extraction, or persistence fault. On host and extraction
    /// faults nothing was written.
    pub async fn run_extraction(
        &mut self,
        host: &mut dyn PageHost,
        status: &dyn StatusSink,
    ) -> Result<RunReport> {
        let op = OperationGuard::new("run_extraction");
        match self.run_inner(host, status).await {
            Ok(report) => {
                op.complete();
                let message = if report.is_noop() {
                    format!("Nothing new ({} items total)", report.total)
                } else {
                    format!("Added {} new items ({} total)", report.added, report.total)
                };
                status.success(&message);
                Ok(report)
            }
            Err(e) => {
                op.fail(&e);
                status.failure(e.outcome_label(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(
        &mut self,
        host: &mut dyn PageHost,
        status: &dyn StatusSink,
    ) -> Result<RunReport> {
        self.policy.validate()?;
        let _guard = self.guard()?;

        status.update("Loading collection");
        let prior = self.storage.load_collection()?;
        let request = ExtractionRequest::new(&prior.known_identities(), self.policy);

        status.update(&format!("Extracting from {}", host.label()));
        let response = submit(host, &request).await?;
        info!(
            found = response.items.len(),
            rounds = response.rounds,
            stop = %response.stop,
            "Extraction returned"
        );

        if response.items.is_empty() {
            return Ok(RunReport {
                added: 0,
                total: prior.len(),
                stop: response.stop,
                rounds: response.rounds,
                position_shift: 0,
                artifacts: None,
            });
        }

        let added = response.items.len();
        let merged = prior.prepend(response.items).map_err(|e| match e {
            FeedError::DuplicateIdentity { .. } | FeedError::InvalidItem { .. } => {
                FeedError::MalformedResult {
                    reason: e.to_string(),
                }
            }
            other => other,
        })?;

        status.update("Saving collection");
        self.storage.save_collection(&merged)?;

        let tags = self.load_tags()?;
        let dangling = tags.dangling(merged.len());
        if dangling > 0 {
            warn!(
                dangling,
                total = merged.len(),
                "Folder entries reference ordinals with no item"
            );
        }

        status.update("Writing gallery");
        let artifacts = self.write_artifacts(&merged, tags)?;

        Ok(RunReport {
            added,
            total: merged.len(),
            stop: response.stop,
            rounds: response.rounds,
            position_shift: if prior.is_empty() { 0 } else { added },
            artifacts: Some(artifacts),
        })
    }

    fn write_artifacts(&mut self, collection: &Collection, seed: TagStore) -> Result<ArtifactPaths> {
        let renderer = GalleryRenderer::new(RenderOptions {
            title: self.title.clone(),
            seed,
            ..RenderOptions::default()
        });
        let document = self
            .sink
            .write(DOCUMENT_FILE, renderer.render(collection).as_bytes())?;
        let json = backup_json(collection).map_err(|e| FeedError::persistence(BACKUP_FILE, e))?;
        let backup = self.sink.write(BACKUP_FILE, json.as_bytes())?;
        info!(items = collection.len(), "Regenerated artifacts");
        Ok(ArtifactPaths { document, backup })
    }

    /// Rewrite both artifacts from the stored collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or an artifact write fails.
    pub fn regenerate(&mut self) -> Result<ArtifactPaths> {
        let _guard = self.guard()?;
        let collection = self.storage.load_collection()?;
        let tags = self.load_tags()?;
        self.write_artifacts(&collection, tags)
    }

    /// Delete the stored collection. Artifacts and folders are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::RunInProgress`] during a run, or a persistence
    /// fault if the delete fails.
    pub fn clear_all(&mut self, status: &dyn StatusSink) -> Result<ClearReport> {
        let _guard = self.guard()?;
        match self.storage.clear_collection() {
            Ok(removed) => {
                status.success(&format!(
                    "Cleared {removed} items. Folders are kept; their ordinals now refer to whatever is harvested next."
                ));
                Ok(ClearReport { removed })
            }
            Err(e) => {
                status.failure(e.outcome_label(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Summary of the store and folder file.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the folder file cannot be read.
    pub fn stats(&self) -> Result<CollectionStats> {
        let collection = self.storage.load_collection()?;
        let tags = self.load_tags()?;
        Ok(CollectionStats {
            total: collection.len(),
            newest: collection.newest().map(|i| i.link.clone()),
            oldest: collection.oldest().map(|i| i.link.clone()),
            missing_thumbs: collection.iter().filter(|i| i.thumb.is_empty()).count(),
            revision: self.storage.revision()?,
            updated_at: self.storage.updated_at()?,
            folders: tags.len(),
            tagged_ordinals: tags.tagged_ordinals().len(),
            dangling_ordinals: tags.dangling(collection.len()),
        })
    }
}
