//! Page automation host.
//!
//! The extractor runs on the surface side of a message boundary; the
//! pipeline runs on the control side. They exchange exactly one serialized
//! request and one serialized response per run, so the two sides never
//! share memory and could live in separate processes.

use crate::error::{FeedError, Result};
use crate::extractor::{ExtractPolicy, Extractor};
use crate::model::{Item, StopReason};
use crate::surface::{CaptureSurface, ContentSurface, HttpFeedSurface, HttpOptions, MemorySurface};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// What the control side submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Links already persisted. Never reported back as new.
    pub known: Vec<String>,
    pub policy: ExtractPolicy,
}

impl ExtractionRequest {
    /// Build a request from a known-identity snapshot. Links are sorted so
    /// the payload is deterministic.
    #[must_use]
    pub fn new(known: &HashSet<String>, policy: ExtractPolicy) -> Self {
        let mut known: Vec<String> = known.iter().cloned().collect();
        known.sort_unstable();
        Self { known, policy }
    }
}

/// What the surface side returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub items: Vec<Item>,
    pub rounds: usize,
    pub stop: StopReason,
}

/// Executes extraction logic inside a surface's context.
#[async_trait]
pub trait PageHost: Send {
    /// Human-readable name of the attached source.
    fn label(&self) -> String;

    /// Run one extraction. Both payloads are JSON documents.
    async fn execute(&mut self, payload: String) -> Result<String>;
}

/// Submit a request through `host` and decode its reply.
///
/// # Errors
///
/// Propagates host errors unchanged. A reply that cannot be decoded becomes
/// [`FeedError::MalformedResult`].
pub async fn submit(
    host: &mut dyn PageHost,
    request: &ExtractionRequest,
) -> Result<ExtractionResponse> {
    let payload = serde_json::to_string(request)?;
    debug!(
        host = %host.label(),
        known = request.known.len(),
        bytes = payload.len(),
        "Submitting extraction"
    );
    let reply = host.execute(payload).await?;
    serde_json::from_str(&reply).map_err(|e| FeedError::MalformedResult {
        reason: e.to_string(),
    })
}

/// Something a host can attach a fresh surface from.
#[async_trait]
pub trait SurfaceSource: Send {
    fn label(&self) -> String;

    /// # Errors
    ///
    /// Returns [`FeedError::HostUnavailable`] when no surface can be found.
    async fn attach(&mut self) -> Result<Box<dyn ContentSurface>>;
}

/// Where the feed comes from.
#[derive(Debug, Clone)]
pub enum SurfaceSpec {
    /// A directory of saved page fragments.
    Capture { dir: PathBuf, base: Option<Url> },
    /// A paged HTML feed over HTTP.
    Http { url: Url, options: HttpOptions },
}

impl SurfaceSpec {
    /// Interpret a CLI source argument: `http(s)://` URLs are feeds, anything
    /// else is a capture directory.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidArgument`] for an unparsable URL.
    pub fn parse(source: &str, base: Option<&str>, options: HttpOptions) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let url = Url::parse(source)
                .map_err(|e| FeedError::invalid_argument(format!("bad feed URL '{source}': {e}")))?;
            return Ok(Self::Http { url, options });
        }
        let base = base
            .map(|b| {
                Url::parse(b)
                    .map_err(|e| FeedError::invalid_argument(format!("bad base URL '{b}': {e}")))
            })
            .transpose()?;
        Ok(Self::Capture {
            dir: PathBuf::from(source),
            base,
        })
    }
}

#[async_trait]
impl SurfaceSource for SurfaceSpec {
    fn label(&self) -> String {
        match self {
            Self::Capture { dir, .. } => format!("capture:{}", dir.display()),
            Self::Http { url, .. } => url.to_string(),
        }
    }

    async fn attach(&mut self) -> Result<Box<dyn ContentSurface>> {
        match self {
            Self::Capture { dir, base } => {
                Ok(Box::new(CaptureSurface::open(dir.as_path(), base.clone())?))
            }
            Self::Http { url, options } => {
                Ok(Box::new(HttpFeedSurface::connect(url.clone(), options).await?))
            }
        }
    }
}

/// Hands out one pre-built [`MemorySurface`], then reports no surface.
#[derive(Debug, Default)]
pub struct MemorySource {
    surface: Option<MemorySurface>,
}

impl MemorySource {
    #[must_use]
    pub const fn new(surface: MemorySurface) -> Self {
        Self {
            surface: Some(surface),
        }
    }

    /// A source with no surface at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self { surface: None }
    }
}

#[async_trait]
impl SurfaceSource for MemorySource {
    fn label(&self) -> String {
        "memory".to_string()
    }

    async fn attach(&mut self) -> Result<Box<dyn ContentSurface>> {
        self.surface
            .take()
            .map(|s| Box::new(s) as Box<dyn ContentSurface>)
            .ok_or_else(|| FeedError::host_unavailable("no active content surface"))
    }
}

/// A host running the extractor in-process, behind a JSON round-trip.
#[derive(Debug)]
pub struct LocalHost<S> {
    source: S,
}

impl<S: SurfaceSource> LocalHost<S> {
    pub const fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: SurfaceSource> PageHost for LocalHost<S> {
    fn label(&self) -> String {
        self.source.label()
    }

    async fn execute(&mut self, payload: String) -> Result<String> {
        let request: ExtractionRequest =
            serde_json::from_str(&payload).map_err(|e| FeedError::MalformedResult {
                reason: format!("request: {e}"),
            })?;

        let mut surface = self.source.attach().await?;
        info!(source = %self.source.label(), "Surface attached");

        let known: HashSet<String> = request.known.into_iter().collect();
        let extraction = Extractor::new(known, request.policy)
            .run(surface.as_mut())
            .await?;

        let response = ExtractionResponse {
            items: extraction.items,
            rounds: extraction.rounds,
            stop: extraction.stop,
        };
        Ok(serde_json::to_string(&response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::PostRef;

    #[tokio::test(start_paused = true)]
    async fn local_host_round_trips_through_json() {
        let surface = MemorySurface::new(vec![vec![
            PostRef::new("new", "n.jpg"),
            PostRef::new("old", "o.jpg"),
        ]]);
        let mut host = LocalHost::new(MemorySource::new(surface));
        let known: HashSet<String> = std::iter::once("old".to_string()).collect();
        let request = ExtractionRequest::new(&known, ExtractPolicy::default());

        let response = submit(&mut host, &request).await.unwrap();
        assert_eq!(response.stop, StopReason::Boundary);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].link, "new");
        assert_eq!(response.items[0].thumb, "n.jpg");
    }

    #[tokio::test]
    async fn missing_surface_is_host_unavailable() {
        let mut host = LocalHost::new(MemorySource::empty());
        let request = ExtractionRequest::new(&HashSet::new(), ExtractPolicy::default());
        let err = submit(&mut host, &request).await.unwrap_err();
        assert!(matches!(err, FeedError::HostUnavailable { .. }));
    }

    #[test]
    fn request_is_sorted_for_stable_payloads() {
        let known: HashSet<String> = ["b", "c", "a"].iter().map(|s| (*s).to_string()).collect();
        let request = ExtractionRequest::new(&known, ExtractPolicy::default());
        assert_eq!(request.known, ["a", "b", "c"]);
    }

    #[test]
    fn spec_parses_urls_and_directories() {
        let spec = SurfaceSpec::parse("https://feed.test/saved/", None, HttpOptions::default())
            .unwrap();
        assert!(matches!(spec, SurfaceSpec::Http { .. }));

        let spec = SurfaceSpec::parse(
            "./captures",
            Some("https://feed.test/"),
            HttpOptions::default(),
        )
        .unwrap();
        assert!(matches!(spec, SurfaceSpec::Capture { base: Some(_), .. }));

        assert!(SurfaceSpec::parse("./captures", Some("not a url"), HttpOptions::default()).is_err());
    }
}
