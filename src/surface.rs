//! Live content surfaces.
//!
//! A surface is whatever the extractor scrolls: it can reveal more content,
//! report a content-size signal, and list the post references currently
//! revealed. Surfaces are driven strictly sequentially by one extractor.

use crate::error::{FeedError, Result};
use crate::scan::{PostRef, PostScanner};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// A scrollable feed surface.
#[async_trait]
pub trait ContentSurface: Send {
    /// Scroll-to-end equivalent. Content may arrive asynchronously afterwards.
    async fn reveal_more(&mut self) -> Result<()>;

    /// Content-size signal (total scrollable extent or equivalent).
    async fn content_extent(&mut self) -> Result<u64>;

    /// Every post reference currently revealed, in document order.
    async fn post_references(&mut self) -> Result<Vec<PostRef>>;
}

// ============================================================================
// In-memory surface
// ============================================================================

/// A surface replaying pre-built pages from memory.
///
/// Page 0 is visible from the start; each reveal appends the next page.
/// An empty page models a round where loading stalled. A window limits how
/// many of the most recent pages stay visible, the way virtualized feeds
/// unload content that scrolled away.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    pages: Vec<Vec<PostRef>>,
    revealed: usize,
    window: Option<usize>,
    detach_after: Option<usize>,
    reveals: usize,
}

impl MemorySurface {
    #[must_use]
    pub fn new(pages: Vec<Vec<PostRef>>) -> Self {
        Self {
            revealed: usize::from(!pages.is_empty()),
            pages,
            ..Self::default()
        }
    }

    /// Keep only the last `pages` revealed pages visible.
    #[must_use]
    pub const fn with_window(mut self, pages: usize) -> Self {
        self.window = Some(pages);
        self
    }

    /// Make the surface disappear after `reveals` scrolls.
    #[must_use]
    pub const fn detach_after(mut self, reveals: usize) -> Self {
        self.detach_after = Some(reveals);
        self
    }

    /// Number of reveal requests received so far.
    #[must_use]
    pub const fn reveals(&self) -> usize {
        self.reveals
    }

    fn check_attached(&self) -> Result<()> {
        match self.detach_after {
            Some(limit) if self.reveals > limit => {
                Err(FeedError::host_unavailable("surface was removed from the page"))
            }
            _ => Ok(()),
        }
    }

    fn visible_pages(&self) -> &[Vec<PostRef>] {
        let revealed = &self.pages[..self.revealed];
        match self.window {
            Some(window) if revealed.len() > window => &revealed[revealed.len() - window..],
            _ => revealed,
        }
    }
}

#[async_trait]
impl ContentSurface for MemorySurface {
    async fn reveal_more(&mut self) -> Result<()> {
        self.reveals += 1;
        self.check_attached()?;
        if self.revealed < self.pages.len() {
            self.revealed += 1;
        }
        Ok(())
    }

    async fn content_extent(&mut self) -> Result<u64> {
        self.check_attached()?;
        let refs: usize = self.pages[..self.revealed].iter().map(Vec::len).sum();
        Ok(u64::try_from(refs).unwrap_or(u64::MAX))
    }

    async fn post_references(&mut self) -> Result<Vec<PostRef>> {
        self.check_attached()?;
        Ok(self.visible_pages().iter().flatten().cloned().collect())
    }
}

// ============================================================================
// Capture directory surface
// ============================================================================

/// A surface backed by a directory of saved page fragments.
///
/// Files ending in `.html` are replayed in file-name order: the first is the
/// initially loaded page, each reveal appends the next one. The content-size
/// signal is the byte length of everything revealed.
#[derive(Debug)]
pub struct CaptureSurface {
    dir: PathBuf,
    chunks: Vec<String>,
    revealed: usize,
    scanner: PostScanner,
}

impl CaptureSurface {
    /// Attach to a capture directory.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::HostUnavailable`] if the directory is missing or
    /// holds no `.html` files.
    pub fn open(dir: impl AsRef<Path>, base: Option<Url>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(FeedError::host_unavailable(format!(
                "capture directory not found: {}",
                dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| FeedError::path_error("read", dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(FeedError::host_unavailable(format!(
                "no .html captures in {}",
                dir.display()
            )));
        }

        let chunks = files
            .iter()
            .map(|path| {
                std::fs::read_to_string(path).map_err(|e| FeedError::path_error("read", path, e))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(dir = %dir.display(), chunks = chunks.len(), "Attached capture surface");

        let scanner = base.map_or_else(PostScanner::new, PostScanner::with_base);
        Ok(Self {
            dir: dir.to_path_buf(),
            chunks,
            revealed: 1,
            scanner,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl ContentSurface for CaptureSurface {
    async fn reveal_more(&mut self) -> Result<()> {
        if self.revealed < self.chunks.len() {
            self.revealed += 1;
            debug!(revealed = self.revealed, "Revealed capture chunk");
        }
        Ok(())
    }

    async fn content_extent(&mut self) -> Result<u64> {
        let bytes: usize = self.chunks[..self.revealed].iter().map(String::len).sum();
        Ok(u64::try_from(bytes).unwrap_or(u64::MAX))
    }

    async fn post_references(&mut self) -> Result<Vec<PostRef>> {
        Ok(self.chunks[..self.revealed]
            .iter()
            .flat_map(|chunk| self.scanner.scan(chunk))
            .collect())
    }
}

// ============================================================================
// HTTP feed surface
// ============================================================================

/// HTTP settings for [`HttpFeedSurface`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("feedfold/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A paged HTML feed followed over HTTP.
///
/// Each reveal fetches the page named by the current page's `rel="next"`
/// link. When there is no next link, or it points at a page already
/// fetched, the feed has ended and the size signal stops changing.
#[derive(Debug)]
pub struct HttpFeedSurface {
    client: reqwest::Client,
    pages: Vec<String>,
    next: Option<Url>,
    visited: HashSet<Url>,
    scanner: PostScanner,
}

impl HttpFeedSurface {
    /// Fetch the first page of the feed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::HostUnavailable`] when the first page cannot be
    /// fetched.
    pub async fn connect(start: Url, options: &HttpOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(options.timeout)
            .build()
            .map_err(|e| FeedError::host_unavailable(format!("http client: {e}")))?;

        let first = fetch(&client, &start)
            .await
            .map_err(|e| FeedError::host_unavailable(format!("{start}: {e}")))?;

        let scanner = PostScanner::with_base(start.clone());
        let next = next_url(&scanner, &first).filter(|next| next != &start);
        info!(url = %start, has_next = next.is_some(), "Attached HTTP feed surface");

        Ok(Self {
            client,
            pages: vec![first],
            next,
            visited: HashSet::from([start]),
            scanner,
        })
    }

    #[must_use]
    pub fn pages_loaded(&self) -> usize {
        self.pages.len()
    }
}

async fn fetch(client: &reqwest::Client, url: &Url) -> Result<String> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

fn next_url(scanner: &PostScanner, page: &str) -> Option<Url> {
    scanner
        .next_page(page)
        .and_then(|href| Url::parse(&href).ok())
}

#[async_trait]
impl ContentSurface for HttpFeedSurface {
    async fn reveal_more(&mut self) -> Result<()> {
        let Some(url) = self.next.take() else {
            return Ok(());
        };
        let page = fetch(&self.client, &url).await?;
        self.visited.insert(url.clone());
        self.next = next_url(&self.scanner, &page).filter(|next| !self.visited.contains(next));
        debug!(url = %url, pages = self.pages.len() + 1, "Fetched feed page");
        self.pages.push(page);
        Ok(())
    }

    async fn content_extent(&mut self) -> Result<u64> {
        let bytes: usize = self.pages.iter().map(String::len).sum();
        Ok(u64::try_from(bytes).unwrap_or(u64::MAX))
    }

    async fn post_references(&mut self) -> Result<Vec<PostRef>> {
        Ok(self
            .pages
            .iter()
            .flat_map(|page| self.scanner.scan(page))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(links: &[&str]) -> Vec<PostRef> {
        links.iter().map(|l| PostRef::new(*l, "")).collect()
    }

    #[tokio::test]
    async fn memory_surface_reveals_page_by_page() {
        let mut surface = MemorySurface::new(vec![refs(&["a", "b"]), refs(&["c"])]);
        assert_eq!(surface.content_extent().await.unwrap(), 2);
        surface.reveal_more().await.unwrap();
        assert_eq!(surface.content_extent().await.unwrap(), 3);
        surface.reveal_more().await.unwrap();
        assert_eq!(surface.content_extent().await.unwrap(), 3);
        assert_eq!(surface.post_references().await.unwrap().len(), 3);
        assert_eq!(surface.reveals(), 2);
    }

    #[tokio::test]
    async fn memory_surface_window_hides_old_pages() {
        let mut surface =
            MemorySurface::new(vec![refs(&["a"]), refs(&["b"]), refs(&["c"])]).with_window(1);
        surface.reveal_more().await.unwrap();
        surface.reveal_more().await.unwrap();
        let visible = surface.post_references().await.unwrap();
        assert_eq!(visible, refs(&["c"]));
    }

    #[tokio::test]
    async fn memory_surface_detaches() {
        let mut surface = MemorySurface::new(vec![refs(&["a"])]).detach_after(1);
        surface.reveal_more().await.unwrap();
        assert!(surface.reveal_more().await.is_err());
    }

    #[tokio::test]
    async fn capture_surface_replays_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("001.html"), r#"<a href="/p/new/">x</a>"#).unwrap();
        std::fs::write(dir.path().join("002.html"), r#"<a href="/p/old/">y</a>"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let base = Url::parse("https://feed.test/").unwrap();
        let mut surface = CaptureSurface::open(dir.path(), Some(base)).unwrap();
        assert_eq!(surface.chunk_count(), 2);

        let first = surface.post_references().await.unwrap();
        assert_eq!(first, refs(&["https://feed.test/p/new/"]));

        let before = surface.content_extent().await.unwrap();
        surface.reveal_more().await.unwrap();
        assert!(surface.content_extent().await.unwrap() > before);
        assert_eq!(surface.post_references().await.unwrap().len(), 2);
    }

    /// Serve `pages` (path, body) over HTTP/1.1 on a loopback port and
    /// return the root URL. Unknown paths answer 500.
    async fn serve(pages: Vec<(&'static str, String)>) -> Url {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let pages = pages.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&request).into_owned();
                    let path = head.split_whitespace().nth(1).unwrap_or("/");
                    let (status, body) = pages
                        .iter()
                        .find(|(p, _)| *p == path)
                        .map_or(("500 Internal Server Error", "down"), |(_, b)| ("200 OK", b.as_str()));
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    fn feed_page(code: &str, next: Option<&str>) -> String {
        let mut html = format!(r#"<a href="/p/{code}/"><img src="/{code}.jpg"></a>"#);
        if let Some(next) = next {
            html.push_str(&format!(r#"<link rel="next" href="{next}">"#));
        }
        html
    }

    fn links_of(refs: &[PostRef]) -> Vec<&str> {
        refs.iter()
            .map(|r| r.link.rsplit('/').nth(1).unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn http_surface_follows_next_until_it_repeats() {
        let root = serve(vec![
            ("/", feed_page("one", Some("/page2"))),
            ("/page2", feed_page("two", Some("/page3"))),
            ("/page3", feed_page("three", Some("/page3"))),
        ])
        .await;
        let mut surface = HttpFeedSurface::connect(root.clone(), &HttpOptions::default())
            .await
            .unwrap();
        assert_eq!(surface.pages_loaded(), 1);

        surface.reveal_more().await.unwrap();
        surface.reveal_more().await.unwrap();
        assert_eq!(surface.pages_loaded(), 3);
        let extent = surface.content_extent().await.unwrap();

        // page3 names itself as next; nothing more is fetched.
        surface.reveal_more().await.unwrap();
        assert_eq!(surface.pages_loaded(), 3);
        assert_eq!(surface.content_extent().await.unwrap(), extent);

        let refs = surface.post_references().await.unwrap();
        assert_eq!(links_of(&refs), ["one", "two", "three"]);
        assert_eq!(refs[0].link, root.join("/p/one/").unwrap().as_str());
        assert_eq!(refs[0].thumb, root.join("/one.jpg").unwrap().as_str());
    }

    #[tokio::test]
    async fn http_surface_stops_on_cycle_back_to_start() {
        let root = serve(vec![
            ("/", feed_page("one", Some("/b"))),
            ("/b", feed_page("two", Some("/"))),
        ])
        .await;
        let mut surface = HttpFeedSurface::connect(root, &HttpOptions::default())
            .await
            .unwrap();
        for _ in 0..3 {
            surface.reveal_more().await.unwrap();
        }
        assert_eq!(surface.pages_loaded(), 2);
    }

    #[tokio::test]
    async fn http_surface_unreachable_start_is_host_unavailable() {
        let root = serve(Vec::new()).await;
        let err = HttpFeedSurface::connect(root, &HttpOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::HostUnavailable { .. }));
    }

    #[tokio::test]
    async fn http_fetch_error_mid_run_is_extraction_fault() {
        use crate::extractor::{ExtractPolicy, Extractor};

        let root = serve(vec![
            ("/", feed_page("one", Some("/page2"))),
            ("/page2", feed_page("two", Some("/gone"))),
        ])
        .await;
        let mut surface = HttpFeedSurface::connect(root, &HttpOptions::default())
            .await
            .unwrap();
        let policy = ExtractPolicy {
            settle_delay_ms: 1,
            final_settle_ms: 1,
            stability_rounds: 3,
            max_rounds: Some(10),
        };

        let err = Extractor::new(HashSet::new(), policy)
            .run(&mut surface)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::ExtractionFault { round: 2, .. }), "{err:?}");
    }

    #[test]
    fn capture_surface_requires_captures() {
        let dir = tempfile::tempdir().unwrap();
        let err = CaptureSurface::open(dir.path(), None).unwrap_err();
        assert!(matches!(err, FeedError::HostUnavailable { .. }));

        let err = CaptureSurface::open(dir.path().join("missing"), None).unwrap_err();
        assert!(matches!(err, FeedError::HostUnavailable { .. }));
    }
}
