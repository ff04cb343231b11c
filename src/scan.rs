//! Post reference scanner.
//!
//! Walks the anchors of a page's markup and keeps those pointing at a post
//! (`/p/`, `/reel/`, `/tv/`), paired with the first image nested inside the
//! anchor. Hrefs are resolved against the page URL so that the same post
//! always yields the same link.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Path fragments that mark an anchor as a post reference.
pub const POST_PATH_MARKERS: &[&str] = &["/p/", "/reel/", "/tv/"];

// Attribute runs skip over quoted values so a `>` inside one does not end the tag.
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b((?:[^>"']|"[^"]*"|'[^']*')*)>(.*?)</a\s*>"#).expect("anchor regex")
});

static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("href regex")
});

static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("img regex")
});

static NEXT_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(?:link|a)\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("next link regex")
});

static REL_NEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\brel\s*=\s*(?:"[^"]*\bnext\b[^"]*"|'[^']*\bnext\b[^']*'|next\b)"#)
        .expect("rel regex")
});

/// A post reference as observed on the page, before identity checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub link: String,
    pub thumb: String,
}

impl PostRef {
    pub fn new(link: impl Into<String>, thumb: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            thumb: thumb.into(),
        }
    }
}

/// Extracts [`PostRef`]s from page markup.
#[derive(Debug, Clone, Default)]
pub struct PostScanner {
    base: Option<Url>,
}

impl PostScanner {
    /// Scanner that keeps hrefs exactly as written.
    #[must_use]
    pub const fn new() -> Self {
        Self { base: None }
    }

    /// Scanner that resolves relative hrefs against `base`.
    #[must_use]
    pub const fn with_base(base: Url) -> Self {
        Self { base: Some(base) }
    }

    #[must_use]
    pub const fn base(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// All post references in document order. Repeats are kept; callers
    /// deduplicate by identity.
    #[must_use]
    pub fn scan(&self, html: &str) -> Vec<PostRef> {
        ANCHOR_RE
            .captures_iter(html)
            .filter_map(|cap| {
                let attrs = cap.get(1)?.as_str();
                let body = cap.get(2).map_or("", |m| m.as_str());
                let href = first_group(&HREF_RE, attrs)?;
                let link = self.resolve(&decode_entities(href.trim()));
                if !is_post_link(&link) || !is_web_link(&link) {
                    return None;
                }
                let thumb = first_group(&IMG_SRC_RE, body)
                    .map(|src| self.resolve(&decode_entities(src.trim())))
                    .filter(|src| is_web_link(src))
                    .unwrap_or_default();
                Some(PostRef { link, thumb })
            })
            .collect()
    }

    /// Target of the first `rel="next"` link or anchor, resolved.
    #[must_use]
    pub fn next_page(&self, html: &str) -> Option<String> {
        NEXT_LINK_RE.captures_iter(html).find_map(|cap| {
            let attrs = cap.get(1)?.as_str();
            if !REL_NEXT_RE.is_match(attrs) {
                return None;
            }
            let href = first_group(&HREF_RE, attrs)?;
            Some(self.resolve(&decode_entities(href.trim())))
        })
    }

    fn resolve(&self, href: &str) -> String {
        if href.is_empty() {
            return String::new();
        }
        match &self.base {
            Some(base) => base
                .join(href)
                .map_or_else(|_| href.to_string(), |url| url.to_string()),
            None => href.to_string(),
        }
    }
}

/// Whether `link` points at a post.
#[must_use]
pub fn is_post_link(link: &str) -> bool {
    POST_PATH_MARKERS.iter().any(|marker| link.contains(marker))
}

/// Whether `link` may be emitted as a link target: an `http(s)` URL or a
/// relative reference. Any other scheme (`javascript:`, `data:`, ...) is refused.
#[must_use]
pub fn is_web_link(link: &str) -> bool {
    match Url::parse(link) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => !link
            .split(['/', '?', '#'])
            .next()
            .is_some_and(|head| head.contains(':')),
    }
}

fn first_group<'h>(re: &Regex, haystack: &'h str) -> Option<&'h str> {
    let cap = re.captures(haystack)?;
    (1..cap.len()).find_map(|i| cap.get(i)).map(|m| m.as_str())
}

/// Decode the handful of entities that appear in attribute values.
#[must_use]
pub fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
