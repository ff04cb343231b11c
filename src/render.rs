//! Gallery document rendering.
//!
//! Produces one self-contained HTML file: a grid of cards, one per item,
//! newest first, each carrying its ordinal. The document embeds a small
//! script that implements the folder tag store against browser
//! `localStorage` with the same semantics as [`crate::tags`]: folders hold
//! ordinals, toggles flip membership, range and folder filters hide cards.
//!
//! Ordinals are recomputed here on every render. Nothing in the document
//! references the collection store.

use crate::model::{Collection, Item, Ordinal, PLACEHOLDER_THUMB};
use crate::scan::is_web_link;
use crate::tags::TagStore;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write;

/// `localStorage` key the document keeps its folders under.
pub const STORAGE_KEY: &str = "feedfold_folders";

/// Characters of the link shown on a card before truncation.
pub const LINK_DISPLAY_CHARS: usize = 60;

const EMBED_HOST: &str = "https://www.instagram.com";

// Stand-in target for links that are not http(s).
const BLANK_TARGET: &str = "about:blank";

/// One rendered card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub ordinal: Ordinal,
    pub link: String,
    pub thumb: String,
    /// URL for the in-page viewer.
    pub embed: String,
    /// Link text as displayed.
    pub label: String,
}

impl Card {
    #[must_use]
    pub fn new(ordinal: Ordinal, item: &Item) -> Self {
        let (link, embed) = if is_web_link(&item.link) {
            (item.link.clone(), embed_url(&item.link))
        } else {
            (BLANK_TARGET.to_string(), BLANK_TARGET.to_string())
        };
        let thumb = Some(item.thumb_or_placeholder())
            .filter(|thumb| is_web_link(thumb))
            .unwrap_or(PLACEHOLDER_THUMB);
        Self {
            ordinal,
            link,
            thumb: thumb.to_string(),
            embed,
            label: display_link(&item.link),
        }
    }
}

/// Ordinal for every item, newest first: `N, N-1, ..., 1`.
#[must_use]
pub fn ordinals(collection: &Collection) -> Vec<Ordinal> {
    collection.with_ordinals().map(|(ordinal, _)| ordinal).collect()
}

/// Cards for every item, newest first.
#[must_use]
pub fn cards(collection: &Collection) -> Vec<Card> {
    collection
        .with_ordinals()
        .map(|(ordinal, item)| Card::new(ordinal, item))
        .collect()
}

/// Map a post link to its embeddable viewer URL.
///
/// `/reel/<code>`, `/p/<code>` and `/tv/<code>` links become the captioned
/// embed page for that code; anything else is returned unchanged.
#[must_use]
pub fn embed_url(link: &str) -> String {
    for marker in ["/reel/", "/p/", "/tv/"] {
        let Some((_, rest)) = link.split_once(marker) else {
            continue;
        };
        let code = rest
            .split('/')
            .next()
            .and_then(|segment| segment.split('?').next())
            .unwrap_or_default();
        if code.is_empty() {
            return link.to_string();
        }
        let kind = marker.trim_matches('/');
        return format!("{EMBED_HOST}/{kind}/{code}/embed/captioned/?utm_source=ig_embed");
    }
    link.to_string()
}

/// Link text for a card, cut at [`LINK_DISPLAY_CHARS`] characters.
#[must_use]
pub fn display_link(link: &str) -> String {
    if link.chars().count() > LINK_DISPLAY_CHARS {
        let head: String = link.chars().take(LINK_DISPLAY_CHARS).collect();
        format!("{head}...")
    } else {
        link.to_string()
    }
}

/// Escape text for HTML element content and quoted attribute values.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that is safe to place inside a `<script>` element.
#[must_use]
pub fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
        .replace("<!--", "<\\!--")
}

/// Settings for one render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub generated_at: DateTime<Local>,
    /// Folders used when the browser has none stored yet.
    pub seed: TagStore,
    /// File name shown in the footer.
    pub document_name: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Feed Collection".to_string(),
            generated_at: Local::now(),
            seed: TagStore::new(),
            document_name: crate::artifacts::DOCUMENT_FILE.to_string(),
        }
    }
}

/// Renders a [`Collection`] into the gallery document.
#[derive(Debug, Clone, Default)]
pub struct GalleryRenderer {
    options: RenderOptions,
}

impl GalleryRenderer {
    #[must_use]
    pub const fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the full HTML document.
    #[must_use]
    pub fn render(&self, collection: &Collection) -> String {
        let total = collection.len();
        let title = escape_html(&self.options.title);
        let generated = self.options.generated_at.format("%Y-%m-%d %H:%M:%S");

        let mut html = String::with_capacity(2048 + total * 640);
        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} - {total} items</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
<h1>{title}</h1>
<div class="subtitle">Updated {generated}</div>

<section class="folder-section">
  <div class="folder-controls">
    <input type="text" id="folderName" placeholder="New folder name">
    <button type="button" data-action="create-folder">Create folder</button>
  </div>
  <div class="folder-list" id="folderList"></div>
</section>

<div class="controls">
  <div class="search-box">
    <label for="rangeFrom">Ordinals</label>
    <input type="number" id="rangeFrom" placeholder="from" min="1" max="{total}">
    <label for="rangeTo">to</label>
    <input type="number" id="rangeTo" placeholder="to" min="1" max="{total}">
    <button type="button" data-action="filter-range">Filter</button>
    <button type="button" data-action="reset-filter">Reset</button>
  </div>
</div>

<div class="stats" id="statsDisplay">Showing all {total} items</div>

<div class="grid" id="grid">
"#
        );

        for card in cards(collection) {
            write_card(&mut html, &card);
        }

        let _ = write!(
            html,
            r#"</div>

<div class="footer">
  File: {document}<br>
  Total items: {total}<br>
  Generated: {generated}
</div>
</div>

<div class="selection-bar" id="selectionBar">
  <span><span id="selectedCount">0</span> selected</span>
  <button type="button" data-action="manage-selected">Folders</button>
  <button type="button" data-action="clear-selection">Cancel</button>
</div>

<div class="modal" id="folderModal" data-action="close-folder-modal">
  <div class="modal-content">
    <div class="modal-header">Choose folders</div>
    <div id="modalFolderList"></div>
    <div class="modal-actions">
      <button type="button" data-action="confirm-folders">Apply</button>
      <button type="button" data-action="close-folder-modal">Cancel</button>
    </div>
  </div>
</div>

<div class="modal" id="viewerModal" data-action="close-viewer">
  <div class="viewer">
    <button type="button" class="viewer-close" data-action="close-viewer">&#215;</button>
    <iframe id="viewerFrame" allowfullscreen></iframe>
  </div>
</div>

<script>
const TOTAL = {total};
const STORAGE_KEY = {key};
const PLACEHOLDER = {placeholder};
const SEED = {seed};
{SCRIPT}
</script>
</body>
</html>
"#,
            document = escape_html(&self.options.document_name),
            key = script_json(&STORAGE_KEY),
            placeholder = script_json(&PLACEHOLDER_THUMB),
            seed = script_json(&self.options.seed),
        );
        html
    }
}

fn write_card(html: &mut String, card: &Card) {
    let link = if is_web_link(&card.link) {
        escape_html(&card.link)
    } else {
        BLANK_TARGET.to_string()
    };
    let _ = write!(
        html,
        r#"<div class="card" data-number="{ordinal}" data-embed="{embed}">
  <input type="checkbox" class="select" data-action="select">
  <img src="{thumb}" class="thumb" alt="Post {ordinal}" loading="lazy" data-action="view">
  <div class="card-content">
    <div class="card-number">#{ordinal}</div>
    <a href="{link}" target="_blank" rel="noopener" class="card-link">{label}</a>
    <button type="button" data-action="manage-card">Folders</button>
  </div>
</div>
"#,
        ordinal = card.ordinal,
        embed = escape_html(&card.embed),
        thumb = escape_html(&card.thumb),
        label = escape_html(&card.label),
    );
}

const STYLE: &str = r"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', Tahoma, sans-serif; background: #1a1a2e; color: #e0e0e0; padding: 20px; }
.container { max-width: 1400px; margin: 0 auto; background: #0f3460; border-radius: 16px; padding: 28px; }
h1 { text-align: center; color: #00d4ff; margin-bottom: 8px; }
.subtitle, .stats, .footer { text-align: center; color: #a0a0a0; margin-bottom: 16px; }
.folder-section, .search-box { background: #1a1a2e; border-radius: 12px; padding: 14px; margin-bottom: 16px; }
.folder-controls, .search-box { display: flex; gap: 8px; flex-wrap: wrap; align-items: center; }
input { background: #0f3460; color: #e0e0e0; border: 1px solid #00d4ff; border-radius: 8px; padding: 8px; }
button { background: #00d4ff; color: #1a1a2e; border: 0; border-radius: 8px; padding: 8px 14px; cursor: pointer; font-weight: 600; }
.folder-list { display: flex; gap: 8px; flex-wrap: wrap; margin-top: 12px; }
.folder-tag { background: #16213e; border: 1px solid #00d4ff; border-radius: 16px; padding: 6px 12px; cursor: pointer; display: flex; gap: 6px; align-items: center; }
.folder-tag.active { background: #00d4ff; color: #1a1a2e; }
.folder-tag .delete { background: transparent; color: inherit; padding: 0 4px; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 18px; }
.card { position: relative; background: #1a1a2e; border-radius: 12px; overflow: hidden; border: 2px solid transparent; }
.card.selected { border-color: #00d4ff; }
.card.hidden { display: none; }
.card .select { position: absolute; top: 10px; left: 10px; width: 20px; height: 20px; }
.thumb { width: 100%; height: 280px; object-fit: cover; cursor: pointer; display: block; }
.card-content { padding: 12px; }
.card-number { color: #00d4ff; font-weight: 700; margin-bottom: 6px; }
.card-link { color: #a0a0a0; word-break: break-all; font-size: 0.85em; display: block; margin-bottom: 8px; }
.selection-bar { position: fixed; bottom: -80px; left: 0; right: 0; background: #16213e; padding: 14px; display: flex; gap: 12px; justify-content: center; align-items: center; transition: bottom 0.2s; }
.selection-bar.show { bottom: 0; }
.modal { display: none; position: fixed; inset: 0; background: rgba(0,0,0,0.8); align-items: center; justify-content: center; }
.modal.show { display: flex; }
.modal-content { background: #0f3460; border-radius: 12px; padding: 20px; min-width: 320px; max-height: 80vh; overflow-y: auto; }
.modal-header { color: #00d4ff; font-weight: 700; margin-bottom: 12px; }
.modal-folder { display: flex; gap: 10px; align-items: center; padding: 8px; border-radius: 8px; cursor: pointer; }
.modal-folder.chosen { background: #16213e; }
.modal-folder .coverage { margin-left: auto; }
.modal-actions { display: flex; gap: 8px; margin-top: 14px; justify-content: flex-end; }
.viewer { position: relative; width: min(540px, 95vw); height: 90vh; }
.viewer iframe { width: 100%; height: 100%; border: 0; background: #fff; border-radius: 8px; }
.viewer-close { position: absolute; top: -14px; right: -14px; border-radius: 50%; }
";

const SCRIPT: &str = r#"
let folders = loadFolders();
let activeFolder = 'all';
const selectedCards = new Set();
const chosenFolders = new Set();

function loadFolders() {
  const raw = localStorage.getItem(STORAGE_KEY);
  if (raw === null) {
    const seeded = JSON.parse(JSON.stringify(SEED || {}));
    localStorage.setItem(STORAGE_KEY, JSON.stringify(seeded));
    return seeded;
  }
  try { return JSON.parse(raw) || {}; } catch (e) { return {}; }
}

function saveFolders() {
  localStorage.setItem(STORAGE_KEY, JSON.stringify(folders));
}

function el(tag, cls, text) {
  const node = document.createElement(tag);
  if (cls) node.className = cls;
  if (text !== undefined) node.textContent = text;
  return node;
}

function cardNumber(card) {
  return parseInt(card.dataset.number, 10);
}

function renderFolderList() {
  const list = document.getElementById('folderList');
  list.replaceChildren();
  const all = el('div', 'folder-tag', 'All');
  all.dataset.action = 'filter-folder';
  all.dataset.folder = 'all';
  list.appendChild(all);
  Object.keys(folders).sort().forEach(function (name) {
    const tag = el('div', 'folder-tag');
    tag.dataset.action = 'filter-folder';
    tag.dataset.folder = name;
    tag.appendChild(el('span', null, name + ' (' + folders[name].length + ')'));
    const del = el('button', 'delete', '×');
    del.type = 'button';
    del.dataset.action = 'delete-folder';
    del.dataset.folder = name;
    tag.appendChild(del);
    list.appendChild(tag);
  });
  list.querySelectorAll('.folder-tag').forEach(function (tag) {
    tag.classList.toggle('active', tag.dataset.folder === activeFolder);
  });
}

function createFolder() {
  const input = document.getElementById('folderName');
  const name = input.value.trim();
  if (!name || name === 'all') { alert('Enter a folder name.'); return; }
  if (Object.prototype.hasOwnProperty.call(folders, name)) { alert('Folder "' + name + '" already exists.'); return; }
  folders[name] = [];
  saveFolders();
  input.value = '';
  renderFolderList();
}

function deleteFolder(name) {
  if (!confirm('Delete folder "' + name + '"?')) return;
  delete folders[name];
  saveFolders();
  if (activeFolder === name) {
    filterFolder('all');
  } else {
    renderFolderList();
  }
}

function applyFilter(match, extra) {
  let visible = 0;
  document.querySelectorAll('.card').forEach(function (card) {
    const show = match(cardNumber(card));
    card.classList.toggle('hidden', !show);
    if (show) visible++;
  });
  updateStats(visible, extra);
}

function filterFolder(name) {
  activeFolder = name;
  const members = name === 'all' ? null : (folders[name] || []);
  applyFilter(function (n) { return members === null || members.includes(n); });
  renderFolderList();
}

function filterByRange() {
  const from = parseInt(document.getElementById('rangeFrom').value, 10);
  const to = parseInt(document.getElementById('rangeTo').value, 10);
  if (!from || !to || from > to) { alert('Enter a valid range with from <= to.'); return; }
  applyFilter(function (n) { return n >= from && n <= to; }, from + '-' + to);
}

function resetFilter() {
  document.getElementById('rangeFrom').value = '';
  document.getElementById('rangeTo').value = '';
  filterFolder('all');
}

function updateStats(count, extra) {
  document.getElementById('statsDisplay').textContent =
    'Showing ' + (count || 0) + ' items' + (extra ? ' (' + extra + ')' : '');
}

function updateSelectionBar() {
  document.getElementById('selectedCount').textContent = selectedCards.size;
  document.getElementById('selectionBar').classList.toggle('show', selectedCards.size > 0);
}

function clearSelection() {
  selectedCards.clear();
  document.querySelectorAll('.card').forEach(function (card) {
    card.classList.remove('selected');
    card.querySelector('.select').checked = false;
  });
  updateSelectionBar();
}

function toggleCardSelection(card, checked) {
  const n = cardNumber(card);
  if (checked) { selectedCards.add(n); } else { selectedCards.delete(n); }
  card.classList.toggle('selected', checked);
  updateSelectionBar();
}

function coverage(name) {
  const members = folders[name] || [];
  let held = 0;
  selectedCards.forEach(function (n) { if (members.includes(n)) held++; });
  if (held > 0 && held === selectedCards.size) return 'all';
  return held > 0 ? 'some' : 'none';
}

const COVERAGE_MARK = { all: '✔', some: '◐', none: '+' };

function openFolderModal() {
  if (selectedCards.size === 0) { alert('Select at least one item.'); return; }
  const names = Object.keys(folders).sort();
  if (names.length === 0) { alert('Create a folder first.'); return; }
  chosenFolders.clear();
  const list = document.getElementById('modalFolderList');
  list.replaceChildren();
  names.forEach(function (name) {
    const row = el('div', 'modal-folder');
    row.dataset.action = 'choose-folder';
    row.dataset.folder = name;
    row.appendChild(el('span', null, name + ' (' + folders[name].length + ')'));
    const mark = el('span', 'coverage', COVERAGE_MARK[coverage(name)]);
    mark.dataset.coverage = coverage(name);
    row.appendChild(mark);
    list.appendChild(row);
  });
  document.getElementById('folderModal').classList.add('show');
}

function closeFolderModal() {
  document.getElementById('folderModal').classList.remove('show');
  chosenFolders.clear();
}

function chooseFolder(row) {
  const name = row.dataset.folder;
  if (chosenFolders.has(name)) { chosenFolders.delete(name); } else { chosenFolders.add(name); }
  row.classList.toggle('chosen', chosenFolders.has(name));
}

function confirmFolders() {
  if (chosenFolders.size === 0) { alert('Choose at least one folder.'); return; }
  if (selectedCards.size === 0) { alert('No items selected.'); return; }
  let added = 0;
  let removed = 0;
  chosenFolders.forEach(function (name) {
    const members = folders[name] || (folders[name] = []);
    selectedCards.forEach(function (n) {
      const at = members.indexOf(n);
      if (at > -1) { members.splice(at, 1); removed++; } else { members.push(n); added++; }
    });
  });
  saveFolders();
  closeFolderModal();
  clearSelection();
  if (activeFolder === 'all') { renderFolderList(); } else { filterFolder(activeFolder); }
  alert('Added ' + added + ' | Removed ' + removed);
}

function openViewer(card) {
  document.getElementById('viewerFrame').src = card.dataset.embed;
  document.getElementById('viewerModal').classList.add('show');
}

function closeViewer() {
  document.getElementById('viewerModal').classList.remove('show');
  document.getElementById('viewerFrame').src = '';
}

document.addEventListener('click', function (event) {
  const target = event.target.closest('[data-action]');
  if (!target) return;
  const card = target.closest('.card');
  switch (target.dataset.action) {
    case 'create-folder': createFolder(); break;
    case 'delete-folder': event.stopPropagation(); deleteFolder(target.dataset.folder); break;
    case 'filter-folder': filterFolder(target.dataset.folder); break;
    case 'filter-range': filterByRange(); break;
    case 'reset-filter': resetFilter(); break;
    case 'select': toggleCardSelection(card, target.checked); break;
    case 'manage-card':
      clearSelection();
      card.querySelector('.select').checked = true;
      toggleCardSelection(card, true);
      openFolderModal();
      break;
    case 'manage-selected': openFolderModal(); break;
    case 'clear-selection': clearSelection(); break;
    case 'choose-folder': chooseFolder(target); break;
    case 'confirm-folders': confirmFolders(); break;
    case 'close-folder-modal': if (event.target === target) closeFolderModal(); break;
    case 'view': openViewer(card); break;
    case 'close-viewer': if (event.target === target) closeViewer(); break;
  }
});

document.addEventListener('error', function (event) {
  const img = event.target;
  if (img.tagName === 'IMG' && img.src !== PLACEHOLDER) img.src = PLACEHOLDER;
}, true);

document.addEventListener('keydown', function (event) {
  if (event.key === 'Escape') { closeViewer(); closeFolderModal(); }
});

renderFolderList();
updateStats(TOTAL);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(links: &[(&str, &str)]) -> Collection {
        Collection::from_items(
            links
                .iter()
                .map(|(link, thumb)| Item::new(*link, *thumb).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn ordinals_count_down_to_one() {
        let c = collection(&[("d", ""), ("c", ""), ("b", ""), ("a", "")]);
        assert_eq!(ordinals(&c), [4, 3, 2, 1]);
        assert!(ordinals(&Collection::new()).is_empty());
    }

    #[test]
    fn embed_url_maps_known_kinds() {
        assert_eq!(
            embed_url("https://www.instagram.com/reel/ABC123/?igsh=x"),
            "https://www.instagram.com/reel/ABC123/embed/captioned/?utm_source=ig_embed"
        );
        assert_eq!(
            embed_url("https://www.instagram.com/p/XYZ?utm=1"),
            "https://www.instagram.com/p/XYZ/embed/captioned/?utm_source=ig_embed"
        );
        assert_eq!(
            embed_url("https://www.instagram.com/tv/T1/"),
            "https://www.instagram.com/tv/T1/embed/captioned/?utm_source=ig_embed"
        );
        assert_eq!(embed_url("https://example.com/x"), "https://example.com/x");
        assert_eq!(embed_url("https://example.com/p/"), "https://example.com/p/");
    }

    #[test]
    fn long_links_are_truncated() {
        let long = format!("https://www.instagram.com/p/{}/", "a".repeat(80));
        let label = display_link(&long);
        assert_eq!(label.chars().count(), LINK_DISPLAY_CHARS + 3);
        assert!(label.ends_with("..."));
        assert_eq!(display_link("short"), "short");
    }

    #[test]
    fn escaping_blocks_markup_and_script_breakout() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        let json = script_json(&"</script><script>alert(1)");
        assert!(!json.contains("</script>"));
    }

    #[test]
    fn cards_substitute_placeholder() {
        let c = collection(&[("https://x.test/p/b/", ""), ("https://x.test/p/a/", "a.jpg")]);
        let cards = cards(&c);
        assert_eq!(cards[0].ordinal, 2);
        assert_eq!(cards[0].thumb, PLACEHOLDER_THUMB);
        assert_eq!(cards[1].ordinal, 1);
        assert_eq!(cards[1].thumb, "a.jpg");
        assert!(cards[1].embed.contains("/p/a/embed/"));
    }

    #[test]
    fn document_lists_items_newest_first() {
        let c = collection(&[
            ("https://x.test/p/new/", "n.jpg"),
            ("https://x.test/p/old/\"><script>", "o.jpg"),
        ]);
        let mut seed = TagStore::new();
        seed.create_folder("picks").unwrap();

        let html = GalleryRenderer::new(RenderOptions {
            title: "Saved".into(),
            seed,
            ..RenderOptions::default()
        })
        .render(&c);

        let first = html.find(r#"data-number="2""#).unwrap();
        let second = html.find(r#"data-number="1""#).unwrap();
        assert!(first < second);
        assert!(html.contains("<title>Saved - 2 items</title>"));
        assert!(html.contains("Total items: 2"));
        assert!(html.contains(r#"const SEED = {"picks":[]};"#));
        assert!(html.contains(r#"const STORAGE_KEY = "feedfold_folders";"#));
        assert!(!html.contains("old/\"><script>"));
        assert!(html.contains("collection_master.html"));
    }

    #[test]
    fn script_links_never_become_targets() {
        let c = collection(&[
            ("javascript:alert(document.domain)//p/x", "data:image/svg+xml,<svg/>"),
            ("https://x.test/p/ok/", "ok.jpg"),
        ]);
        let cards = cards(&c);
        assert_eq!(cards[0].link, "about:blank");
        assert_eq!(cards[0].embed, "about:blank");
        assert_eq!(cards[0].thumb, PLACEHOLDER_THUMB);
        assert_eq!(cards[1].link, "https://x.test/p/ok/");

        let html = GalleryRenderer::default().render(&c);
        assert!(!html.contains(r#"href="javascript:"#));
        assert!(!html.contains(r#"data-embed="javascript:"#));
        assert!(html.contains(r#"<a href="about:blank""#));

        let mut out = String::new();
        write_card(
            &mut out,
            &Card {
                ordinal: 1,
                link: "javascript:alert(1)".into(),
                thumb: String::new(),
                embed: String::new(),
                label: "x".into(),
            },
        );
        assert!(out.contains(r#"<a href="about:blank""#));
    }

    #[test]
    fn empty_collection_still_renders() {
        let html = GalleryRenderer::default().render(&Collection::new());
        assert!(html.contains("const TOTAL = 0;"));
        assert!(!html.contains(r#"class="card""#));
    }
}
