//! Host backed by a saved copy of the chat site.
//!
//! Layout:
//! - `<root>/index.html`: the sidebar with `a.conversation` links
//! - `<root>/conversations/<id>.html`: one conversation page
//!
//! The sidebar behaves like the live one: only `batch` links are rendered at
//! first and every scroll reveals another batch. Navigating to a link that is
//! rendered switches the page in place; anything else needs a full reload,
//! which this host reports instead of performing, so the caller can restart
//! with a fresh host at the target URL.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use engine_logging::{engine_debug, engine_info, engine_warn};
use exporter_core::{conversation_id, ChatMessage, ConversationRef};
use scraper::Html;
use thiserror::Error;

use crate::decode::decode_page;
use crate::extract::{parse_selector, DomTranscriptExtractor, DEFAULT_SELECTORS};
use crate::host::{
    ConversationExtractor, ListContainer, NavigationOutcome, Navigator, PageHost, RenderedLink,
};

pub const INDEX_FILE: &str = "index.html";
pub const CONVERSATIONS_DIR: &str = "conversations";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("site directory {0} does not exist")]
    MissingSite(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    /// Links revealed per scroll.
    pub batch: usize,
    /// Height of one sidebar row, used for the extent.
    pub row_height: u64,
    /// Prefix for root-relative links, e.g. `https://chat.example.com`.
    pub origin: String,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            batch: 20,
            row_height: 48,
            origin: "https://chat.local".to_string(),
        }
    }
}

/// The virtualized sidebar.
pub struct SidebarList {
    links: Vec<RenderedLink>,
    revealed: AtomicUsize,
    batch: usize,
    row_height: u64,
}

impl SidebarList {
    fn new(links: Vec<RenderedLink>, batch: usize, row_height: u64) -> Self {
        let batch = batch.max(1);
        Self {
            revealed: AtomicUsize::new(batch.min(links.len())),
            links,
            batch,
            row_height,
        }
    }

    fn revealed(&self) -> usize {
        self.revealed.load(Ordering::Relaxed)
    }

    fn is_rendered(&self, id: &str) -> bool {
        self.links[..self.revealed()]
            .iter()
            .any(|link| conversation_id(&link.href) == id)
    }

    fn title_of(&self, id: &str) -> Option<String> {
        self.links
            .iter()
            .find(|link| conversation_id(&link.href) == id)
            .map(|link| link.title.clone())
    }
}

#[async_trait::async_trait]
impl ListContainer for SidebarList {
    async fn scroll_to_end(&self) {
        let next = (self.revealed() + self.batch).min(self.links.len());
        self.revealed.store(next, Ordering::Relaxed);
    }

    fn extent(&self) -> u64 {
        self.revealed() as u64 * self.row_height
    }

    fn rendered_links(&self) -> Vec<RenderedLink> {
        self.links[..self.revealed()].to_vec()
    }
}

#[derive(Debug, Clone, Default)]
struct LoadedPage {
    url: String,
    html: Option<String>,
}

pub struct SnapshotHost {
    root: PathBuf,
    sidebar: Option<Arc<SidebarList>>,
    page: Mutex<Option<LoadedPage>>,
    extractor: DomTranscriptExtractor,
}

impl SnapshotHost {
    /// Opens the site as a freshly loaded page at `location`.
    pub fn open(
        root: &Path,
        location: Option<&str>,
        settings: &SnapshotSettings,
    ) -> Result<Arc<Self>, SnapshotError> {
        if !root.is_dir() {
            return Err(SnapshotError::MissingSite(root.to_path_buf()));
        }
        let sidebar = read_sidebar(&root.join(INDEX_FILE), &settings.origin)?
            .map(|links| Arc::new(SidebarList::new(links, settings.batch, settings.row_height)));

        let host = Self {
            root: root.to_path_buf(),
            sidebar,
            page: Mutex::new(None),
            extractor: DomTranscriptExtractor::default(),
        };
        if let Some(url) = location {
            host.load(url);
        }
        engine_info!(
            "Opened saved site {} at {}",
            root.display(),
            location.unwrap_or("<home>")
        );
        Ok(Arc::new(host))
    }

    fn load(&self, url: &str) {
        let id = conversation_id(url);
        let path = self.root.join(CONVERSATIONS_DIR).join(format!("{id}.html"));
        let html = match fs::read(&path) {
            Ok(bytes) => match decode_page(&bytes) {
                Ok(decoded) => Some(decoded.html),
                Err(err) => {
                    engine_warn!("Could not decode {}: {}", path.display(), err);
                    None
                }
            },
            Err(err) => {
                engine_warn!("Conversation page {} unavailable: {}", path.display(), err);
                None
            }
        };
        *self.lock_page() = Some(LoadedPage {
            url: url.to_string(),
            html,
        });
    }

    fn lock_page(&self) -> std::sync::MutexGuard<'_, Option<LoadedPage>> {
        self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_html(&self) -> Option<String> {
        self.lock_page().as_ref().and_then(|page| page.html.clone())
    }
}

impl PageHost for SnapshotHost {
    fn current_url(&self) -> Option<String> {
        self.lock_page().as_ref().map(|page| page.url.clone())
    }

    fn list_container(&self) -> Option<Arc<dyn ListContainer>> {
        self.sidebar
            .clone()
            .map(|sidebar| sidebar as Arc<dyn ListContainer>)
    }

    fn content_ready(&self) -> bool {
        self.current_html()
            .is_some_and(|html| self.extractor.has_chat_container(&html))
    }

    fn current_title(&self) -> Option<String> {
        let url = self.current_url()?;
        let id = conversation_id(&url);
        self.sidebar
            .as_ref()
            .and_then(|sidebar| sidebar.title_of(&id))
            .or_else(|| {
                self.current_html()
                    .and_then(|html| self.extractor.page_title(&html))
            })
    }
}

#[async_trait::async_trait]
impl Navigator for SnapshotHost {
    async fn activate(&self, target: &ConversationRef) -> NavigationOutcome {
        let rendered = self
            .sidebar
            .as_ref()
            .is_some_and(|sidebar| sidebar.is_rendered(&target.id));
        if rendered {
            engine_debug!("In-app navigation to {}", target.url);
            self.load(&target.url);
            NavigationOutcome::InApp
        } else {
            engine_debug!("{} is not rendered; full reload required", target.id);
            NavigationOutcome::Reloading
        }
    }
}

impl ConversationExtractor for SnapshotHost {
    fn extract_current(&self) -> Option<Vec<ChatMessage>> {
        let html = self.current_html()?;
        self.extractor.extract(&html)
    }
}

/// Reads sidebar links; `Ok(None)` when the index has no sidebar.
fn read_sidebar(path: &Path, origin: &str) -> Result<Option<Vec<RenderedLink>>, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let html = match decode_page(&bytes) {
        Ok(decoded) => decoded.html,
        Err(err) => {
            engine_warn!("Could not decode {}: {}", path.display(), err);
            return Ok(None);
        }
    };
    Ok(parse_sidebar(&html, origin))
}

fn parse_sidebar(html: &str, origin: &str) -> Option<Vec<RenderedLink>> {
    let doc = Html::parse_document(html);
    let container_sel = parse_selector(DEFAULT_SELECTORS.sidebar_container)?;
    let item_sel = parse_selector(DEFAULT_SELECTORS.sidebar_item)?;
    let title_sel = parse_selector(DEFAULT_SELECTORS.sidebar_title)?;
    let container = doc.select(&container_sel).next()?;

    let links = container
        .select(&item_sel)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let title = anchor
                .select(&title_sel)
                .next()
                .map(|node| node.text().collect::<String>())
                .unwrap_or_else(|| anchor.text().collect::<String>());
            Some(RenderedLink {
                title: title.trim().to_string(),
                href: absolutize(href, origin),
            })
        })
        .collect();
    Some(links)
}

fn absolutize(href: &str, origin: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(path) = href.strip_prefix('/') {
        format!("{}/{path}", origin.trim_end_matches('/'))
    } else {
        format!("{}/{href}", origin.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_links_are_resolved_against_origin() {
        assert_eq!(absolutize("/app/1", "https://c.example/"), "https://c.example/app/1");
        assert_eq!(absolutize("app/1", "https://c.example"), "https://c.example/app/1");
        assert_eq!(absolutize("https://x.example/app/1", "https://c.example"), "https://x.example/app/1");
    }

    #[test]
    fn sidebar_titles_prefer_title_element() {
        let html = r#"<nav><a class="conversation" href="/app/a1"><span class="conversation-title">Trip</span><span>pinned</span></a>
            <a class="conversation" href="/app/b2">Plain</a></nav>"#;
        let links = parse_sidebar(html, "https://c.example").unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "Trip");
        assert_eq!(links[1].href, "https://c.example/app/b2");
    }

    #[test]
    fn page_without_nav_has_no_sidebar() {
        assert!(parse_sidebar("<main></main>", "https://c.example").is_none());
    }
}
