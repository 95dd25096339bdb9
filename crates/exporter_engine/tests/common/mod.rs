#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use exporter_core::{ChatMessage, ConversationRef, Role};
use exporter_engine::{
    BatchController, ConversationExtractor, DownloadError, DownloadTrigger, EngineConfig,
    ExportEvent, HostBindings, JobStore, ListContainer, NavigationOutcome, Navigator, PageHost,
    ProgressSink, RenderedLink,
};
use tokio::time::Instant;

pub const ORIGIN: &str = "https://chat.test/app";

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub fn url_of(id: &str) -> String {
    format!("{ORIGIN}/{id}")
}

pub fn link(id: &str, title: &str) -> RenderedLink {
    RenderedLink {
        title: title.to_string(),
        href: url_of(id),
    }
}

pub fn conv(id: &str, title: &str) -> ConversationRef {
    ConversationRef::from_link(title, &url_of(id))
}

pub fn chat(question: &str, answer_html: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::User, question),
        ChatMessage::new(Role::Model, answer_html),
    ]
}

/// Config with fixed clocks so filenames and metadata are stable.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        exported_at: Arc::new(|| "2024-05-01 12:00:00".to_string()),
        archive_date: Arc::new(|| "2024-05-01".to_string()),
        ..EngineConfig::default()
    }
}

/// Conversation list whose extent follows a script, then stays at the last
/// value. Without a script the extent grows on every scroll.
pub struct FakeList {
    links: Vec<RenderedLink>,
    extents: Vec<u64>,
    scrolls: AtomicUsize,
}

impl FakeList {
    pub fn new(links: Vec<RenderedLink>, extents: Vec<u64>) -> Self {
        Self {
            links,
            extents,
            scrolls: AtomicUsize::new(0),
        }
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ListContainer for FakeList {
    async fn scroll_to_end(&self) {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
    }

    fn extent(&self) -> u64 {
        let scrolls = self.scrolls();
        if self.extents.is_empty() {
            return scrolls as u64 * 10;
        }
        let index = scrolls.saturating_sub(1).min(self.extents.len() - 1);
        self.extents[index]
    }

    fn rendered_links(&self) -> Vec<RenderedLink> {
        self.links.clone()
    }
}

/// What the host shows once a conversation is opened.
#[derive(Debug, Clone)]
pub enum Page {
    Ready(Vec<ChatMessage>),
    /// Container present but no messages inside.
    Empty,
    /// Container never appears.
    Never,
}

type ExtractHook = Box<dyn Fn(&str) + Send + Sync>;

/// Scripted chat application.
pub struct FakeHost {
    list: Option<Arc<FakeList>>,
    pages: HashMap<String, Page>,
    titles: HashMap<String, String>,
    reload_ids: HashSet<String>,
    current: Mutex<Option<String>>,
    navigations: Mutex<Vec<String>>,
    on_extract: Mutex<Option<ExtractHook>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            list: None,
            pages: HashMap::new(),
            titles: HashMap::new(),
            reload_ids: HashSet::new(),
            current: Mutex::new(None),
            navigations: Mutex::new(Vec::new()),
            on_extract: Mutex::new(None),
        }
    }

    /// Sidebar with the given links that stabilizes after a few scrolls.
    pub fn with_sidebar(mut self, links: Vec<RenderedLink>) -> Self {
        self.list = Some(Arc::new(FakeList::new(links, vec![100, 200, 200, 200])));
        self
    }

    pub fn with_list(mut self, list: Arc<FakeList>) -> Self {
        self.list = Some(list);
        self
    }

    pub fn with_page(mut self, id: &str, title: &str, page: Page) -> Self {
        self.pages.insert(id.to_string(), page);
        self.titles.insert(id.to_string(), title.to_string());
        self
    }

    /// Navigating to `id` needs a full reload.
    pub fn reloads_for(mut self, id: &str) -> Self {
        self.reload_ids.insert(id.to_string());
        self
    }

    pub fn at(self, url: &str) -> Self {
        *self.current.lock().unwrap() = Some(url.to_string());
        self
    }

    pub fn on_extract(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_extract.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    fn current_id(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap()
            .as_deref()
            .map(exporter_core::conversation_id)
    }

    fn current_page(&self) -> Option<Page> {
        self.current_id().and_then(|id| self.pages.get(&id).cloned())
    }
}

impl PageHost for FakeHost {
    fn current_url(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    fn list_container(&self) -> Option<Arc<dyn ListContainer>> {
        self.list.clone().map(|list| list as Arc<dyn ListContainer>)
    }

    fn content_ready(&self) -> bool {
        matches!(self.current_page(), Some(Page::Ready(_)) | Some(Page::Empty))
    }

    fn current_title(&self) -> Option<String> {
        self.current_id().and_then(|id| self.titles.get(&id).cloned())
    }
}

#[async_trait::async_trait]
impl Navigator for FakeHost {
    async fn activate(&self, target: &ConversationRef) -> NavigationOutcome {
        self.navigations.lock().unwrap().push(target.id.clone());
        if self.reload_ids.contains(&target.id) {
            return NavigationOutcome::Reloading;
        }
        *self.current.lock().unwrap() = Some(target.url.clone());
        NavigationOutcome::InApp
    }
}

impl ConversationExtractor for FakeHost {
    fn extract_current(&self) -> Option<Vec<ChatMessage>> {
        let id = self.current_id().unwrap_or_default();
        if let Some(hook) = self.on_extract.lock().unwrap().as_ref() {
            hook(&id);
        }
        match self.current_page()? {
            Page::Ready(messages) => Some(messages),
            Page::Empty => Some(Vec::new()),
            Page::Never => None,
        }
    }
}

/// Keeps every saved file in memory, stamped with the (paused) clock.
#[derive(Default)]
pub struct RecordingDownloads {
    saved: Mutex<Vec<(String, Vec<u8>, Instant)>>,
    failing: bool,
}

impl RecordingDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _, _)| name.clone())
            .collect()
    }

    pub fn content(&self, name: &str) -> Option<Vec<u8>> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .find(|(saved, _, _)| saved == name)
            .map(|(_, bytes, _)| bytes.clone())
    }

    pub fn times(&self) -> Vec<Instant> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, at)| *at)
            .collect()
    }
}

impl DownloadTrigger for RecordingDownloads {
    fn save(&self, content: &[u8], filename: &str) -> Result<PathBuf, DownloadError> {
        if self.failing {
            return Err(DownloadError::Save {
                filename: filename.to_string(),
                source: exporter_engine::persist::PersistError::Directory {
                    path: PathBuf::from("downloads"),
                    reason: "downloads disabled".to_string(),
                },
            });
        }
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), content.to_vec(), Instant::now()));
        Ok(PathBuf::from(filename))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ExportEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ExportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ExportEvent::Progress(report) => Some(report.percent),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ExportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn bindings(host: &Arc<FakeHost>, downloads: &Arc<RecordingDownloads>) -> HostBindings {
    HostBindings {
        host: host.clone(),
        navigator: host.clone(),
        extractor: host.clone(),
        downloads: downloads.clone(),
    }
}

pub fn controller(
    host: &Arc<FakeHost>,
    downloads: &Arc<RecordingDownloads>,
    store: &JobStore,
    sink: &Arc<RecordingSink>,
) -> BatchController {
    BatchController::new(
        bindings(host, downloads),
        store.clone(),
        test_config(),
        sink.clone(),
    )
}

/// Entry names of a zip blob, in archive order.
pub fn zip_names(blob: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(std::io::Cursor::new(blob.to_vec())).unwrap();
    archive.file_names().map(str::to_string).collect::<Vec<_>>()
}

pub fn zip_entry(blob: &[u8], name: &str) -> String {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(blob.to_vec())).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}
