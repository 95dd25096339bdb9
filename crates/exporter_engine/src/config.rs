use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::CrawlSettings;

/// Produces a timestamp string; swapped out in tests for determinism.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
pub struct EngineConfig {
    pub crawl: CrawlSettings,
    /// Upper bound on waiting for the conversation content after navigation.
    pub content_timeout: Duration,
    /// Poll interval while waiting for the content container.
    pub content_poll: Duration,
    /// Gap between consecutive downloads in individual mode.
    pub download_stagger: Duration,
    pub archive_prefix: String,
    /// Human-readable export time written into transcript metadata.
    pub exported_at: Clock,
    /// Date stamp used in archive and fallback filenames.
    pub archive_date: Clock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            crawl: CrawlSettings::default(),
            content_timeout: Duration::from_secs(10),
            content_poll: Duration::from_millis(100),
            download_stagger: Duration::from_millis(300),
            archive_prefix: "Chat_Export_Full".to_string(),
            exported_at: Arc::new(|| chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            archive_date: Arc::new(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
        }
    }
}

impl EngineConfig {
    pub fn archive_filename(&self) -> String {
        format!("{}_{}.zip", self.archive_prefix, (self.archive_date)())
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("crawl", &self.crawl)
            .field("content_timeout", &self.content_timeout)
            .field("content_poll", &self.content_poll)
            .field("download_stagger", &self.download_stagger)
            .field("archive_prefix", &self.archive_prefix)
            .finish_non_exhaustive()
    }
}
