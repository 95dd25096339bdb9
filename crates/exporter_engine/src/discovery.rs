use std::collections::HashSet;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use exporter_core::ConversationRef;
use thiserror::Error;

use crate::host::{PageHost, RenderedLink};

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Wait after each scroll before sampling the extent.
    pub settle: Duration,
    /// Hard cap on scroll iterations.
    pub max_iterations: usize,
    /// Consecutive samples at one extent that count as stable; at least 2.
    pub stable_samples: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(1500),
            max_iterations: 100,
            stable_samples: 2,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("conversation list not found")]
    ContainerNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub refs: Vec<ConversationRef>,
    /// Number of scroll iterations performed.
    pub iterations: usize,
    pub stabilized: bool,
}

/// Scrolls the conversation list until its extent stops growing, then
/// collects the rendered links.
///
/// `on_progress` receives the number of rendered links after every scroll.
pub async fn discover(
    host: &dyn PageHost,
    settings: &CrawlSettings,
    on_progress: &mut (dyn FnMut(usize) + Send),
) -> Result<CrawlReport, DiscoveryError> {
    let container = host
        .list_container()
        .ok_or(DiscoveryError::ContainerNotFound)?;

    let mut previous_extent = None;
    // Consecutive samples at the current extent, the first one included.
    let mut same_extent = 0;
    let mut iterations = 0;
    let mut stabilized = false;

    while iterations < settings.max_iterations {
        container.scroll_to_end().await;
        tokio::time::sleep(settings.settle).await;
        iterations += 1;

        let extent = container.extent();
        if previous_extent == Some(extent) {
            same_extent += 1;
        } else {
            same_extent = 1;
        }
        previous_extent = Some(extent);
        engine_debug!(
            "Crawl iteration {} extent={} same_extent={}",
            iterations,
            extent,
            same_extent
        );
        on_progress(container.rendered_links().len());

        if same_extent >= settings.stable_samples.max(2) {
            stabilized = true;
            break;
        }
    }

    let refs = dedupe_links(container.rendered_links());
    engine_info!(
        "Discovered {} conversations in {} iterations (stabilized={})",
        refs.len(),
        iterations,
        stabilized
    );
    Ok(CrawlReport {
        refs,
        iterations,
        stabilized,
    })
}

/// Builds references from rendered links, keeping the first occurrence of
/// every id.
pub fn dedupe_links(links: Vec<RenderedLink>) -> Vec<ConversationRef> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .map(|link| ConversationRef::from_link(&link.title, &link.href))
        .filter(|conv| !conv.id.is_empty())
        .filter(|conv| seen.insert(conv.id.clone()))
        .collect()
}
