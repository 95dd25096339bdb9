//! Interfaces the controller needs from the chat application's page.
//!
//! The controller never looks at page structure itself; it only uses these
//! narrow contracts, so any host (a browser bridge, a saved copy of the site,
//! a test double) can drive it.

use std::sync::Arc;

use exporter_core::{ChatMessage, ConversationRef};

/// A link as currently rendered in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
    pub title: String,
    pub href: String,
}

/// The virtualized conversation list. Items render lazily as it scrolls.
#[async_trait::async_trait]
pub trait ListContainer: Send + Sync {
    /// Scrolls to the maximum extent, which may trigger lazy loading.
    async fn scroll_to_end(&self);
    /// Current scrollable extent of the container.
    fn extent(&self) -> u64;
    /// Links rendered right now, in display order.
    fn rendered_links(&self) -> Vec<RenderedLink>;
}

pub trait PageHost: Send + Sync {
    /// URL of the conversation currently on screen, if any.
    fn current_url(&self) -> Option<String>;
    /// Locates the conversation list; `None` when the page has none.
    fn list_container(&self) -> Option<Arc<dyn ListContainer>>;
    /// Whether the conversation content container is present.
    fn content_ready(&self) -> bool;
    /// Title of the conversation on screen, as shown by the host.
    fn current_title(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The view switched without a reload; in-memory state survives.
    InApp,
    /// The host is doing a full reload. Everything in memory is about to be
    /// lost and the controller must stop; the next initialization resumes.
    Reloading,
}

#[async_trait::async_trait]
pub trait Navigator: Send + Sync {
    async fn activate(&self, target: &ConversationRef) -> NavigationOutcome;
}

pub trait ConversationExtractor: Send + Sync {
    /// Messages of the conversation on screen, or `None` if none was found.
    fn extract_current(&self) -> Option<Vec<ChatMessage>>;
}
