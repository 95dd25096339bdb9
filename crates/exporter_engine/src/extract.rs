use exporter_core::{ChatMessage, Role};
use scraper::{ElementRef, Html, Selector};

/// CSS selectors describing the chat application's markup.
#[derive(Debug, Clone)]
pub struct ChatSelectors {
    pub chat_container: &'static str,
    pub user_row: &'static str,
    pub model_row: &'static str,
    /// Tried in order inside a model row; the row itself is the fallback.
    pub model_content: &'static [&'static str],
    pub sidebar_container: &'static str,
    pub sidebar_item: &'static str,
    pub sidebar_title: &'static str,
    pub page_title: &'static str,
}

pub const DEFAULT_SELECTORS: ChatSelectors = ChatSelectors {
    chat_container: ".chat-history",
    user_row: "user-query",
    model_row: "model-response",
    model_content: &[".markdown", ".message-content"],
    sidebar_container: "nav",
    sidebar_item: "a.conversation",
    sidebar_title: ".conversation-title",
    page_title: "h1.title, .conversation-title",
};

/// Pulls the transcript out of a rendered conversation page:
/// - locates the chat container, `None` if absent
/// - walks user and model rows in document order
/// - user rows become escaped text with the trailing "edit" label removed
/// - model rows keep their HTML for the converter.
#[derive(Debug, Clone)]
pub struct DomTranscriptExtractor {
    selectors: ChatSelectors,
}

impl Default for DomTranscriptExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SELECTORS)
    }
}

impl DomTranscriptExtractor {
    pub fn new(selectors: ChatSelectors) -> Self {
        Self { selectors }
    }

    pub fn has_chat_container(&self, html: &str) -> bool {
        let doc = Html::parse_document(html);
        parse_selector(self.selectors.chat_container)
            .map(|sel| doc.select(&sel).next().is_some())
            .unwrap_or(false)
    }

    pub fn extract(&self, html: &str) -> Option<Vec<ChatMessage>> {
        let doc = Html::parse_document(html);
        let container_sel = parse_selector(self.selectors.chat_container)?;
        let rows_sel = parse_selector(&format!(
            "{}, {}",
            self.selectors.user_row, self.selectors.model_row
        ))?;
        let container = doc.select(&container_sel).next()?;

        let messages = container
            .select(&rows_sel)
            .filter_map(|row| self.message_from_row(row))
            .collect();
        Some(messages)
    }

    /// Title shown inside the page header, if the page has one.
    pub fn page_title(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let sel = parse_selector(self.selectors.page_title)?;
        doc.select(&sel)
            .map(|node| node.text().collect::<String>().trim().to_string())
            .find(|title| !title.is_empty())
    }

    fn message_from_row(&self, row: ElementRef<'_>) -> Option<ChatMessage> {
        let is_user = row
            .value()
            .name()
            .eq_ignore_ascii_case(self.selectors.user_row);
        let message = if is_user {
            let text = visible_text(row);
            let text = strip_edit_label(text.trim());
            ChatMessage::new(Role::User, escape_text(text))
        } else {
            let html = self
                .selectors
                .model_content
                .iter()
                .filter_map(|sel| parse_selector(sel))
                .find_map(|sel| row.select(&sel).next())
                .map(|node| node.inner_html())
                .unwrap_or_else(|| row.inner_html());
            ChatMessage::new(Role::Model, html.trim())
        };
        if message.content.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

pub(crate) fn parse_selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Text of a row without the host's controls (buttons, icons).
fn visible_text(row: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in row.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_control = node.ancestors().any(|ancestor| {
            ancestor.value().as_element().is_some_and(|el| {
                matches!(el.name(), "button" | "mat-icon" | "script" | "style")
            })
        });
        if !in_control {
            out.push_str(text);
        }
    }
    out
}

/// User rows may still end with the host's "edit" button label.
fn strip_edit_label(text: &str) -> &str {
    let trimmed = text.trim_end();
    let Some(split) = trimmed.len().checked_sub(4) else {
        return trimmed;
    };
    if !trimmed.is_char_boundary(split) || !trimmed[split..].eq_ignore_ascii_case("edit") {
        return trimmed;
    }
    let head = &trimmed[..split];
    if head.is_empty() || head.ends_with(char::is_whitespace) {
        head.trim_end()
    } else {
        trimmed
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
