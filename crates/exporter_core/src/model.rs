use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

const UNTITLED: &str = "Untitled";

/// Pointer to one exportable conversation, as discovered in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationRef {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl ConversationRef {
    /// Builds a reference from a rendered link. The id is the trailing path
    /// segment of `url`; the title is the first non-empty line of the link text.
    pub fn from_link(title: &str, url: &str) -> Self {
        let title = title
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();
        Self {
            id: conversation_id(url),
            title,
            url: url.trim().to_string(),
        }
    }
}

/// Trailing path segment of a conversation URL, ignoring query and fragment.
pub fn conversation_id(url: &str) -> String {
    let trimmed = url.trim();
    if let Ok(parsed) = Url::parse(trimmed) {
        if let Some(segment) = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        {
            return segment.to_string();
        }
    }
    let path = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Model => write!(f, "Model"),
        }
    }
}

/// One message of a transcript. `content` is the raw HTML (or text) the
/// extractor pulled out of the page; rendering happens later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

pub const ERROR_PREFIX: &str = "ERROR_";

/// One finished export artifact, or a placeholder describing a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportItem {
    pub filename: String,
    pub content: String,
}

impl ExportItem {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.filename.starts_with(ERROR_PREFIX)
    }
}

/// Persisted run flag and the total captured at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunState {
    pub is_running: bool,
    pub total: usize,
}
