use std::fmt;
use std::path::PathBuf;

use exporter_core::{ConversationRef, ExportItem};
use thiserror::Error;

use crate::download::DownloadError;
use crate::filename::error_filename;
use crate::finalize::FinalOutput;
use crate::store::StoreError;

/// How a controller invocation ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// No persisted run was found on initialization.
    Idle,
    Completed(FinalOutput),
    /// The host is reloading to `url`; state lives on in the store and the
    /// next initialization resumes.
    Reloading { url: String },
    Cancelled,
    Failed { reason: String },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Idle => write!(f, "idle"),
            RunOutcome::Completed(FinalOutput::Archive { path, files }) => {
                write!(f, "archive {} with {files} files", path.display())
            }
            RunOutcome::Completed(FinalOutput::Individual(pending)) => {
                write!(f, "{} downloads scheduled", pending.scheduled)
            }
            RunOutcome::Completed(FinalOutput::Fallback { saved, failed, .. }) => {
                write!(f, "{saved} files saved individually ({failed} failed)")
            }
            RunOutcome::Reloading { url } => write!(f, "reloading to {url}"),
            RunOutcome::Cancelled => write!(f, "cancelled"),
            RunOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Recoverable per-item failure; becomes an error placeholder, never aborts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemFailure {
    #[error("conversation content did not appear within {timeout_ms} ms")]
    ElementTimeout { timeout_ms: u64 },
    #[error("failed to extract or conversation empty")]
    ExtractionEmpty,
}

impl ItemFailure {
    pub fn placeholder(&self, conversation: &ConversationRef) -> ExportItem {
        ExportItem::new(
            error_filename(&conversation.id),
            format!(
                "Failed to export \"{}\"\nURL: {}\nReason: {self}\n",
                conversation.title, conversation.url
            ),
        )
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ExportCurrentError {
    #[error("no messages found; scroll to load the history and retry")]
    NoMessages,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedConversation {
    pub path: PathBuf,
    pub title: String,
    pub messages: usize,
}
