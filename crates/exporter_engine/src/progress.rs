use std::sync::mpsc;

use exporter_core::ProgressReport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    /// Free-form status line (crawler messages, finalizer notes).
    Status(String),
    /// Recomputed progress after a state change.
    Progress(ProgressReport),
    /// One item reached its checkpoint.
    ItemCompleted {
        id: String,
        filename: String,
        failed: bool,
    },
}

/// Observer for controller progress, decoupled from any rendering.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ExportEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<ExportEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<ExportEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ExportEvent) {
        let _ = self.tx.send(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ExportEvent) {}
}
