#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked to export every conversation.
    ExportAllRequested,
    /// Crawler status while the list is still growing.
    DiscoveryProgress { found: usize },
    /// Discovery finished and the queue was persisted.
    Discovered { total: usize },
    /// The list container could not be located.
    DiscoveryFailed { reason: String },
    /// Fresh initialization found the persisted run flag raised.
    Resumed { total: usize, remaining: usize },
    /// Controller picked the front item of the queue.
    ItemStarted { title: String },
    /// Checkpoint written: the item left the queue and a result was appended.
    ItemFinished { remaining: usize, failed: bool },
    /// Archive generation progress, 0..=100.
    ArchiveProgress(u8),
    /// Output handed to the download trigger.
    Finalized,
    /// Finalization failed even after falling back to individual files.
    FinalizeFailed { reason: String },
    /// User confirmed Stop.
    CancelRequested,
    /// The run flag was found cleared by someone else.
    CancelObserved,
}
