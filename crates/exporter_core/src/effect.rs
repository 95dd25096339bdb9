/// Side effects requested by [`crate::update`]; executed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Clear persisted results and raise the run flag.
    BeginRun,
    /// Run the discovery crawler and persist the queue and total.
    Discover,
    /// Process the item at the front of the persisted queue.
    ProcessNext,
    /// Hand the accumulated results to the finalizer.
    Finalize,
    /// Delete queue, results, run flag and total from the store.
    ClearRunState,
}
