use crate::progress::{report, ProgressReport};

/// Phase of the batch export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    /// Start transition: scrolling the list and collecting references.
    Discovering,
    Running,
    Finalizing,
    Done,
    Cancelled,
    /// Fatal discovery or finalization failure.
    Failed,
}

impl JobPhase {
    /// Phases in which a run is in flight and owns the persisted job record.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            JobPhase::Discovering | JobPhase::Running | JobPhase::Finalizing
        )
    }
}

/// In-memory mirror of the job. Everything here can be rebuilt from the
/// persisted store, so it is safe to lose on reload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobState {
    phase: JobPhase,
    total: usize,
    remaining: usize,
    failed: usize,
    discovered: usize,
    current: Option<String>,
    archive_percent: u8,
    error: Option<String>,
    dirty: bool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn processed(&self) -> usize {
        self.total.saturating_sub(self.remaining)
    }

    /// Items that ended as error placeholders during this controller's lifetime.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn discovered(&self) -> usize {
        self.discovered
    }

    pub fn current_title(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn archive_percent(&self) -> u8 {
        self.archive_percent
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn progress(&self) -> ProgressReport {
        report(self)
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_discovery(&mut self) {
        *self = Self {
            phase: JobPhase::Discovering,
            dirty: true,
            ..Self::default()
        };
    }

    pub(crate) fn set_discovered(&mut self, found: usize) {
        if self.discovered != found {
            self.discovered = found;
            self.dirty = true;
        }
    }

    pub(crate) fn begin_processing(&mut self, total: usize, remaining: usize) {
        self.phase = JobPhase::Running;
        self.total = total;
        self.remaining = remaining.min(total);
        self.current = None;
        self.error = None;
        self.dirty = true;
    }

    pub(crate) fn start_item(&mut self, title: String) {
        self.current = Some(title);
        self.dirty = true;
    }

    pub(crate) fn finish_item(&mut self, remaining: usize, failed: bool) {
        // Remaining only shrinks within a run; a stale observation must not
        // move progress backwards.
        self.remaining = remaining.min(self.remaining);
        if failed {
            self.failed += 1;
        }
        self.dirty = true;
    }

    pub(crate) fn begin_finalizing(&mut self) {
        self.phase = JobPhase::Finalizing;
        self.remaining = 0;
        self.current = None;
        self.archive_percent = 0;
        self.dirty = true;
    }

    pub(crate) fn set_archive_percent(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent > self.archive_percent {
            self.archive_percent = percent;
            self.dirty = true;
        }
    }

    pub(crate) fn finish(&mut self) {
        self.phase = JobPhase::Done;
        self.archive_percent = 100;
        self.dirty = true;
    }

    pub(crate) fn cancel(&mut self) {
        self.phase = JobPhase::Cancelled;
        self.current = None;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.phase = JobPhase::Failed;
        self.current = None;
        self.error = Some(reason);
        self.dirty = true;
    }
}
