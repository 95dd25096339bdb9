//! Progress reporting: maps job state to a status line and a percentage.
//!
//! Processing covers 0..=90; the top 10% is reserved for finalization so the
//! bar never jumps backwards when archive generation starts.

use crate::{JobPhase, JobState};

/// Share of the bar covered by per-item processing.
pub const PROCESSING_SHARE: usize = 90;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressReport {
    pub text: String,
    pub percent: u8,
}

/// Pure function of the job state; recomputed on every observation.
pub fn report(state: &JobState) -> ProgressReport {
    let percent = percent_for(state);
    let text = match state.phase() {
        JobPhase::Idle => "Ready".to_string(),
        JobPhase::Discovering => {
            if state.discovered() == 0 {
                "Scanning conversation list...".to_string()
            } else {
                format!(
                    "Scanning conversation list... (found {} items)",
                    state.discovered()
                )
            }
        }
        JobPhase::Running => match state.current_title() {
            Some(title) => format!(
                "Processing: {title} ({} done, {} left)",
                state.processed(),
                state.remaining()
            ),
            None => format!("Processing {} of {}", state.processed(), state.total()),
        },
        JobPhase::Finalizing => format!("Packaging {} files...", state.total()),
        JobPhase::Done => {
            if state.failed() > 0 {
                format!(
                    "Done! Exported {} conversations ({} failed).",
                    state.total(),
                    state.failed()
                )
            } else {
                format!("Done! Exported {} conversations.", state.total())
            }
        }
        JobPhase::Cancelled => "Export cancelled.".to_string(),
        JobPhase::Failed => format!("Error: {}", state.error().unwrap_or("unknown failure")),
    };
    ProgressReport { text, percent }
}

fn percent_for(state: &JobState) -> u8 {
    match state.phase() {
        JobPhase::Idle | JobPhase::Discovering => 0,
        JobPhase::Running | JobPhase::Cancelled | JobPhase::Failed => {
            processing_percent(state.processed(), state.total())
        }
        JobPhase::Finalizing => {
            let archive = usize::from(state.archive_percent()) / 10;
            (PROCESSING_SHARE + archive).min(100) as u8
        }
        JobPhase::Done => 100,
    }
}

/// `floor(processed / total * 90)`, zero when nothing was discovered.
pub fn processing_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (processed.min(total) * PROCESSING_SHARE / total) as u8
}
