use crate::{Effect, JobPhase, JobState, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the current phase are ignored, so a late event
/// from an abandoned step cannot resurrect a finished or cancelled run.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::ExportAllRequested => {
            if state.phase().is_active() {
                return (state, Vec::new());
            }
            state.begin_discovery();
            vec![Effect::BeginRun, Effect::Discover]
        }
        Msg::DiscoveryProgress { found } => {
            if state.phase() == JobPhase::Discovering {
                state.set_discovered(found);
            }
            Vec::new()
        }
        Msg::Discovered { total } => {
            if state.phase() != JobPhase::Discovering {
                return (state, Vec::new());
            }
            state.set_discovered(total);
            state.begin_processing(total, total);
            next_step(&mut state)
        }
        Msg::DiscoveryFailed { reason } => {
            if state.phase() != JobPhase::Discovering {
                return (state, Vec::new());
            }
            state.fail(reason);
            vec![Effect::ClearRunState]
        }
        Msg::Resumed { total, remaining } => {
            if state.phase().is_active() {
                return (state, Vec::new());
            }
            // A record written by an older build may lack the total.
            state.begin_processing(total.max(remaining), remaining);
            next_step(&mut state)
        }
        Msg::ItemStarted { title } => {
            if state.phase() == JobPhase::Running {
                state.start_item(title);
            }
            Vec::new()
        }
        Msg::ItemFinished { remaining, failed } => {
            if state.phase() != JobPhase::Running {
                return (state, Vec::new());
            }
            state.finish_item(remaining, failed);
            next_step(&mut state)
        }
        Msg::ArchiveProgress(percent) => {
            if state.phase() == JobPhase::Finalizing {
                state.set_archive_percent(percent);
            }
            Vec::new()
        }
        Msg::Finalized => {
            if state.phase() != JobPhase::Finalizing {
                return (state, Vec::new());
            }
            state.finish();
            vec![Effect::ClearRunState]
        }
        Msg::FinalizeFailed { reason } => {
            if state.phase() != JobPhase::Finalizing {
                return (state, Vec::new());
            }
            state.fail(reason);
            vec![Effect::ClearRunState]
        }
        Msg::CancelRequested => {
            state.cancel();
            vec![Effect::ClearRunState]
        }
        Msg::CancelObserved => {
            if state.phase().is_active() {
                state.cancel();
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn next_step(state: &mut JobState) -> Vec<Effect> {
    if state.remaining() == 0 {
        state.begin_finalizing();
        vec![Effect::Finalize]
    } else {
        vec![Effect::ProcessNext]
    }
}
