//! Batch controller.
//!
//! Drives one export run as an explicit effect loop: every host event is
//! turned into a [`Msg`], fed through the pure core `update`, and the
//! returned effects are executed here in order. The persisted record is the
//! only source of truth between steps; the in-memory [`JobState`] is a
//! mirror for progress reporting and may be lost on any reload.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn, set_current_item};
use exporter_core::{
    conversation_id, update, ConversationRef, Effect, ExportItem, JobState, Msg, Settings,
};

use crate::archive::{zip_archive_factory, ArchiveFactory};
use crate::config::EngineConfig;
use crate::convert::converter_for;
use crate::discovery::discover;
use crate::document::{build_transcript, TranscriptHeader};
use crate::download::DownloadTrigger;
use crate::filename::export_filename;
use crate::finalize::{FinalizeOptions, Finalizer};
use crate::host::{ConversationExtractor, NavigationOutcome, Navigator, PageHost};
use crate::progress::{ExportEvent, ProgressSink};
use crate::store::{JobStore, StoreError};
use crate::types::{
    ControllerError, ExportCurrentError, ExportedConversation, ItemFailure, RunOutcome,
};

/// Everything the controller needs from the environment it runs in.
#[derive(Clone)]
pub struct HostBindings {
    pub host: Arc<dyn PageHost>,
    pub navigator: Arc<dyn Navigator>,
    pub extractor: Arc<dyn ConversationExtractor>,
    pub downloads: Arc<dyn DownloadTrigger>,
}

/// Effects to run next, plus the outcome if this effect ended the run.
type StepResult = Result<(Vec<Effect>, Option<RunOutcome>), ControllerError>;

pub struct BatchController {
    bindings: HostBindings,
    store: JobStore,
    config: EngineConfig,
    finalizer: Finalizer,
    sink: Arc<dyn ProgressSink>,
    state: JobState,
}

impl BatchController {
    pub fn new(
        bindings: HostBindings,
        store: JobStore,
        config: EngineConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let finalizer = Finalizer::new(
            bindings.downloads.clone(),
            zip_archive_factory(),
            config.download_stagger,
        );
        Self {
            bindings,
            store,
            config,
            finalizer,
            sink,
            state: JobState::new(),
        }
    }

    /// Replaces the zip writer, e.g. with one that fails on purpose.
    pub fn with_archive_factory(mut self, factory: ArchiveFactory) -> Self {
        self.finalizer = Finalizer::new(
            self.bindings.downloads.clone(),
            factory,
            self.config.download_stagger,
        );
        self
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Called once per page load: resumes a persisted run if one is active.
    pub async fn initialize(&mut self) -> Result<RunOutcome, ControllerError> {
        if !self.store.is_running()? {
            engine_debug!("No active run to resume");
            return Ok(RunOutcome::Idle);
        }
        let remaining = self.store.queue()?.len();
        let mut total = self.store.total()?;
        if total == 0 {
            total = remaining + self.store.results()?.len();
            engine_warn!("Run record has no total; rebuilt as {}", total);
            self.store.set_total(total)?;
        }
        engine_info!("Resuming run: {} of {} remaining", remaining, total);
        self.sink.emit(ExportEvent::Status(format!(
            "Resuming export ({remaining} left)..."
        )));
        let effects = self.dispatch(Msg::Resumed { total, remaining });
        self.run(effects).await
    }

    /// Starts a full export: discovery, then the per-item loop, then output.
    pub async fn export_all(&mut self) -> Result<RunOutcome, ControllerError> {
        if self.store.is_running()? && !self.state.phase().is_active() {
            engine_warn!("A persisted run is active; resume it or cancel it first");
            return Ok(RunOutcome::Idle);
        }
        let effects = self.dispatch(Msg::ExportAllRequested);
        if effects.is_empty() {
            engine_warn!("Export already in progress; ignoring request");
            return Ok(RunOutcome::Idle);
        }
        self.run(effects).await
    }

    /// Clears the run record. A step loop running elsewhere notices the
    /// missing flag before its next checkpoint and stops.
    pub async fn cancel(&mut self) -> Result<RunOutcome, ControllerError> {
        engine_info!("Cancel requested");
        let effects = self.dispatch(Msg::CancelRequested);
        self.run(effects).await?;
        Ok(RunOutcome::Cancelled)
    }

    /// Saves the conversation currently on screen as a single document.
    pub fn export_current(&self) -> Result<ExportedConversation, ExportCurrentError> {
        let settings = self.store.settings()?;
        let messages = self
            .bindings
            .extractor
            .extract_current()
            .filter(|messages| !messages.is_empty())
            .ok_or(ExportCurrentError::NoMessages)?;

        let host = &self.bindings.host;
        let title = host
            .current_title()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| format!("Chat_{}", (self.config.archive_date)()));
        let url = host.current_url();
        let id = url.as_deref().map(conversation_id).unwrap_or_default();

        let converter = converter_for(settings.format);
        let exported_at = (self.config.exported_at)();
        let content = build_transcript(
            TranscriptHeader {
                title: &title,
                url: url.as_deref(),
                exported_at: &exported_at,
            },
            &messages,
            &settings,
            converter.as_ref(),
        );
        let filename = export_filename(&title, &id, settings.format);
        let path = self
            .bindings
            .downloads
            .save(content.as_bytes(), &filename)?;
        self.sink
            .emit(ExportEvent::Status(format!("Exported \"{title}\"")));
        Ok(ExportedConversation {
            path,
            title,
            messages: messages.len(),
        })
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        apply(&mut self.state, self.sink.as_ref(), msg)
    }

    async fn run(&mut self, effects: Vec<Effect>) -> Result<RunOutcome, ControllerError> {
        let mut pending: VecDeque<Effect> = effects.into();
        let mut outcome = None;
        while let Some(effect) = pending.pop_front() {
            engine_debug!("Effect {:?}", effect);
            let (next, ended) = match effect {
                Effect::BeginRun => {
                    self.store.set_results(&[])?;
                    self.store.set_running(true)?;
                    (Vec::new(), None)
                }
                Effect::Discover => self.discover().await?,
                Effect::ProcessNext => self.process_next().await?,
                Effect::Finalize => self.finalize().await?,
                Effect::ClearRunState => {
                    self.store.clear_run()?;
                    (Vec::new(), None)
                }
            };
            if ended.is_some() {
                outcome = ended;
            }
            pending.extend(next);
        }
        Ok(outcome.unwrap_or(RunOutcome::Idle))
    }

    async fn discover(&mut self) -> StepResult {
        self.sink.emit(ExportEvent::Status(
            "Scanning conversation list...".to_string(),
        ));
        let host = self.bindings.host.clone();
        let crawl = self.config.crawl.clone();
        let state = &mut self.state;
        let sink = self.sink.clone();
        let result = discover(host.as_ref(), &crawl, &mut |found| {
            apply(state, sink.as_ref(), Msg::DiscoveryProgress { found });
        })
        .await;

        let report = match result {
            Ok(report) => report,
            Err(err) => {
                engine_error!("Discovery failed: {}", err);
                let reason = err.to_string();
                let effects = self.dispatch(Msg::DiscoveryFailed {
                    reason: reason.clone(),
                });
                return Ok((effects, Some(RunOutcome::Failed { reason })));
            }
        };

        if !self.store.is_running()? {
            return Ok(self.observe_cancel());
        }
        let total = report.refs.len();
        self.store.set_queue(&report.refs)?;
        self.store.set_total(total)?;
        self.sink.emit(ExportEvent::Status(format!(
            "Found {total} conversations. Starting export..."
        )));
        Ok((self.dispatch(Msg::Discovered { total }), None))
    }

    async fn process_next(&mut self) -> StepResult {
        if !self.store.is_running()? {
            return Ok(self.observe_cancel());
        }
        let mut queue = self.store.queue()?;
        let Some(item) = queue.first().cloned() else {
            engine_warn!("Queue is empty while items were expected");
            return Ok((
                self.dispatch(Msg::ItemFinished {
                    remaining: 0,
                    failed: false,
                }),
                None,
            ));
        };

        set_current_item(Some(&item.id));
        self.dispatch(Msg::ItemStarted {
            title: item.title.clone(),
        });

        let on_target = self.bindings.host.current_url().as_deref() == Some(item.url.as_str());
        if !on_target {
            match self.bindings.navigator.activate(&item).await {
                NavigationOutcome::InApp => {}
                NavigationOutcome::Reloading => {
                    engine_info!("Host reloading to {}; run continues after load", item.url);
                    set_current_item(None);
                    return Ok((Vec::new(), Some(RunOutcome::Reloading { url: item.url })));
                }
            }
        }

        let settings = self.store.settings()?;
        let (export, failed) = match self.capture(&item, &settings).await {
            Ok(export) => (export, false),
            Err(failure) => {
                engine_warn!("Export of \"{}\" failed: {}", item.title, failure);
                (failure.placeholder(&item), true)
            }
        };

        // The run may have been cancelled while this item was captured.
        if !self.store.is_running()? {
            set_current_item(None);
            return Ok(self.observe_cancel());
        }

        queue.remove(0);
        let mut results = self.store.results()?;
        results.push(export.clone());
        self.store.set_queue(&queue)?;
        self.store.set_results(&results)?;
        self.check_invariant(queue.len(), results.len())?;

        engine_info!("Checkpoint: {} ({} left)", export.filename, queue.len());
        self.sink.emit(ExportEvent::ItemCompleted {
            id: item.id.clone(),
            filename: export.filename,
            failed,
        });
        set_current_item(None);
        Ok((
            self.dispatch(Msg::ItemFinished {
                remaining: queue.len(),
                failed,
            }),
            None,
        ))
    }

    async fn capture(
        &self,
        item: &ConversationRef,
        settings: &Settings,
    ) -> Result<ExportItem, ItemFailure> {
        let ready = wait_for_content(
            self.bindings.host.as_ref(),
            self.config.content_timeout,
            self.config.content_poll,
        )
        .await;
        if !ready {
            return Err(ItemFailure::ElementTimeout {
                timeout_ms: self.config.content_timeout.as_millis() as u64,
            });
        }
        tokio::time::sleep(settings.settle_delay()).await;

        let messages = self
            .bindings
            .extractor
            .extract_current()
            .filter(|messages| !messages.is_empty())
            .ok_or(ItemFailure::ExtractionEmpty)?;

        let converter = converter_for(settings.format);
        let exported_at = (self.config.exported_at)();
        let content = build_transcript(
            TranscriptHeader {
                title: &item.title,
                url: Some(&item.url),
                exported_at: &exported_at,
            },
            &messages,
            settings,
            converter.as_ref(),
        );
        Ok(ExportItem::new(
            export_filename(&item.title, &item.id, settings.format),
            content,
        ))
    }

    async fn finalize(&mut self) -> StepResult {
        if !self.store.is_running()? {
            return Ok(self.observe_cancel());
        }
        let results = self.store.results()?;
        let settings = self.store.settings()?;
        self.sink.emit(ExportEvent::Status(format!(
            "Packaging {} files...",
            results.len()
        )));
        let options = FinalizeOptions {
            archive_name: self.config.archive_filename(),
            include_manifest: settings.include_metadata,
            exported_at: (self.config.exported_at)(),
        };

        let finalizer = self.finalizer.clone();
        let state = &mut self.state;
        let sink = self.sink.clone();
        let result = finalizer
            .finalize(results, settings.export_mode, &options, &mut |percent| {
                apply(state, sink.as_ref(), Msg::ArchiveProgress(percent));
            })
            .await;

        match result {
            Ok(output) => {
                let effects = self.dispatch(Msg::Finalized);
                Ok((effects, Some(RunOutcome::Completed(output))))
            }
            Err(err) => {
                engine_error!("Finalize failed: {}", err);
                let reason = err.to_string();
                let effects = self.dispatch(Msg::FinalizeFailed {
                    reason: reason.clone(),
                });
                Ok((effects, Some(RunOutcome::Failed { reason })))
            }
        }
    }

    fn observe_cancel(&mut self) -> (Vec<Effect>, Option<RunOutcome>) {
        engine_info!("Run flag cleared; stopping");
        (
            self.dispatch(Msg::CancelObserved),
            Some(RunOutcome::Cancelled),
        )
    }

    fn check_invariant(&self, queued: usize, done: usize) -> Result<(), StoreError> {
        let total = self.store.total()?;
        if queued + done != total {
            engine_warn!(
                "Run record out of balance: {} queued + {} done != {} total",
                queued,
                done,
                total
            );
        }
        Ok(())
    }
}

fn apply(state: &mut JobState, sink: &dyn ProgressSink, msg: Msg) -> Vec<Effect> {
    let (mut next, effects) = update(mem::take(state), msg);
    if next.consume_dirty() {
        sink.emit(ExportEvent::Progress(next.progress()));
    }
    *state = next;
    effects
}

/// Polls until the conversation content is present or `timeout` elapses.
async fn wait_for_content(host: &dyn PageHost, timeout: Duration, poll: Duration) -> bool {
    let poll = poll.max(Duration::from_millis(1));
    let wait = async {
        while !host.content_ready() {
            tokio::time::sleep(poll).await;
        }
    };
    tokio::time::timeout(timeout, wait).await.is_ok()
}
