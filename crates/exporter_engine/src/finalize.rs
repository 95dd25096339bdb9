//! Result accumulator and finalizer.
//!
//! Archive mode packs every item into one zip and saves it once. Individual
//! mode schedules one staggered download per item and returns immediately.
//! If the archive cannot be built or saved, the items are saved one by one
//! instead so the user still receives every transcript.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use exporter_core::{ExportItem, ExportMode};
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::archive::ArchiveFactory;
use crate::download::DownloadTrigger;

pub const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    #[error("archive failed ({reason}) and none of the {count} files could be saved")]
    NothingSaved { reason: String, count: usize },
}

/// Downloads scheduled in individual mode. Dropping this does not cancel them.
#[derive(Debug)]
pub struct PendingDownloads {
    pub scheduled: usize,
    handle: JoinHandle<usize>,
}

impl PendingDownloads {
    /// Waits for every scheduled download and returns how many were saved.
    pub async fn wait(self) -> usize {
        match self.handle.await {
            Ok(saved) => saved,
            Err(err) => {
                engine_error!("Download task failed: {}", err);
                0
            }
        }
    }
}

#[derive(Debug)]
pub enum FinalOutput {
    Archive {
        path: PathBuf,
        files: usize,
    },
    Individual(PendingDownloads),
    /// Archive failed; items were saved individually instead.
    Fallback {
        saved: usize,
        failed: usize,
        reason: String,
    },
}

/// Optional per-run extras written next to the items.
#[derive(Debug, Clone, Default)]
pub struct FinalizeOptions {
    pub archive_name: String,
    pub include_manifest: bool,
    pub exported_at: String,
}

#[derive(Clone)]
pub struct Finalizer {
    downloads: Arc<dyn DownloadTrigger>,
    archive_factory: ArchiveFactory,
    stagger: Duration,
}

impl Finalizer {
    pub fn new(
        downloads: Arc<dyn DownloadTrigger>,
        archive_factory: ArchiveFactory,
        stagger: Duration,
    ) -> Self {
        Self {
            downloads,
            archive_factory,
            stagger,
        }
    }

    pub async fn finalize(
        &self,
        results: Vec<ExportItem>,
        mode: ExportMode,
        options: &FinalizeOptions,
        on_archive_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<FinalOutput, FinalizeError> {
        match mode {
            ExportMode::Individual => Ok(FinalOutput::Individual(self.schedule_individual(results))),
            ExportMode::Archive => {
                match self.write_archive(&results, options, on_archive_progress) {
                    Ok(path) => Ok(FinalOutput::Archive {
                        path,
                        files: results.len(),
                    }),
                    Err(reason) => {
                        engine_warn!("Archive failed, saving files individually: {}", reason);
                        self.save_individually(results, reason).await
                    }
                }
            }
        }
    }

    fn write_archive(
        &self,
        results: &[ExportItem],
        options: &FinalizeOptions,
        on_progress: &mut (dyn FnMut(u8) + Send),
    ) -> Result<PathBuf, String> {
        let mut archive = (self.archive_factory)();
        for item in results {
            archive
                .add_file(&item.filename, item.content.as_bytes())
                .map_err(|err| err.to_string())?;
        }
        if options.include_manifest {
            let manifest = build_manifest(results, &options.exported_at);
            archive
                .add_file(MANIFEST_FILENAME, manifest.as_bytes())
                .map_err(|err| err.to_string())?;
        }
        let blob = archive
            .finalize(&mut |percent| on_progress(percent))
            .map_err(|err| err.to_string())?;
        let path = self
            .downloads
            .save(&blob, &options.archive_name)
            .map_err(|err| err.to_string())?;
        engine_info!(
            "Archive {} written with {} items",
            path.display(),
            results.len()
        );
        Ok(path)
    }

    fn schedule_individual(&self, results: Vec<ExportItem>) -> PendingDownloads {
        let scheduled = results.len();
        let downloads = self.downloads.clone();
        let stagger = self.stagger;
        let handle = tokio::spawn(async move {
            let mut saved = 0;
            for (index, item) in results.into_iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(stagger).await;
                }
                match downloads.save(item.content.as_bytes(), &item.filename) {
                    Ok(_) => saved += 1,
                    Err(err) => engine_warn!("Download of {} failed: {}", item.filename, err),
                }
            }
            saved
        });
        engine_info!("Scheduled {} individual downloads", scheduled);
        PendingDownloads { scheduled, handle }
    }

    async fn save_individually(
        &self,
        results: Vec<ExportItem>,
        reason: String,
    ) -> Result<FinalOutput, FinalizeError> {
        let count = results.len();
        let saved = self.schedule_individual(results).wait().await;
        if count > 0 && saved == 0 {
            return Err(FinalizeError::NothingSaved { reason, count });
        }
        Ok(FinalOutput::Fallback {
            saved,
            failed: count - saved,
            reason,
        })
    }
}

/// JSON index of the archive: one entry per item with its status.
pub fn build_manifest(results: &[ExportItem], exported_at: &str) -> String {
    let failed = results.iter().filter(|item| item.is_error()).count();
    json!({
        "exported_at": exported_at,
        "item_count": results.len(),
        "failed_count": failed,
        "files": results.iter().map(|item| {
            json!({
                "filename": item.filename,
                "status": if item.is_error() { "error" } else { "ok" },
                "bytes": item.content.len(),
            })
        }).collect::<Vec<_>>()
    })
    .to_string()
}
