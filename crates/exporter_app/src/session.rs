//! One CLI invocation's view of the exporter: the saved site, the run record
//! and the download directory.
//!
//! A saved-site host cannot follow a full reload itself. When the controller
//! stops with [`RunOutcome::Reloading`], the session opens a fresh host at
//! the target URL and lets a new controller resume from the store, exactly as
//! a page load would.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use engine_logging::engine_info;
use exporter_engine::{
    BatchController, DirectoryDownloads, EngineConfig, ExportedConversation, FileStore,
    HostBindings, JobStore, ProgressSink, RunOutcome, SnapshotHost, SnapshotSettings,
};

pub struct Session {
    site: PathBuf,
    host_settings: SnapshotSettings,
    store: JobStore,
    downloads: Arc<DirectoryDownloads>,
    sink: Arc<dyn ProgressSink>,
    config: EngineConfig,
}

impl Session {
    pub fn new(site: &Path, state_dir: &Path, out_dir: &Path, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            site: site.to_path_buf(),
            host_settings: SnapshotSettings::default(),
            store: JobStore::new(Arc::new(FileStore::new(state_dir.to_path_buf()))),
            downloads: Arc::new(DirectoryDownloads::new(out_dir.to_path_buf())),
            sink,
            config: EngineConfig::default(),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Builds a controller over a freshly loaded page at `location`.
    fn controller(&self, location: Option<&str>) -> anyhow::Result<BatchController> {
        let host = SnapshotHost::open(&self.site, location, &self.host_settings)
            .with_context(|| format!("failed to open saved site {}", self.site.display()))?;
        let bindings = HostBindings {
            host: host.clone(),
            navigator: host.clone(),
            extractor: host,
            downloads: self.downloads.clone(),
        };
        Ok(BatchController::new(
            bindings,
            self.store.clone(),
            self.config.clone(),
            self.sink.clone(),
        ))
    }

    pub async fn export_all(&self) -> anyhow::Result<RunOutcome> {
        let mut controller = self.controller(None)?;
        let outcome = controller
            .export_all()
            .await
            .context("export failed")?;
        self.follow_reloads(outcome).await
    }

    pub async fn resume(&self) -> anyhow::Result<RunOutcome> {
        let mut controller = self.controller(None)?;
        let outcome = controller.initialize().await.context("resume failed")?;
        self.follow_reloads(outcome).await
    }

    pub async fn cancel(&self) -> anyhow::Result<()> {
        let mut controller = self.controller(None)?;
        controller.cancel().await.context("cancel failed")?;
        Ok(())
    }

    pub fn export_current(&self, url: Option<&str>) -> anyhow::Result<ExportedConversation> {
        let controller = self.controller(url)?;
        let exported = controller.export_current()?;
        Ok(exported)
    }

    async fn follow_reloads(&self, mut outcome: RunOutcome) -> anyhow::Result<RunOutcome> {
        while let RunOutcome::Reloading { url } = &outcome {
            engine_info!("Reloading saved site at {}", url);
            let mut controller = self.controller(Some(url))?;
            outcome = controller
                .initialize()
                .await
                .context("resume after reload failed")?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use exporter_core::ConversationRef;
    use exporter_engine::{FinalOutput, NullProgressSink};
    use tempfile::TempDir;

    use super::*;

    const ORIGIN: &str = "https://chat.local";

    fn write_site(root: &Path, count: usize) {
        let links: String = (0..count)
            .map(|i| format!(r#"<a class="conversation" href="/app/c{i}">Chat {i}</a>"#))
            .collect();
        fs::write(
            root.join("index.html"),
            format!("<html><body><nav>{links}</nav></body></html>"),
        )
        .unwrap();
        let dir = root.join("conversations");
        fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            fs::write(
                dir.join(format!("c{i}.html")),
                format!(
                    r#"<div class="chat-history"><user-query>Q{i}</user-query><model-response><div class="markdown"><p>A{i}</p></div></model-response></div>"#
                ),
            )
            .unwrap();
        }
    }

    struct Dirs {
        site: TempDir,
        state: TempDir,
        out: TempDir,
    }

    fn session(count: usize) -> (Dirs, Session) {
        let dirs = Dirs {
            site: TempDir::new().unwrap(),
            state: TempDir::new().unwrap(),
            out: TempDir::new().unwrap(),
        };
        write_site(dirs.site.path(), count);
        let session = Session::new(
            dirs.site.path(),
            dirs.state.path(),
            dirs.out.path(),
            Arc::new(NullProgressSink),
        );
        (dirs, session)
    }

    fn zip_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "zip"))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn export_all_writes_archive_to_out_dir() {
        let (dirs, session) = session(3);

        let outcome = session.export_all().await.unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Completed(FinalOutput::Archive { files: 3, .. })
        ));
        assert_eq!(zip_files(dirs.out.path()).len(), 1);
        assert!(!session.store().is_running().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_follows_full_reloads() {
        // The default sidebar renders 20 links before scrolling, so c25 is
        // out of reach of a freshly loaded page.
        let (dirs, session) = session(30);
        let store = session.store();
        let target = ConversationRef::from_link("Chat 25", &format!("{ORIGIN}/app/c25"));
        store.set_queue(&[target]).unwrap();
        store.set_results(&[]).unwrap();
        store.set_total(1).unwrap();
        store.set_running(true).unwrap();

        let outcome = session.resume().await.unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Completed(FinalOutput::Archive { files: 1, .. })
        ));
        assert_eq!(zip_files(dirs.out.path()).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn export_current_saves_one_file() {
        let (dirs, session) = session(2);

        let exported = session
            .export_current(Some(&format!("{ORIGIN}/app/c1")))
            .unwrap();

        assert_eq!(exported.title, "Chat 1");
        assert_eq!(exported.path, dirs.out.path().join("Chat_1_c1.md"));
        assert!(exported.path.is_file());
    }

    #[test]
    fn missing_site_is_reported_with_context() {
        let state = TempDir::new().unwrap();
        let session = Session::new(
            &state.path().join("missing"),
            state.path(),
            state.path(),
            Arc::new(NullProgressSink),
        );
        let err = session.export_current(None).unwrap_err();
        assert!(format!("{err:#}").contains("failed to open saved site"));
    }
}
