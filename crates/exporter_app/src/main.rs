//! `chat-export`: batch export of chat conversations from a saved copy of
//! the chat site.
//!
//!   chat-export --site ./site export-all --yes
//!   chat-export export-current --url https://chat.local/app/abc123
//!   chat-export settings set --format text --mode individual
//!   chat-export status

mod cli;
mod events;
mod session;

use std::sync::{mpsc, Arc};

use anyhow::{bail, Context};
use clap::Parser;
use engine_logging::{engine_error, engine_info, LogDestination};
use exporter_core::{processing_percent, Settings};
use exporter_engine::{ChannelProgressSink, FinalOutput, JobStore, RunOutcome};
use log::LevelFilter;

use cli::{confirm, Cli, Command, SettingsAction};
use session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (destination, level) = if cli.verbose {
        (LogDestination::Both, LevelFilter::Debug)
    } else {
        (LogDestination::File, LevelFilter::Info)
    };
    engine_logging::initialize(destination, level);
    engine_info!("chat-export {:?}", cli.command);

    let (tx, rx) = mpsc::channel();
    let printer = events::spawn_printer(rx);
    let session = Session::new(
        &cli.site,
        &cli.state_dir,
        &cli.out_dir,
        Arc::new(ChannelProgressSink::new(tx)),
    );

    let result = run(cli.command, &session).await;
    // Dropping the session closes the event channel so the printer drains.
    drop(session);
    let _ = printer.join();

    if let Err(err) = &result {
        engine_error!("{:#}", err);
    }
    result
}

async fn run(command: Command, session: &Session) -> anyhow::Result<()> {
    match command {
        Command::ExportCurrent { url } => {
            let exported = session.export_current(url.as_deref())?;
            println!(
                "Saved \"{}\" ({} messages) to {}",
                exported.title,
                exported.messages,
                exported.path.display()
            );
            Ok(())
        }
        Command::ExportAll { yes } => {
            if session.store().is_running()? {
                println!("An export is already in progress; resuming it.");
                return report(session.resume().await?).await;
            }
            if !yes && !confirm("Export all conversations? This can take a while.")? {
                println!("Aborted.");
                return Ok(());
            }
            report(session.export_all().await?).await
        }
        Command::Resume => {
            if !session.store().is_running()? {
                println!("No export in progress.");
                return Ok(());
            }
            report(session.resume().await?).await
        }
        Command::Cancel { yes } => {
            if !session.store().is_running()? {
                println!("No export in progress.");
                return Ok(());
            }
            if !yes && !confirm("Cancel the export and discard its progress?")? {
                println!("Aborted.");
                return Ok(());
            }
            session.cancel().await?;
            println!("Export cancelled.");
            Ok(())
        }
        Command::Settings { action } => settings(session.store(), action),
        Command::Status => status(session.store()),
    }
}

async fn report(outcome: RunOutcome) -> anyhow::Result<()> {
    match outcome {
        RunOutcome::Completed(FinalOutput::Individual(pending)) => {
            let scheduled = pending.scheduled;
            let saved = pending.wait().await;
            println!("Saved {saved} of {scheduled} files.");
            Ok(())
        }
        RunOutcome::Failed { reason } => bail!("export failed: {reason}"),
        other => {
            println!("Finished: {other}");
            Ok(())
        }
    }
}

fn settings(store: &JobStore, action: SettingsAction) -> anyhow::Result<()> {
    let current = store.settings()?;
    let settings = match action {
        SettingsAction::Show => current,
        SettingsAction::Set {
            format,
            mode,
            metadata,
            delay_ms,
        } => {
            let updated = Settings {
                format: format.unwrap_or(current.format),
                export_mode: mode.unwrap_or(current.export_mode),
                include_metadata: metadata.unwrap_or(current.include_metadata),
                delay: delay_ms.unwrap_or(current.delay),
            };
            store
                .set_settings(&updated)
                .context("failed to save settings")?;
            updated
        }
    };
    println!("format:   {:?}", settings.format);
    println!("mode:     {:?}", settings.export_mode);
    println!("metadata: {}", settings.include_metadata);
    println!("delay:    {} ms", settings.delay);
    Ok(())
}

fn status(store: &JobStore) -> anyhow::Result<()> {
    let run = store.run_state()?;
    if !run.is_running {
        println!("No export in progress.");
        return Ok(());
    }
    let queued = store.queue()?.len();
    let done = store.results()?.len();
    let total = run.total.max(queued + done);
    println!(
        "Export in progress: {done} of {total} done, {queued} left ({}%)",
        processing_percent(done, total)
    );
    Ok(())
}
