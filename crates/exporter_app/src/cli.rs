use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use exporter_core::{ExportFormat, ExportMode};

#[derive(Debug, Parser)]
#[command(
    name = "chat-export",
    version,
    about = "Export every conversation from a saved copy of the chat site"
)]
pub struct Cli {
    /// Saved site: index.html with the sidebar plus conversations/<id>.html
    #[arg(long, global = true, default_value = "site")]
    pub site: PathBuf,

    /// Where the run record and settings are kept between invocations
    #[arg(long, global = true, default_value = ".chat-export")]
    pub state_dir: PathBuf,

    /// Where finished exports are saved
    #[arg(long, global = true, default_value = "downloads")]
    pub out_dir: PathBuf,

    /// Also log to the terminal, at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Export the conversation open at URL
    ExportCurrent {
        #[arg(long)]
        url: Option<String>,
    },
    /// Discover every conversation and export them all
    ExportAll {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Continue an interrupted export
    Resume,
    /// Stop the running export and discard its progress
    Cancel {
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or change export settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print the state of the current export
    Status,
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    Show,
    Set {
        /// markdown | text
        #[arg(long)]
        format: Option<ExportFormat>,
        /// archive | individual
        #[arg(long)]
        mode: Option<ExportMode>,
        /// Include the metadata block and manifest
        #[arg(long)]
        metadata: Option<bool>,
        /// Settle delay after a conversation loads
        #[arg(long = "delay-ms")]
        delay_ms: Option<u64>,
    },
}

/// Asks a yes/no question on stdin. Anything but y/yes is a no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    confirm_with(prompt, &mut stdin.lock(), &mut io::stdout())
}

fn confirm_with(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{prompt} [y/N] ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn settings_set_parses_values() {
        let cli = Cli::parse_from([
            "chat-export",
            "settings",
            "set",
            "--format",
            "text",
            "--mode",
            "individual",
            "--delay-ms",
            "500",
        ]);
        match cli.command {
            Command::Settings {
                action:
                    SettingsAction::Set {
                        format,
                        mode,
                        metadata,
                        delay_ms,
                    },
            } => {
                assert_eq!(format, Some(ExportFormat::Text));
                assert_eq!(mode, Some(ExportMode::Individual));
                assert_eq!(metadata, None);
                assert_eq!(delay_ms, Some(500));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn confirmation_accepts_only_yes() {
        let mut out = Vec::new();
        assert!(confirm_with("Go?", &mut "y\n".as_bytes(), &mut out).unwrap());
        assert!(confirm_with("Go?", &mut "YES\n".as_bytes(), &mut out).unwrap());
        assert!(!confirm_with("Go?", &mut "\n".as_bytes(), &mut out).unwrap());
        assert!(!confirm_with("Go?", &mut "nope\n".as_bytes(), &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().starts_with("Go? [y/N] "));
    }
}
