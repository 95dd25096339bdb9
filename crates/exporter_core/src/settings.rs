use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DELAY_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Text,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Unknown format: {s}. Use: markdown, text")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// One compressed archive holding every item.
    #[default]
    Archive,
    /// One download per item.
    Individual,
}

impl std::str::FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "archive" | "zip" => Ok(Self::Archive),
            "individual" | "files" => Ok(Self::Individual),
            _ => Err(format!("Unknown export mode: {s}. Use: archive, individual")),
        }
    }
}

/// User-facing export settings. Missing fields fall back to defaults so an
/// older persisted record still loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub format: ExportFormat,
    pub export_mode: ExportMode,
    pub include_metadata: bool,
    /// Settle delay after the content container appears, in milliseconds.
    pub delay: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Markdown,
            export_mode: ExportMode::Archive,
            include_metadata: true,
            delay: DEFAULT_DELAY_MS,
        }
    }
}

impl Settings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }
}
