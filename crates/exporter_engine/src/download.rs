use std::path::PathBuf;

use engine_logging::engine_info;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to save {filename}: {source}")]
    Save {
        filename: String,
        #[source]
        source: PersistError,
    },
}

/// Hands finished output to the user.
pub trait DownloadTrigger: Send + Sync {
    fn save(&self, content: &[u8], filename: &str) -> Result<PathBuf, DownloadError>;
}

/// Saves downloads into a directory, replacing files with the same name.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    writer: AtomicFileWriter,
}

impl DirectoryDownloads {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }
}

impl DownloadTrigger for DirectoryDownloads {
    fn save(&self, content: &[u8], filename: &str) -> Result<PathBuf, DownloadError> {
        let path = self
            .writer
            .write(filename, content)
            .map_err(|source| DownloadError::Save {
                filename: filename.to_string(),
                source,
            })?;
        engine_info!("Saved {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }
}
