use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot use directory {path}: {reason}")]
    Directory { path: PathBuf, reason: String },
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Writes whole files into one directory, replacing any previous version in
/// a single rename. Readers see the old content or the new, never a mix.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.target(filename)?;
        self.prepare_dir()?;

        let mut staged = Builder::new()
            .prefix(".staging-")
            .tempfile_in(&self.dir)?;
        staged.write_all(content)?;
        staged.as_file().sync_all()?;
        staged
            .persist(&target)
            .map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }

    /// Deletes `filename`; deleting a file that is not there succeeds.
    pub fn remove(&self, filename: &str) -> Result<(), PersistError> {
        let target = self.target(filename)?;
        if let Err(err) = fs::remove_file(target) {
            if err.kind() != io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Only plain names are accepted; anything with a path separator could
    /// escape the directory.
    fn target(&self, filename: &str) -> Result<PathBuf, PersistError> {
        let plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\']);
        if plain {
            Ok(self.dir.join(filename))
        } else {
            Err(PersistError::InvalidName(filename.to_string()))
        }
    }

    fn prepare_dir(&self) -> Result<(), PersistError> {
        let failure = |reason: String| PersistError::Directory {
            path: self.dir.clone(),
            reason,
        };
        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(failure("not a directory".to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.dir).map_err(|err| failure(err.to_string()))
            }
            Err(err) => Err(failure(err.to_string())),
        }
    }
}
