use std::collections::HashSet;
use std::io::{self, Cursor, Write};
use std::sync::Arc;

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Collects files and produces one compressed blob.
pub trait ArchiveWriter: Send {
    fn add_file(&mut self, name: &str, content: &[u8]) -> Result<(), ArchiveError>;
    /// Builds the archive, reporting 0..=100 as entries are compressed.
    fn finalize(self: Box<Self>, progress: &mut dyn FnMut(u8)) -> Result<Vec<u8>, ArchiveError>;
}

/// Creates a fresh writer for every finalization.
pub type ArchiveFactory = Arc<dyn Fn() -> Box<dyn ArchiveWriter> + Send + Sync>;

pub fn zip_archive_factory() -> ArchiveFactory {
    Arc::new(|| Box::new(ZipArchiveWriter::new()))
}

/// Deflate-compressed zip built in memory.
#[derive(Debug, Default)]
pub struct ZipArchiveWriter {
    entries: Vec<(String, Vec<u8>)>,
    names: HashSet<String>,
}

impl ZipArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip entries must be unique; a clash gets a numeric suffix.
    fn unique_name(&mut self, name: &str) -> String {
        let name = name.replace('\\', "/");
        if self.names.insert(name.clone()) {
            return name;
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
            None => (name.clone(), String::new()),
        };
        let mut n = 2;
        loop {
            let candidate = format!("{stem}_{n}{ext}");
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_file(&mut self, name: &str, content: &[u8]) -> Result<(), ArchiveError> {
        let name = self.unique_name(name);
        self.entries.push((name, content.to_vec()));
        Ok(())
    }

    fn finalize(self: Box<Self>, progress: &mut dyn FnMut(u8)) -> Result<Vec<u8>, ArchiveError> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let count = self.entries.len();
        progress(0);
        for (index, (name, content)) in self.entries.into_iter().enumerate() {
            zip.start_file(name, options)?;
            zip.write_all(&content)?;
            progress(((index + 1) * 100 / count) as u8);
        }
        let cursor = zip.finish()?;
        progress(100);
        Ok(cursor.into_inner())
    }
}
