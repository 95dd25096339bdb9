//! Exporter engine: discovery crawler, batch controller, transcript
//! rendering and output (archive or individual downloads).
//!
//! The controller talks to the chat application only through the traits in
//! [`host`], persists its run record through [`store`] and reports progress
//! through a [`ProgressSink`].

pub mod archive;
pub mod config;
pub mod controller;
pub mod convert;
pub mod decode;
pub mod discovery;
pub mod document;
pub mod download;
pub mod extract;
pub mod filename;
pub mod finalize;
pub mod host;
pub mod persist;
pub mod progress;
pub mod snapshot;
pub mod store;
pub mod types;

pub use archive::{zip_archive_factory, ArchiveError, ArchiveFactory, ArchiveWriter};
pub use config::{Clock, EngineConfig};
pub use controller::{BatchController, HostBindings};
pub use convert::{converter_for, Converter, Html2MdConverter, PlainTextConverter};
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use discovery::{dedupe_links, discover, CrawlReport, CrawlSettings, DiscoveryError};
pub use document::{build_transcript, TranscriptHeader};
pub use download::{DirectoryDownloads, DownloadError, DownloadTrigger};
pub use extract::{ChatSelectors, DomTranscriptExtractor, DEFAULT_SELECTORS};
pub use filename::{error_filename, export_filename, sanitize_title};
pub use finalize::{
    build_manifest, FinalOutput, FinalizeError, FinalizeOptions, Finalizer, PendingDownloads,
    MANIFEST_FILENAME,
};
pub use host::{
    ConversationExtractor, ListContainer, NavigationOutcome, Navigator, PageHost, RenderedLink,
};
pub use progress::{ChannelProgressSink, ExportEvent, NullProgressSink, ProgressSink};
pub use snapshot::{SnapshotError, SnapshotHost, SnapshotSettings};
pub use store::{FileStore, JobStore, KvStore, MemoryStore, StoreError, RUN_KEYS};
pub use types::{
    ControllerError, ExportCurrentError, ExportedConversation, ItemFailure, RunOutcome,
};
