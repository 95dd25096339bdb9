//! Exporter core: data model, pure job state machine and progress reporting.
mod effect;
mod model;
mod msg;
mod progress;
mod settings;
mod state;
mod update;

pub use effect::Effect;
pub use model::{
    conversation_id, ChatMessage, ConversationRef, ExportItem, Role, RunState, ERROR_PREFIX,
};
pub use msg::Msg;
pub use progress::{processing_percent, report, ProgressReport, PROCESSING_SHARE};
pub use settings::{ExportFormat, ExportMode, Settings, DEFAULT_DELAY_MS};
pub use state::{JobPhase, JobState};
pub use update::update;
