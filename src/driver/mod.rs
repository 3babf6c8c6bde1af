pub mod batch;
pub mod layout;
pub mod tool;

pub use batch::{BatchDriver, BatchEvent, BatchReport, BatchSettings, PlannedJob, RecordResult, StopReason};
pub use layout::WorkspaceLayout;
pub use tool::{ExtractionJob, ExtractionTool, Extractor, ToolOutcome};
