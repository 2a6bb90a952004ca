pub mod error;
pub mod io;
pub mod models;
pub mod orchestrator;
pub mod sources;
pub mod stages;
pub mod text;

pub use error::{AlignError, SourceError};
pub use io::{
    parse_transcription_json, read_reference_text, read_timed_lines, MachineOutput,
    SubtitleDocument,
};
pub use models::{
    AlignmentMethod, AlignmentOp, AlignmentResult, FailureReason, TimedLine, TimedSegment,
};
pub use orchestrator::{AlignmentOrchestrator, LadderStep, OrchestratorConfig, Outcome};
pub use stages::{
    align_by_content, align_by_position, align_sequences, ContentAlignConfig,
    SequenceAlignConfig,
};
pub use text::{filter_reference_lines, normalize, similarity};
