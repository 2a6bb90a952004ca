//! External collaborators consumed by the orchestrator.
//!
//! Every provider is a black box behind a narrow trait. Any failure is treated
//! uniformly by the orchestrator as "this source is unavailable".

pub mod command;
pub mod file;
pub mod http;
pub mod romanizer;
pub mod store;

pub use command::*;
pub use file::*;
pub use http::*;
pub use romanizer::*;
pub use store::*;

use async_trait::async_trait;

use crate::error::{AlignError, SourceError};
use crate::models::{AlignmentResult, TimedLine};

/// Supplies timed lines (captions, ASR output, forced transcription)
#[async_trait]
pub trait TimedSourceProvider: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    async fn fetch(&self, identifier: &str) -> Result<Vec<TimedLine>, SourceError>;
}

/// Supplies the raw multi-line reference lyric text
#[async_trait]
pub trait ReferenceTextProvider: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<String, SourceError>;
}

/// Turns text in any script into a comparable (romanized) form
///
/// Constructed once, initialized explicitly, then passed by reference into
/// the content aligner.
pub trait Romanizer: Send + Sync {
    fn is_ready(&self) -> bool;

    fn initialize(&mut self) -> Result<(), AlignError>;

    fn romanize(&self, text: &str) -> Result<String, AlignError>;
}

/// Keeps finished alignments keyed by identifier; re-upserts overwrite
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn upsert(&self, identifier: &str, result: &AlignmentResult) -> Result<(), SourceError>;

    async fn load(&self, identifier: &str) -> Result<Option<StoredAlignment>, SourceError>;
}
