use thiserror::Error;

/// Errors raised by the alignment library.
///
/// Quality shortfalls (low confidence, nothing matched) are not errors. Those
/// come back as an `AlignmentResult` with `ok == false`.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("invalid timing: start={start}, end={end} (need end >= start >= 0)")]
    InvalidTiming { start: f64, end: f64 },
    #[error("romanizer is not ready")]
    RomanizerUnavailable,
    #[error("no usable alignment could be produced for {identifier} (last reason: {last_reason})")]
    NoUsableAlignment {
        identifier: String,
        last_reason: String,
    },
}

/// Failures reported by external collaborators (caption sources, lyric
/// providers, stores). The orchestrator treats all of them as "step failed".
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error while {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("command `{program}` failed: {message}")]
    Command { program: String, message: String },
    #[error("source returned invalid data: {0}")]
    Invalid(#[from] AlignError),
    #[error("source returned no usable content")]
    Empty,
}

impl SourceError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn command(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            message: message.into(),
        }
    }
}
