use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::TimedSourceProvider;
use crate::error::SourceError;
use crate::models::{TimedLine, TranscriptionDocument};

/// Marker the transcription tool prints when every retry produced nothing
const NO_SEGMENTS_MARKER: &str = "WHISPER_NO_SEGMENTS";

/// Forced re-transcription through an external tool
///
/// Runs `program args...` with `{id}` substituted in each argument and reads a
/// transcription document (`{"segments": [...]}`) from stdout. The child is
/// killed if the future is dropped, so an orchestrator timeout cleans it up.
#[derive(Debug, Clone)]
pub struct CommandTimedSource {
    label: String,
    program: String,
    args: Vec<String>,
}

impl CommandTimedSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            label: "transcription".to_string(),
            program: program.into(),
            args,
        }
    }

    fn args_for(&self, identifier: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{id}", identifier))
            .collect()
    }
}

#[async_trait]
impl TimedSourceProvider for CommandTimedSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(&self, identifier: &str) -> Result<Vec<TimedLine>, SourceError> {
        let args = self.args_for(identifier);
        info!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SourceError::io(format!("spawning {}", self.program), e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains(NO_SEGMENTS_MARKER) {
            return Err(SourceError::Empty);
        }
        if !output.status.success() {
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(SourceError::command(
                &self.program,
                format!("{}: {}", output.status, tail.join(" | ")),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let document = TranscriptionDocument::from_json(stdout.trim())
            .map_err(|e| SourceError::json(format!("parsing {} output", self.program), e))?;
        let lines = document.into_timed_lines()?;
        debug!("{} produced {} lines", self.program, lines.len());

        if lines.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_substitution() {
        let source = CommandTimedSource::new(
            "python",
            vec!["align_whisper.py".to_string(), "--videoId".to_string(), "{id}".to_string()],
        );

        assert_eq!(
            source.args_for("dQw4w9WgXcQ"),
            vec!["align_whisper.py", "--videoId", "dQw4w9WgXcQ"]
        );
        assert_eq!(source.name(), "transcription");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reads_document_from_stdout() {
        let script = r#"echo '{"segments": [{"start": 1.0, "end": 2.0, "text_ja": "こんにちは", "text_romaji": "konnichiwa"}]}'"#;
        let source = CommandTimedSource::new("sh", vec!["-c".to_string(), script.to_string()]);

        let lines = source.fetch("ignored").await.unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].romanized.as_deref(), Some("konnichiwa"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_exit_status() {
        let source = CommandTimedSource::new(
            "sh",
            vec!["-c".to_string(), "echo WHISPER_NO_SEGMENTS >&2; exit 1".to_string()],
        );

        assert!(matches!(source.fetch("x").await, Err(SourceError::Empty)));

        let source = CommandTimedSource::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);

        assert!(matches!(
            source.fetch("x").await,
            Err(SourceError::Command { .. })
        ));
    }
}
