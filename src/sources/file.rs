use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{ReferenceTextProvider, TimedSourceProvider};
use crate::error::SourceError;
use crate::models::{TimedLine, TranscriptionDocument};

/// Read and parse a transcription document from disk
async fn read_transcription(path: &Path) -> Result<Vec<TimedLine>, SourceError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SourceError::io(format!("reading {:?}", path), e))?;
    let document = TranscriptionDocument::from_json(&content)
        .map_err(|e| SourceError::json(format!("parsing {:?}", path), e))?;

    Ok(document.into_timed_lines()?)
}

/// Timed lines stored as `<dir>/<identifier>.<kind>.json`
#[derive(Debug, Clone)]
pub struct FileTimedSource {
    dir: PathBuf,
    kind: String,
}

impl FileTimedSource {
    /// `kind` distinguishes sources sharing a directory, e.g. "manual" or "auto"
    pub fn new(dir: impl Into<PathBuf>, kind: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            kind: kind.into(),
        }
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.json", identifier, self.kind))
    }
}

#[async_trait]
impl TimedSourceProvider for FileTimedSource {
    fn name(&self) -> &str {
        &self.kind
    }

    async fn fetch(&self, identifier: &str) -> Result<Vec<TimedLine>, SourceError> {
        let path = self.path_for(identifier);
        debug!("Reading {} lines from {:?}", self.kind, path);

        let lines = read_transcription(&path).await?;
        if lines.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(lines)
    }
}

/// Reference lyrics stored as `<dir>/<identifier>.txt`
#[derive(Debug, Clone)]
pub struct FileReferenceProvider {
    dir: PathBuf,
}

impl FileReferenceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReferenceTextProvider for FileReferenceProvider {
    async fn fetch(&self, identifier: &str) -> Result<String, SourceError> {
        let path = self.dir.join(format!("{}.txt", identifier));
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SourceError::io(format!("reading {:?}", path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_timed_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("song1.manual.json"),
            r#"{"segments": [{"start": 0.0, "end": 1.0, "text": "Hello"}]}"#,
        )
        .unwrap();

        let source = FileTimedSource::new(dir.path(), "manual");
        let lines = source.fetch("song1").await.unwrap();

        assert_eq!(source.name(), "manual");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].normalized, "hello");
        assert!(source.fetch("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_file_timed_source_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("song1.auto.json"), r#"{"segments": []}"#).unwrap();

        let source = FileTimedSource::new(dir.path(), "auto");

        assert!(matches!(source.fetch("song1").await, Err(SourceError::Empty)));
    }

    #[tokio::test]
    async fn test_file_reference_provider() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("song1.txt"), "[Chorus]\nla la\n").unwrap();

        let provider = FileReferenceProvider::new(dir.path());

        assert_eq!(provider.fetch("song1").await.unwrap(), "[Chorus]\nla la\n");
    }
}
