use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::PersistenceStore;
use crate::error::SourceError;
use crate::models::{AlignmentMethod, AlignmentResult, TimedSegment};

/// Persisted record of a finished alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlignment {
    pub identifier: String,
    pub stored_at: DateTime<Utc>,
    pub method: AlignmentMethod,
    pub confidence: f64,
    pub coverage: f64,
    pub segments: Vec<TimedSegment>,
}

impl StoredAlignment {
    pub fn from_result(identifier: &str, result: &AlignmentResult) -> Self {
        Self {
            identifier: identifier.to_string(),
            stored_at: Utc::now(),
            method: result.method,
            confidence: result.confidence,
            coverage: result.coverage,
            segments: result.segments.clone().unwrap_or_default(),
        }
    }

    /// Whether the record is younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        Utc::now() - self.stored_at < max_age
    }
}

/// One JSON file per identifier under a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{}.json", identifier))
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn upsert(&self, identifier: &str, result: &AlignmentResult) -> Result<(), SourceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SourceError::io(format!("creating {:?}", self.dir), e))?;

        let record = StoredAlignment::from_result(identifier, result);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| SourceError::json(format!("serializing {}", identifier), e))?;

        let path = self.path_for(identifier);
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| SourceError::io(format!("writing {:?}", path), e))?;
        debug!("Stored alignment for {} at {:?}", identifier, path);

        Ok(())
    }

    async fn load(&self, identifier: &str) -> Result<Option<StoredAlignment>, SourceError> {
        let path = self.path_for(identifier);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SourceError::io(format!("reading {:?}", path), e)),
        };

        let record = serde_json::from_str(&content)
            .map_err(|e| SourceError::json(format!("parsing {:?}", path), e))?;
        Ok(Some(record))
    }
}

/// In-process store, mostly for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, StoredAlignment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn upsert(&self, identifier: &str, result: &AlignmentResult) -> Result<(), SourceError> {
        let record = StoredAlignment::from_result(identifier, result);
        self.records
            .lock()
            .await
            .insert(identifier.to_string(), record);
        Ok(())
    }

    async fn load(&self, identifier: &str) -> Result<Option<StoredAlignment>, SourceError> {
        Ok(self.records.lock().await.get(identifier).cloned())
    }
}
