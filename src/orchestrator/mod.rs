//! Fallback ladder over timed sources.
//!
//! Steps run in a fixed order and the first accepted result wins:
//! manual captions, automatic captions, forced transcription, then the
//! optional alternate source. Each external call is bounded by the step
//! timeout, and any source failure just moves the ladder on.

pub mod config;

pub use config::*;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{AlignError, SourceError};
use crate::models::{AlignmentMethod, AlignmentResult, FailureReason, TimedLine, TimedSegment};
use crate::sources::{PersistenceStore, ReferenceTextProvider, Romanizer, TimedSourceProvider};
use crate::stages::{align_by_content, align_by_position, align_sequences};
use crate::text::filter_reference_lines;

/// One rung of the fallback ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderStep {
    ManualCaptions,
    AutomaticCaptions,
    ForcedTranscription,
    AlternateSource,
}

impl LadderStep {
    pub const ALL: [LadderStep; 4] = [
        LadderStep::ManualCaptions,
        LadderStep::AutomaticCaptions,
        LadderStep::ForcedTranscription,
        LadderStep::AlternateSource,
    ];

    /// Caption steps align by DP; transcription steps by content
    fn is_caption(self) -> bool {
        matches!(self, LadderStep::ManualCaptions | LadderStep::AutomaticCaptions)
    }
}

impl fmt::Display for LadderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LadderStep::ManualCaptions => "manual captions",
            LadderStep::AutomaticCaptions => "automatic captions",
            LadderStep::ForcedTranscription => "forced transcription",
            LadderStep::AlternateSource => "alternate source",
        };
        f.write_str(name)
    }
}

/// Record of one ladder step, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAttempt {
    pub step: LadderStep,
    pub ok: bool,
    pub method: Option<AlignmentMethod>,
    pub confidence: f64,
    pub reason: Option<FailureReason>,
}

impl StepAttempt {
    fn from_result(step: LadderStep, result: &AlignmentResult) -> Self {
        Self {
            step,
            ok: result.ok,
            method: Some(result.method),
            confidence: result.confidence,
            reason: result.reason,
        }
    }

    fn failed(step: LadderStep, reason: FailureReason) -> Self {
        Self {
            step,
            ok: false,
            method: None,
            confidence: 0.0,
            reason: Some(reason),
        }
    }
}

/// Final answer of a ladder run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub identifier: String,
    pub run_id: String,
    /// Step that produced `result`
    pub step: LadderStep,
    pub result: AlignmentResult,
    /// Set when `result` was rejected and returned only because low-confidence
    /// output was requested
    pub low_confidence: bool,
    pub attempts: Vec<StepAttempt>,
}

/// Runs the fallback ladder for one identifier at a time
pub struct AlignmentOrchestrator {
    manual: Option<Box<dyn TimedSourceProvider>>,
    automatic: Option<Box<dyn TimedSourceProvider>>,
    transcription: Option<Box<dyn TimedSourceProvider>>,
    alternate: Option<Box<dyn TimedSourceProvider>>,
    reference: Box<dyn ReferenceTextProvider>,
    romanizer: Box<dyn Romanizer>,
    store: Option<Arc<dyn PersistenceStore>>,
    config: OrchestratorConfig,
}

impl AlignmentOrchestrator {
    pub fn new(
        reference: Box<dyn ReferenceTextProvider>,
        romanizer: Box<dyn Romanizer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            manual: None,
            automatic: None,
            transcription: None,
            alternate: None,
            reference,
            romanizer,
            store: None,
            config,
        }
    }

    pub fn with_manual(mut self, provider: Box<dyn TimedSourceProvider>) -> Self {
        self.manual = Some(provider);
        self
    }

    pub fn with_automatic(mut self, provider: Box<dyn TimedSourceProvider>) -> Self {
        self.automatic = Some(provider);
        self
    }

    pub fn with_transcription(mut self, provider: Box<dyn TimedSourceProvider>) -> Self {
        self.transcription = Some(provider);
        self
    }

    pub fn with_alternate(mut self, provider: Box<dyn TimedSourceProvider>) -> Self {
        self.alternate = Some(provider);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Initialize the romanizer. On failure content matching stays
    /// unavailable and transcription steps use position alignment.
    pub fn initialize(&mut self) -> Result<(), AlignError> {
        self.romanizer.initialize()
    }

    fn provider(&self, step: LadderStep) -> Option<&dyn TimedSourceProvider> {
        let provider = match step {
            LadderStep::ManualCaptions => &self.manual,
            LadderStep::AutomaticCaptions => &self.automatic,
            LadderStep::ForcedTranscription => &self.transcription,
            LadderStep::AlternateSource => &self.alternate,
        };
        provider.as_deref()
    }

    /// Walk the ladder and return the first accepted alignment
    pub async fn run(&self, identifier: &str) -> Result<Outcome, AlignError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("align", run_id = %run_id, identifier = %identifier);

        self.run_ladder(identifier, run_id).instrument(span).await
    }

    async fn run_ladder(&self, identifier: &str, run_id: String) -> Result<Outcome, AlignError> {
        info!("Starting alignment for {}", identifier);
        let reference = self.fetch_reference(identifier).await;

        let mut attempts = Vec::new();
        let mut best_rejected: Option<(LadderStep, AlignmentResult)> = None;

        for step in LadderStep::ALL {
            if step == LadderStep::AlternateSource && !self.config.enable_alternate_source {
                debug!("Alternate source disabled");
                continue;
            }
            let Some(provider) = self.provider(step) else {
                debug!("No provider configured for {}", step);
                continue;
            };

            info!("Trying {} ({})", step, provider.name());
            let result = match self.attempt(step, provider, identifier, &reference).await {
                Ok(result) => result,
                Err(reason) => {
                    warn!("{} failed: {}", step, reason);
                    attempts.push(StepAttempt::failed(step, reason));
                    continue;
                }
            };
            attempts.push(StepAttempt::from_result(step, &result));

            if result.ok {
                info!(
                    "Accepted {} via {} ({} segments, confidence {:.2})",
                    step,
                    result.method,
                    result.segment_count(),
                    result.confidence
                );
                self.persist(identifier, &result).await;
                return Ok(Outcome {
                    identifier: identifier.to_string(),
                    run_id,
                    step,
                    result,
                    low_confidence: false,
                    attempts,
                });
            }

            warn!(
                "{} rejected via {}: {} (confidence {:.2})",
                step,
                result.method,
                result.reason.map_or("unknown", |r| r.as_str()),
                result.confidence
            );
            if result.segment_count() > 0
                && best_rejected
                    .as_ref()
                    .is_none_or(|(_, best)| result.confidence > best.confidence)
            {
                best_rejected = Some((step, result));
            }
        }

        if self.config.accept_low_confidence {
            if let Some((step, result)) = best_rejected {
                warn!(
                    "Ladder exhausted; returning low-confidence result from {} ({:.2})",
                    step, result.confidence
                );
                return Ok(Outcome {
                    identifier: identifier.to_string(),
                    run_id,
                    step,
                    result,
                    low_confidence: true,
                    attempts,
                });
            }
        }

        let last_reason = attempts
            .last()
            .and_then(|a| a.reason)
            .map_or("no sources configured".to_string(), |r| r.to_string());
        Err(AlignError::NoUsableAlignment {
            identifier: identifier.to_string(),
            last_reason,
        })
    }

    /// Fetch and filter the reference text; failures leave it empty
    async fn fetch_reference(&self, identifier: &str) -> Vec<String> {
        match timeout(self.config.step_timeout, self.reference.fetch(identifier)).await {
            Ok(Ok(text)) => {
                let lines = filter_reference_lines(&text);
                info!("Reference text: {} lyric lines", lines.len());
                lines
            }
            Ok(Err(e)) => {
                warn!("Reference text unavailable: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Reference text fetch timed out after {:?}",
                    self.config.step_timeout
                );
                Vec::new()
            }
        }
    }

    async fn fetch_timed(
        &self,
        provider: &dyn TimedSourceProvider,
        identifier: &str,
    ) -> Result<Vec<TimedLine>, FailureReason> {
        match timeout(self.config.step_timeout, provider.fetch(identifier)).await {
            Ok(Ok(lines)) if lines.is_empty() => Err(FailureReason::EmptySource),
            Ok(Ok(lines)) => {
                debug!("{} returned {} lines", provider.name(), lines.len());
                Ok(lines)
            }
            Ok(Err(SourceError::Empty)) => Err(FailureReason::EmptySource),
            Ok(Err(e)) => {
                warn!("{} unavailable: {}", provider.name(), e);
                Err(FailureReason::SourceUnavailable)
            }
            Err(_) => {
                warn!(
                    "{} timed out after {:?}",
                    provider.name(),
                    self.config.step_timeout
                );
                Err(FailureReason::Timeout)
            }
        }
    }

    async fn attempt(
        &self,
        step: LadderStep,
        provider: &dyn TimedSourceProvider,
        identifier: &str,
        reference: &[String],
    ) -> Result<AlignmentResult, FailureReason> {
        // Transcription is expensive and useless without lyrics
        if !step.is_caption() && reference.is_empty() {
            return Err(FailureReason::NoLyricLines);
        }

        let lines = self.fetch_timed(provider, identifier).await?;

        if step.is_caption() {
            Ok(self.align_captions(step, &lines, reference))
        } else {
            Ok(self.align_transcription(&lines, reference))
        }
    }

    fn align_captions(
        &self,
        step: LadderStep,
        lines: &[TimedLine],
        reference: &[String],
    ) -> AlignmentResult {
        if !reference.is_empty() {
            return align_sequences(lines, reference, &self.config.sequence);
        }

        let trust = if step == LadderStep::ManualCaptions {
            self.config.manual_trust
        } else {
            self.config.automatic_trust
        };
        info!("No reference text; using {} verbatim", step);
        let segments: Vec<TimedSegment> = lines.iter().map(TimedSegment::from).collect();
        AlignmentResult::accepted(AlignmentMethod::SourceVerbatim, segments, trust, 1.0)
    }

    fn align_transcription(&self, lines: &[TimedLine], reference: &[String]) -> AlignmentResult {
        let content = align_by_content(
            lines,
            reference,
            self.romanizer.as_ref(),
            &self.config.content,
        );
        if content.ok {
            return content;
        }

        info!(
            "Content matching rejected ({}), falling back to position",
            content.reason.map_or("unknown", |r| r.as_str())
        );
        align_by_position(lines, reference)
    }

    async fn persist(&self, identifier: &str, result: &AlignmentResult) {
        let Some(store) = &self.store else {
            return;
        };

        match timeout(self.config.step_timeout, store.upsert(identifier, result)).await {
            Ok(Ok(())) => debug!("Stored alignment for {}", identifier),
            Ok(Err(e)) => warn!("Failed to store alignment for {}: {}", identifier, e),
            Err(_) => warn!("Storing alignment for {} timed out", identifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::sources::{MemoryStore, PassthroughRomanizer, StoredAlignment};

    struct FakeTimed {
        lines: Option<Vec<TimedLine>>,
        delay: Option<Duration>,
    }

    impl FakeTimed {
        fn boxed(texts: &[&str]) -> Box<dyn TimedSourceProvider> {
            let lines = texts
                .iter()
                .enumerate()
                .map(|(i, text)| TimedLine::new(i as f64 * 2.0, i as f64 * 2.0 + 1.5, *text).unwrap())
                .collect();
            Box::new(Self {
                lines: Some(lines),
                delay: None,
            })
        }

        fn unavailable() -> Box<dyn TimedSourceProvider> {
            Box::new(Self {
                lines: None,
                delay: None,
            })
        }

        fn slow(texts: &[&str]) -> Box<dyn TimedSourceProvider> {
            let lines = texts
                .iter()
                .map(|text| TimedLine::new(0.0, 1.0, *text).unwrap())
                .collect();
            Box::new(Self {
                lines: Some(lines),
                delay: Some(Duration::from_secs(5)),
            })
        }
    }

    #[async_trait]
    impl TimedSourceProvider for FakeTimed {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch(&self, _identifier: &str) -> Result<Vec<TimedLine>, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.lines
                .clone()
                .ok_or_else(|| SourceError::command("fake", "offline"))
        }
    }

    struct FakeReference(Option<&'static str>);

    #[async_trait]
    impl ReferenceTextProvider for FakeReference {
        async fn fetch(&self, _identifier: &str) -> Result<String, SourceError> {
            self.0.map(str::to_string).ok_or(SourceError::Empty)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl PersistenceStore for FailingStore {
        async fn upsert(&self, _id: &str, _result: &AlignmentResult) -> Result<(), SourceError> {
            Err(SourceError::command("store", "disk full"))
        }

        async fn load(&self, _id: &str) -> Result<Option<StoredAlignment>, SourceError> {
            Ok(None)
        }
    }

    fn ladder(reference: Option<&'static str>, config: OrchestratorConfig) -> AlignmentOrchestrator {
        AlignmentOrchestrator::new(
            Box::new(FakeReference(reference)),
            Box::new(PassthroughRomanizer::ready()),
            config,
        )
    }

    #[tokio::test]
    async fn test_manual_captions_aligned_and_stored() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = ladder(Some("[Chorus]\nHello, world!"), OrchestratorConfig::default())
            .with_manual(FakeTimed::boxed(&["hello world"]))
            .with_store(store.clone());

        let outcome = orchestrator.run("song1").await.unwrap();

        assert_eq!(outcome.step, LadderStep::ManualCaptions);
        assert_eq!(outcome.result.method, AlignmentMethod::DpAlignment);
        assert!(!outcome.low_confidence);
        assert_eq!(outcome.result.segments.as_ref().unwrap()[0].text, "Hello, world!");

        let stored = store.load("song1").await.unwrap().unwrap();
        assert_eq!(stored.segments.len(), 1);
        assert_eq!(stored.method, AlignmentMethod::DpAlignment);
    }

    #[tokio::test]
    async fn test_verbatim_without_reference() {
        let orchestrator = ladder(None, OrchestratorConfig::default())
            .with_manual(FakeTimed::unavailable())
            .with_automatic(FakeTimed::boxed(&["la la la"]));

        let outcome = orchestrator.run("song1").await.unwrap();

        assert_eq!(outcome.step, LadderStep::AutomaticCaptions);
        assert_eq!(outcome.result.method, AlignmentMethod::SourceVerbatim);
        assert_eq!(outcome.result.confidence, 0.8);
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].reason, Some(FailureReason::SourceUnavailable));
    }

    #[tokio::test]
    async fn test_rejected_captions_fall_through_to_transcription() {
        let orchestrator = ladder(Some("wxyz"), OrchestratorConfig::default())
            .with_manual(FakeTimed::boxed(&["abcd"]))
            .with_transcription(FakeTimed::boxed(&["wxyz"]));

        let outcome = orchestrator.run("song1").await.unwrap();

        assert_eq!(outcome.step, LadderStep::ForcedTranscription);
        assert_eq!(outcome.result.method, AlignmentMethod::ContentMatching);
        assert_eq!(outcome.attempts[0].reason, Some(FailureReason::LowConfidence));
    }

    #[tokio::test]
    async fn test_unready_romanizer_uses_position() {
        let orchestrator = AlignmentOrchestrator::new(
            Box::new(FakeReference(Some("wxyz"))),
            Box::new(PassthroughRomanizer::new()),
            OrchestratorConfig::default(),
        )
        .with_transcription(FakeTimed::boxed(&["wxyz"]));

        let outcome = orchestrator.run("song1").await.unwrap();

        assert_eq!(outcome.result.method, AlignmentMethod::PositionFallback);
        assert_eq!(outcome.result.confidence, 0.70);
    }

    #[tokio::test]
    async fn test_timeout_then_exhaustion() {
        let config = OrchestratorConfig {
            step_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let orchestrator = ladder(Some("wxyz"), config)
            .with_transcription(FakeTimed::slow(&["wxyz"]));

        let err = orchestrator.run("song1").await.unwrap_err();

        match err {
            AlignError::NoUsableAlignment {
                identifier,
                last_reason,
            } => {
                assert_eq!(identifier, "song1");
                assert_eq!(last_reason, "timeout");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_low_confidence_returned_when_requested() {
        let config = OrchestratorConfig {
            accept_low_confidence: true,
            ..Default::default()
        };
        let orchestrator = ladder(Some("wxyz"), config).with_manual(FakeTimed::boxed(&["abcd"]));

        let outcome = orchestrator.run("song1").await.unwrap();

        assert!(outcome.low_confidence);
        assert!(!outcome.result.ok);
        assert_eq!(outcome.step, LadderStep::ManualCaptions);
    }

    #[tokio::test]
    async fn test_alternate_source_requires_flag() {
        let orchestrator = ladder(Some("wxyz"), OrchestratorConfig::default())
            .with_alternate(FakeTimed::boxed(&["wxyz"]));

        assert!(orchestrator.run("song1").await.is_err());

        let config = OrchestratorConfig {
            enable_alternate_source: true,
            ..Default::default()
        };
        let orchestrator = ladder(Some("wxyz"), config).with_alternate(FakeTimed::boxed(&["wxyz"]));

        let outcome = orchestrator.run("song1").await.unwrap();
        assert_eq!(outcome.step, LadderStep::AlternateSource);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_fatal() {
        let orchestrator = ladder(None, OrchestratorConfig::default())
            .with_manual(FakeTimed::boxed(&["hello"]))
            .with_store(Arc::new(FailingStore));

        let outcome = orchestrator.run("song1").await.unwrap();

        assert_eq!(outcome.result.method, AlignmentMethod::SourceVerbatim);
        assert_eq!(outcome.result.confidence, 1.0);
    }
}
