use std::time::Duration;

use anyhow::{Context, Result};

use crate::stages::{ContentAlignConfig, SequenceAlignConfig};

/// Configuration for the fallback ladder
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on each external call (source fetch, transcription, store)
    pub step_timeout: Duration,
    /// Whether the last-resort alternate source is tried
    pub enable_alternate_source: bool,
    /// Return the best rejected result instead of failing when the ladder is exhausted
    pub accept_low_confidence: bool,
    /// Confidence reported for manual captions used verbatim
    pub manual_trust: f64,
    /// Confidence reported for automatic captions used verbatim
    pub automatic_trust: f64,
    pub sequence: SequenceAlignConfig,
    pub content: ContentAlignConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(120),
            enable_alternate_source: false,
            accept_low_confidence: false,
            manual_trust: 1.0,
            automatic_trust: 0.8,
            sequence: SequenceAlignConfig::default(),
            content: ContentAlignConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `LYRICSYNC_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(secs) = std::env::var("LYRICSYNC_STEP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("LYRICSYNC_STEP_TIMEOUT_SECS is not a number: {}", secs))?;
            config.step_timeout = Duration::from_secs(secs);
        }
        if let Ok(value) = std::env::var("LYRICSYNC_ENABLE_ALTERNATE") {
            config.enable_alternate_source = parse_flag(&value)
                .with_context(|| format!("LYRICSYNC_ENABLE_ALTERNATE is not a flag: {}", value))?;
        }
        if let Ok(value) = std::env::var("LYRICSYNC_ACCEPT_LOW_CONFIDENCE") {
            config.accept_low_confidence = parse_flag(&value).with_context(|| {
                format!("LYRICSYNC_ACCEPT_LOW_CONFIDENCE is not a flag: {}", value)
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
