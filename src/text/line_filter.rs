use std::sync::LazyLock;

use regex::Regex;

/// `[Label: free text]`, e.g. `[Intro: Artist Name]`
static METADATA_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]:]+:[^\]]*\]$").expect("valid metadata regex"));

/// Bare section markers such as `[Chorus]` or `[Verse 2]`
static SECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\[\s*(intro|verse|pre-chorus|chorus|post-chorus|hook|pre-hook|post-hook|refrain|bridge|interlude|instrumental|break|breakdown|drop|outro|skit|spoken)(\s*\d+)?\s*\]$",
    )
    .expect("valid section regex")
});

/// Bracketed annotations carrying corner or double quotation marks
static QUOTED_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[.*[「」『』“”].*\]$").expect("valid annotation regex"));

/// Classification of a single reference transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Lyric,
    Empty,
    MetadataHeader,
    SectionMarker,
    QuotedAnnotation,
}

impl LineKind {
    pub fn is_lyric(&self) -> bool {
        matches!(self, LineKind::Lyric)
    }
}

/// Classify one line (trimmed before matching)
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();

    if line.is_empty() {
        LineKind::Empty
    } else if SECTION_MARKER.is_match(line) {
        LineKind::SectionMarker
    } else if METADATA_HEADER.is_match(line) {
        LineKind::MetadataHeader
    } else if QUOTED_ANNOTATION.is_match(line) {
        LineKind::QuotedAnnotation
    } else {
        LineKind::Lyric
    }
}

/// Extract the ordered lyric lines from a raw reference transcript
///
/// Structural lines are dropped; everything else (short interjections
/// included) is kept trimmed and in order. Returns an empty list when
/// nothing usable remains.
pub fn filter_reference_lines(raw_text: &str) -> Vec<String> {
    raw_text
        .lines()
        .map(str::trim)
        .filter(|line| classify_line(line).is_lyric())
        .map(str::to_string)
        .collect()
}
