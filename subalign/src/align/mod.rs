//! Per-cue alignment against the reference corpus.
//!
//! Every cue is matched independently: [`search`] finds the best corpus
//! window for the cue's plain text and [`refine`] tidies its edges. Cues
//! do not constrain each other, so two cues may resolve to overlapping or
//! out-of-order spans of the corpus.

pub mod matcher;
pub mod refine;
pub mod scoring;
pub mod search;

pub use matcher::{MatchBlock, SequenceMatcher, similarity};
pub use refine::refine;
pub use scoring::{Score, Scorer, completeness, key_fragments, score};
pub use search::{MatchKind, SearchResult, search};

use rayon::prelude::*;
use thiserror::Error;

use crate::srt::{self, Cue, FormatError, ParseError};
use crate::text::normalize_script;

/// Score below which a cue is reported as a weak match.
pub const DEFAULT_LOW_SCORE: f64 = 0.4;

#[derive(Debug, Clone, Copy)]
pub struct AlignOptions {
    /// Spread cues over the rayon thread pool
    pub parallel: bool,
    /// Cues under this score are logged at warn level
    pub low_score_threshold: f64,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            low_score_threshold: DEFAULT_LOW_SCORE,
        }
    }
}

/// Result of aligning one cue.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignReport {
    /// Corrected text for the cue; may be empty
    pub chunk: String,
    /// Best search score before refinement
    pub score: f64,
    pub kind: MatchKind,
}

impl AlignReport {
    pub fn broadened(&self) -> bool {
        self.kind == MatchKind::Broadened
    }
}

#[derive(Debug, Error)]
pub enum CorrectError {
    #[error("Failed to parse subtitles: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to format subtitles: {0}")]
    Format(#[from] FormatError),
}

/// Search and refine a single cue.
pub fn align_cue(cue: &Cue, corpus: &str) -> AlignReport {
    let target = cue.plain_text();
    let found = search(&target, corpus);
    let chunk = refine(&target, &found.candidate, corpus);

    log::debug!(
        "Cue {}: {:?} -> {:?} (score {:.3}, {:?})",
        cue.index,
        target,
        chunk,
        found.score,
        found.kind
    );

    AlignReport {
        chunk,
        score: found.score,
        kind: found.kind,
    }
}

/// Align every cue, calling `on_progress` once per finished cue.
///
/// Reports come back in cue order whether or not the run is parallel.
pub fn align_reports<F>(
    cues: &[Cue],
    corpus: &str,
    options: AlignOptions,
    on_progress: F,
) -> Vec<AlignReport>
where
    F: Fn() + Sync,
{
    let align_one = |cue: &Cue| {
        let report = align_cue(cue, corpus);
        on_progress();
        report
    };

    let reports: Vec<AlignReport> = if options.parallel {
        cues.par_iter().map(align_one).collect()
    } else {
        cues.iter().map(align_one).collect()
    };

    for (cue, report) in cues.iter().zip(&reports) {
        if report.score < options.low_score_threshold {
            log::warn!(
                "Cue {} matched weakly (score {:.3}): {:?}",
                cue.index,
                report.score,
                report.chunk
            );
        }
    }

    let exact = reports.iter().filter(|r| r.kind == MatchKind::Exact).count();
    let broadened = reports.iter().filter(|r| r.broadened()).count();
    log::info!(
        "Aligned {} cues ({} exact, {} broadened)",
        reports.len(),
        exact,
        broadened
    );

    reports
}

/// Corrected chunks for `cues`, in cue order.
pub fn align_cues(cues: &[Cue], corpus: &str, options: AlignOptions) -> Vec<String> {
    align_reports(cues, corpus, options, || {})
        .into_iter()
        .map(|r| r.chunk)
        .collect()
}

/// Parse `document`, align it against the `reference` transcript, and
/// render the corrected document.
pub fn correct_document(
    document: &str,
    reference: &str,
    options: AlignOptions,
) -> Result<String, CorrectError> {
    let cues = srt::parse_srt(document)?;
    let corpus = normalize_script(reference);
    let chunks = align_cues(&cues, &corpus, options);
    Ok(srt::format_srt(&cues, &chunks, None)?)
}
