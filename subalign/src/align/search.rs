//! Sliding-window search for the reference span that best matches a cue.

use super::scoring::{Score, Scorer};

/// Scores closer than this are treated as tied.
const TIE_MARGIN: f64 = 0.01;

/// Below this best score the search retries with nearby window lengths.
const BROADEN_BELOW: f64 = 0.4;

/// Window length offsets tried by the broadened pass.
const LENGTH_OFFSETS: [isize; 6] = [-3, -2, -1, 1, 2, 3];

/// How the returned candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The cue text occurs verbatim in the corpus
    Exact,
    /// Best same-length window
    Window,
    /// Best window after the broadened pass ran
    Broadened,
}

/// Outcome of searching the corpus for one cue.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Best candidate; empty when nothing scored
    pub candidate: String,
    /// Best composite score reached (for exact matches, the full score)
    pub score: f64,
    pub completeness: f64,
    pub kind: MatchKind,
}

#[derive(Default)]
struct Best {
    candidate: Option<Vec<char>>,
    total: f64,
    completeness: f64,
}

impl Best {
    /// Take `score` if it is clearly higher, or tied with better ordering.
    fn offer(&mut self, score: &Score, candidate: impl FnOnce() -> Vec<char>) {
        let clearly_better = score.total > self.total + TIE_MARGIN;
        let tied_but_more_complete = (score.total - self.total).abs() < TIE_MARGIN
            && score.completeness > self.completeness;
        if clearly_better || tied_but_more_complete {
            self.total = score.total;
            self.completeness = score.completeness;
            self.candidate = Some(candidate());
        }
    }
}

/// Find the corpus span that best matches `target`.
///
/// A verbatim occurrence wins outright. Otherwise every window of the
/// target's length is scored, and if nothing reaches [`BROADEN_BELOW`],
/// windows up to three characters shorter or longer are tried too, cut or
/// space-padded to the target's length.
pub fn search(target: &str, corpus: &str) -> SearchResult {
    if corpus.contains(target) {
        let exact = Scorer::new(target).score(&target.chars().collect::<Vec<_>>());
        return SearchResult {
            candidate: target.to_string(),
            score: exact.total,
            completeness: exact.completeness,
            kind: MatchKind::Exact,
        };
    }

    let scorer = Scorer::new(target);
    let corpus: Vec<char> = corpus.chars().collect();
    let target_len = scorer.target().len();
    let mut best = Best::default();

    if target_len <= corpus.len() {
        for window in corpus.windows(target_len) {
            let score = scorer.score(window);
            best.offer(&score, || window.to_vec());
        }
    }

    let mut kind = MatchKind::Window;
    if best.total < BROADEN_BELOW {
        log::debug!(
            "Best window for {:?} scored {:.3}; broadening window lengths",
            target,
            best.total
        );
        kind = MatchKind::Broadened;
        for offset in LENGTH_OFFSETS {
            let Some(len) = target_len.checked_add_signed(offset) else {
                continue;
            };
            if len == 0 || len > corpus.len() {
                continue;
            }
            for window in corpus.windows(len) {
                let fitted = fit_to_length(window, target_len);
                let score = scorer.score_without_fragments(&fitted);
                best.offer(&score, || fitted.clone());
            }
        }
    }

    SearchResult {
        candidate: best.candidate.map(|c| c.into_iter().collect()).unwrap_or_default(),
        score: best.total,
        completeness: best.completeness,
        kind,
    }
}

/// Cut `window` to `len` characters, or pad it on the right with spaces.
fn fit_to_length(window: &[char], len: usize) -> Vec<char> {
    let mut fitted: Vec<char> = window.iter().take(len).copied().collect();
    fitted.resize(len, ' ');
    fitted
}
