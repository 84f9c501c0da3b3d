//! Composite match score between a cue's text and a reference window.

use super::matcher::{MatchBlock, SequenceMatcher, ratio_from_blocks};

/// Score added per key fragment found verbatim in the candidate.
const FRAGMENT_WEIGHT: f64 = 0.2;

/// Weight of the order-preserving completeness term.
const COMPLETENESS_WEIGHT: f64 = 0.1;

/// Fragments shorter than this carry too little signal to count.
const MIN_FRAGMENT_LEN: usize = 2;

const FRAGMENT_SEPARATORS: &[char] = &[
    '，', '。', '！', '？', '；', '、', '"', '（', '）', '(', ')', '《', '》', '〈', '〉', '—', '-',
];

/// Breakdown of one candidate's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub total: f64,
    pub similarity: f64,
    pub completeness: f64,
    pub fragments: usize,
}

/// Scores candidates against one target; the target-side work is done once.
pub struct Scorer {
    target: Vec<char>,
    fragments: Vec<Vec<char>>,
}

impl Scorer {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.chars().collect(),
            fragments: key_fragments(target)
                .into_iter()
                .map(|f| f.chars().collect())
                .collect(),
        }
    }

    pub fn target(&self) -> &[char] {
        &self.target
    }

    /// Similarity, plus a bonus per key fragment present, plus completeness.
    pub fn score(&self, candidate: &[char]) -> Score {
        let mut score = self.score_without_fragments(candidate);
        score.fragments = self
            .fragments
            .iter()
            .filter(|f| contains(candidate, f))
            .count();
        let bonus = (0..score.fragments).fold(0.0, |acc, _| acc + FRAGMENT_WEIGHT);
        score.total = score.similarity + bonus + COMPLETENESS_WEIGHT * score.completeness;
        score
    }

    /// Similarity plus completeness only.
    pub fn score_without_fragments(&self, candidate: &[char]) -> Score {
        let blocks = SequenceMatcher::new(&self.target, candidate).matching_blocks();
        let similarity = ratio_from_blocks(&blocks, self.target.len(), candidate.len());
        let completeness = completeness_from_blocks(&blocks, self.target.len(), candidate.len());
        Score {
            total: similarity + COMPLETENESS_WEIGHT * completeness,
            similarity,
            completeness,
            fragments: 0,
        }
    }
}

/// Split text on sentence and clause punctuation and whitespace, keeping
/// pieces of at least two characters.
pub fn key_fragments(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || FRAGMENT_SEPARATORS.contains(&c))
        .filter(|part| part.chars().count() >= MIN_FRAGMENT_LEN)
        .map(str::to_string)
        .collect()
}

/// Fraction of the target reproduced in the candidate in the same order.
pub fn completeness(target: &str, candidate: &str) -> f64 {
    let target: Vec<char> = target.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    let blocks = SequenceMatcher::new(&target, &candidate).matching_blocks();
    completeness_from_blocks(&blocks, target.len(), candidate.len())
}

/// Sum the blocks whose candidate position moves strictly forward from the
/// previously counted block, over the target length.
fn completeness_from_blocks(blocks: &[MatchBlock], target_len: usize, candidate_len: usize) -> f64 {
    if target_len == 0 || candidate_len == 0 {
        return 0.0;
    }

    let mut preserved = 0;
    let mut last_pos: Option<usize> = None;
    for block in blocks.iter().filter(|b| b.size > 0) {
        if last_pos.is_none_or(|last| block.b_start > last) {
            preserved += block.size;
            last_pos = Some(block.b_start);
        }
    }

    preserved as f64 / target_len as f64
}

/// Composite score of `candidate` as a correction for `target`.
pub fn score(target: &str, candidate: &str) -> Score {
    let candidate: Vec<char> = candidate.chars().collect();
    Scorer::new(target).score(&candidate)
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
