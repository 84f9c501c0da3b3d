//! Clean-up of a matched candidate: leading noise and cut-off particles.

use crate::text::is_break_char;

/// Targets up to this many characters may be recovered verbatim when the
/// search came back empty.
const SHORT_TARGET_MAX: usize = 6;

/// Sentence-final particles and punctuation a fixed-length window may cut.
const SENTENCE_FINALS: &[char] = &[
    '吗', '嗎', '呢', '啦', '喇', '啊', '呀', '啰', '啵', '啲', '！', '!', '？', '?', '。', '．', '.',
];

/// Refine `candidate`, the search result for `target`, against `corpus`.
pub fn refine(target: &str, candidate: &str, corpus: &str) -> String {
    let target = target.trim();

    if candidate.trim().is_empty() {
        if !target.is_empty()
            && target.chars().count() <= SHORT_TARGET_MAX
            && corpus.contains(target)
        {
            return target.to_string();
        }
        return candidate.to_string();
    }

    let candidate = trim_leading_noise(candidate, target);
    align_suffix(candidate, target, corpus)
}

/// Drop leading punctuation and spaces the target does not start with.
fn trim_leading_noise<'a>(candidate: &'a str, target: &str) -> &'a str {
    let target_start = target.chars().next();
    candidate.trim_start_matches(|c: char| is_break_char(c) && Some(c) != target_start)
}

/// Re-attach the target's final particle when the corpus has it right
/// after the candidate. The result is right-trimmed.
fn align_suffix(candidate: &str, target: &str, corpus: &str) -> String {
    let Some(last) = target.chars().last() else {
        return candidate.to_string();
    };

    let trimmed = candidate.trim_end();
    if SENTENCE_FINALS.contains(&last) && !trimmed.ends_with(last) {
        let next = corpus
            .find(candidate)
            .and_then(|pos| corpus[pos + candidate.len()..].chars().next());
        if next == Some(last) {
            return format!("{candidate}{last}").trim().to_string();
        }
    }
    trimmed.to_string()
}
