//! Text helpers shared by the codec and the aligner: markup stripping,
//! reference normalization, and line wrapping.

pub mod script;
pub mod wrap;

use once_cell::sync::Lazy;
use regex::Regex;

pub use script::normalize_script;
pub use wrap::{ManualBreak, wrap_chunk};

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// Punctuation and spaces a line may end on.
///
/// Also the set of leading noise the refiner trims from a candidate.
const BREAK_CHARS: &[char] = &[
    '，', ',', '。', '.', '!', '！', '？', '?', '；', ';', '：', ':', '、', '…', ' ', '“', '”', '"',
    '\'', '（', '）', '(', ')', '《', '》', '〈', '〉', '-', '—',
];

/// Check if a line break may follow this character.
pub fn is_break_char(c: char) -> bool {
    BREAK_CHARS.contains(&c)
}

/// Remove inline markup tags such as `<b>` and `</i>`.
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").into_owned()
}

/// Markup-free text with every whitespace character removed.
///
/// This is the form subtitles are matched and compared in.
pub fn plain_text(text: &str) -> String {
    strip_markup(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}
