//! Re-splitting corrected text into a cue's original number of lines.

use super::is_break_char;

const OPEN_TAG: &str = "<b>";
const CLOSE_TAG: &str = "</b>";

/// How far past the approximate split point to look for a break, each way.
const SPLIT_SEARCH_WINDOW: usize = 8;

/// Caller-supplied line split for one cue.
///
/// Elements are split on their own newlines, then lines are trimmed and
/// blank lines dropped on construction. The break is
/// only honoured when what is left matches the cue's line count; otherwise
/// the wrapper falls back to automatic splitting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualBreak {
    lines: Vec<String>,
}

impl ManualBreak {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines
            .into_iter()
            .flat_map(|l| {
                l.as_ref()
                    .lines()
                    .map(|line| line.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines }
    }

    /// Break an edited text block on its own newlines.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether this break can be used for a cue of `line_count` lines.
    pub fn fits(&self, line_count: usize) -> bool {
        !self.lines.is_empty() && self.lines.len() == line_count
    }
}

/// Wrap a corrected chunk into exactly `line_count` subtitle lines.
///
/// The first line opens a bold span and the last line closes it.
pub fn wrap_chunk(chunk: &str, line_count: usize, manual: Option<&ManualBreak>) -> Vec<String> {
    let text = chunk.trim();

    let segments = match manual {
        Some(manual) if manual.fits(line_count) => manual.lines().to_vec(),
        _ => {
            if let Some(manual) = manual {
                log::debug!(
                    "Ignoring manual break with {} lines for a {}-line cue",
                    manual.lines().len(),
                    line_count
                );
            }
            if line_count <= 1 {
                vec![single_line(text)]
            } else if let Some(lines) = explicit_lines(text, line_count) {
                lines
            } else {
                balanced_split(&single_line(text), line_count)
            }
        }
    };

    tag_lines(segments)
}

/// Use the chunk's own line breaks when they already give the right count.
fn explicit_lines(text: &str, line_count: usize) -> Option<Vec<String>> {
    let lines: Vec<String> = text
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    (lines.len() == line_count).then_some(lines)
}

/// Join the non-blank lines of `text` with spaces.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into `line_count` segments of roughly equal length,
/// preferring to break right after punctuation.
fn balanced_split(text: &str, line_count: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::with_capacity(line_count);
    let mut cursor = 0;

    for line_index in 0..line_count {
        let remaining = line_count - line_index;
        let remainder = &chars[cursor..];

        if remaining == 1 || remainder.is_empty() {
            segments.push(trimmed(remainder));
            cursor = chars.len();
            continue;
        }

        let approx = (remainder.len() as f64 / remaining as f64).round_ties_even() as usize;
        let split_at = find_line_split(remainder, approx.max(1));
        segments.push(trimmed(&remainder[..split_at]));
        cursor += split_at;
    }

    segments
}

/// Find where to end a line near `approx`: the closest position right
/// after a break character, searching forward first, then backward.
fn find_line_split(chars: &[char], approx: usize) -> usize {
    let approx = approx.min(chars.len().saturating_sub(1)).max(1);

    for offset in 0..SPLIT_SEARCH_WINDOW {
        let idx = approx + offset;
        if idx < chars.len() && is_break_char(chars[idx - 1]) {
            return idx;
        }
    }
    for offset in 0..SPLIT_SEARCH_WINDOW {
        match approx.checked_sub(offset) {
            Some(idx) if idx > 0 && is_break_char(chars[idx - 1]) => return idx,
            _ => {}
        }
    }
    approx
}

fn trimmed(chars: &[char]) -> String {
    chars.iter().collect::<String>().trim().to_string()
}

fn tag_lines(mut lines: Vec<String>) -> Vec<String> {
    let last = lines.len().saturating_sub(1);
    for (idx, line) in lines.iter_mut().enumerate() {
        if idx == 0 {
            line.insert_str(0, OPEN_TAG);
        }
        if idx == last {
            line.push_str(CLOSE_TAG);
        }
    }
    lines
}
