//! SubRip (SRT) codec: blocks of index, time range, and text lines.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::text::{self, ManualBreak};

static TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{2}):(\d{2}),(\d{3})$").expect("valid timestamp regex"));

const TIME_ARROW: &str = "-->";

/// Errors raised while reading an SRT document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid cue index {value:?} at block {block}")]
    InvalidIndex { block: usize, value: String },

    #[error("Invalid time range {value:?} in cue {index}")]
    InvalidTimeRange { index: u64, value: String },

    #[error("Invalid timestamp {value:?} in cue {index}")]
    InvalidTimestamp { index: u64, value: String },
}

/// Errors raised while writing an SRT document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Cue and chunk counts do not match ({cues} cues, {chunks} chunks)")]
    CountMismatch { cues: usize, chunks: usize },
}

/// One timed subtitle block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// Index as written in the document (kept verbatim, not renumbered).
    /// Always at least 1 for parsed cues.
    pub index: u64,
    /// Start time, `HH:MM:SS,mmm`
    pub start: String,
    /// End time, `HH:MM:SS,mmm`
    pub end: String,
    /// Raw text lines, markup included
    pub text_lines: Vec<String>,
}

impl Cue {
    pub fn new(
        index: u64,
        start: impl Into<String>,
        end: impl Into<String>,
        text_lines: Vec<String>,
    ) -> Self {
        Self {
            index,
            start: start.into(),
            end: end.into(),
            text_lines,
        }
    }

    /// All lines joined, markup and whitespace removed.
    pub fn plain_text(&self) -> String {
        text::plain_text(&self.text_lines.join("\n"))
    }

    pub fn line_count(&self) -> usize {
        self.text_lines.len()
    }

    /// `end - start` in milliseconds; negative when the cue runs backwards.
    ///
    /// Returns `None` if either timestamp is malformed, which only happens
    /// for cues built by hand rather than parsed, or too large for an `i64`.
    pub fn duration_ms(&self) -> Option<i64> {
        let start = timestamp_ms(&self.start)?;
        let end = timestamp_ms(&self.end)?;
        i64::try_from(end).ok()?.checked_sub(i64::try_from(start).ok()?)
    }

    /// Render this cue's block with the given text lines.
    fn render(&self, lines: &[String]) -> String {
        let mut block = Vec::with_capacity(lines.len() + 2);
        block.push(self.index.to_string());
        block.push(format!("{} {} {}", self.start, TIME_ARROW, self.end));
        // a blank line would end the block early
        block.extend(lines.iter().map(|l| {
            if l.trim().is_empty() {
                " ".to_string()
            } else {
                l.clone()
            }
        }));
        block.join("\n")
    }
}

/// Parse an `HH:MM:SS,mmm` timestamp into milliseconds.
///
/// `None` when the text is malformed or the value does not fit in a `u64`.
pub fn timestamp_ms(timestamp: &str) -> Option<u64> {
    let caps = TIMESTAMP.captures(timestamp)?;
    let field = |i: usize| caps[i].parse::<u64>().ok();
    field(1)?
        .checked_mul(3_600_000)?
        .checked_add(field(2)? * 60_000)?
        .checked_add(field(3)? * 1_000 + field(4)?)
}

/// Parse an SRT document into cues, in document order.
///
/// Blocks with fewer than three lines are skipped. A block with a bad
/// index or time line aborts the whole parse.
pub fn parse_srt(document: &str) -> Result<Vec<Cue>, ParseError> {
    let normalized = document.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for (block_no, block) in normalized.trim().split("\n\n").enumerate() {
        if let Some(cue) = parse_block(block_no, block)? {
            cues.push(cue);
        }
    }

    log::debug!("Parsed {} cues", cues.len());
    Ok(cues)
}

/// Parse one block: `Ok(None)` for an incomplete block that is dropped,
/// `Err` for a block that is present but malformed.
fn parse_block(block_no: usize, block: &str) -> Result<Option<Cue>, ParseError> {
    let lines: Vec<&str> = block.trim_matches('\n').lines().collect();
    if lines.len() < 3 {
        if !block.trim().is_empty() {
            log::warn!("Skipping incomplete subtitle block {}: {:?}", block_no, block);
        }
        return Ok(None);
    }

    let raw_index = lines[0].trim();
    let index = raw_index
        .parse::<u64>()
        .ok()
        .filter(|&i| i > 0)
        .ok_or_else(|| ParseError::InvalidIndex {
            block: block_no,
            value: raw_index.to_string(),
        })?;

    let (start, end) = match lines[1].split(TIME_ARROW).collect::<Vec<_>>()[..] {
        [start, end] => (start.trim(), end.trim()),
        _ => {
            return Err(ParseError::InvalidTimeRange {
                index,
                value: lines[1].to_string(),
            });
        }
    };

    for value in [start, end] {
        if timestamp_ms(value).is_none() {
            return Err(ParseError::InvalidTimestamp {
                index,
                value: value.to_string(),
            });
        }
    }

    let text_lines = lines[2..].iter().map(|l| l.to_string()).collect();
    Ok(Some(Cue::new(index, start, end, text_lines)))
}

/// Render each cue with its corrected chunk, one block per cue.
///
/// `manual_breaks[i]`, when present, overrides the automatic wrapping of
/// cue `i`; a shorter list leaves the remaining cues on automatic.
pub fn format_blocks(
    cues: &[Cue],
    chunks: &[String],
    manual_breaks: Option<&[Option<ManualBreak>]>,
) -> Result<Vec<String>, FormatError> {
    if cues.len() != chunks.len() {
        return Err(FormatError::CountMismatch {
            cues: cues.len(),
            chunks: chunks.len(),
        });
    }

    let blocks = cues
        .iter()
        .zip(chunks)
        .enumerate()
        .map(|(i, (cue, chunk))| {
            let manual = manual_breaks
                .and_then(|breaks| breaks.get(i))
                .and_then(Option::as_ref);
            let lines = text::wrap_chunk(chunk, cue.line_count(), manual);
            cue.render(&lines)
        })
        .collect();

    Ok(blocks)
}

/// Render a complete SRT document; it always ends with a single newline.
pub fn format_srt(
    cues: &[Cue],
    chunks: &[String],
    manual_breaks: Option<&[Option<ManualBreak>]>,
) -> Result<String, FormatError> {
    let blocks = format_blocks(cues, chunks, manual_breaks)?;
    Ok(blocks.join("\n\n") + "\n")
}

/// Re-serialize cues with their own text, as they were parsed.
pub fn render_cues(cues: &[Cue]) -> String {
    let blocks: Vec<String> = cues.iter().map(|c| c.render(&c.text_lines)).collect();
    blocks.join("\n\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:02,500\n<b>今天天气</b>\n\n\
                          7\n00:00:03,000 --> 00:00:05,000\n<b>我们出去\n玩吧</b>\n";

    #[test]
    fn test_parse_basic() {
        let cues = parse_srt(SAMPLE).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, "00:00:01,000");
        assert_eq!(cues[0].end, "00:00:02,500");
        assert_eq!(cues[0].text_lines, vec!["<b>今天天气</b>"]);
        assert_eq!(cues[1].index, 7);
        assert_eq!(cues[1].line_count(), 2);
        assert_eq!(cues[1].plain_text(), "我们出去玩吧");
    }

    #[test]
    fn test_duration() {
        let cues = parse_srt(SAMPLE).unwrap();
        assert_eq!(cues[0].duration_ms(), Some(1500));
        let backwards = Cue::new(1, "00:00:05,000", "00:00:04,000", vec!["x".into()]);
        assert_eq!(backwards.duration_ms(), Some(-1000));
        let bad = Cue::new(1, "soon", "later", vec!["x".into()]);
        assert_eq!(bad.duration_ms(), None);
    }

    #[test]
    fn test_timestamp_ms() {
        assert_eq!(timestamp_ms("01:02:03,004"), Some(3_723_004));
        assert_eq!(timestamp_ms("100:00:00,000"), Some(360_000_000));
        assert_eq!(timestamp_ms("00:00:01.000"), None);
        assert_eq!(timestamp_ms("0:0:1,0"), None);
    }

    #[test]
    fn test_timestamp_overflow_is_rejected() {
        assert_eq!(timestamp_ms("10000000000000000:00:00,000"), None);
        assert_eq!(timestamp_ms("5124095576031:00:00,000"), None);
        assert_eq!(timestamp_ms("5124095576030:26:00,000"), None);
        assert_eq!(
            timestamp_ms("5124095576030:25:51,615"),
            Some(u64::MAX)
        );

        let doc = "1\n10000000000000000:00:00,000 --> 10000000000000000:00:01,000\n文本\n";
        assert!(matches!(
            parse_srt(doc),
            Err(ParseError::InvalidTimestamp { index: 1, .. })
        ));
    }

    #[test]
    fn test_duration_out_of_range() {
        // fits in u64 but not in i64
        let huge = "4000000000000:00:00,000";
        assert!(timestamp_ms(huge).is_some());
        let cue = Cue::new(1, "00:00:00,000", huge, vec!["x".into()]);
        assert_eq!(cue.duration_ms(), None);
    }

    #[test]
    fn test_short_blocks_dropped() {
        let doc = "1\n00:00:01,000 --> 00:00:02,000\n\n\
                   2\n00:00:02,000 --> 00:00:03,000\n文本\n";
        let cues = parse_srt(doc).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 2);
    }

    #[test]
    fn test_invalid_index_fails() {
        let doc = "abc\n00:00:01,000 --> 00:00:02,000\n文本\n";
        assert!(matches!(
            parse_srt(doc),
            Err(ParseError::InvalidIndex { block: 0, .. })
        ));
    }

    #[test]
    fn test_index_range() {
        let doc = "18446744073709551615\n00:00:01,000 --> 00:00:02,000\n文本\n";
        assert_eq!(parse_srt(doc).unwrap()[0].index, u64::MAX);

        for bad in ["0", "-3", "18446744073709551616"] {
            let doc = format!("{bad}\n00:00:01,000 --> 00:00:02,000\n文本\n");
            assert!(matches!(
                parse_srt(&doc),
                Err(ParseError::InvalidIndex { block: 0, .. })
            ));
        }
    }

    #[test]
    fn test_invalid_time_range_fails() {
        let doc = "1\n00:00:01,000 00:00:02,000\n文本\n";
        assert!(matches!(
            parse_srt(doc),
            Err(ParseError::InvalidTimeRange { index: 1, .. })
        ));
        let doc = "1\n00:00:01,000 --> 00:00:02,000 --> 00:00:03,000\n文本\n";
        assert!(matches!(
            parse_srt(doc),
            Err(ParseError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn test_invalid_timestamp_fails() {
        let doc = "1\nsoon --> later\n文本\n";
        assert!(matches!(
            parse_srt(doc),
            Err(ParseError::InvalidTimestamp { index: 1, .. })
        ));
    }

    #[test]
    fn test_crlf_and_extra_blank_lines() {
        let doc = "1\r\n00:00:01,000 --> 00:00:02,000\r\n甲\r\n\r\n\r\n2\r\n00:00:02,000 --> 00:00:03,000\r\n乙\r\n";
        let cues = parse_srt(doc).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].text_lines, vec!["乙"]);
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_srt("").unwrap().is_empty());
        assert!(parse_srt("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_format_srt() {
        let cues = parse_srt(SAMPLE).unwrap();
        let chunks = vec!["今天天气很好".to_string(), "我们出去玩吧".to_string()];
        let out = format_srt(&cues, &chunks, None).unwrap();
        assert_eq!(
            out,
            "1\n00:00:01,000 --> 00:00:02,500\n<b>今天天气很好</b>\n\n\
             7\n00:00:03,000 --> 00:00:05,000\n<b>我们出\n去玩吧</b>\n"
        );
    }

    #[test]
    fn test_format_with_manual_breaks() {
        let cues = parse_srt(SAMPLE).unwrap();
        let chunks = vec!["甲".to_string(), "乙丙丁".to_string()];
        let breaks = vec![None, Some(ManualBreak::new(["乙丙", "丁"]))];
        let blocks = format_blocks(&cues, &chunks, Some(&breaks)).unwrap();
        assert_eq!(blocks[1], "7\n00:00:03,000 --> 00:00:05,000\n<b>乙丙\n丁</b>");

        // a short override list leaves later cues on automatic wrapping
        let breaks = vec![Some(ManualBreak::new(["甲"]))];
        let blocks = format_blocks(&cues, &chunks, Some(&breaks)).unwrap();
        assert_eq!(blocks[0], "1\n00:00:01,000 --> 00:00:02,500\n<b>甲</b>");
    }

    #[test]
    fn test_manual_break_with_newlines_keeps_block_intact() {
        let cue = Cue::new(2, "00:00:01,000", "00:00:02,000", vec!["一".into(); 3]);
        let breaks = vec![Some(ManualBreak::new(["a\n\nb", "c"]))];
        let out = format_srt(&[cue], &["x".to_string()], Some(&breaks)).unwrap();
        assert_eq!(out, "2\n00:00:01,000 --> 00:00:02,000\n<b>a\nb\nc</b>\n");
        assert_eq!(parse_srt(&out).unwrap()[0].line_count(), 3);
    }

    #[test]
    fn test_format_keeps_line_count_for_short_chunks() {
        let cue = Cue::new(4, "00:00:01,000", "00:00:02,000", vec!["一".into(); 4]);
        let out = format_srt(&[cue], &["ab".to_string()], None).unwrap();
        assert_eq!(out, "4\n00:00:01,000 --> 00:00:02,000\n<b>a\nb\n \n</b>\n");
        assert_eq!(parse_srt(&out).unwrap()[0].line_count(), 4);
    }

    #[test]
    fn test_format_count_mismatch() {
        let cues = parse_srt(SAMPLE).unwrap();
        let err = format_srt(&cues, &["只有一个".to_string()], None).unwrap_err();
        assert_eq!(err, FormatError::CountMismatch { cues: 2, chunks: 1 });
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_srt(&[], &[], None).unwrap(), "\n");
    }

    #[test]
    fn test_render_cues_round_trip() {
        let cues = parse_srt(SAMPLE).unwrap();
        let rendered = render_cues(&cues);
        assert_eq!(parse_srt(&rendered).unwrap(), cues);
        assert!(rendered.ends_with("玩吧</b>\n"));
    }
}
