//! Editable review file: one JSON entry per cue with the aligned text,
//! which can be hand-corrected and rendered back to SRT.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::srt::{self, Cue, FormatError};
use crate::text::ManualBreak;

/// One cue as presented for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub index: u64,
    pub start: String,
    pub end: String,
    pub line_count: usize,
    /// Lines as they appeared in the input subtitles
    pub text_lines: Vec<String>,
    /// `text_lines` joined with newlines
    pub original_text: String,
    /// Text the aligner picked from the reference
    pub script_chunk: String,
    /// Text to emit; starts as `script_chunk` and is what reviewers edit.
    /// Newlines in it fix the line breaks when the line count matches.
    pub corrected_text: String,
}

impl ReviewEntry {
    fn cue(&self) -> Cue {
        Cue::new(self.index, &self.start, &self.end, self.text_lines.clone())
    }

    /// Line override from the corrected text, if it has exactly as many
    /// non-blank lines as the cue.
    fn manual_break(&self) -> Option<ManualBreak> {
        let manual = ManualBreak::from_text(self.corrected_text.trim());
        manual.fits(self.line_count).then_some(manual)
    }
}

/// Pair cues with their aligned chunks for review.
pub fn build_review(cues: &[Cue], chunks: &[String]) -> Result<Vec<ReviewEntry>, FormatError> {
    if cues.len() != chunks.len() {
        return Err(FormatError::CountMismatch {
            cues: cues.len(),
            chunks: chunks.len(),
        });
    }

    Ok(cues
        .iter()
        .zip(chunks)
        .map(|(cue, chunk)| ReviewEntry {
            index: cue.index,
            start: cue.start.clone(),
            end: cue.end.clone(),
            line_count: cue.line_count(),
            text_lines: cue.text_lines.clone(),
            original_text: cue.text_lines.join("\n"),
            script_chunk: chunk.clone(),
            corrected_text: chunk.clone(),
        })
        .collect())
}

/// Render reviewed entries as an SRT document.
pub fn apply_review(entries: &[ReviewEntry]) -> Result<String, FormatError> {
    let cues: Vec<Cue> = entries.iter().map(ReviewEntry::cue).collect();
    let chunks: Vec<String> = entries
        .iter()
        .map(|e| e.corrected_text.trim().to_string())
        .collect();
    let manual_breaks: Vec<Option<ManualBreak>> =
        entries.iter().map(ReviewEntry::manual_break).collect();

    let overrides = manual_breaks.iter().filter(|m| m.is_some()).count();
    log::debug!("Applying review of {} cues ({} with manual line breaks)", entries.len(), overrides);

    srt::format_srt(&cues, &chunks, Some(&manual_breaks))
}

/// Write review entries as pretty JSON.
pub fn save_review(path: &Path, entries: &[ReviewEntry]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create review file {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, entries).context("Failed to write review JSON")?;
    Ok(())
}

pub fn load_review(path: &Path) -> Result<Vec<ReviewEntry>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open review file {}", path.display()))?;
    let entries = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid review file {}", path.display()))?;
    Ok(entries)
}
