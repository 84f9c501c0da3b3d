//! Alignment quality against hand-corrected ground truth.
//!
//! A dataset directory holds `scripts/`, `input_subtitles/` and
//! `groundtruth/`. Each script is paired with an input SRT and a ground
//! truth SRT by file name; every cue is aligned and its wrapped output
//! compared to the ground truth cue.

use anyhow::{Context, Result, bail};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::align::{self, AlignOptions, similarity};
use crate::srt::{self, Cue};
use crate::text::{self, normalize_script, wrap_chunk};

/// Name suffixes ignored when pairing files.
const NAME_SUFFIXES: [&str; 4] = ["_script", "_input", "_gt", "_groundtruth"];

/// Corpus characters shown on each side of a chunk in reports.
const CONTEXT_WINDOW: usize = 40;

/// One script with its input and ground truth subtitles.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub script_path: PathBuf,
    pub input_path: PathBuf,
    pub groundtruth_path: PathBuf,
}

/// File contents of a sample.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub script: String,
    pub input: String,
    pub groundtruth: String,
}

impl Sample {
    pub fn load(&self) -> Result<SampleData> {
        let read = |path: &Path| {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        };
        Ok(SampleData {
            script: read(&self.script_path)?,
            input: read(&self.input_path)?,
            groundtruth: read(&self.groundtruth_path)?,
        })
    }
}

/// Score of one aligned cue.
#[derive(Debug, Clone)]
pub struct CueScore {
    pub cue: Cue,
    pub groundtruth: Cue,
    pub chunk: String,
    pub wrapped: Vec<String>,
    pub ratio: f64,
}

#[derive(Debug, Clone)]
pub struct SampleReport {
    pub name: String,
    /// Reference text as read, for context snippets
    pub script: String,
    pub scores: Vec<CueScore>,
}

impl SampleReport {
    pub fn ratios(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().map(|s| s.ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
}

/// Find every complete sample under `base_dir`, in script name order.
pub fn discover_samples(base_dir: &Path) -> Result<Vec<Sample>> {
    let scripts_dir = base_dir.join("scripts");
    let mut input_dir = base_dir.join("input_subtitles");
    if !input_dir.exists() {
        input_dir = base_dir.join("input_subtiles");
    }
    let gt_dir = base_dir.join("groundtruth");

    if !scripts_dir.is_dir() || !input_dir.is_dir() || !gt_dir.is_dir() {
        bail!(
            "{} must contain scripts/, input_subtitles/ (or input_subtiles/) and groundtruth/",
            base_dir.display()
        );
    }

    let mut script_files: Vec<PathBuf> = fs::read_dir(&scripts_dir)
        .with_context(|| format!("Failed to list {}", scripts_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    script_files.sort();

    let mut samples = Vec::new();
    for script_path in script_files {
        let Some(stem) = script_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let base = base_name(stem);

        let input = first_existing(
            &input_dir,
            &[
                format!("{base}.srt"),
                format!("{base}_input.srt"),
                format!("{stem}.srt"),
            ],
        );
        let groundtruth = first_existing(
            &gt_dir,
            &[
                format!("{base}.srt"),
                format!("{base}_gt.srt"),
                format!("{base}_groundtruth.srt"),
                format!("{stem}.srt"),
            ],
        );

        match (input, groundtruth) {
            (Some(input_path), Some(groundtruth_path)) => samples.push(Sample {
                name: base.to_string(),
                script_path: script_path.clone(),
                input_path,
                groundtruth_path,
            }),
            _ => log::debug!("Skipping {}: no matching subtitles", script_path.display()),
        }
    }

    if samples.is_empty() {
        bail!("No script/subtitle pairs found in {}", base_dir.display());
    }
    Ok(samples)
}

fn base_name(stem: &str) -> &str {
    NAME_SUFFIXES
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .unwrap_or(stem)
}

fn first_existing(dir: &Path, names: &[String]) -> Option<PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|path| path.exists())
}

/// Align a sample's input subtitles and score every cue against the
/// ground truth. `data.input` may already have been translated.
pub fn score_sample(name: &str, data: &SampleData, options: AlignOptions) -> Result<SampleReport> {
    let cues = srt::parse_srt(&data.input).with_context(|| format!("{name}: invalid input SRT"))?;
    let groundtruth = srt::parse_srt(&data.groundtruth)
        .with_context(|| format!("{name}: invalid ground truth SRT"))?;
    if cues.len() != groundtruth.len() {
        bail!(
            "{name}: input has {} cues but ground truth has {}",
            cues.len(),
            groundtruth.len()
        );
    }

    let corpus = normalize_script(&data.script);
    let chunks = align::align_cues(&cues, &corpus, options);

    let scores = cues
        .into_iter()
        .zip(groundtruth)
        .zip(chunks)
        .map(|((cue, groundtruth), chunk)| {
            let wrapped = wrap_chunk(&chunk, cue.line_count(), None);
            let predicted = text::plain_text(&wrapped.join(" "));
            let expected = text::plain_text(&groundtruth.text_lines.join(" "));
            CueScore {
                ratio: similarity(&predicted, &expected),
                cue,
                groundtruth,
                chunk,
                wrapped,
            }
        })
        .collect();

    Ok(SampleReport {
        name: name.to_string(),
        script: data.script.clone(),
        scores,
    })
}

/// Mean, median, max and min of `scores`; None when empty.
pub fn summarize(scores: &[f64]) -> Option<Summary> {
    if scores.is_empty() {
        return None;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    Some(Summary {
        count: n,
        mean: sorted.iter().sum::<f64>() / n as f64,
        median,
        max: sorted[n - 1],
        min: sorted[0],
    })
}

/// Summary table, one row per labelled score set.
pub fn format_summary(rows: &[(&str, Summary)]) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Benchmark results (against ground truth)");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<14} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "run", "cues", "mean", "median", "max", "min"
    );
    let _ = writeln!(out, "{}", "-".repeat(60));
    for (label, s) in rows {
        let _ = writeln!(
            out,
            "{:<14} {:>8} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
            label, s.count, s.mean, s.median, s.max, s.min
        );
    }
    out
}

/// Score bands listed by [`low_score_report`].
#[derive(Debug, Clone, Copy)]
pub struct ReportBands {
    /// Cues under this are listed as low
    pub low: f64,
    /// Inclusive lower bound of the "nearly right" band
    pub mid_min: f64,
    /// Exclusive upper bound of the "nearly right" band
    pub mid_max: f64,
}

impl Default for ReportBands {
    fn default() -> Self {
        Self {
            low: 0.5,
            mid_min: 0.7,
            mid_max: 0.95,
        }
    }
}

/// Detailed listing of low-scoring and nearly-right cues of one sample.
pub fn low_score_report(report: &SampleReport, bands: ReportBands) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\nSample: {}\n{rule}", report.name);

    let low: Vec<&CueScore> = report.scores.iter().filter(|s| s.ratio < bands.low).collect();
    let mid: Vec<&CueScore> = report
        .scores
        .iter()
        .filter(|s| s.ratio >= bands.low && s.ratio >= bands.mid_min && s.ratio < bands.mid_max)
        .collect();

    for score in &low {
        write_entry(&mut out, score, &report.script, "low");
    }
    if !mid.is_empty() {
        let _ = writeln!(out, "\n--- Nearly right ---");
        for score in &mid {
            write_entry(&mut out, score, &report.script, "mid");
        }
    }
    if low.is_empty() {
        let _ = writeln!(out, "No cues below {:.2}.", bands.low);
    }
    out
}

fn write_entry(out: &mut String, score: &CueScore, script: &str, label: &str) {
    let cue = &score.cue;
    let output = score.wrapped.join(" ");
    let _ = writeln!(out, "\n[{label}] cue #{} | similarity {:.3}", cue.index, score.ratio);
    let _ = writeln!(out, "time:         {} --> {}", cue.start, cue.end);
    let _ = writeln!(out, "subtitle:     {}", cue.plain_text());
    let _ = writeln!(out, "ground truth: {}", score.groundtruth.text_lines.join(" "));
    let _ = writeln!(
        out,
        "output:       {}",
        if output.is_empty() { "(empty)" } else { &output }
    );
    if let Some(context) = extract_context(script, &score.chunk, CONTEXT_WINDOW) {
        let _ = writeln!(out, "script:       …{context}…");
    }
}

/// The chunk with up to `window` characters of surrounding reference
/// text, or the chunk's first `window` characters if it is not found.
fn extract_context(script: &str, chunk: &str, window: usize) -> Option<String> {
    let chunk = chunk.trim();
    if chunk.is_empty() {
        return None;
    }

    let Some(byte_pos) = script.find(chunk) else {
        return Some(chunk.chars().take(window).collect());
    };
    let pos = script[..byte_pos].chars().count();
    let chars: Vec<char> = script.chars().collect();
    let start = pos.saturating_sub(window);
    let end = (pos + chunk.chars().count() + window).min(chars.len());

    Some(
        chars[start..end]
            .iter()
            .map(|&c| if c == '\n' { ' ' } else { c })
            .collect(),
    )
}
