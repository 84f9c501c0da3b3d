//! Subtitle correction against a reference transcript.
//!
//! Machine-generated SRT cues are matched one by one against a flattened
//! reference script; the best-matching span replaces each cue's text while
//! its index, timing and line count are kept.
//!
//! ```no_run
//! use subalign::align::{AlignOptions, correct_document};
//!
//! let srt = std::fs::read_to_string("episode.srt")?;
//! let script = std::fs::read_to_string("episode.md")?;
//! let corrected = correct_document(&srt, &script, AlignOptions::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod align;
pub mod bench;
pub mod config;
pub mod review;
pub mod srt;
pub mod text;
pub mod translate;

pub use align::{AlignOptions, AlignReport, align_cues, correct_document};
pub use config::SubalignConfig;
pub use srt::{Cue, FormatError, ParseError, format_srt, parse_srt};
pub use text::{ManualBreak, normalize_script, wrap_chunk};
pub use translate::{SubtitleTranslator, TranslationError};
