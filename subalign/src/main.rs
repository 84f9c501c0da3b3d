//! subalign - Correct machine-generated subtitles against a reference script

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use subalign::align::{self, AlignOptions};
use subalign::bench::{self, ReportBands};
use subalign::review;
use subalign::srt;
use subalign::{SubalignConfig, SubtitleTranslator, normalize_script};

#[derive(Parser, Debug)]
#[command(name = "subalign")]
#[command(about = "Correct machine-generated subtitles against a reference script", long_about = None)]
#[command(version)]
struct Args {
    /// Enable debug output
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    /// Hide progress bars
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Correct an SRT file using a reference script
    Align {
        /// Subtitles to correct
        #[arg(long)]
        srt: PathBuf,

        /// Reference script (markdown or plain text)
        #[arg(long)]
        script: PathBuf,

        /// Corrected SRT output path
        #[arg(short, long)]
        out: PathBuf,

        /// Translate the subtitles to Cantonese before aligning
        #[arg(long)]
        translate: bool,

        /// Also write an editable review file (JSON)
        #[arg(long)]
        review: Option<PathBuf>,

        /// Align cues one at a time instead of in parallel
        #[arg(long)]
        sequential: bool,
    },
    /// Render an edited review file as SRT
    Apply {
        /// Review file written by `align --review`
        #[arg(long)]
        review: PathBuf,

        /// SRT output path
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Translate Mandarin subtitles to Cantonese
    Translate {
        #[arg(long)]
        srt: PathBuf,

        #[arg(short, long)]
        out: PathBuf,
    },
    /// Score alignment against ground truth subtitles
    Bench {
        /// Directory containing scripts/, input_subtitles/ and groundtruth/
        #[arg(long, default_value = "baseline")]
        baseline_dir: PathBuf,

        /// Translate input subtitles before aligning
        #[arg(long)]
        translate: bool,

        /// Print every cue below this score (with --report)
        #[arg(long, default_value_t = 0.5)]
        low_threshold: f64,

        /// Lower bound (inclusive) of the nearly-right band (with --report)
        #[arg(long, default_value_t = 0.7)]
        mid_min: f64,

        /// Upper bound (exclusive) of the nearly-right band (with --report)
        #[arg(long, default_value_t = 0.95)]
        mid_max: f64,

        /// Print per-cue details for low and nearly-right cues
        #[arg(long)]
        report: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set the llm-client preset used for translation
    SetPreset {
        /// Preset name from llm.toml
        name: String,
    },
    /// Set the Mandarin/Cantonese example pair used to prime translation
    SetExamples {
        /// Mandarin SRT
        source: PathBuf,
        /// Cantonese SRT with the same cues
        target: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    match args.command {
        Commands::Align {
            srt,
            script,
            out,
            translate,
            review,
            sequential,
        } => {
            run_align(
                &srt,
                &script,
                &out,
                translate,
                review.as_deref(),
                sequential,
                args.quiet,
            )
            .await
        }
        Commands::Apply { review, out } => run_apply(&review, &out),
        Commands::Translate { srt, out } => run_translate(&srt, &out).await,
        Commands::Bench {
            baseline_dir,
            translate,
            low_threshold,
            mid_min,
            mid_max,
            report,
        } => {
            let bands = ReportBands {
                low: low_threshold,
                mid_min,
                mid_max,
            };
            run_bench(&baseline_dir, translate, report.then_some(bands), args.quiet).await
        }
        Commands::Config { action } => handle_config_command(&action),
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn progress_bar(len: usize, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

async fn translate_document(config: &SubalignConfig, document: &str) -> Result<String> {
    let translator =
        SubtitleTranslator::from_config(config).context("Failed to set up translation")?;
    let translated = translator
        .translate(document)
        .await
        .context("Subtitle translation failed")?;
    Ok(translated)
}

async fn run_align(
    srt_path: &Path,
    script_path: &Path,
    out: &Path,
    translate: bool,
    review_path: Option<&Path>,
    sequential: bool,
    quiet: bool,
) -> Result<()> {
    let config = SubalignConfig::load()?;

    let mut document = read_text(srt_path)?;
    if translate {
        document = translate_document(&config, &document).await?;
    }
    let reference = read_text(script_path)?;

    let cues = srt::parse_srt(&document)
        .with_context(|| format!("Invalid subtitles in {}", srt_path.display()))?;
    let corpus = normalize_script(&reference);
    log::debug!("Reference corpus: {} characters", corpus.chars().count());

    let options = AlignOptions {
        parallel: config.parallel && !sequential,
        low_score_threshold: config.low_score_threshold,
    };

    let pb = progress_bar(cues.len(), quiet)?;
    pb.set_message("aligning");
    let reports = align::align_reports(&cues, &corpus, options, || pb.inc(1));
    pb.finish_and_clear();

    let chunks: Vec<String> = reports.iter().map(|r| r.chunk.clone()).collect();
    let corrected = srt::format_srt(&cues, &chunks, None)?;
    write_text(out, &corrected)?;
    println!("Wrote corrected subtitles to {}", out.display());

    if let Some(path) = review_path {
        let entries = review::build_review(&cues, &chunks)?;
        review::save_review(path, &entries)?;
        println!("Wrote review file to {}", path.display());
    }

    let weak = reports
        .iter()
        .filter(|r| r.score < options.low_score_threshold)
        .count();
    if weak > 0 {
        println!(
            "{} of {} cues matched weakly (score < {})",
            weak,
            reports.len(),
            options.low_score_threshold
        );
    }
    Ok(())
}

fn run_apply(review_path: &Path, out: &Path) -> Result<()> {
    let entries = review::load_review(review_path)?;
    let corrected = review::apply_review(&entries)?;
    write_text(out, &corrected)?;
    println!("Wrote {} cues to {}", entries.len(), out.display());
    Ok(())
}

async fn run_translate(srt_path: &Path, out: &Path) -> Result<()> {
    let config = SubalignConfig::load()?;
    let document = read_text(srt_path)?;
    let translated = translate_document(&config, &document).await?;
    write_text(out, &translated)?;
    println!("Wrote translated subtitles to {}", out.display());
    Ok(())
}

async fn run_bench(
    baseline_dir: &Path,
    translate: bool,
    bands: Option<ReportBands>,
    quiet: bool,
) -> Result<()> {
    let config = SubalignConfig::load()?;
    let samples = bench::discover_samples(baseline_dir)?;
    let translator = if translate {
        Some(SubtitleTranslator::from_config(&config).context("Failed to set up translation")?)
    } else {
        None
    };
    let options = AlignOptions {
        parallel: config.parallel,
        low_score_threshold: config.low_score_threshold,
    };

    let pb = progress_bar(samples.len(), quiet || bands.is_some())?;
    let mut ratios = Vec::new();

    for sample in &samples {
        pb.set_message(sample.name.clone());
        let mut data = sample.load()?;
        if let Some(translator) = &translator {
            data.input = translator
                .translate(&data.input)
                .await
                .with_context(|| format!("{}: subtitle translation failed", sample.name))?;
        }

        let report = bench::score_sample(&sample.name, &data, options)?;
        if let Some(bands) = bands {
            print!("{}", bench::low_score_report(&report, bands));
        }
        ratios.extend(report.ratios());
        pb.inc(1);
    }
    pb.finish_and_clear();

    let Some(summary) = bench::summarize(&ratios) else {
        bail!("No cues to score in {}", baseline_dir.display());
    };
    let label = if translate { "translated" } else { "aligned" };
    println!();
    print!("{}", bench::format_summary(&[(label, summary)]));
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = SubalignConfig::load()?;
            println!("Configuration file: {:?}", SubalignConfig::config_path()?);
            println!();
            match &config.translation_preset {
                Some(preset) => println!("translation_preset = \"{}\"", preset),
                None => println!("translation_preset = (llm-client default)"),
            }
            println!("translation_chunk_size = {}", config.translation_chunk_size);
            println!("full_pass_threshold = {}", config.full_pass_threshold);
            println!("translation_temperature = {}", config.translation_temperature);
            match config.example_pair() {
                Some((src, tgt)) => {
                    println!("example_source = \"{}\"", src.display());
                    println!("example_target = \"{}\"", tgt.display());
                }
                None => println!("examples = (none)"),
            }
            println!("max_examples = {}", config.max_examples);
            println!("parallel = {}", config.parallel);
            println!("low_score_threshold = {}", config.low_score_threshold);
        }
        ConfigAction::SetPreset { name } => {
            let llm_config = llm_client::Config::load()?;
            llm_config
                .get_preset(name)
                .with_context(|| format!("Unknown preset: {}", name))?;

            let mut config = SubalignConfig::load()?;
            config.translation_preset = Some(name.clone());
            config.save()?;
            println!("Translation preset set to: {}", name);
        }
        ConfigAction::SetExamples { source, target } => {
            for path in [source, target] {
                if !path.exists() {
                    bail!("Example file not found: {}", path.display());
                }
            }
            let mut config = SubalignConfig::load()?;
            config.example_source = Some(source.clone());
            config.example_target = Some(target.clone());
            config.save()?;
            println!(
                "Translation examples set to: {} / {}",
                source.display(),
                target.display()
            );
        }
    }
    Ok(())
}
