//! Mandarin to Cantonese subtitle translation through an LLM provider.
//!
//! The model receives whole SRT documents and must return them with the
//! same blocks, indices and timings. Short documents go out in one
//! request; long ones, or ones whose single-pass result lost cues, are
//! sent in parts and each part is checked for structure.

use std::fs;
use std::path::Path;
use std::time::Duration;

use llm_client::{Config, LlmError, LlmProvider, LlmRequest, LlmResponse, get_provider};
use thiserror::Error;

use crate::config::SubalignConfig;
use crate::srt::{self, ParseError};

/// Program name used to pick the llm-client default preset.
const PROGRAM_NAME: &str = "subalign";

pub const SYSTEM_PROMPT: &str = "You are a professional Cantonese subtitle translator.";

/// Prompt filler used when no example pairs are configured.
const NO_EXAMPLES: &str = "（示例暂缺，但仍需保持字幕格式不变。）";

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("No translation provider available for preset '{preset}': {source}")]
    MissingProvider {
        preset: String,
        #[source]
        source: LlmError,
    },

    #[error("Translation request failed: {0}")]
    Provider(#[from] LlmError),

    #[error("Translation came back empty")]
    EmptyResponse,

    #[error("Translated part {part} has {actual} cues, expected {expected}")]
    StructureMismatch {
        part: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Subtitles to translate are malformed: {0}")]
    Parse(#[from] ParseError),
}

/// Retry behavior for rate limits and overloaded servers.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    /// Cues per part when translating in parts
    pub chunk_size: usize,
    /// Largest document sent in a single request
    pub full_pass_threshold: usize,
    pub temperature: f32,
    pub retry: RetryConfig,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self::from(&SubalignConfig::default())
    }
}

impl From<&SubalignConfig> for TranslatorSettings {
    fn from(config: &SubalignConfig) -> Self {
        Self {
            chunk_size: config.translation_chunk_size.max(1),
            full_pass_threshold: config.full_pass_threshold,
            temperature: config.translation_temperature,
            retry: RetryConfig::default(),
        }
    }
}

pub struct SubtitleTranslator {
    provider: Box<dyn LlmProvider>,
    example_block: Option<String>,
    settings: TranslatorSettings,
}

impl SubtitleTranslator {
    pub fn new(provider: Box<dyn LlmProvider>, settings: TranslatorSettings) -> Self {
        Self {
            provider,
            example_block: None,
            settings,
        }
    }

    /// Prime the prompt with Mandarin/Cantonese example pairs.
    pub fn with_examples(mut self, example_block: Option<String>) -> Self {
        self.example_block = example_block;
        self
    }

    /// Build a translator from the subalign and llm-client configuration.
    pub fn from_config(config: &SubalignConfig) -> Result<Self, TranslationError> {
        let llm_config = Config::load()?;
        let preset_name = config
            .translation_preset
            .clone()
            .unwrap_or_else(|| llm_config.get_default_for_program(PROGRAM_NAME).to_string());

        let provider = llm_config
            .get_preset(&preset_name)
            .and_then(|preset| {
                let provider_config = llm_config.get_provider_config(&preset.provider);
                get_provider(preset, provider_config)
            })
            .map_err(|source| TranslationError::MissingProvider {
                preset: preset_name.clone(),
                source,
            })?;
        log::debug!("Translating with {} (preset {})", provider.name(), preset_name);

        let examples = config
            .example_pair()
            .and_then(|(src, tgt)| load_example_block(&src, &tgt, config.max_examples));

        Ok(Self::new(provider, TranslatorSettings::from(config)).with_examples(examples))
    }

    /// Translate an SRT document, keeping its block structure.
    pub async fn translate(&self, document: &str) -> Result<String, TranslationError> {
        if document.trim().is_empty() {
            return Ok(document.to_string());
        }

        let cues = srt::parse_srt(document)?;

        if cues.len() <= self.settings.full_pass_threshold {
            let translated = self.translate_block(document, "").await?;
            match srt::parse_srt(&translated) {
                Ok(parsed) if parsed.len() == cues.len() => return Ok(translated),
                Ok(parsed) => log::warn!(
                    "Single-pass translation returned {} cues instead of {}; retrying in parts",
                    parsed.len(),
                    cues.len()
                ),
                Err(e) => {
                    log::warn!("Single-pass translation is not valid SRT ({e}); retrying in parts")
                }
            }
        }

        let parts: Vec<_> = cues.chunks(self.settings.chunk_size).collect();
        let total = parts.len();
        let mut translated_parts = Vec::with_capacity(total);

        for (i, part) in parts.iter().enumerate() {
            let part_no = i + 1;
            log::info!("Translating part {}/{} ({} cues)", part_no, total, part.len());

            let note = format!(
                "\n（当前为第 {part_no}/{total} 部分，只需翻译以下条目，勿更改任意编号或时间轴。）"
            );
            let translated = self.translate_block(&srt::render_cues(part), &note).await?;

            let actual = srt::parse_srt(&translated).map(|c| c.len()).unwrap_or(0);
            if actual != part.len() {
                return Err(TranslationError::StructureMismatch {
                    part: part_no,
                    expected: part.len(),
                    actual,
                });
            }
            translated_parts.push(translated.trim().to_string());
        }

        Ok(translated_parts.join("\n\n").trim().to_string() + "\n")
    }

    async fn translate_block(
        &self,
        subtitles: &str,
        note: &str,
    ) -> Result<String, TranslationError> {
        let example_block = self.example_block.as_deref().unwrap_or(NO_EXAMPLES);
        let request = LlmRequest::new(build_prompt(example_block, note, subtitles), SYSTEM_PROMPT)
            .with_temperature(self.settings.temperature);

        let response = self.complete_with_retry(request).await?;
        if let Some(usage) = &response.usage {
            log::debug!(
                "Tokens: {} in, {} out",
                usage.input_tokens,
                usage.output_tokens
            );
        }

        let content = response.content.trim();
        if content.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(content.to_string())
    }

    async fn complete_with_retry(
        &self,
        request: LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let retry = &self.settings.retry;
        let mut attempt = 0;
        let mut delay = retry.initial_delay;

        loop {
            attempt += 1;

            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let wait = match &e {
                        LlmError::RateLimited {
                            retry_after: Some(secs),
                        } => delay.max(Duration::from_secs(*secs)),
                        _ => delay,
                    };
                    log::warn!(
                        "{} request failed (attempt {}/{}): {}; retrying in {:?}",
                        self.provider.name(),
                        attempt,
                        retry.max_attempts,
                        e,
                        wait
                    );

                    tokio::time::sleep(wait).await;
                    delay = Duration::from_secs_f32(
                        (delay.as_secs_f32() * retry.backoff_factor)
                            .min(retry.max_delay.as_secs_f32()),
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn build_prompt(example_block: &str, note: &str, subtitles: &str) -> String {
    format!(
        "你是专业字幕翻译器，任务是把普通话字幕翻译成粤语白话（简体字）。请严格遵守：\n\
         1. 保留原先的序号、时间轴（例如 00:00:22,699 --> 00:00:24,533）、HTML 标签（例如 <b>…</b>）和行结构，只替换文字内容。\n\
         2. 输出必须是口语化的粤语白话（简体写法），例如“我/你/他”可译作“我/你/佢”；保持语气词和口语表达自然顺畅。\n\
         3. 参考以下普通话→粤语示例，这些内容仅供参考，不要在输出中重复示例本身：\n\
         {example_block}\n\
         4. 标点和空白需沿用原文；若原行为空或只有标签，保持原样。\n\
         5. 输出只包含翻译后的字幕内容，不要附加解释或任何额外文字。\n\
         {note}\n\
         \n\
         需要翻译的完整字幕如下：\n\
         {subtitles}\n"
    )
}

/// Numbered Mandarin/Cantonese pairs from the first `max_entries` cues of
/// two parallel SRT files, one cue's lines joined with " / ".
///
/// Returns None if either file is missing or unreadable, or has no cues.
pub fn load_example_block(source: &Path, target: &Path, max_entries: usize) -> Option<String> {
    let read_cues = |path: &Path| {
        let text = fs::read_to_string(path)
            .map_err(|e| log::warn!("Cannot read example file {}: {}", path.display(), e))
            .ok()?;
        srt::parse_srt(&text)
            .map_err(|e| log::warn!("Cannot parse example file {}: {}", path.display(), e))
            .ok()
    };

    let source_cues = read_cues(source)?;
    let target_cues = read_cues(target)?;

    let examples: Vec<String> = source_cues
        .iter()
        .zip(&target_cues)
        .take(max_entries)
        .enumerate()
        .map(|(i, (src, tgt))| {
            format!(
                "{}. 普通话：{}\n   粤语：{}",
                i + 1,
                src.text_lines.join(" / "),
                tgt.text_lines.join(" / ")
            )
        })
        .collect();

    if examples.is_empty() {
        None
    } else {
        Some(examples.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::MockProvider;
    use std::sync::Arc;

    const MARKER: &str = "需要翻译的完整字幕如下：\n";

    const DOC: &str = "1\n00:00:01,000 --> 00:00:02,000\n<b>他来了</b>\n\n\
                       2\n00:00:02,000 --> 00:00:03,000\n<b>他走了</b>\n\n\
                       3\n00:00:03,000 --> 00:00:04,000\n<b>他笑了</b>\n";

    /// Echo the subtitles in the prompt, rewriting 他 as 佢.
    fn cantonese_echo(request: &LlmRequest) -> llm_client::Result<String> {
        let subtitles = request.prompt.split(MARKER).nth(1).unwrap_or_default();
        Ok(subtitles.replace('他', "佢"))
    }

    fn instant_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    fn translator(mock: &Arc<MockProvider>, settings: TranslatorSettings) -> SubtitleTranslator {
        SubtitleTranslator::new(Box::new(Arc::clone(mock)), settings)
    }

    #[tokio::test]
    async fn test_blank_document_skips_provider() {
        let mock = Arc::new(MockProvider::from_fn(cantonese_echo));
        let t = translator(&mock, TranslatorSettings::default());
        assert_eq!(t.translate("  \n").await.unwrap(), "  \n");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_pass() {
        let mock = Arc::new(MockProvider::from_fn(cantonese_echo));
        let t = translator(&mock, TranslatorSettings::default());
        let out = t.translate(DOC).await.unwrap();

        assert_eq!(out, DOC.replace('他', "佢").trim());
        assert_eq!(mock.call_count(), 1);

        let request = &mock.requests()[0];
        assert_eq!(request.system_prompt.as_deref(), Some(SYSTEM_PROMPT));
        assert_eq!(request.temperature, Some(0.2));
        assert!(request.prompt.contains(NO_EXAMPLES));
        assert!(!request.prompt.contains("部分"));
    }

    #[tokio::test]
    async fn test_bad_single_pass_falls_back_to_parts() {
        let mock = Arc::new(MockProvider::from_fn(|req| {
            if req.prompt.contains("部分") {
                cantonese_echo(req)
            } else {
                Ok("1\n00:00:01,000 --> 00:00:02,000\n佢来了\n".to_string())
            }
        }));
        let settings = TranslatorSettings {
            chunk_size: 2,
            ..Default::default()
        };
        let out = translator(&mock, settings).translate(DOC).await.unwrap();

        assert_eq!(mock.call_count(), 3);
        assert_eq!(out, DOC.replace('他', "佢"));
        let prompts: Vec<String> = mock.requests().into_iter().map(|r| r.prompt).collect();
        assert!(prompts[1].contains("第 1/2 部分"));
        assert!(prompts[2].contains("第 2/2 部分"));
    }

    #[tokio::test]
    async fn test_long_document_goes_straight_to_parts() {
        let mock = Arc::new(MockProvider::from_fn(cantonese_echo));
        let settings = TranslatorSettings {
            chunk_size: 1,
            full_pass_threshold: 2,
            ..Default::default()
        };
        let out = translator(&mock, settings).translate(DOC).await.unwrap();

        assert_eq!(mock.call_count(), 3);
        assert!(mock.requests()[0].prompt.contains("第 1/3 部分"));
        assert_eq!(srt::parse_srt(&out).unwrap().len(), 3);
        assert!(out.ends_with("佢笑了</b>\n"));
    }

    #[tokio::test]
    async fn test_part_structure_mismatch() {
        let mock = Arc::new(MockProvider::always_succeeds("不是字幕"));
        let settings = TranslatorSettings {
            chunk_size: 2,
            full_pass_threshold: 0,
            ..Default::default()
        };
        let err = translator(&mock, settings).translate(DOC).await.unwrap_err();
        assert!(matches!(
            err,
            TranslationError::StructureMismatch {
                part: 1,
                expected: 2,
                actual: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_response() {
        let mock = Arc::new(MockProvider::always_succeeds("  \n"));
        let err = translator(&mock, TranslatorSettings::default())
            .translate(DOC)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let mock = Arc::new(MockProvider::scripted(vec![
            Err(LlmError::RateLimited { retry_after: None }),
            Err(LlmError::ServerOverloaded {
                message: "busy".to_string(),
            }),
            Ok(DOC.to_string()),
        ]));
        let settings = TranslatorSettings {
            retry: instant_retry(),
            ..Default::default()
        };
        let out = translator(&mock, settings).translate(DOC).await.unwrap();
        assert_eq!(out, DOC.trim());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_on_permanent_errors() {
        let mock = Arc::new(MockProvider::always_fails(LlmError::ApiError {
            message: "bad request".to_string(),
            status_code: Some(400),
        }));
        let settings = TranslatorSettings {
            retry: instant_retry(),
            ..Default::default()
        };
        let err = translator(&mock, settings).translate(DOC).await.unwrap_err();
        assert!(matches!(err, TranslationError::Provider(LlmError::ApiError { .. })));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_source() {
        let mock = Arc::new(MockProvider::from_fn(cantonese_echo));
        let t = translator(&mock, TranslatorSettings::default());
        let err = t.translate("一\n00:00:01,000 --> 00:00:02,000\n文本\n").await.unwrap_err();
        assert!(matches!(err, TranslationError::Parse(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_examples_in_prompt() {
        let mock = Arc::new(MockProvider::from_fn(cantonese_echo));
        let t = translator(&mock, TranslatorSettings::default())
            .with_examples(Some("1. 普通话：他\n   粤语：佢".to_string()));
        t.translate(DOC).await.unwrap();
        let prompt = &mock.requests()[0].prompt;
        assert!(prompt.contains("1. 普通话：他\n   粤语：佢"));
        assert!(!prompt.contains(NO_EXAMPLES));
    }

    #[test]
    fn test_load_example_block() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.srt");
        let tgt = dir.path().join("tgt.srt");
        fs::write(&src, DOC).unwrap();
        fs::write(
            &tgt,
            "1\n00:00:01,000 --> 00:00:02,000\n佢嚟咗\n第二行\n\n\
             2\n00:00:02,000 --> 00:00:03,000\n佢走咗\n",
        )
        .unwrap();

        let block = load_example_block(&src, &tgt, 3).unwrap();
        assert_eq!(
            block,
            "1. 普通话：<b>他来了</b>\n   粤语：佢嚟咗 / 第二行\n\
             2. 普通话：<b>他走了</b>\n   粤语：佢走咗"
        );
        assert_eq!(load_example_block(&src, &tgt, 1).unwrap().lines().count(), 2);
        assert!(load_example_block(&src, &tgt, 0).is_none());
        assert!(load_example_block(&src, &dir.path().join("missing.srt"), 3).is_none());
    }
}
