use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::io::output::save_text;
use crate::llm::{render_correction_prompt, GenerateOutcome, TextBackend, CORRECTION_PROMPT};

/// Progress sink invoked with whole-percent strings ("0".."100")
pub type ProgressFn = dyn Fn(&str) + Sync;

/// Configuration for chunked correction
#[derive(Debug, Clone)]
pub struct CorrectorConfig {
    /// Words per chunk before adaptive resizing
    pub chunk_words: usize,
    /// Words shared with the previous chunk
    pub overlap_words: usize,
    /// Token budget the rendered prompt must fit
    pub max_prompt_tokens: u32,
    /// Correction prompt, with a {texto} placeholder for the chunk
    pub prompt_template: String,
    /// Generation attempts per chunk before giving up
    pub max_attempts: u32,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            chunk_words: 10_000,
            overlap_words: 20,
            max_prompt_tokens: 8192,
            prompt_template: CORRECTION_PROMPT.to_string(),
            max_attempts: 3,
        }
    }
}

impl CorrectorConfig {
    /// Defaults overridden by CHUNK_WORDS / OVERLAP_WORDS env vars, with
    /// the token budget taken from the backend configuration
    pub fn from_env(max_prompt_tokens: u32) -> Self {
        let mut config = Self {
            max_prompt_tokens,
            ..Self::default()
        };
        if let Some(chunk) = env_usize("CHUNK_WORDS") {
            config.chunk_words = chunk;
        }
        if let Some(overlap) = env_usize("OVERLAP_WORDS") {
            config.overlap_words = overlap;
        }
        config
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Result of correcting one document
#[derive(Debug, Clone)]
pub struct CorrectionReport {
    /// Reassembled corrected text, with a placeholder line per failed chunk
    pub corrected_text: String,
    /// Chunks corrected (or deliberately passed through uncorrected)
    pub succeeded: usize,
    /// 1-based indices of chunks that failed after all retries
    pub failed_chunks: Vec<usize>,
    /// Total chunks the document was split into
    pub total: usize,
}

/// Correction result for a file, including the best-effort save outcome
#[derive(Debug, Clone)]
pub struct CorrectionOutcome {
    pub report: CorrectionReport,
    pub output_path: PathBuf,
    /// Whether the corrected text reached disk; independent of correction
    /// success
    pub saved: bool,
}

/// Split the document into overlapping word windows sized to the token
/// budget. A window that renders over budget halves `chunk_words` (floor,
/// minimum 1) and re-checks; the reduced size stays in effect for later
/// offsets.
async fn plan_chunks<B: TextBackend>(
    backend: &B,
    words: &[&str],
    config: &CorrectorConfig,
) -> Result<Vec<String>> {
    let mut chunk_words = config.chunk_words.max(1);
    let mut chunks = Vec::new();
    let mut offset = 0;

    while offset < words.len() {
        let mut chunk = words[offset..(offset + chunk_words).min(words.len())].join(" ");
        let mut prompt = render_correction_prompt(&config.prompt_template, &chunk);
        let mut tokens = backend.count_tokens(&prompt).await?;

        while tokens > config.max_prompt_tokens && chunk_words > 1 {
            chunk_words = (chunk_words / 2).max(1);
            chunk = words[offset..(offset + chunk_words).min(words.len())].join(" ");
            prompt = render_correction_prompt(&config.prompt_template, &chunk);
            tokens = backend.count_tokens(&prompt).await?;
        }

        chunks.push(chunk);
        offset += chunk_words.saturating_sub(config.overlap_words).max(1);
    }

    Ok(chunks)
}

/// Correct one chunk, recursively splitting at the midpoint word boundary
/// whenever the rendered prompt exceeds the budget or the backend reports a
/// truncated response. Recursion bottoms out at a single word.
async fn correct_segment<B: TextBackend>(
    backend: &B,
    config: &CorrectorConfig,
    chunk: &str,
    level: u32,
) -> Result<String> {
    let prompt = render_correction_prompt(&config.prompt_template, chunk);
    let tokens = backend.count_tokens(&prompt).await?;
    if tokens > config.max_prompt_tokens {
        warn!(
            "segment over token budget ({} > {}), subdividing (level {})",
            tokens, config.max_prompt_tokens, level
        );
        return split_and_recurse(backend, config, chunk, level).await;
    }

    let mut corrected = String::new();
    let mut attempts = 0;
    let mut last_outcome: Option<GenerateOutcome> = None;
    let mut last_error: Option<anyhow::Error> = None;

    while attempts < config.max_attempts && corrected.trim().is_empty() {
        attempts += 1;
        match backend.generate(&prompt).await {
            Ok(outcome) => {
                corrected = outcome.text.clone();
                if corrected.trim().is_empty() {
                    warn!("attempt {} returned no text (level {})", attempts, level);
                }
                last_outcome = Some(outcome);
            }
            Err(error) => {
                warn!(
                    "segment attempt {} failed (level {}): {}",
                    attempts, level, error
                );
                last_error = Some(error);
            }
        }
    }
    debug!("attempts made (level {}): {}", level, attempts);

    if last_outcome.as_ref().is_some_and(|o| o.truncated) {
        warn!("segment output truncated, subdividing (level {})", level);
        if word_count(chunk) <= 1 {
            return Ok(if corrected.trim().is_empty() {
                chunk.to_string()
            } else {
                corrected
            });
        }
        return split_and_recurse(backend, config, chunk, level).await;
    }

    if corrected.trim().is_empty() {
        if let Some(error) = last_error {
            return Err(error);
        }
        if last_outcome.as_ref().is_some_and(|o| o.blocked) {
            warn!("backend blocked the segment (level {})", level);
        } else {
            warn!("backend returned no text for the segment (level {})", level);
        }
        corrected = chunk.to_string();
    }

    Ok(corrected)
}

async fn split_and_recurse<B: TextBackend>(
    backend: &B,
    config: &CorrectorConfig,
    chunk: &str,
    level: u32,
) -> Result<String> {
    let words: Vec<&str> = chunk.split_whitespace().collect();
    if words.len() <= 1 {
        return Ok(chunk.to_string());
    }

    let mid = words.len().div_ceil(2);
    let first = words[..mid].join(" ");
    let second = words[mid..].join(" ");

    let first_corrected = Box::pin(correct_segment(backend, config, &first, level + 1)).await?;
    let second_corrected = Box::pin(correct_segment(backend, config, &second, level + 1)).await?;

    Ok(format!("{} {}", first_corrected, second_corrected)
        .trim()
        .to_string())
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn report_progress(on_progress: Option<&ProgressFn>, percent: usize) {
    if let Some(callback) = on_progress {
        callback(&percent.to_string());
    }
}

/// Correct a whole document chunk by chunk, sequentially.
///
/// Chunks are corrected in order because reassembly trims the leading
/// `overlap_words` words from every chunk after the first (a position-based
/// trim against the previous chunk's tail, not a content search). A chunk
/// that exhausts its retries is replaced by a placeholder naming its
/// 1-based index and the run continues; only chunk-planning failures abort
/// the whole document.
pub async fn correct_document<B: TextBackend>(
    backend: &B,
    document: &str,
    config: &CorrectorConfig,
    on_progress: Option<&ProgressFn>,
) -> Result<CorrectionReport> {
    let words: Vec<&str> = document.split_whitespace().collect();
    let chunks = plan_chunks(backend, &words, config).await?;
    let total = chunks.len();

    info!("correcting {} chunks ({} words)", total, words.len());
    report_progress(on_progress, 0);

    let mut corrected_text = String::new();
    let mut succeeded = 0;
    let mut failed_chunks = Vec::new();

    for (index, chunk) in chunks.iter().enumerate() {
        match correct_segment(backend, config, chunk, 0).await {
            Ok(mut text) => {
                if index > 0 && config.overlap_words > 0 {
                    text = text
                        .split_whitespace()
                        .skip(config.overlap_words)
                        .collect::<Vec<_>>()
                        .join(" ");
                }
                corrected_text.push_str(&text);
                corrected_text.push('\n');
                succeeded += 1;
            }
            Err(error) => {
                warn!("chunk {} failed: {}", index + 1, error);
                corrected_text.push_str(&format!("[SEGMENTO {} NO PROCESADO]\n", index + 1));
                failed_chunks.push(index + 1);
            }
        }
        report_progress(on_progress, (index + 1) * 100 / total.max(1));
    }

    info!(
        "chunks corrected: {}, failed: {}",
        succeeded,
        failed_chunks.len()
    );

    Ok(CorrectionReport {
        corrected_text,
        succeeded,
        failed_chunks,
        total,
    })
}

/// Correct a transcript file and write the result next to where the caller
/// asked. The write is best-effort: a failed save is reported in the
/// outcome, never as an error.
pub async fn correct_file<B: TextBackend>(
    backend: &B,
    input: &Path,
    output: &Path,
    config: &CorrectorConfig,
    on_progress: Option<&ProgressFn>,
) -> Result<CorrectionOutcome> {
    let document = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read transcript: {:?}", input))?;

    let report = correct_document(backend, &document, config, on_progress).await?;
    let saved = save_text(output, &report.corrected_text);

    Ok(CorrectionOutcome {
        report,
        output_path: output.to_path_buf(),
        saved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatSession;
    use std::sync::Mutex;

    /// Scripted backend: echoes prompts back minus the template, with
    /// per-chunk failure hooks
    struct MockBackend {
        /// Token count charged per word of prompt
        tokens_per_word: u32,
        /// Chunks (by contained word) that always error
        poison_word: Option<String>,
        /// Respond with empty text this many times before succeeding
        empty_responses: Mutex<u32>,
        /// Report truncation on the first call for prompts holding this word
        truncate_word: Option<String>,
        truncated_served: Mutex<bool>,
        calls: Mutex<u32>,
    }

    impl MockBackend {
        fn echo() -> Self {
            Self {
                tokens_per_word: 1,
                poison_word: None,
                empty_responses: Mutex::new(0),
                truncate_word: None,
                truncated_served: Mutex::new(false),
                calls: Mutex::new(0),
            }
        }
    }

    impl TextBackend for MockBackend {
        async fn count_tokens(&self, prompt: &str) -> Result<u32> {
            Ok(prompt.split_whitespace().count() as u32 * self.tokens_per_word)
        }

        async fn generate(&self, prompt: &str) -> Result<GenerateOutcome> {
            *self.calls.lock().unwrap() += 1;

            if let Some(poison) = &self.poison_word {
                if prompt.contains(poison.as_str()) {
                    anyhow::bail!("backend rejected the segment");
                }
            }

            {
                let mut remaining = self.empty_responses.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(GenerateOutcome::default());
                }
            }

            if let Some(truncate) = &self.truncate_word {
                let mut served = self.truncated_served.lock().unwrap();
                if !*served && prompt.contains(truncate.as_str()) {
                    *served = true;
                    return Ok(GenerateOutcome {
                        text: "texto a medias".to_string(),
                        truncated: true,
                        blocked: false,
                    });
                }
            }

            Ok(GenerateOutcome {
                text: prompt.to_string(),
                truncated: false,
                blocked: false,
            })
        }

        async fn generate_in_session(
            &self,
            _session: &mut ChatSession,
            message: &str,
        ) -> Result<GenerateOutcome> {
            self.generate(message).await
        }
    }

    // Tests use a bare "{texto}" template so the rendered prompt IS the
    // chunk and the echo backend hands it straight back.
    fn test_config(chunk_words: usize, overlap_words: usize) -> CorrectorConfig {
        CorrectorConfig {
            chunk_words,
            overlap_words,
            max_prompt_tokens: 1_000,
            prompt_template: "{texto}".to_string(),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_noop_correction_drops_only_overlap_words() {
        let backend = MockBackend::echo();
        let config = test_config(4, 1);
        let document = "w1 w2 w3 w4 w5 w6 w7";

        let report = correct_document(&backend, document, &config, None)
            .await
            .unwrap();

        // Windows advance by 3: [w1..w4], [w4..w7], [w7]; each non-first
        // chunk loses its first (overlap) word on reassembly.
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 3);
        assert!(report.failed_chunks.is_empty());
        assert_eq!(report.corrected_text, "w1 w2 w3 w4\nw5 w6 w7\n\n");
    }

    #[tokio::test]
    async fn test_failed_chunk_gets_placeholder_and_run_continues() {
        let backend = MockBackend {
            poison_word: Some("w5".to_string()),
            ..MockBackend::echo()
        };
        let config = test_config(2, 0);
        let document = "w1 w2 w3 w4 w5 w6 w7 w8 w9 w10";

        let report = correct_document(&backend, document, &config, None)
            .await
            .unwrap();

        // Five chunks, only the third ("w5 w6") ever fails
        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed_chunks, vec![3]);
        assert!(report.corrected_text.contains("[SEGMENTO 3 NO PROCESADO]"));
        assert!(report.corrected_text.contains("w1 w2"));
        assert!(report.corrected_text.contains("w9 w10"));
    }

    #[tokio::test]
    async fn test_empty_responses_fall_back_to_original_chunk() {
        let backend = MockBackend {
            empty_responses: Mutex::new(10),
            ..MockBackend::echo()
        };
        let config = test_config(10, 0);

        let report = correct_document(&backend, "texto que no cambia", &config, None)
            .await
            .unwrap();

        // All attempts came back empty with no error: the chunk passes
        // through uncorrected and still counts as a success.
        assert_eq!(report.succeeded, 1);
        assert!(report.failed_chunks.is_empty());
        assert_eq!(report.corrected_text.trim(), "texto que no cambia");
    }

    #[tokio::test]
    async fn test_truncated_response_splits_chunk() {
        let backend = MockBackend {
            truncate_word: Some("w1".to_string()),
            ..MockBackend::echo()
        };
        let config = test_config(6, 0);
        let document = "w1 w2 w3 w4";

        let report = correct_document(&backend, document, &config, None)
            .await
            .unwrap();

        // First call truncates, the halves are corrected independently and
        // joined with a single space.
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.corrected_text.trim(), "w1 w2 w3 w4");
        assert!(*backend.calls.lock().unwrap() >= 3);
    }

    #[tokio::test]
    async fn test_oversized_prompt_is_resized_before_sending() {
        let backend = MockBackend {
            tokens_per_word: 300,
            ..MockBackend::echo()
        };
        // 4-word chunks render to 1200 tokens, over the 1000 budget:
        // sizing halves to 2 words per chunk.
        let config = test_config(4, 0);
        let document = "w1 w2 w3 w4";

        let report = correct_document(&backend, document, &config, None)
            .await
            .unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.corrected_text, "w1 w2\nw3 w4\n");
    }

    #[tokio::test]
    async fn test_progress_reaches_one_hundred() {
        let backend = MockBackend::echo();
        let config = test_config(2, 0);
        let seen: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let callback = |value: &str| {
            seen.lock().unwrap().push(value.to_string());
        };
        correct_document(&backend, "w1 w2 w3 w4", &config, Some(&callback))
            .await
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first().map(String::as_str), Some("0"));
        assert_eq!(seen.last().map(String::as_str), Some("100"));
    }

    #[tokio::test]
    async fn test_correct_file_reports_save_flag() {
        let backend = MockBackend::echo();
        let config = test_config(50, 0);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("acta_transcripcion.txt");
        let output = dir.path().join("acta_corregida.txt");
        std::fs::write(&input, "texto de prueba").unwrap();

        let outcome = correct_file(&backend, &input, &output, &config, None)
            .await
            .unwrap();

        assert!(outcome.saved);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap().trim(),
            "texto de prueba"
        );
    }
}
