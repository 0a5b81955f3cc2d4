use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Per-call ceiling; an expired call surfaces as a failed attempt and
/// consumes one retry slot
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Configuration for the Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key (from GEMINI_API_KEY env var)
    pub api_key: String,
    /// Model to use (e.g., "gemini-2.5-flash")
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Top-k sampling cutoff
    pub top_k: u32,
    /// Top-p sampling cutoff
    pub top_p: f64,
    /// Maximum tokens in response, also the budget a rendered prompt must fit
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .context("GEMINI_API_KEY environment variable not set")?;

        let model =
            std::env::var("MODELO_GEMINI").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let temperature = std::env::var("TEMPERATURA")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.3);
        let max_output_tokens = std::env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8192);

        Ok(Self {
            api_key,
            model,
            temperature,
            top_k: 20,
            top_p: 0.8,
            max_output_tokens,
        })
    }

    /// Create with custom settings
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.3,
            top_k: 20,
            top_p: 0.8,
            max_output_tokens: 8192,
        }
    }
}

/// Outcome of one generation call
#[derive(Debug, Clone, Default)]
pub struct GenerateOutcome {
    /// Generated text, possibly empty
    pub text: String,
    /// Output was cut off by the token limit
    pub truncated: bool,
    /// The prompt was rejected by the backend's safety layer
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

/// One prior exchange in a stateful conversation
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Conversation history threaded through sequential generation calls
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            text: text.into(),
        });
    }
}

/// Capability contract for the external text backend: token counting plus
/// stateless and session-scoped generation. Pipeline stages are generic
/// over this so tests can substitute a scripted backend.
pub trait TextBackend {
    fn count_tokens(&self, prompt: &str) -> impl Future<Output = Result<u32>>;

    fn generate(&self, prompt: &str) -> impl Future<Output = Result<GenerateOutcome>>;

    fn generate_in_session(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> impl Future<Output = Result<GenerateOutcome>>;
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Token budget a rendered prompt has to fit
    pub fn max_output_tokens(&self) -> u32 {
        self.config.max_output_tokens
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/models/{}:{}", BASE_URL, self.config.model, method);

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[("key", self.config.api_key.as_str())])
            .json(request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse Gemini API response")
    }

    async fn send_contents(&self, contents: Vec<Content>) -> Result<GenerateOutcome> {
        let request = GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response: GenerateContentResponse = self.post("generateContent", &request).await?;

        let text = response
            .candidates
            .first()
            .map(Candidate::text)
            .unwrap_or_default();
        let truncated = response
            .candidates
            .first()
            .is_some_and(|c| c.finish_reason.as_deref() == Some("MAX_TOKENS"));
        let blocked = response
            .prompt_feedback
            .as_ref()
            .is_some_and(|f| f.block_reason.is_some());

        Ok(GenerateOutcome {
            text,
            truncated,
            blocked,
        })
    }
}

impl TextBackend for GeminiClient {
    async fn count_tokens(&self, prompt: &str) -> Result<u32> {
        let request = CountTokensRequest {
            contents: vec![Content::user(prompt)],
        };
        let response: CountTokensResponse = self.post("countTokens", &request).await?;
        Ok(response.total_tokens)
    }

    async fn generate(&self, prompt: &str) -> Result<GenerateOutcome> {
        self.send_contents(vec![Content::user(prompt)]).await
    }

    async fn generate_in_session(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<GenerateOutcome> {
        session.push(ChatRole::User, message);

        let contents = session
            .turns
            .iter()
            .map(|turn| Content {
                role: match turn.role {
                    ChatRole::User => "user".to_string(),
                    ChatRole::Model => "model".to_string(),
                },
                parts: vec![Part {
                    text: turn.text.clone(),
                }],
            })
            .collect();

        let outcome = self.send_contents(contents).await?;
        session.push(ChatRole::Model, outcome.text.clone());
        Ok(outcome)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CountTokensResponse {
    #[serde(rename = "totalTokens")]
    total_tokens: u32,
}
