use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use crate::config::SummarizerConfig;
use crate::llm::{ChatMessage, LlmClient};

/// Something that can shorten a game description into a short blurb
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Short name for log lines
    fn name(&self) -> &str;

    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Keep the first two sentences of `text`.
///
/// Splits on '.', drops blank pieces, joins the first two with ". " and
/// ends with a period. Blank input gives an empty string.
pub fn first_sentences(text: &str) -> String {
    let flattened = text.replace('\n', " ");
    let sentences: Vec<&str> = flattened
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(2)
        .collect();
    if sentences.is_empty() {
        return String::new();
    }
    format!("{}.", sentences.join(". "))
}

/// Deterministic local summarizer
pub struct LocalSummarizer;

#[async_trait]
impl Summarizer for LocalSummarizer {
    fn name(&self) -> &str {
        "local"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(first_sentences(text))
    }
}

/// Summarizer backed by a chat completions API
pub struct LlmSummarizer {
    llm: LlmClient,
    system_prompt: String,
}

impl LlmSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        let system_prompt = config.system_prompt.clone();
        Ok(Self {
            llm: LlmClient::new(config)?,
            system_prompt,
        })
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    fn name(&self) -> &str {
        self.llm.model()
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(format!(
                "Summarize this game description in two sentences: {}",
                text
            )),
        ];
        self.llm.chat(&messages).await
    }
}

/// Runs the configured summarizer and falls back to the local first
/// sentences on any failure. Never fails.
pub struct SummaryService {
    primary: Box<dyn Summarizer>,
}

impl SummaryService {
    pub fn new(primary: Box<dyn Summarizer>) -> Self {
        Self { primary }
    }

    pub fn local_only() -> Self {
        Self::new(Box::new(LocalSummarizer))
    }

    /// Pick the implementation from configuration
    pub fn from_config(config: &SummarizerConfig) -> Result<Self> {
        if !config.is_enabled() {
            info!("Summarizer: no API key configured, using local first-sentences summary");
            return Ok(Self::local_only());
        }
        let remote = LlmSummarizer::new(config.clone())?;
        info!(
            "Summarizer: {} model={} url={}",
            config.provider,
            remote.name(),
            config.effective_base_url()
        );
        Ok(Self::new(Box::new(remote)))
    }

    pub fn name(&self) -> &str {
        self.primary.name()
    }

    pub async fn summarize(&self, text: &str) -> String {
        match self.primary.summarize(text).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Summarizer '{}' failed: {:#}", self.primary.name(), e);
                first_sentences(text)
            }
        }
    }
}
