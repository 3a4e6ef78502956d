//! services/api/src/adapters/generator_llm.rs
//!
//! This module contains the adapter for the flashcard-generating LLM.
//! It implements the `FlashcardGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use flashcards_core::{
    domain::{CardPair, GenerationMode},
    ports::{FlashcardGenerationService, ProviderError},
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const SYSTEM_PROMPT: &str = "You are a helpful flashcard generation assistant.";

const TEXT_PROMPT: &str = r#"You are tasked with extracting flashcard content from text.

Text:
{content}

Guidelines:
1. Identify important terms and concepts
2. Extract 3-10 flashcard pairs
3. Keep front concise (1-5 words)
4. Keep back clear and educational (under 50 words)

Respond ONLY with a valid JSON array:
[
  {"front": "term", "back": "definition"}
]
"#;

const TOPIC_PROMPT: &str = r#"Create educational flashcards about: {content}

Guidelines:
1. Each flashcard should have clear term and definition
2. Terms should be specific (1-5 words)
3. Definitions should be clear (under 50 words)
4. Generate exactly 10 flashcards
5. Focus on most important concepts

Respond ONLY with a valid JSON array:
[
  {"front": "term", "back": "definition"}
]
"#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `FlashcardGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiFlashcardAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiFlashcardAdapter {
    /// Creates a new `OpenAiFlashcardAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    fn prompt(mode: GenerationMode, content: &str) -> String {
        let template = match mode {
            GenerationMode::Text => TEXT_PROMPT,
            GenerationMode::Topic => TOPIC_PROMPT,
        };
        template.replace("{content}", content)
    }
}

//=========================================================================================
// `FlashcardGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl FlashcardGenerationService for OpenAiFlashcardAdapter {
    async fn generate(
        &self,
        mode: GenerationMode,
        content: &str,
    ) -> Result<Vec<CardPair>, ProviderError> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(request_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(Self::prompt(mode, content))
                .build()
                .map_err(request_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.7)
            .max_tokens(1000u32)
            .n(1)
            .build()
            .map_err(request_error)?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                error!(timeout = ?self.timeout, "Flashcard generation call timed out");
                ProviderError::TimedOut(self.timeout)
            })?
            .map_err(|e: OpenAIError| {
                error!("Flashcard generation call failed: {}", e);
                ProviderError::Transport(e.to_string())
            })?;

        let raw = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::Malformed("response contained no text content".to_string())
            })?;

        debug!(chars = raw.len(), "Received flashcard payload");
        parse_card_pairs(&raw)
    }
}

fn request_error(e: OpenAIError) -> ProviderError {
    ProviderError::Transport(format!("could not build request: {}", e))
}

//=========================================================================================
// Output parsing
//=========================================================================================

/// Parses the model's structured-text answer into an ordered list of pairs.
///
/// Surrounding Markdown code fences are tolerated. The payload must be a JSON
/// array; an element without string `front`/`back` fields becomes a pair with
/// empty sides so downstream validation can drop it.
pub fn parse_card_pairs(raw: &str) -> Result<Vec<CardPair>, ProviderError> {
    let payload = strip_code_fence(raw.trim());
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ProviderError::Malformed(format!("not valid JSON: {}", e)))?;

    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::Malformed("expected a JSON array".to_string()))?;

    Ok(items
        .iter()
        .map(|item| {
            let side = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            CardPair::new(side("front"), side("back"))
        })
        .collect())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
