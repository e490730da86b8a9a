use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use train_core::Clock;
use train_core::model::{Difficulty, Question, RewardImage, Subject};

use crate::error::GenerationError;

/// Boundary for fresh content: one new question per call, one image per call.
///
/// Implementations must never block past their configured request timeout;
/// callers distinguish rate-limit failures (pause further calls) from
/// transient ones (retryable on the next natural fetch).
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Produce one new question.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the upstream fails; `RateLimited` when
    /// the upstream reports quota exhaustion.
    async fn generate(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        topic_hint: &str,
        ban_list: &[String],
    ) -> Result<Question, GenerationError>;

    /// Produce one detached image for a visual prompt. Best-effort: `None`
    /// on any failure, never an error.
    async fn generate_image(&self, prompt: &str) -> Option<RewardImage>;
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub image_model: String,
}

impl GeneratorConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("TRAIN_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("TRAIN_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("TRAIN_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        let image_model =
            env::var("TRAIN_AI_IMAGE_MODEL").unwrap_or_else(|_| "dall-e-3".into());
        Some(Self {
            base_url,
            api_key,
            model,
            image_model,
        })
    }
}

/// OpenAI-compatible question source over chat completions (JSON mode) and
/// the images endpoint.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    config: GeneratorConfig,
    clock: Clock,
}

impl OpenAiGenerator {
    #[must_use]
    pub fn new(config: GeneratorConfig, clock: Clock) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            clock,
        }
    }

    /// Construct the generator if the API key is present; otherwise `None`
    /// and the session runs cache-only.
    #[must_use]
    pub fn from_env(clock: Clock) -> Option<Self> {
        GeneratorConfig::from_env().map(|config| Self::new(config, clock))
    }

    fn question_prompt(
        subject: Subject,
        difficulty: Difficulty,
        topic_hint: &str,
        ban_list: &[String],
    ) -> String {
        let mut prompt = format!(
            "Write one {subject} quiz question for a young child, difficulty {difficulty} of 5, \
             about {topic_hint}. Respond as a JSON object with fields: prompt (string), \
             options (2-6 short strings), correct_index (number), explanation (one friendly \
             sentence), visual_subject (a short scene to illustrate, or null for abstract \
             questions)."
        );
        if !ban_list.is_empty() {
            prompt.push_str("\nDo not repeat any of these questions:\n");
            for banned in ban_list {
                prompt.push_str("- ");
                prompt.push_str(banned);
                prompt.push('\n');
            }
        }
        prompt
    }
}

#[async_trait]
impl QuestionSource for OpenAiGenerator {
    async fn generate(
        &self,
        subject: Subject,
        difficulty: Difficulty,
        topic_hint: &str,
        ban_list: &[String],
    ) -> Result<Question, GenerationError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You write cheerful, simple quiz questions for children aged 4-8."
                        .into(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::question_prompt(subject, difficulty, topic_hint, ban_list),
                },
            ],
            temperature: 0.8,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::RateLimited(body));
        }
        if !status.is_success() {
            return Err(GenerationError::HttpStatus(status));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        let generated: GeneratedQuestion = serde_json::from_str(content.trim())
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let question = Question::new_choice(
            subject,
            difficulty,
            generated.prompt,
            generated.options,
            generated.correct_index,
            generated.explanation,
            generated.visual_subject,
            self.clock.now(),
        )?;
        Ok(question)
    }

    async fn generate_image(&self, prompt: &str) -> Option<RewardImage> {
        let url = format!(
            "{}/images/generations",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = ImageRequest {
            model: self.config.image_model.clone(),
            prompt: format!("{prompt}, bright friendly cartoon style for young children"),
            n: 1,
            size: "512x512",
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "image generation failed");
            return None;
        }

        let body: ImageResponse = response.json().await.ok()?;
        let b64 = body.data.into_iter().next()?.b64_json?;
        let data = format!("data:image/png;base64,{b64}");
        match RewardImage::new(prompt, data, self.clock.now()) {
            Ok(image) => Some(image),
            Err(err) => {
                debug!(error = %err, "image payload rejected");
                None
            }
        }
    }
}

//
// ─── WIRE PAYLOADS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: String,
    #[serde(default)]
    visual_subject: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u8,
    size: &'static str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_payload_parses_with_and_without_visual_subject() {
        let raw = r#"{
            "prompt": "What is 1 + 1?",
            "options": ["1", "2"],
            "correct_index": 1,
            "explanation": "One and one make two.",
            "visual_subject": "two ducklings on a pond"
        }"#;
        let parsed: GeneratedQuestion = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.correct_index, 1);
        assert!(parsed.visual_subject.is_some());

        let raw = r#"{
            "prompt": "Which word rhymes with cat?",
            "options": ["hat", "dog"],
            "correct_index": 0,
            "explanation": "Cat and hat end with the same sound."
        }"#;
        let parsed: GeneratedQuestion = serde_json::from_str(raw).unwrap();
        assert!(parsed.visual_subject.is_none());
    }

    #[test]
    fn config_prompt_includes_ban_list() {
        let prompt = OpenAiGenerator::question_prompt(
            Subject::Math,
            Difficulty::clamped(1),
            "counting wagons",
            &["What is 2 + 2?".into()],
        );
        assert!(prompt.contains("counting wagons"));
        assert!(prompt.contains("What is 2 + 2?"));
    }
}
