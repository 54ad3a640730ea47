use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{EnhancerConfig, GenerationConfig};
use crate::generation::{GenerationError, GenerationErrorKind, RetryPolicy, TextGenerator};

#[derive(Clone)]
pub struct GenerationClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    timeout: Duration,
    parameters: GenerationParameters,
    retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl From<&GenerationConfig> for GenerationParameters {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

impl GenerationClient {
    pub fn from_config(config: &EnhancerConfig) -> Self {
        Self::new(
            config.generation.api_base.clone(),
            config.generation.model.clone(),
            config.generation.api_key(),
            Duration::from_millis(config.generation.timeout_ms),
            GenerationParameters::from(&config.generation),
            RetryPolicy::from_config(&config.retry),
        )
    }

    pub fn new(
        api_base: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
        parameters: GenerationParameters,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_base,
            model,
            timeout,
            parameters,
            retry,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn attempt(&self, api_key: &str, instruction: &str) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, self.call(api_key, instruction)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::new(
                GenerationErrorKind::Timeout,
                format!("generation timed out after {:?}", self.timeout),
            )),
        }
    }

    async fn call(&self, api_key: &str, instruction: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base.trim_end_matches('/'),
            self.model,
            urlencoding::encode(api_key)
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: instruction.to_string(),
                }],
            }],
            generation_config: self.parameters,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                let kind = if err.is_timeout() {
                    GenerationErrorKind::Timeout
                } else {
                    GenerationErrorKind::Network
                };
                GenerationError::new(kind, format!("generation request failed: {}", err))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status.as_u16(), &error_body));
        }

        let body: GenerateResponse = response.json().await.map_err(|err| {
            GenerationError::new(
                GenerationErrorKind::Unknown,
                format!("generation response parse failed: {}", err),
            )
        })?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::new(
                GenerationErrorKind::NoContent,
                "generation response had no text",
            ));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(&self, instruction: &str, platform_label: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::Auth, "generation credential is not set")
        })?;

        let mut attempt = 1u32;
        loop {
            debug!(platform = platform_label, attempt, "calling generation backend");
            match self.attempt(api_key, instruction).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if !self.retry.should_retry(err.kind, attempt) {
                        warn!(
                            platform = platform_label,
                            attempt,
                            kind = err.kind.code(),
                            "generation failed: {}",
                            err.message
                        );
                        return Err(err);
                    }
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        platform = platform_label,
                        attempt,
                        kind = err.kind.code(),
                        delay_ms = delay.as_millis() as u64,
                        "generation attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationParameters,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
