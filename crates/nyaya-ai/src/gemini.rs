//! Gemini REST client implementing [`Generator`].

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::generator::{GenerationParams, Generator, MediaInput};
use crate::tokens::{TokenEstimator, approx_token_count};

/// Prefix put in front of every text prompt.
pub const SYSTEM_PREAMBLE: &str = "System: You are an expert legal summarizer.\n\nUser: ";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the `generateContent` and `countTokens` endpoints.
pub struct GeminiClient {
    client: reqwest::Client,
    config: LlmConfig,
    estimator: TokenEstimator,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    #[serde(rename_all = "camelCase")]
    InlineData { mime_type: &'a str, data: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "no_stops")]
    stop_sequences: &'a [String],
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Serialize)]
struct CountRequest<'a> {
    contents: Vec<Content<'a>>,
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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse {
    total_tokens: usize,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Self {
        let estimator = TokenEstimator::from_optional_path(config.tokenizer_path.as_deref());
        Self {
            client: reqwest::Client::new(),
            config: LlmConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            estimator,
        }
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url, self.config.model, method
        )
    }

    /// The key travels in a header so that request errors, which quote the
    /// URL, never carry it.
    fn request<B: Serialize>(&self, method: &str, body: &B) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(method))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, LlmError> {
        let resp = self.request(method, body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn generate_parts(
        &self,
        parts: Vec<Part<'_>>,
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: params.max_new_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                stop_sequences: &params.stop,
            }),
        };
        let response: GenerateResponse = self.post("generateContent", &request).await?;
        let text = candidate_text(response);
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn default_params(&self) -> GenerationParams {
        self.config.params()
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let full = format!("{SYSTEM_PREAMBLE}{prompt}");
        debug!(
            model = %self.config.model,
            prompt_chars = full.len(),
            max_tokens = params.max_new_tokens,
            "generateContent"
        );
        let text = self.generate_parts(vec![Part::Text(&full)], params).await?;
        info!(model = %self.config.model, response_chars = text.len(), "generation complete");
        Ok(text)
    }

    async fn count_tokens(&self, text: &str) -> usize {
        let request = CountRequest {
            contents: vec![Content {
                parts: vec![Part::Text(text)],
            }],
        };
        match self.post::<_, CountResponse>("countTokens", &request).await {
            Ok(resp) => resp.total_tokens,
            Err(e) => {
                warn!(error = %e, "countTokens failed, using approximation");
                approx_token_count(text)
            }
        }
    }

    fn truncate_to_token_limit(&self, text: &str, max_tokens: usize) -> String {
        self.estimator.truncate(text, max_tokens)
    }

    async fn transcribe(&self, media: &MediaInput, instruction: &str) -> Result<String, LlmError> {
        info!(
            file = %media.file_name,
            mime = %media.mime_type,
            bytes = media.data.len(),
            "transcribing media"
        );
        let parts = vec![
            Part::InlineData {
                mime_type: &media.mime_type,
                data: STANDARD.encode(&media.data),
            },
            Part::Text(instruction),
        ];
        self.generate_parts(parts, &self.default_params()).await
    }
}

/// Text parts of every candidate, concatenated.
fn candidate_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_shape() {
        let stop = vec!["END".to_string()];
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        mime_type: "audio/mpeg",
                        data: STANDARD.encode(b"abc"),
                    },
                    Part::Text("hello"),
                ],
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: 256,
                temperature: 0.5,
                top_p: 0.5,
                stop_sequences: &stop,
            }),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{"parts": [
                    {"inlineData": {"mimeType": "audio/mpeg", "data": "YWJj"}},
                    {"text": "hello"}
                ]}],
                "generationConfig": {
                    "maxOutputTokens": 256,
                    "temperature": 0.5,
                    "topP": 0.5,
                    "stopSequences": ["END"]
                }
            })
        );
    }

    #[test]
    fn empty_stop_list_is_omitted() {
        let config = GenerationConfig {
            max_output_tokens: 1,
            temperature: 0.0,
            top_p: 1.0,
            stop_sequences: &[],
        };
        let body = serde_json::to_value(&config).unwrap();
        assert!(body.get("stopSequences").is_none());
    }

    #[test]
    fn candidate_parts_are_concatenated() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\": "}, {"text": "1}"}]}},
                {"finishReason": "SAFETY"}
            ]
        }))
        .unwrap();
        assert_eq!(candidate_text(response), "{\"a\": 1}");
    }

    #[test]
    fn url_uses_trimmed_base() {
        let mut config = LlmConfig::new("k3y");
        config.base_url = "http://localhost:8080/v1beta/".into();
        let client = GeminiClient::new(config);
        assert_eq!(
            client.url("generateContent"),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(client.model_name(), "gemini-2.0-flash");
        assert_eq!(client.default_params().max_new_tokens, 1024);
    }

    #[test]
    fn api_key_sent_as_header() {
        let client = GeminiClient::new(LlmConfig::new("k3y"));
        let request = client
            .request("countTokens", &json!({"contents": []}))
            .build()
            .unwrap();
        assert_eq!(request.headers()[API_KEY_HEADER], "k3y");
        assert!(request.url().query().is_none());
        assert!(!request.url().as_str().contains("k3y"));
    }

    #[tokio::test]
    async fn connection_errors_do_not_reveal_key() {
        let mut config = LlmConfig::new("SECRET-KEY-123");
        config.base_url = "http://127.0.0.1:1/v1beta".into();
        let client = GeminiClient::new(config);

        let err = client
            .generate("hello", &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
        assert!(err.to_string().contains("127.0.0.1:1"));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));
    }
}
