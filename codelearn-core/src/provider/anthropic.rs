//! Anthropic Claude provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.unwrap_or(120)))
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.anthropic.com/v1")
            .trim_end_matches('/')
    }

    /// Anthropic takes the system prompt as a top-level field, not a message
    fn build_request(&self, request: &CompletionRequest, stream: bool) -> AnthropicRequest {
        let model = request.model.as_deref().unwrap_or(self.default_model());

        let mut system: Option<String> = None;
        let mut messages = Vec::new();
        for msg in &request.messages {
            match msg.role {
                Role::System => match &mut system {
                    Some(existing) => {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    }
                    None => system = Some(msg.content.clone()),
                },
                Role::User | Role::Assistant => messages.push(AnthropicMessage {
                    role: msg.role.as_str().into(),
                    content: msg.content.clone(),
                }),
            }
        }

        AnthropicRequest {
            model: model.to_string(),
            messages,
            system,
            max_tokens: request
                .max_tokens
                .or(self.config.max_tokens)
                .unwrap_or(4096),
            temperature: request.temperature.or(self.config.temperature),
            stream: Some(stream),
            stop_sequences: request.stop.clone(),
        }
    }

    async fn send(&self, body: &AnthropicRequest) -> Result<reqwest::Response, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(ProviderError::AuthenticationFailed)?;

        let mut req = self
            .client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", api_key)
            .header("content-type", "application/json")
            .json(body);

        if !self.config.headers.contains_key("anthropic-version") {
            req = req.header("anthropic-version", "2023-06-01");
        }
        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        debug!(provider = "anthropic", model = %body.model, stream = ?body.stream, "sending messages request");

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = retry_after_secs(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, text, retry_after));
        }

        Ok(response)
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        self.config
            .default_model
            .as_deref()
            .unwrap_or("claude-sonnet-4-20250514")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_request = self.build_request(&request, false);
        let response = self.send(&api_request).await?;

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content: String = api_response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();

        let usage = Usage {
            prompt_tokens: api_response.usage.input_tokens,
            completion_tokens: api_response.usage.output_tokens,
            total_tokens: api_response.usage.input_tokens + api_response.usage.output_tokens,
        };

        Ok(CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            content: if content.is_empty() { None } else { Some(content) },
            finish_reason: parse_stop_reason(api_response.stop_reason.as_deref()),
            usage,
        })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<StreamReceiver, ProviderError> {
        let api_request = self.build_request(&request, true);
        let response = self.send(&api_request).await?;

        let stream = async_stream::stream! {
            use futures_util::StreamExt;

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                match chunk_result {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));

                        for event in drain_sse_events(&mut buffer) {
                            let (event_type, event_data) = parse_sse_event(&event);

                            if let (Some(etype), Some(data)) = (event_type, event_data) {
                                match etype.as_str() {
                                    "content_block_delta" => {
                                        if let Ok(delta) = serde_json::from_str::<ContentBlockDelta>(&data) {
                                            if let DeltaContent::TextDelta { text } = delta.delta {
                                                yield StreamChunk::Text(text);
                                            }
                                        }
                                    }
                                    "message_delta" => {
                                        if let Ok(delta) = serde_json::from_str::<MessageDelta>(&data) {
                                            if let Some(reason) = delta.delta.stop_reason {
                                                yield StreamChunk::Done {
                                                    finish_reason: parse_stop_reason(Some(&reason)),
                                                    usage: delta.usage.map(|u| Usage {
                                                        prompt_tokens: 0,
                                                        completion_tokens: u.output_tokens,
                                                        total_tokens: u.output_tokens,
                                                    }),
                                                };
                                            }
                                        }
                                    }
                                    "message_stop" => {
                                        yield StreamChunk::Done {
                                            finish_reason: FinishReason::Stop,
                                            usage: None,
                                        };
                                        return;
                                    }
                                    "error" => {
                                        yield StreamChunk::Error(data);
                                        return;
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield StreamChunk::Error(e.to_string());
                        return;
                    }
                }
            }
        };

        Ok(StreamReceiver::new(stream))
    }
}

/// Split one SSE event into its `event:` and `data:` fields
fn parse_sse_event(event: &str) -> (Option<String>, Option<String>) {
    let mut event_type = None;
    let mut event_data = None;
    for line in event.lines() {
        if let Some(t) = line.strip_prefix("event:") {
            event_type = Some(t.trim().to_string());
        } else if let Some(d) = line.strip_prefix("data:") {
            event_data = Some(d.trim_start().to_string());
        }
    }
    (event_type, event_data)
}

fn parse_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("refusal") => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

// Streaming types
#[derive(Debug, Deserialize)]
struct ContentBlockDelta {
    delta: DeltaContent,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum DeltaContent {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    delta: MessageDeltaContent,
    usage: Option<DeltaUsage>,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaContent {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    output_tokens: usize,
}
