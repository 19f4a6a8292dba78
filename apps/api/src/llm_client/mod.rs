/// LLM Client: the single point of entry for chat-completion calls.
///
/// Speaks the OpenAI-compatible `/chat/completions` wire format, including
/// function tools. The orchestrator depends on the `LlmBackend` trait rather
/// than on `LlmClient` directly, so tests can script the model's replies.
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-5";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

static RE_FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").unwrap());
static RE_BRACED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Messages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_content(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_content(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_content(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, content)
    }

    /// Result of executing the tool call `call_id`.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::with_content(Role::Tool, content)
        }
    }

    /// Non-blank text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it.
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Decoded arguments. Malformed or non-object arguments become an empty map.
    pub fn parsed_arguments(&self) -> Map<String, Value> {
        if self.arguments.trim().is_empty() {
            return Map::new();
        }
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!("Tool '{}' arguments are not an object: {}", self.name, other);
                Map::new()
            }
            Err(e) => {
                warn!("Tool '{}' arguments are not valid JSON: {}", self.name, e);
                Map::new()
            }
        }
    }
}

/// Token counters, accumulated across the turns of one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt += other.prompt;
        self.completion += other.completion;
        self.total += other.total;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub message: ChatMessage,
    pub usage: TokenUsage,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Backend trait + HTTP client
// ────────────────────────────────────────────────────────────────────────────

/// Anything that can answer a chat-completion request.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// `tools` empty means a plain completion with no function calling.
    async fn chat(&self, messages: &[ChatMessage], tools: &[Value])
        -> Result<ChatCompletion, LlmError>;
}

/// The HTTP LLM client. Retries on 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, model: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .pool_max_idle_per_host(0)
                .build()?,
            api_key,
            api_url,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<ChatCompletion, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages,
            tools,
            tool_choice: (!tools.is_empty()).then_some("auto"),
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let parsed: ChatResponse = serde_json::from_str(&body)?;
            let message = parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message)
                .ok_or(LlmError::EmptyContent)?;
            let usage = parsed.usage.unwrap_or_default();

            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}, tool_calls={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                message.tool_calls.len()
            );

            return Ok(ChatCompletion {
                message,
                usage: TokenUsage {
                    prompt: usage.prompt_tokens,
                    completion: usage.completion_tokens,
                    total: usage.total_tokens,
                },
            });
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JSON recovery
// ────────────────────────────────────────────────────────────────────────────

/// Recovers a JSON object from model output, trying in order: the whole
/// trimmed text, a fenced code block, the outermost brace-delimited span, then
/// the first object that parses from any `{` onwards.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let as_object = |candidate: &str| match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    };

    as_object(text.trim())
        .or_else(|| {
            RE_FENCED_JSON
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .find_map(|m| as_object(m.as_str()))
        })
        .or_else(|| RE_BRACED.find(text).and_then(|m| as_object(m.as_str())))
        .or_else(|| first_object_from_any_brace(text))
}

/// Streams one value from each `{` position; trailing prose is ignored.
fn first_object_from_any_brace(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(i, _)| {
        match serde_json::Deserializer::from_str(&text[i..])
            .into_iter::<Value>()
            .next()
        {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_bare_object() {
        let map = extract_json_object("  {\"need_search\": false, \"message\": \"嗨\"}  ").unwrap();
        assert_eq!(map["need_search"], json!(false));
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "好的：\n```json\n{\"need_search\": true, \"params\": {}}\n```\n以上";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["need_search"], json!(true));
    }

    #[test]
    fn test_extract_json_fence_without_tag() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(text).unwrap()["a"], json!(1));
    }

    #[test]
    fn test_extract_json_embedded_in_prose() {
        let text = "我判斷如下 {\"need_search\": true, \"params\": {\"keyword\": \"Go\"}} 請參考";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["params"]["keyword"], json!("Go"));
    }

    #[test]
    fn test_extract_json_with_braces_in_trailing_prose() {
        let text = "好的，參數如下：{\"need_search\": false, \"message\": \"嗨\"}（格式為 {key: value}）";
        let map = extract_json_object(text).unwrap();
        assert_eq!(map["need_search"], json!(false));
        assert_eq!(map["message"], json!("嗨"));
    }

    #[test]
    fn test_extract_json_skips_leading_non_json_braces() {
        let text = "用 {placeholder} 表示欄位，結果是 {\"a\": {\"b\": 2}} 完畢 }";
        assert_eq!(extract_json_object(text).unwrap()["a"]["b"], json!(2));
    }

    #[test]
    fn test_extract_json_none_when_nothing_parses() {
        assert_eq!(extract_json_object("沒有 JSON"), None);
        assert_eq!(extract_json_object("{ not json }"), None);
        assert_eq!(extract_json_object("[1, 2, 3]"), None);
    }

    #[test]
    fn test_tool_call_wire_roundtrip_shape() {
        let wire = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "search_104_jobs", "arguments": "{\"keyword\":\"Rust\"}"}
            }]
        });
        let message: ChatMessage = serde_json::from_value(wire).unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text(), None);
        let args = message.tool_calls[0].function.parsed_arguments();
        assert_eq!(args["keyword"], json!("Rust"));
    }

    #[test]
    fn test_malformed_arguments_become_empty_map() {
        let call = FunctionCall {
            name: "search_104_jobs".into(),
            arguments: "{keyword: Rust".into(),
        };
        assert!(call.parsed_arguments().is_empty());
    }

    #[test]
    fn test_tool_result_message_serialization() {
        let message = ChatMessage::tool_result("call_9", "結果");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_9");
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn test_request_omits_tools_when_empty() {
        let messages = [ChatMessage::user("hi")];
        let request = ChatRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
            tools: &[],
            tool_choice: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
    }

    #[test]
    fn test_client_builds_with_configured_model() {
        let client = LlmClient::new(
            "sk-test".into(),
            DEFAULT_API_URL.into(),
            "gpt-4o-mini".into(),
        )
        .unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(client.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(TokenUsage { prompt: 10, completion: 5, total: 15 });
        total.add(TokenUsage { prompt: 1, completion: 2, total: 3 });
        assert_eq!(total, TokenUsage { prompt: 11, completion: 7, total: 18 });
    }
}
