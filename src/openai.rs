//! OpenAI API client — chat responses and response helpers.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{Value, json};

use crate::agent::ChatModel;
use crate::constants::{
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, DEFAULT_TEMPERATURE, MAX_TOOL_LOOPS,
};
use crate::util::env_first;

/// A single tool-call extracted from an OpenAI response.
#[derive(Clone, Debug)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
    pub call_id: String,
}

/// Thin wrapper around the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAiClient {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    api_key: Option<String>,
    http_client: HttpClient,
}

impl OpenAiClient {
    pub fn new() -> Self {
        let model = env_first(&["OPENAI_MODEL", "MOODCHAT_OPENAI_MODEL"])
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let base_url = env_first(&["OPENAI_BASE_URL", "OPENAI_API_BASE"])
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        OpenAiClient {
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: DEFAULT_TEMPERATURE,
            api_key: env_first(&["OPENAI_API_KEY"]),
            http_client: HttpClient::new(),
        }
    }

    /// The configured key, for masked display.
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub async fn response(&self, input: &[Value], tools: Option<&[Value]>) -> Result<Value> {
        let mut body = json!({
            "model": self.model,
            "input": input,
            "temperature": self.temperature,
        });
        if let Some(tools) = tools {
            body["tools"] = Value::Array(tools.to_vec());
        }
        self.request("responses", body).await
    }

    async fn request(&self, path: &str, body: Value) -> Result<Value> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OpenAI key not configured (set OPENAI_API_KEY)"))?;
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let response = self
            .http_client
            .post(url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .context("send OpenAI request")?;
        let status = response.status();
        let text = response.text().await.context("read OpenAI response")?;
        let json: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({"raw": text}));
        if !status.is_success() {
            return Err(anyhow!("OpenAI error {status}: {json}"));
        }
        Ok(json)
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn respond(&self, input: &[Value], tools: &[Value]) -> Result<Value> {
        let tools = if tools.is_empty() { None } else { Some(tools) };
        self.response(input, tools).await
    }
}

/// Pull the top-level `output` array from an OpenAI response.
pub fn extract_output_items(response: &Value) -> Vec<Value> {
    response
        .get("output")
        .and_then(|value| value.as_array())
        .cloned()
        .unwrap_or_default()
}

fn item_type(item: &Value) -> Option<&str> {
    item.get("type").and_then(Value::as_str)
}

/// Reply text: every `output_text` block of every `message` item, one per line.
pub fn extract_output_text(output_items: &[Value]) -> String {
    output_items
        .iter()
        .filter(|item| item_type(item) == Some("message"))
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|block| item_type(block) == Some("output_text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `function_call` items the model wants answered, in order.
///
/// Calls missing a name or call id are skipped. Arguments that are not valid
/// JSON are passed through under `_raw`.
pub fn extract_tool_calls(output_items: &[Value]) -> Vec<ToolCall> {
    output_items
        .iter()
        .filter(|item| item_type(item) == Some("function_call"))
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?;
            let call_id = item.get("call_id")?.as_str()?;
            let raw = item
                .get("arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}");
            Some(ToolCall {
                name: name.to_string(),
                arguments: serde_json::from_str(raw).unwrap_or_else(|_| json!({ "_raw": raw })),
                call_id: call_id.to_string(),
            })
        })
        .collect()
}

/// Build the `function_call_output` item that answers a tool call.
pub fn tool_output_item(call_id: &str, output: &Value) -> Value {
    let output = match output {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    json!({
        "type": "function_call_output",
        "call_id": call_id,
        "output": output,
    })
}

/// Returns `true` when the tool-call loop has hit the configured ceiling.
pub fn tool_loop_limit_reached(tool_loops: usize) -> bool {
    tool_loops >= MAX_TOOL_LOOPS
}
