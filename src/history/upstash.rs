//! Upstash Redis REST backend for persona histories.
//!
//! Each persona's log is a Redis list at `message_store:<persona>`. New
//! messages are `LPUSH`ed, so the list is newest-first on the wire and is
//! reversed on fetch.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{Value, json};

use crate::constants::HISTORY_KEY_PREFIX;
use crate::persona::Persona;
use crate::util::{env_first, parse_base_url};

use super::{HistoryStore, Role, Turn};

/// History store speaking the Upstash Redis REST protocol.
#[derive(Clone)]
pub struct UpstashHistory {
    base_url: String,
    token: String,
    http_client: HttpClient,
}

impl UpstashHistory {
    pub fn new(url: &str, token: &str) -> Result<Self> {
        Ok(UpstashHistory {
            base_url: parse_base_url(url)?,
            token: token.to_string(),
            http_client: HttpClient::new(),
        })
    }

    /// Build from `UPSTASH_REDIS_REST_URL` / `UPSTASH_REDIS_REST_TOKEN`.
    ///
    /// Returns `Ok(None)` when neither is set.
    pub fn from_env() -> Result<Option<Self>> {
        let url = env_first(&["UPSTASH_REDIS_REST_URL", "UPSTASH_URL"]);
        let token = env_first(&["UPSTASH_REDIS_REST_TOKEN", "UPSTASH_TOKEN"]);
        match (url, token) {
            (None, None) => Ok(None),
            (Some(url), Some(token)) => Self::new(&url, &token).map(Some),
            (Some(_), None) => Err(anyhow!("UPSTASH_REDIS_REST_TOKEN is not set")),
            (None, Some(_)) => Err(anyhow!("UPSTASH_REDIS_REST_URL is not set")),
        }
    }

    /// Run one Redis command and return its `result` field.
    async fn command(&self, args: &[&str]) -> Result<Value> {
        let response = self
            .http_client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .with_context(|| format!("send Upstash {}", args.first().unwrap_or(&"command")))?;
        let status = response.status();
        let text = response.text().await.context("read Upstash response")?;
        let json: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({"raw": text}));
        if let Some(error) = json.get("error") {
            return Err(anyhow!("Upstash error {status}: {error}"));
        }
        if !status.is_success() {
            return Err(anyhow!("Upstash error {status}: {json}"));
        }
        Ok(json.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl HistoryStore for UpstashHistory {
    async fn append(&self, persona: Persona, turn: &Turn) -> Result<()> {
        let payload = encode_message(turn).to_string();
        self.command(&["LPUSH", &history_key(persona), &payload])
            .await
            .with_context(|| format!("append {persona} history"))?;
        Ok(())
    }

    async fn fetch(&self, persona: Persona) -> Result<Vec<Turn>> {
        let result = self
            .command(&["LRANGE", &history_key(persona), "0", "-1"])
            .await
            .with_context(|| format!("fetch {persona} history"))?;
        decode_list(&result)
    }

    async fn clear(&self, persona: Persona) -> Result<()> {
        self.command(&["DEL", &history_key(persona)])
            .await
            .with_context(|| format!("clear {persona} history"))?;
        Ok(())
    }

    fn label(&self) -> String {
        let host = url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.base_url.clone());
        format!("upstash ({host})")
    }
}

/// Redis key holding a persona's messages.
pub fn history_key(persona: Persona) -> String {
    format!("{HISTORY_KEY_PREFIX}{}", persona.id())
}

/// Serialise a turn in the `{type, data: {content}}` message shape.
pub fn encode_message(turn: &Turn) -> Value {
    let kind = match turn.role {
        Role::User => "human",
        Role::Assistant => "ai",
    };
    json!({
        "type": kind,
        "data": {
            "type": kind,
            "content": turn.content,
            "additional_kwargs": {},
        }
    })
}

/// Parse one stored message back into a turn.
pub fn decode_message(raw: &str) -> Result<Turn> {
    let value: Value = serde_json::from_str(raw).context("decode stored message")?;
    let content = value
        .pointer("/data/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("stored message has no content"))?;
    let role = match value.get("type").and_then(|v| v.as_str()) {
        Some("human") | Some("user") => Role::User,
        _ => Role::Assistant,
    };
    Ok(Turn {
        role,
        content: content.to_string(),
    })
}

/// Decode an `LRANGE` result (newest-first) into oldest-first turns.
fn decode_list(result: &Value) -> Result<Vec<Turn>> {
    let items = match result {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => return Err(anyhow!("unexpected LRANGE result: {other}")),
    };
    let mut turns = items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| anyhow!("non-string list item: {item}"))
                .and_then(decode_message)
        })
        .collect::<Result<Vec<_>>>()?;
    turns.reverse();
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_message_store_prefix() {
        assert_eq!(history_key(Persona::Angry), "message_store:angry");
    }

    #[test]
    fn decode_reads_the_stored_shape() {
        let stored = r#"{"type":"ai","data":{"content":"WHAT NOW","additional_kwargs":{},"type":"ai"}}"#;
        assert_eq!(decode_message(stored).unwrap(), Turn::assistant("WHAT NOW"));

        let encoded = encode_message(&Turn::user("hello")).to_string();
        assert_eq!(decode_message(&encoded).unwrap(), Turn::user("hello"));
    }

    #[test]
    fn decode_rejects_messages_without_content() {
        assert!(decode_message(r#"{"type":"human","data":{}}"#).is_err());
    }

    #[test]
    fn list_is_reversed_to_oldest_first() {
        let newest = encode_message(&Turn::assistant("second")).to_string();
        let oldest = encode_message(&Turn::user("first")).to_string();
        let turns = decode_list(&json!([newest, oldest])).unwrap();
        assert_eq!(turns, vec![Turn::user("first"), Turn::assistant("second")]);
        assert!(decode_list(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn base_url_is_normalised() {
        let store = UpstashHistory::new("endless-cub.upstash.io/", "t").unwrap();
        assert_eq!(store.base_url, "https://endless-cub.upstash.io");
        assert_eq!(store.label(), "upstash (endless-cub.upstash.io)");
    }
}
