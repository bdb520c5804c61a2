//! Tavily web search — the one tool every persona agent can call.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::agent::SearchTool;
use crate::constants::{SEARCH_MAX_RESULTS, SEARCH_TOOL_NAME, TAVILY_SEARCH_URL};
use crate::util::env_first;

/// One search hit as handed back to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub content: String,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Client for the Tavily search API.
#[derive(Clone)]
pub struct TavilySearch {
    api_key: Option<String>,
    endpoint: String,
    max_results: u64,
    http_client: HttpClient,
}

impl TavilySearch {
    pub fn new() -> Self {
        TavilySearch {
            api_key: env_first(&["TAVILY_API_KEY"]),
            endpoint: env_first(&["TAVILY_SEARCH_URL"])
                .unwrap_or_else(|| TAVILY_SEARCH_URL.to_string()),
            max_results: SEARCH_MAX_RESULTS,
            http_client: HttpClient::new(),
        }
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for TavilySearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchTool for TavilySearch {
    fn definition(&self) -> Value {
        search_tool_definition()
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Tavily key not configured (set TAVILY_API_KEY)"))?;
        let body = json!({
            "api_key": key,
            "query": query,
            "max_results": self.max_results,
        });
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("send Tavily request")?;
        let status = response.status();
        let text = response.text().await.context("read Tavily response")?;
        if !status.is_success() {
            return Err(anyhow!("Tavily error {status}: {text}"));
        }
        let parsed: TavilyResponse =
            serde_json::from_str(&text).context("decode Tavily response")?;
        Ok(parsed.results)
    }
}

/// Function-tool definition advertised to the model.
pub fn search_tool_definition() -> Value {
    json!({
        "type": "function",
        "name": SEARCH_TOOL_NAME,
        "description": "A search engine optimized for comprehensive, accurate, and trusted results. \
                        Useful for when you need to answer questions about current events. \
                        Input should be a search query.",
        "parameters": {
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "search query to look up"
                }
            },
            "required": ["query"]
        }
    })
}
