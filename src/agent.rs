//! Persona agents — a system prompt, the persona's running history, and a
//! search tool wired to a chat model.
//!
//! The model, the search tool, and the history store sit behind traits so an
//! agent can be driven against in-process fakes.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::constants::SEARCH_TOOL_NAME;
use crate::history::{HistoryStore, Role, Turn};
use crate::openai::{
    extract_output_items, extract_output_text, extract_tool_calls, tool_loop_limit_reached,
    tool_output_item,
};
use crate::persona::Persona;
use crate::search::SearchResult;

/// Reply text used when the tool loop runs out of rounds.
pub const LOOP_LIMIT_REPLY: &str = "Agent stopped due to iteration limit or time limit.";

/// A chat model speaking the Responses-API item format.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn respond(&self, input: &[Value], tools: &[Value]) -> Result<Value>;
}

/// A web search the agent can call as a tool.
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Function-tool definition advertised to the model.
    fn definition(&self) -> Value;
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Shared collaborators every agent is built from.
#[derive(Clone)]
pub struct AgentToolkit {
    pub model: Arc<dyn ChatModel>,
    pub search: Arc<dyn SearchTool>,
    pub history: Arc<dyn HistoryStore>,
}

impl AgentToolkit {
    pub fn new(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn SearchTool>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        AgentToolkit {
            model,
            search,
            history,
        }
    }

    /// Build an agent for `persona` with its history bound to the persona id.
    pub fn build(&self, persona: Persona, system_prompt: &str) -> Result<PersonaAgent> {
        if system_prompt.trim().is_empty() {
            return Err(anyhow!("system prompt for {persona} is empty"));
        }
        Ok(PersonaAgent {
            persona,
            system_prompt: system_prompt.to_string(),
            model: self.model.clone(),
            search: self.search.clone(),
            history: self.history.clone(),
        })
    }
}

/// One conversational agent bound to a persona.
pub struct PersonaAgent {
    persona: Persona,
    system_prompt: String,
    model: Arc<dyn ChatModel>,
    search: Arc<dyn SearchTool>,
    history: Arc<dyn HistoryStore>,
}

impl PersonaAgent {
    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answer `input` in character and record both sides in the history store.
    pub async fn invoke(&self, input: &str) -> Result<String> {
        let past = self
            .history
            .fetch(self.persona)
            .await
            .context("load chat history")?;

        let mut items = Vec::with_capacity(past.len() + 2);
        items.push(json!({"role": "system", "content": self.system_prompt}));
        for turn in &past {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            items.push(json!({"role": role, "content": turn.content}));
        }
        items.push(json!({"role": "user", "content": input}));

        let reply = self.run_tool_loop(items).await?;

        self.history
            .append(self.persona, &Turn::user(input))
            .await
            .context("save user turn")?;
        self.history
            .append(self.persona, &Turn::assistant(reply.clone()))
            .await
            .context("save assistant turn")?;

        Ok(reply)
    }

    async fn run_tool_loop(&self, mut items: Vec<Value>) -> Result<String> {
        let tools = vec![self.search.definition()];
        let mut tool_loops = 0;

        loop {
            let response = self.model.respond(&items, &tools).await?;
            let output = extract_output_items(&response);
            let calls = extract_tool_calls(&output);
            if calls.is_empty() {
                return Ok(extract_output_text(&output));
            }
            if tool_loop_limit_reached(tool_loops) {
                return Ok(LOOP_LIMIT_REPLY.to_string());
            }
            tool_loops += 1;

            items.extend(output);
            for call in calls {
                let result = if call.name == SEARCH_TOOL_NAME {
                    let query = call
                        .arguments
                        .get("query")
                        .and_then(|q| q.as_str())
                        .ok_or_else(|| anyhow!("search call without a query"))?;
                    let hits = self
                        .search
                        .search(query)
                        .await
                        .with_context(|| format!("search for {query:?}"))?;
                    serde_json::to_value(hits).context("encode search results")?
                } else {
                    Value::String(format!("{} is not a valid tool", call.name))
                };
                items.push(tool_output_item(&call.call_id, &result));
            }
        }
    }
}
