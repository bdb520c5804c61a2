//! Compile-time constants and tunables shared across the crate.

/// Application name shown in the header bar.
pub const APP_NAME: &str = "moodchat";
/// Application version injected from `Cargo.toml` at compile time.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default OpenAI chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo-1106";
/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Sampling temperature sent with every chat request.
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

/// Tavily search endpoint.
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
/// Function name the model uses to call the search tool.
pub const SEARCH_TOOL_NAME: &str = "tavily_search_results_json";
/// Maximum number of search results handed back to the model.
pub const SEARCH_MAX_RESULTS: u64 = 5;

/// Redis key prefix for persona message logs.
pub const HISTORY_KEY_PREFIX: &str = "message_store:";

/// Maximum number of tool-call round-trips per chat turn.
pub const MAX_TOOL_LOOPS: usize = 6;
/// Maximum number of log entries kept in the activity panel.
pub const MAX_LOGS: usize = 1000;
