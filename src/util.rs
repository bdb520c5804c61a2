//! Small utility helpers shared across the crate.

use std::env;

use anyhow::{Context, Result};
use url::Url;

/// Return the first non-empty environment variable from `keys`, or `None`.
pub fn env_first(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(value) = env::var(key) {
            if !value.trim().is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Normalise a URL by prepending `http://` or `https://` when the scheme is missing.
pub fn normalize_url(raw: &str) -> String {
    if raw.contains("://") {
        return raw.to_string();
    }
    let scheme = if raw.starts_with("localhost") || raw.starts_with("127.") || raw.contains(":80") {
        "http"
    } else {
        "https"
    };
    format!("{scheme}://{raw}")
}

/// Normalise and parse a base URL, dropping any trailing slash.
pub fn parse_base_url(raw: &str) -> Result<String> {
    let normalized = normalize_url(raw.trim());
    let url = Url::parse(&normalized).with_context(|| format!("invalid URL: {raw}"))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}
