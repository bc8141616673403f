//! DuckDuckGo instant-answer snippets

use super::ProviderError;
use crate::runtime::SnippetSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Longest snippet forwarded into the prompt, in characters
pub const MAX_SNIPPET_CHARS: usize = 700;

pub struct DuckDuckGoSnippets {
    client: Client,
    base_url: String,
}

impl DuckDuckGoSnippets {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    heading: String,
}

/// Abstract if present, else the heading, clipped
fn pick_snippet(answer: InstantAnswer) -> Option<String> {
    let text = if answer.abstract_text.trim().is_empty() {
        answer.heading
    } else {
        answer.abstract_text
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(MAX_SNIPPET_CHARS).collect())
    }
}

#[async_trait]
impl SnippetSource for DuckDuckGoSnippets {
    async fn snippet(&self, query: &str) -> Result<Option<String>, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
                ("t", "desktop-doge"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        // DuckDuckGo answers an empty body for some queries
        if body.trim().is_empty() {
            return Ok(None);
        }
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Ok(pick_snippet(answer))
    }
}
