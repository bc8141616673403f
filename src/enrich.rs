//! Context enrichment for chat questions
//!
//! Two optional lookups run side by side for every question: a short web
//! snippet and a live price quote. Either may fail or time out; the
//! question goes out regardless.

mod intent;
mod quote;
mod snippet;

pub use intent::is_price_query;
pub use quote::{CachedQuotes, CoinGeckoQuotes};
pub use snippet::DuckDuckGoSnippets;

use crate::runtime::{QuoteSource, SnippetSource};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Snapshot of the tracked asset's market price
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub asset: String,
    pub price: f64,
    pub currency: String,
    /// 24h change in percent, when the provider reports it
    pub change_24h: Option<f64>,
}

impl PriceQuote {
    /// One-line human summary, e.g. `Dogecoin price: $0.1234 USD (24h +1.23%).`
    pub fn summary(&self) -> String {
        let mut out = format!("{} price: ${:.4} {}", self.asset, self.price, self.currency);
        if let Some(change) = self.change_24h {
            let _ = write!(out, " (24h {change:+.2}%)");
        }
        out.push('.');
        out
    }
}

/// Failure of an enrichment provider. Never shown to the user.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("unexpected payload: {0}")]
    Malformed(String),
}

/// Runs both lookups concurrently and merges what came back
pub struct ContextEnricher<W: SnippetSource, Q: QuoteSource> {
    snippets: Arc<W>,
    quotes: Arc<Q>,
    timeout: Duration,
}

impl<W: SnippetSource, Q: QuoteSource> ContextEnricher<W, Q> {
    pub fn new(snippets: Arc<W>, quotes: Arc<Q>, timeout: Duration) -> Self {
        Self {
            snippets,
            quotes,
            timeout,
        }
    }

    /// Merged context for `query`; empty when neither lookup produced
    /// anything usable.
    pub async fn enrich(&self, query: &str) -> String {
        let (snippet, quote) = tokio::join!(
            tokio::time::timeout(self.timeout, self.snippets.snippet(query)),
            tokio::time::timeout(self.timeout, self.quotes.quote()),
        );

        let snippet = match snippet {
            Ok(Ok(snippet)) => snippet,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Web snippet lookup failed");
                None
            }
            Err(_) => {
                tracing::debug!("Web snippet lookup timed out");
                None
            }
        };

        let quote = if is_price_query(query) {
            match quote {
                Ok(Ok(quote)) => Some(quote),
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "Price lookup failed");
                    None
                }
                Err(_) => {
                    tracing::debug!("Price lookup timed out");
                    None
                }
            }
        } else {
            None
        };

        merge_context(snippet.as_deref(), quote.as_ref())
    }
}

/// Web snippet first, price second, newline separated
pub fn merge_context(snippet: Option<&str>, quote: Option<&PriceQuote>) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(snippet) = snippet.map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(format!("(web) {snippet}"));
    }
    if let Some(quote) = quote {
        parts.push(format!(
            "(live-data) {}\nYou MUST quote that number.",
            quote.summary()
        ));
    }
    parts.join("\n")
}
