//! Live price quotes from CoinGecko, with a TTL cache in front

use super::{PriceQuote, ProviderError};
use crate::runtime::QuoteSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_COIN_ID: &str = "dogecoin";

pub struct CoinGeckoQuotes {
    client: Client,
    base_url: String,
    coin_id: String,
}

impl CoinGeckoQuotes {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            coin_id: DEFAULT_COIN_ID.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CoinMarket {
    #[serde(default)]
    name: Option<String>,
    current_price: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
}

fn parse_markets(body: &str) -> Result<PriceQuote, ProviderError> {
    let markets: Vec<CoinMarket> =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let coin = markets
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("empty market list".to_string()))?;
    let price = coin
        .current_price
        .ok_or_else(|| ProviderError::Malformed("missing current_price".to_string()))?;

    Ok(PriceQuote {
        asset: coin.name.unwrap_or_else(|| "Dogecoin".to_string()),
        price,
        currency: "USD".to_string(),
        change_24h: coin.price_change_percentage_24h,
    })
}

#[async_trait]
impl QuoteSource for CoinGeckoQuotes {
    async fn quote(&self) -> Result<PriceQuote, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("vs_currency", "usd"), ("ids", self.coin_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_markets(&body)
    }
}

/// Serves a quote younger than `ttl` without asking the inner source.
///
/// The lock is held across a refresh so concurrent callers share one
/// fetch. Failures are not cached.
pub struct CachedQuotes<Q: QuoteSource> {
    inner: Q,
    ttl: Duration,
    cached: Mutex<Option<(Instant, PriceQuote)>>,
}

impl<Q: QuoteSource> CachedQuotes<Q> {
    pub fn new(inner: Q, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<Q: QuoteSource> QuoteSource for CachedQuotes<Q> {
    async fn quote(&self) -> Result<PriceQuote, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some((fetched_at, quote)) = cached.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(quote.clone());
            }
        }

        let quote = self.inner.quote().await?;
        tracing::debug!(price = quote.price, "Refreshed price quote");
        *cached = Some((Instant::now(), quote.clone()));
        Ok(quote)
    }
}
