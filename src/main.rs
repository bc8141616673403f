//! Desktop Doge - a desktop companion that answers questions in character
//!
//! An event-driven controller around a pure state machine: clicks become
//! short, mood-tagged LLM replies, and an idle timer shows price bubbles.

mod chat;
mod config;
mod credentials;
mod enrich;
mod idle;
mod llm;
mod runtime;
mod state_machine;
mod surface;

use chat::{ChatClient, ConversationHistory};
use config::PetConfig;
use credentials::{FileCredentialStore, DEFAULT_ENV_VAR};
use enrich::{CachedQuotes, CoinGeckoQuotes, ContextEnricher, DuckDuckGoSnippets};
use idle::IdleScheduler;
use llm::{LoggingService, OpenAIService};
use runtime::{CredentialStore, PetRuntime};
use std::sync::Arc;
use surface::TerminalSurface;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the surface
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "desktop_doge=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = PetConfig::from_env()?;
    tracing::info!(
        model = %config.model,
        idle_interval_secs = config.idle_interval.as_secs(),
        word_budget = config.word_budget,
        "Configuration loaded"
    );

    let credentials = Arc::new(
        FileCredentialStore::new(&config.credential_path).with_env_override(DEFAULT_ENV_VAR),
    );
    if credentials.get().is_err() {
        tracing::warn!(
            path = %credentials.path().display(),
            "No API key configured yet; the first question will ask for one"
        );
    }

    let completion = Arc::new(OpenAIService::new(
        &config.model,
        &config.chat_url,
        config.chat_timeout,
    )?);
    let service = Arc::new(LoggingService::new(completion));
    let chat = ChatClient::new(
        service,
        config.persona(),
        config.word_budget,
        config.chat_timeout,
    );

    let quotes = Arc::new(CachedQuotes::new(
        CoinGeckoQuotes::new(&config.quote_url, config.provider_timeout)?,
        config.price_cache_ttl,
    ));
    let snippets = Arc::new(DuckDuckGoSnippets::new(
        &config.snippet_url,
        config.provider_timeout,
    )?);
    let enricher = Arc::new(ContextEnricher::new(
        snippets,
        quotes.clone(),
        config.provider_timeout,
    ));

    let shutdown = CancellationToken::new();
    let runtime = PetRuntime::new(
        config.pet_context(),
        chat,
        enricher,
        quotes.clone(),
        credentials.clone(),
        ConversationHistory::new(config.max_history),
    )
    .with_provider_timeout(config.provider_timeout)
    .with_shutdown(shutdown.clone());
    let handle = runtime.handle();

    let scheduler = IdleScheduler::new(
        quotes,
        handle.state_rx.clone(),
        handle.event_tx.clone(),
        shutdown.clone(),
    )
    .with_timing(
        config.idle_first_tick,
        config.idle_interval,
        config.provider_timeout,
    );

    let runtime_task = tokio::spawn(runtime.run());
    let scheduler_task = tokio::spawn(scheduler.run());

    let surface = TerminalSurface::new(handle, credentials, shutdown.clone());
    tokio::select! {
        result = surface.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    shutdown.cancel();
    let _ = tokio::join!(runtime_task, scheduler_task);
    Ok(())
}
