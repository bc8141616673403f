//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{PetHandle, PetRuntime, SurfaceUpdate};
use crate::chat::{ChatClient, ConversationHistory};
use crate::credentials::{Credential, CredentialError};
use crate::enrich::{CachedQuotes, ContextEnricher, PriceQuote, ProviderError};
use crate::idle::IdleScheduler;
use crate::llm::{ChatError, CompletionRequest, CompletionResponse, Usage};
use crate::state_machine::{Bubble, Event, PetContext, PetState};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

type Scripted = (Option<Duration>, Result<String, ChatError>);

// ============================================================================
// Mock Completion Service
// ============================================================================

/// Completion service that replays scripted responses.
///
/// Responses registered for a specific question win over the FIFO queue,
/// so tests with several requests in flight stay deterministic.
#[derive(Default)]
pub struct MockCompletion {
    queued: Mutex<VecDeque<Scripted>>,
    by_query: Mutex<HashMap<String, Scripted>>,
    calls: AtomicUsize,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_text(&self, text: &str) {
        self.queued
            .lock()
            .unwrap()
            .push_back((None, Ok(text.to_string())));
    }

    pub fn queue_delayed_text(&self, delay: Duration, text: &str) {
        self.queued
            .lock()
            .unwrap()
            .push_back((Some(delay), Ok(text.to_string())));
    }

    pub fn queue_error(&self, error: ChatError) {
        self.queued.lock().unwrap().push_back((None, Err(error)));
    }

    /// Answer `query` (the last user message) after `delay`
    pub fn respond_to(&self, query: &str, delay: Duration, text: &str) {
        self.by_query
            .lock()
            .unwrap()
            .insert(query.to_string(), (Some(delay), Ok(text.to_string())));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(
        &self,
        request: &CompletionRequest,
        _credential: &Credential,
    ) -> Result<CompletionResponse, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let query = request.messages.last().map(|m| m.content.clone());
        let scripted = query
            .and_then(|q| self.by_query.lock().unwrap().remove(&q))
            .or_else(|| self.queued.lock().unwrap().pop_front());

        let Some((delay, result)) = scripted else {
            return Err(ChatError::unavailable("No more mock responses"));
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result.map(|text| CompletionResponse {
            text,
            usage: Usage::default(),
        })
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Enrichment Sources
// ============================================================================

pub struct MockSnippets {
    snippet: Option<String>,
    delay: Option<Duration>,
}

impl MockSnippets {
    pub fn returning(snippet: Option<&str>) -> Self {
        Self {
            snippet: snippet.map(str::to_string),
            delay: None,
        }
    }

    pub fn delayed(delay: Duration, snippet: Option<&str>) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(snippet)
        }
    }
}

#[async_trait]
impl SnippetSource for MockSnippets {
    async fn snippet(&self, _query: &str) -> Result<Option<String>, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.snippet.clone())
    }
}

pub struct MockQuotes {
    quote: Mutex<Option<PriceQuote>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockQuotes {
    pub fn returning(quote: PriceQuote) -> Self {
        Self {
            quote: Mutex::new(Some(quote)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(delay: Duration, quote: PriceQuote) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(quote)
        }
    }

    pub fn failing() -> Self {
        Self {
            quote: Mutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn quote(&self) -> Result<PriceQuote, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.quote
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::Status(503))
    }
}

// ============================================================================
// In-Memory Credential Store
// ============================================================================

#[derive(Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            key: Mutex::new(Credential::new(key)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Credential, CredentialError> {
        self.key.lock().unwrap().clone().ok_or(CredentialError::Missing)
    }

    fn set(&self, credential: &Credential) -> Result<(), CredentialError> {
        *self.key.lock().unwrap() = Some(credential.clone());
        Ok(())
    }
}

// ============================================================================
// Test Harness
// ============================================================================

pub fn doge_quote(price: f64, change_24h: Option<f64>) -> PriceQuote {
    PriceQuote {
        asset: "Dogecoin".to_string(),
        price,
        currency: "USD".to_string(),
        change_24h,
    }
}

/// Mock-backed pet with an event loop running in the background
pub struct TestPet {
    pub handle: PetHandle,
    pub updates: broadcast::Receiver<SurfaceUpdate>,
    pub completion: Arc<MockCompletion>,
    pub quotes: Arc<MockQuotes>,
    pub credentials: Arc<MemoryCredentialStore>,
    shutdown: CancellationToken,
}

pub struct TestPetBuilder {
    completion: MockCompletion,
    snippets: MockSnippets,
    quotes: MockQuotes,
    credentials: MemoryCredentialStore,
    context: PetContext,
    chat_timeout: Duration,
    idle_timing: Option<(Duration, Duration)>,
}

impl TestPet {
    pub fn builder() -> TestPetBuilder {
        TestPetBuilder {
            completion: MockCompletion::new(),
            snippets: MockSnippets::returning(None),
            quotes: MockQuotes::returning(doge_quote(0.12, Some(1.0))),
            credentials: MemoryCredentialStore::with_key("sk-test"),
            context: PetContext::new(Duration::from_secs(6), Duration::from_secs(6)),
            chat_timeout: Duration::from_secs(15),
            idle_timing: None,
        }
    }

    pub async fn send(&self, event: Event) {
        self.handle
            .event_tx
            .send(event)
            .await
            .expect("Failed to send event");
    }

    pub async fn click(&self, query: &str) {
        self.send(Event::click(query)).await;
    }

    /// Next surface update; time auto-advances under a paused clock
    pub async fn next_update(&mut self) -> SurfaceUpdate {
        tokio::time::timeout(Duration::from_secs(3600), self.updates.recv())
            .await
            .expect("Timed out waiting for surface update")
            .expect("Surface update channel closed")
    }

    /// Skip updates until a bubble is shown
    pub async fn next_bubble(&mut self) -> Bubble {
        loop {
            if let SurfaceUpdate::ShowBubble { bubble } = self.next_update().await {
                return bubble;
            }
        }
    }

    /// True if nothing reaches the surface within `window`
    pub async fn stays_quiet(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.updates.recv()).await.is_err()
    }

    pub fn state(&self) -> PetState {
        self.handle.state()
    }
}

impl Drop for TestPet {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl TestPetBuilder {
    pub fn completion(mut self, completion: MockCompletion) -> Self {
        self.completion = completion;
        self
    }

    pub fn snippets(mut self, snippets: MockSnippets) -> Self {
        self.snippets = snippets;
        self
    }

    pub fn quotes(mut self, quotes: MockQuotes) -> Self {
        self.quotes = quotes;
        self
    }

    pub fn credentials(mut self, credentials: MemoryCredentialStore) -> Self {
        self.credentials = credentials;
        self
    }

    /// Run an idle scheduler alongside the loop
    pub fn idle_scheduler(mut self, first_tick: Duration, interval: Duration) -> Self {
        self.idle_timing = Some((first_tick, interval));
        self
    }

    pub fn build(self) -> TestPet {
        let completion = Arc::new(self.completion);
        let snippets = Arc::new(self.snippets);
        let quotes = Arc::new(self.quotes);
        let credentials = Arc::new(self.credentials);
        let shutdown = CancellationToken::new();

        let cached = Arc::new(CachedQuotes::new(quotes.clone(), Duration::from_secs(3600)));
        let enricher = Arc::new(ContextEnricher::new(
            snippets,
            cached.clone(),
            Duration::from_secs(5),
        ));
        let chat = ChatClient::new(
            completion.clone(),
            "You are Desktop Doge.".to_string(),
            25,
            self.chat_timeout,
        );

        let runtime = PetRuntime::new(
            self.context,
            chat,
            enricher,
            cached.clone(),
            credentials.clone(),
            ConversationHistory::new(12),
        )
        .with_shutdown(shutdown.clone());
        let handle = runtime.handle();
        let updates = handle.subscribe();
        tokio::spawn(runtime.run());

        if let Some((first_tick, interval)) = self.idle_timing {
            let scheduler = IdleScheduler::new(
                cached,
                handle.state_rx.clone(),
                handle.event_tx.clone(),
                shutdown.clone(),
            )
            .with_timing(first_tick, interval, Duration::from_secs(5));
            tokio::spawn(scheduler.run());
        }

        TestPet {
            handle,
            updates,
            completion,
            quotes,
            credentials,
            shutdown,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{
        Animation, BubbleKind, Mood, DEFAULT_FALLBACK_TEXT, QUOTE_UNAVAILABLE_TEXT,
    };
    use tokio::time::Instant;

    fn show(animation: Animation) -> SurfaceUpdate {
        SurfaceUpdate::ShowAnimation { animation }
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_reply_and_revert() {
        let completion = MockCompletion::new();
        completion.queue_text("<mood:WOW> Doge is mooning at $0.12!");
        let mut pet = TestPet::builder().completion(completion).build();

        pet.click("what's doge worth").await;
        assert_eq!(pet.next_update().await, show(Animation::Thinking));
        assert_eq!(pet.next_update().await, show(Animation::Mood(Mood::Wow)));

        let bubble = pet.next_bubble().await;
        let shown_at = Instant::now();
        assert_eq!(bubble.text, "Doge is mooning at $0.12!");
        assert_eq!(bubble.mood, Mood::Wow);
        assert_eq!(bubble.kind, BubbleKind::Chat);

        assert_eq!(pet.next_update().await, SurfaceUpdate::HideBubble);
        assert_eq!(pet.next_update().await, show(Animation::Idle));
        assert_eq!(shown_at.elapsed(), Duration::from_secs(6));
        assert!(pet.state().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_question_carries_live_data() {
        let completion = MockCompletion::new();
        completion.queue_text("Much $0.1200! <mood:HAPPY>");
        let mut pet = TestPet::builder()
            .completion(completion)
            .snippets(MockSnippets::returning(Some("Dogecoin is a cryptocurrency.")))
            .build();

        pet.click("what is doge worth?").await;
        pet.next_bubble().await;

        let request = &pet.completion.recorded_requests()[0];
        let context = &request.messages[0].content;
        assert!(context.starts_with("(web) Dogecoin is a cryptocurrency."));
        assert!(context.contains("(live-data) Dogecoin price: $0.1200 USD (24h +1.00%)."));
        assert_eq!(request.messages.last().unwrap().content, "what is doge worth?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_shows_fallback() {
        let completion = MockCompletion::new();
        completion.queue_delayed_text(Duration::from_secs(60), "too late <mood:HAPPY>");
        let mut pet = TestPet::builder().completion(completion).build();

        let clicked_at = Instant::now();
        pet.click("hello").await;
        assert_eq!(pet.next_update().await, show(Animation::Thinking));
        assert_eq!(pet.next_update().await, show(Animation::Mood(Mood::Sad)));

        let bubble = pet.next_bubble().await;
        assert_eq!(bubble.text, DEFAULT_FALLBACK_TEXT);
        assert_eq!(bubble.mood, Mood::Sad);
        assert_eq!(clicked_at.elapsed(), Duration::from_secs(15));
        assert_eq!(pet.completion.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_quote_after_interval() {
        let mut pet = TestPet::builder()
            .quotes(MockQuotes::returning(doge_quote(0.2, Some(6.5))))
            .idle_scheduler(Duration::from_secs(600), Duration::from_secs(600))
            .build();

        let start = Instant::now();
        assert_eq!(pet.next_update().await, show(Animation::Mood(Mood::Wow)));
        let bubble = pet.next_bubble().await;
        assert_eq!(start.elapsed(), Duration::from_secs(600));
        assert_eq!(bubble.kind, BubbleKind::Quote);
        assert_eq!(bubble.text, "Dogecoin price: $0.2000 USD (24h +6.50%).");

        assert_eq!(pet.next_update().await, SurfaceUpdate::HideBubble);
        assert_eq!(pet.next_update().await, show(Animation::Idle));
        assert_eq!(start.elapsed(), Duration::from_secs(606));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reply_after_drag_is_discarded() {
        let completion = MockCompletion::new();
        completion.respond_to("first", Duration::from_secs(10), "old news <mood:SAD>");
        completion.respond_to("second", Duration::from_secs(1), "fresh news <mood:HAPPY>");
        let mut pet = TestPet::builder().completion(completion).build();

        pet.click("first").await;
        assert_eq!(pet.next_update().await, show(Animation::Thinking));
        pet.send(Event::DragStart).await;
        assert_eq!(pet.next_update().await, show(Animation::Idle));
        pet.send(Event::DragEnd).await;

        pet.click("second").await;
        assert_eq!(pet.next_update().await, show(Animation::Thinking));
        let bubble = pet.next_bubble().await;
        assert_eq!(bubble.text, "fresh news");
        assert_eq!(bubble.mood, Mood::Happy);

        assert_eq!(pet.next_update().await, SurfaceUpdate::HideBubble);
        assert_eq!(pet.next_update().await, show(Animation::Idle));

        // "old news" lands at t=10s and must not reach the surface
        assert!(pet.stays_quiet(Duration::from_secs(30)).await);
        assert!(pet.state().is_idle());
        assert_eq!(pet.completion.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_credential_prompts_without_calling() {
        let completion = MockCompletion::new();
        completion.queue_text("Such key. <mood:HAPPY>");
        let mut pet = TestPet::builder()
            .completion(completion)
            .credentials(MemoryCredentialStore::empty())
            .build();

        pet.click("hello").await;
        assert_eq!(pet.next_update().await, show(Animation::Thinking));
        assert_eq!(pet.next_update().await, show(Animation::Idle));
        assert_eq!(pet.next_update().await, SurfaceUpdate::PromptCredential);
        assert_eq!(pet.completion.call_count(), 0);
        assert!(pet.state().is_idle());

        pet.credentials
            .set(&Credential::new("sk-entered").unwrap())
            .unwrap();
        pet.click("hello again").await;
        let bubble = pet.next_bubble().await;
        assert_eq!(bubble.text, "Such key.");
        assert_eq!(pet.completion.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_click_is_ignored() {
        let completion = MockCompletion::new();
        completion.respond_to("first", Duration::from_secs(2), "one <mood:HAPPY>");
        completion.respond_to("second", Duration::from_secs(0), "two <mood:LAUGH>");
        let mut pet = TestPet::builder().completion(completion).build();

        pet.click("first").await;
        assert_eq!(pet.next_update().await, show(Animation::Thinking));
        pet.click("second").await;

        let bubble = pet.next_bubble().await;
        assert_eq!(bubble.text, "one");
        assert_eq!(pet.completion.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_follows_applied_replies() {
        let completion = MockCompletion::new();
        completion.queue_text("Wow. <mood:WOW>");
        completion.queue_text("Again. <mood:LAUGH>");
        let mut pet = TestPet::builder().completion(completion).build();

        pet.click("one").await;
        pet.next_bubble().await;
        while pet.next_update().await != show(Animation::Idle) {}
        pet.click("two").await;
        pet.next_bubble().await;

        let requests = pet.completion.recorded_requests();
        let contents: Vec<_> = requests[1].messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "Wow.", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poke_shows_quote() {
        let mut pet = TestPet::builder()
            .quotes(MockQuotes::returning(doge_quote(0.1, Some(-6.0))))
            .build();

        pet.send(Event::Poke).await;
        assert_eq!(pet.next_update().await, show(Animation::Mood(Mood::Sad)));
        let bubble = pet.next_bubble().await;
        assert_eq!(bubble.kind, BubbleKind::Quote);
        assert_eq!(pet.quotes.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poke_without_price_says_so() {
        let mut pet = TestPet::builder().quotes(MockQuotes::failing()).build();

        pet.send(Event::Poke).await;
        assert_eq!(pet.next_update().await, show(Animation::Mood(Mood::Sad)));
        let bubble = pet.next_bubble().await;
        assert_eq!(bubble.text, QUOTE_UNAVAILABLE_TEXT);
        assert_eq!(bubble.kind, BubbleKind::Quote);

        assert_eq!(pet.next_update().await, SurfaceUpdate::HideBubble);
        assert_eq!(pet.next_update().await, show(Animation::Idle));
        assert!(pet.state().is_idle());
    }
}
