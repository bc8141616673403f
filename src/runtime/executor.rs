//! Pet runtime executor

use super::traits::{CompletionService, CredentialStore, QuoteSource, SnippetSource};
use super::{PetHandle, SurfaceUpdate};

use crate::chat::{ChatClient, ConversationHistory};
use crate::credentials::CredentialError;
use crate::enrich::ContextEnricher;
use crate::state_machine::{
    transition, ChatRequest, Effect, Event, PetContext, PetModel, PetState, TransitionError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const EVENT_QUEUE_SIZE: usize = 64;
const BROADCAST_CAPACITY: usize = 128;

/// Event loop that owns the pet model and runs effects.
///
/// Everything slow happens in spawned workers that report back through the
/// event queue, so the loop itself only ever awaits the next event.
pub struct PetRuntime<C, W, Q, S>
where
    C: CompletionService + 'static,
    W: SnippetSource + 'static,
    Q: QuoteSource + 'static,
    S: CredentialStore + 'static,
{
    context: PetContext,
    model: PetModel,
    chat: ChatClient<C>,
    enricher: Arc<ContextEnricher<W, Q>>,
    quotes: Arc<Q>,
    credentials: Arc<S>,
    /// Owned by the loop; workers get a copy
    history: ConversationHistory,
    provider_timeout: Duration,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SurfaceUpdate>,
    state_tx: watch::Sender<PetState>,
    shutdown: CancellationToken,
}

impl<C, W, Q, S> PetRuntime<C, W, Q, S>
where
    C: CompletionService + 'static,
    W: SnippetSource + 'static,
    Q: QuoteSource + 'static,
    S: CredentialStore + 'static,
{
    pub fn new(
        context: PetContext,
        chat: ChatClient<C>,
        enricher: Arc<ContextEnricher<W, Q>>,
        quotes: Arc<Q>,
        credentials: Arc<S>,
        history: ConversationHistory,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, _) = watch::channel(PetState::Idle);

        Self {
            context,
            model: PetModel::new(),
            chat,
            enricher,
            quotes,
            credentials,
            history,
            provider_timeout: Duration::from_secs(5),
            event_rx,
            event_tx,
            broadcast_tx,
            state_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Bound on the quote fetch behind a poke
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Stop the loop when `token` is cancelled
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn handle(&self) -> PetHandle {
        PetHandle {
            event_tx: self.event_tx.clone(),
            broadcast_tx: self.broadcast_tx.clone(),
            state_rx: self.state_tx.subscribe(),
        }
    }

    pub async fn run(mut self) {
        tracing::info!(model = %self.chat.model_id(), "Starting pet runtime");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => self.process_event(event),

                else => break,
            }
        }

        tracing::info!("Pet runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let event_name = event.name();
        let result = match transition(&self.model, &self.context, event, Instant::now()) {
            Ok(result) => result,
            Err(e @ TransitionError::StaleResult { .. }) => {
                tracing::debug!(event = event_name, error = %e, "Discarding stale result");
                return;
            }
            Err(e) => {
                tracing::info!(event = event_name, error = %e, "Event rejected");
                return;
            }
        };

        let previous = self.model.state.name();
        self.model = result.new_model;
        if previous != self.model.state.name() {
            tracing::debug!(
                event = event_name,
                from = previous,
                to = self.model.state.name(),
                generation = self.model.generation,
                "State changed"
            );
        }
        self.state_tx.send_replace(self.model.state.clone());

        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ShowAnimation { animation } => {
                self.notify(SurfaceUpdate::ShowAnimation { animation });
            }

            Effect::ShowBubble { bubble } => {
                self.notify(SurfaceUpdate::ShowBubble { bubble });
            }

            Effect::HideBubble => self.notify(SurfaceUpdate::HideBubble),

            Effect::PromptCredential => self.notify(SurfaceUpdate::PromptCredential),

            Effect::RequestChat {
                generation,
                request,
            } => {
                let chat = self.chat.clone();
                let enricher = self.enricher.clone();
                let credentials = self.credentials.clone();
                let history = self.history.clone();
                let event_tx = self.event_tx.clone();
                let request_id = Uuid::new_v4();

                tokio::spawn(async move {
                    tracing::info!(%request_id, generation, "Asking (background)");
                    let event = ask_in_background(
                        generation,
                        request,
                        &chat,
                        enricher.as_ref(),
                        credentials.as_ref(),
                        &history,
                        request_id,
                    )
                    .await;
                    // The loop is gone only during shutdown
                    let _ = event_tx.send(event).await;
                });
            }

            Effect::ScheduleRevert { bubble_id, delay } => {
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = event_tx.send(Event::BubbleExpired { bubble_id }).await;
                });
            }

            Effect::FetchQuote => {
                let quotes = self.quotes.clone();
                let event_tx = self.event_tx.clone();
                let timeout = self.provider_timeout;
                tokio::spawn(async move {
                    let event = match tokio::time::timeout(timeout, quotes.quote()).await {
                        Ok(Ok(quote)) => Event::IdleTick { quote },
                        Ok(Err(e)) => {
                            tracing::info!(error = %e, "Quote fetch failed");
                            Event::QuoteUnavailable
                        }
                        Err(_) => {
                            tracing::info!("Quote fetch timed out");
                            Event::QuoteUnavailable
                        }
                    };
                    let _ = event_tx.send(event).await;
                });
            }

            Effect::RecordExchange { query, reply } => {
                self.history.record(&query, &reply.text);
            }
        }
    }

    fn notify(&self, update: SurfaceUpdate) {
        // No subscribers is fine; nothing is drawing yet
        let _ = self.broadcast_tx.send(update);
    }
}

/// Credential check, enrichment and the chat call, in that order
async fn ask_in_background<C, W, Q, S>(
    generation: u64,
    request: ChatRequest,
    chat: &ChatClient<C>,
    enricher: &ContextEnricher<W, Q>,
    credentials: &S,
    history: &ConversationHistory,
    request_id: Uuid,
) -> Event
where
    C: CompletionService,
    W: SnippetSource,
    Q: QuoteSource,
    S: CredentialStore + ?Sized,
{
    let credential = match credentials.get() {
        Ok(credential) => credential,
        Err(CredentialError::Missing) => {
            tracing::info!(%request_id, "No API key configured");
            return Event::CredentialMissing { generation };
        }
        Err(e) => {
            tracing::warn!(%request_id, error = %e, "Could not read API key");
            return Event::CredentialMissing { generation };
        }
    };

    let context = enricher.enrich(&request.query).await;
    let request = request.with_context(context);
    tracing::debug!(
        %request_id,
        has_context = request.context.is_some(),
        "Context enrichment finished"
    );

    match chat.ask(&request, history, &credential).await {
        Ok(reply) => {
            tracing::info!(%request_id, mood = %reply.mood, "Reply ready");
            Event::ReplyReady { generation, reply }
        }
        Err(error) => {
            tracing::warn!(%request_id, kind = %error.kind, error = %error.message, "Chat failed");
            Event::ReplyFailed { generation, error }
        }
    }
}
