//! Pure state transition function
//!
//! Every trigger the pet can see goes through here. The function never does
//! I/O; it returns the next model plus the effects the runtime must carry out.

use super::state::{
    Animation, Bubble, BubbleKind, ChatRequest, Mood, PetContext, PetModel, PetState,
};
use super::{Effect, Event};
use crate::enrich::PriceQuote;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_model: PetModel,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(model: PetModel) -> Self {
        Self {
            new_model: model,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Reasons an event was not applied. None of these mutate the model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Pet is busy ({0}), ignoring trigger")]
    Busy(&'static str),
    #[error("Discarding stale result from generation {generation} (current {current})")]
    StaleResult { generation: u64, current: u64 },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same model, context, event and instant it always produces the
/// same result.
pub fn transition(
    model: &PetModel,
    ctx: &PetContext,
    event: Event,
    now: Instant,
) -> Result<TransitionResult, TransitionError> {
    match (&model.state, event) {
        // ============================================================
        // Clicks (single-flight)
        // ============================================================

        // Idle + Click -> AwaitingReply
        (PetState::Idle, Event::Click { query, issued_at }) => {
            let generation = model.generation + 1;
            let request = ChatRequest::new(query, issued_at);
            Ok(TransitionResult::new(PetModel {
                state: PetState::AwaitingReply {
                    generation,
                    request: request.clone(),
                },
                generation,
                bubble_seq: model.bubble_seq,
            })
            .with_effect(Effect::show(Animation::Thinking))
            .with_effect(Effect::RequestChat {
                generation,
                request,
            }))
        }

        (state, Event::Click { .. }) => Err(TransitionError::Busy(state.name())),

        // Idle + Poke -> Idle, quote fetched off the loop
        (PetState::Idle, Event::Poke) => {
            Ok(TransitionResult::new(model.clone()).with_effect(Effect::FetchQuote))
        }

        (state, Event::Poke) => Err(TransitionError::Busy(state.name())),

        // ============================================================
        // Dragging
        // ============================================================

        (PetState::Dragging, Event::DragStart) => Ok(TransitionResult::new(model.clone())),

        // Any + DragStart -> Dragging. An in-flight request keeps running; its
        // result will be rejected because the state left AwaitingReply.
        (state, Event::DragStart) => {
            let result = TransitionResult::new(model.with_state(PetState::Dragging));
            Ok(match state {
                PetState::Speaking { .. } => result
                    .with_effect(Effect::HideBubble)
                    .with_effect(Effect::show(Animation::Idle)),
                PetState::AwaitingReply { .. } => {
                    result.with_effect(Effect::show(Animation::Idle))
                }
                _ => result,
            })
        }

        (PetState::Dragging, Event::DragEnd) => {
            Ok(TransitionResult::new(model.with_state(PetState::Idle)))
        }

        (state, Event::DragEnd) => Err(TransitionError::InvalidTransition(format!(
            "drag_end while {}",
            state.name()
        ))),

        // ============================================================
        // Chat results
        // ============================================================

        (
            PetState::AwaitingReply {
                generation,
                request,
            },
            Event::ReplyReady {
                generation: got,
                reply,
            },
        ) if *generation == got => {
            let (next, bubble) = model.speak(
                reply.text.clone(),
                reply.mood,
                BubbleKind::Chat,
                deadline(now, ctx.bubble_duration),
            );
            Ok(TransitionResult::new(next)
                .with_effects(bubble_effects(&bubble, ctx.bubble_duration))
                .with_effect(Effect::RecordExchange {
                    query: request.query.clone(),
                    reply,
                }))
        }

        (PetState::AwaitingReply { generation, .. }, Event::ReplyFailed { generation: got, .. })
            if *generation == got =>
        {
            let (next, bubble) = model.speak(
                ctx.fallback_text.clone(),
                Mood::Sad,
                BubbleKind::Chat,
                deadline(now, ctx.bubble_duration),
            );
            Ok(TransitionResult::new(next)
                .with_effects(bubble_effects(&bubble, ctx.bubble_duration)))
        }

        (PetState::AwaitingReply { generation, .. }, Event::CredentialMissing { generation: got })
            if *generation == got =>
        {
            Ok(TransitionResult::new(model.with_state(PetState::Idle))
                .with_effect(Effect::show(Animation::Idle))
                .with_effect(Effect::PromptCredential))
        }

        (
            _,
            Event::ReplyReady { generation, .. }
            | Event::ReplyFailed { generation, .. }
            | Event::CredentialMissing { generation },
        ) => Err(TransitionError::StaleResult {
            generation,
            current: model.generation,
        }),

        // ============================================================
        // Bubble expiry (idempotent)
        // ============================================================

        (PetState::Speaking { bubble }, Event::BubbleExpired { bubble_id })
            if bubble.id == bubble_id =>
        {
            Ok(TransitionResult::new(model.with_state(PetState::Idle))
                .with_effect(Effect::HideBubble)
                .with_effect(Effect::show(Animation::Idle)))
        }

        (_, Event::BubbleExpired { .. }) => Ok(TransitionResult::new(model.clone())),

        // ============================================================
        // Idle quotes
        // ============================================================

        (PetState::Idle, Event::IdleTick { quote }) => {
            let (next, bubble) = model.speak(
                quote.summary(),
                price_mood(&quote),
                BubbleKind::Quote,
                deadline(now, ctx.revert_delay),
            );
            Ok(TransitionResult::new(next).with_effects(bubble_effects(&bubble, ctx.revert_delay)))
        }

        (state, Event::IdleTick { .. }) => Err(TransitionError::Busy(state.name())),

        // Idle + QuoteUnavailable -> Speaking. Only a poke asks for this.
        (PetState::Idle, Event::QuoteUnavailable) => {
            let (next, bubble) = model.speak(
                ctx.quote_unavailable_text.clone(),
                Mood::Sad,
                BubbleKind::Quote,
                deadline(now, ctx.revert_delay),
            );
            Ok(TransitionResult::new(next).with_effects(bubble_effects(&bubble, ctx.revert_delay)))
        }

        (state, Event::QuoteUnavailable) => Err(TransitionError::Busy(state.name())),
    }
}

impl PetModel {
    fn with_state(&self, state: PetState) -> Self {
        Self {
            state,
            generation: self.generation,
            bubble_seq: self.bubble_seq,
        }
    }

    /// Next model showing a fresh bubble, plus that bubble
    fn speak(
        &self,
        text: String,
        mood: Mood,
        kind: BubbleKind,
        display_until: Instant,
    ) -> (Self, Bubble) {
        let bubble = Bubble {
            id: self.bubble_seq + 1,
            text,
            mood,
            kind,
            display_until,
        };
        let next = Self {
            state: PetState::Speaking {
                bubble: bubble.clone(),
            },
            generation: self.generation,
            bubble_seq: bubble.id,
        };
        (next, bubble)
    }
}

/// `now + delay`, or `now` when that instant is not representable. Expiry
/// is driven by the revert timer, never by this value.
fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or(now)
}

fn bubble_effects(bubble: &Bubble, delay: Duration) -> [Effect; 3] {
    [
        Effect::show(bubble.mood.animation()),
        Effect::schedule_revert(bubble, delay),
        Effect::show_bubble(bubble.clone()),
    ]
}

/// Mood for an idle price bubble, from the 24h change
pub fn price_mood(quote: &PriceQuote) -> Mood {
    match quote.change_24h {
        Some(change) if change >= 5.0 => Mood::Wow,
        Some(change) if change > 0.0 => Mood::Happy,
        Some(change) if change <= -5.0 => Mood::Sad,
        _ => Mood::Think,
    }
}
