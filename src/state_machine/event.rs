//! Events that can reach the pet's event loop

use super::state::ChatReply;
use crate::enrich::PriceQuote;
use crate::llm::ChatError;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Surface events
    Click {
        query: String,
        issued_at: DateTime<Utc>,
    },
    /// Single click without a drag: show a quote now
    Poke,
    DragStart,
    DragEnd,

    // Worker completions
    ReplyReady {
        generation: u64,
        reply: ChatReply,
    },
    ReplyFailed {
        generation: u64,
        error: ChatError,
    },
    CredentialMissing {
        generation: u64,
    },

    // Timers
    BubbleExpired {
        bubble_id: u64,
    },
    IdleTick {
        quote: PriceQuote,
    },
    /// A poke's quote fetch failed or timed out
    QuoteUnavailable,
}

impl Event {
    /// Click stamped with the current wall-clock time
    pub fn click(query: impl Into<String>) -> Self {
        Event::Click {
            query: query.into(),
            issued_at: Utc::now(),
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Click { .. } => "click",
            Event::Poke => "poke",
            Event::DragStart => "drag_start",
            Event::DragEnd => "drag_end",
            Event::ReplyReady { .. } => "reply_ready",
            Event::ReplyFailed { .. } => "reply_failed",
            Event::CredentialMissing { .. } => "credential_missing",
            Event::BubbleExpired { .. } => "bubble_expired",
            Event::IdleTick { .. } => "idle_tick",
            Event::QuoteUnavailable => "quote_unavailable",
        }
    }
}
