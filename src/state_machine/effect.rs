//! Effects produced by state transitions

use super::state::{Animation, Bubble, ChatRequest, ChatReply};
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Switch the surface animation
    ShowAnimation { animation: Animation },

    /// Display a bubble
    ShowBubble { bubble: Bubble },

    /// Remove whatever bubble is displayed
    HideBubble,

    /// Enrich and send a chat request (spawns as background task)
    RequestChat {
        generation: u64,
        request: ChatRequest,
    },

    /// Fetch a quote off the loop; delivered back as `IdleTick`, or as
    /// `QuoteUnavailable` on failure
    FetchQuote,

    /// Deliver `BubbleExpired` after `delay`
    ScheduleRevert { bubble_id: u64, delay: Duration },

    /// Remember an applied exchange in the conversation history
    RecordExchange { query: String, reply: ChatReply },

    /// Ask the surface to collect an API key
    PromptCredential,
}

impl Effect {
    pub fn show(animation: Animation) -> Self {
        Effect::ShowAnimation { animation }
    }

    pub fn show_bubble(bubble: Bubble) -> Self {
        Effect::ShowBubble { bubble }
    }

    pub fn schedule_revert(bubble: &Bubble, delay: Duration) -> Self {
        Effect::ScheduleRevert {
            bubble_id: bubble.id,
            delay,
        }
    }
}
