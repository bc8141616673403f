//! Pet state types

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Mood & Animation
// ============================================================================

/// Emotional tag carried by a reply; drives animation selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mood {
    Happy,
    Laugh,
    Wow,
    Sad,
    #[default]
    Think,
}

impl Mood {
    pub const ALL: [Mood; 5] = [Mood::Happy, Mood::Laugh, Mood::Wow, Mood::Sad, Mood::Think];

    /// Case-insensitive token lookup. `None` for anything unrecognized.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "happy" => Some(Mood::Happy),
            "laugh" => Some(Mood::Laugh),
            "wow" => Some(Mood::Wow),
            "sad" => Some(Mood::Sad),
            "think" | "thinking" => Some(Mood::Think),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Mood::Happy => "HAPPY",
            Mood::Laugh => "LAUGH",
            Mood::Wow => "WOW",
            Mood::Sad => "SAD",
            Mood::Think => "THINK",
        }
    }

    pub fn animation(self) -> Animation {
        Animation::Mood(self)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// What the surface should be playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Idle,
    /// Reply in flight
    Thinking,
    Mood(Mood),
}

impl Animation {
    /// Asset file name for this animation
    pub fn asset(self) -> &'static str {
        match self {
            Animation::Idle => "3d-doge-spins-like-coin-idle.gif",
            Animation::Mood(Mood::Happy) => "doge-dances-full-body.gif",
            Animation::Mood(Mood::Laugh) => "doge-laughs.gif",
            Animation::Mood(Mood::Wow) => "doge-appears-disappears.gif",
            Animation::Mood(Mood::Sad) => "doge-shaking-head-in-circles.gif",
            Animation::Thinking | Animation::Mood(Mood::Think) => {
                "doge-in-waves-loading-glitching.gif"
            }
        }
    }
}

// ============================================================================
// Requests, Replies, Bubbles
// ============================================================================

/// A chat question issued by a click. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub query: String,
    pub context: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            query: query.into(),
            context: None,
            issued_at,
        }
    }

    /// Copy of this request carrying the merged enrichment context.
    /// Blank context is dropped.
    #[must_use]
    pub fn with_context(&self, context: String) -> Self {
        Self {
            query: self.query.clone(),
            context: if context.trim().is_empty() {
                None
            } else {
                Some(context)
            },
            issued_at: self.issued_at,
        }
    }
}

/// Parsed model output: mood plus word-capped visible text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub mood: Mood,
    pub text: String,
}

/// Where a bubble came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    Chat,
    Quote,
}

/// On-screen speech bubble with an expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub id: u64,
    pub text: String,
    pub mood: Mood,
    pub kind: BubbleKind,
    pub display_until: Instant,
}

// ============================================================================
// Pet State
// ============================================================================

/// The single active interaction state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PetState {
    /// Nothing going on
    #[default]
    Idle,

    /// User is moving the pet around
    Dragging,

    /// Chat request in flight
    AwaitingReply {
        generation: u64,
        request: ChatRequest,
    },

    /// Showing a bubble until it expires or is preempted
    Speaking { bubble: Bubble },
}

impl PetState {
    pub fn is_idle(&self) -> bool {
        matches!(self, PetState::Idle)
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            PetState::Idle => "idle",
            PetState::Dragging => "dragging",
            PetState::AwaitingReply { .. } => "awaiting_reply",
            PetState::Speaking { .. } => "speaking",
        }
    }

    pub fn bubble(&self) -> Option<&Bubble> {
        match self {
            PetState::Speaking { bubble } => Some(bubble),
            _ => None,
        }
    }
}

/// State plus the counters that tag asynchronous results.
///
/// `generation` increases on every accepted click; replies carry the
/// generation they were issued under. `bubble_seq` numbers bubbles so that
/// a preempted bubble's expiry timer cannot close its successor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PetModel {
    pub state: PetState,
    pub generation: u64,
    pub bubble_seq: u64,
}

impl PetModel {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Immutable per-controller configuration
#[derive(Debug, Clone)]
pub struct PetContext {
    /// How long chat bubbles stay up
    pub bubble_duration: Duration,
    /// How long idle/quote bubbles stay up before reverting to Idle
    pub revert_delay: Duration,
    /// Sentence shown (with `Sad`) when a chat fails
    pub fallback_text: String,
    /// Shown (with `Sad`) when a poke cannot get a price
    pub quote_unavailable_text: String,
}

pub const DEFAULT_FALLBACK_TEXT: &str = "Much confuse. Such network trouble. Try again later.";
pub const QUOTE_UNAVAILABLE_TEXT: &str = "Price unavailable.";

impl PetContext {
    pub fn new(bubble_duration: Duration, revert_delay: Duration) -> Self {
        Self {
            bubble_duration,
            revert_delay,
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            quote_unavailable_text: QUOTE_UNAVAILABLE_TEXT.to_string(),
        }
    }
}
