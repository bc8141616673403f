//! Core pet state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{
    Animation, Bubble, BubbleKind, ChatReply, ChatRequest, Mood, PetContext, PetModel, PetState,
    DEFAULT_FALLBACK_TEXT, QUOTE_UNAVAILABLE_TEXT,
};
pub use transition::{transition, TransitionError};
