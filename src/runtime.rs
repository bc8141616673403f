//! Runtime for the pet
//!
//! One event loop owns the `PetModel`. Surfaces, timers and workers talk to
//! it only through the inbound event queue; it talks back through
//! `SurfaceUpdate` broadcasts and a `watch` snapshot of the current state.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::PetRuntime;
pub use traits::*;

use crate::state_machine::{Animation, Bubble, Event, PetState};
use tokio::sync::{broadcast, mpsc, watch};

/// Instructions for whatever is drawing the pet
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceUpdate {
    ShowAnimation { animation: Animation },
    ShowBubble { bubble: Bubble },
    HideBubble,
    /// Ask the user for an API key
    PromptCredential,
}

/// Handle to interact with a running pet
#[derive(Clone)]
pub struct PetHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SurfaceUpdate>,
    pub state_rx: watch::Receiver<PetState>,
}

impl PetHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceUpdate> {
        self.broadcast_tx.subscribe()
    }

    /// Current state as last published by the event loop
    pub fn state(&self) -> PetState {
        self.state_rx.borrow().clone()
    }
}
