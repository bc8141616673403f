//! Periodic price bubbles while the pet is idle

use crate::runtime::QuoteSource;
use crate::state_machine::{Event, PetState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Single repeating timer that turns fresh quotes into `IdleTick` events.
///
/// The published state is only a hint to avoid needless fetches; the
/// transition function still rejects a tick that arrives while busy.
pub struct IdleScheduler<Q: QuoteSource> {
    quotes: Arc<Q>,
    state_rx: watch::Receiver<PetState>,
    event_tx: mpsc::Sender<Event>,
    first_tick: Duration,
    interval: Duration,
    fetch_timeout: Duration,
    cancel: CancellationToken,
}

impl<Q: QuoteSource + 'static> IdleScheduler<Q> {
    pub fn new(
        quotes: Arc<Q>,
        state_rx: watch::Receiver<PetState>,
        event_tx: mpsc::Sender<Event>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            quotes,
            state_rx,
            event_tx,
            first_tick: Duration::from_secs(2),
            interval: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(5),
            cancel,
        }
    }

    #[must_use]
    pub fn with_timing(
        mut self,
        first_tick: Duration,
        interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        self.first_tick = first_tick;
        self.interval = interval;
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(interval_secs = self.interval.as_secs(), "Idle scheduler started");

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                _ = ticker.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Idle scheduler stopped");
    }

    /// One tick. Returns false once the event loop is gone.
    async fn tick(&self) -> bool {
        let (idle, state) = {
            let snapshot = self.state_rx.borrow();
            (snapshot.is_idle(), snapshot.name())
        };
        if !idle {
            tracing::debug!(state, "Skipping idle tick, pet is busy");
            return true;
        }

        let quote = match tokio::time::timeout(self.fetch_timeout, self.quotes.quote()).await {
            Ok(Ok(quote)) => quote,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Idle quote fetch failed");
                return true;
            }
            Err(_) => {
                tracing::debug!("Idle quote fetch timed out");
                return true;
            }
        };

        self.event_tx.send(Event::IdleTick { quote }).await.is_ok()
    }
}
