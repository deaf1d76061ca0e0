use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_util::sync::CancellationToken;

use super::{actor::DispatcherActor, config::Config, dispatcher::Dispatcher};
use crate::{
    binder::SessionBinder,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Dispatcher`] with optional subscribers.
pub struct DispatcherBuilder<B> {
    cfg: Config,
    binder: B,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<B: SessionBinder> DispatcherBuilder<B> {
    /// Creates a new builder with the given configuration and binder.
    pub fn new(cfg: Config, binder: B) -> Self {
        Self {
            cfg,
            binder,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (routing, hand-offs, task lifecycle)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the dispatcher and starts its actor.
    ///
    /// Initializes the event bus, the subscriber workers (if any) and the
    /// dispatcher actor.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Dispatcher<B> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let token = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(&bus, subs, token.clone());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let actor = DispatcherActor::new(
            self.cfg.clone(),
            Arc::new(self.binder),
            bus.clone(),
            tx.clone(),
            token.clone(),
        );
        tokio::spawn(actor.run(rx));

        Dispatcher::new_internal(self.cfg, bus, tx, token)
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
///
/// Events already published when the runtime token is cancelled are still delivered.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}
