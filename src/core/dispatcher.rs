//! # Dispatcher: session-affine task routing over a bounded pool of slots.
//!
//! The [`Dispatcher`] accepts `(session, task)` submissions and guarantees that all
//! tasks for one session run on the one worker slot bound to it, sequentially, in
//! submission order. At most `worker_limit` slots exist; when all are busy, sessions
//! wait in an overflow registry and are served first-come first-served as slots drain.
//!
//! ## High-level architecture
//! ```text
//! submit(key, task) ──► Job + TaskHandle ──► Command::Submit ──► DispatcherActor
//!                          │                                       ├─► slot queue (affinity)
//!                          ▼                                       ├─► spawn slot (capacity)
//!                     caller awaits                                ├─► hand-off idle slot (eviction)
//!                                                                  └─► overflow registry
//!
//! SessionBinder ◄── create / open / close (spawned off the actor)
//!
//! Actor, queues, bind tasks ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                    └──► Dispatcher::subscribe()
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use slotvisor::{BindError, BindOutcome, Config, Dispatcher, SessionBinder, SessionKey, TaskError, TaskFn};
//!
//! struct Pages;
//!
//! #[async_trait]
//! impl SessionBinder for Pages {
//!     type Handle = String;
//!     async fn create(&self) -> Result<String, BindError> { Ok(String::new()) }
//!     async fn open(&self, _: &String, _: &SessionKey) -> Result<BindOutcome, BindError> {
//!         Ok(BindOutcome::unchanged())
//!     }
//!     async fn close(&self, _: &String) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(Config::default(), Pages);
//!
//!     let reply = dispatcher.submit(
//!         "100012345",
//!         TaskFn::new("send", |_page: Arc<String>| async move { Ok::<_, TaskError>("sent") }),
//!     )?;
//!     assert_eq!(reply.await?, "sent");
//!
//!     dispatcher.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::actor::Command;
use super::builder::DispatcherBuilder;
use super::config::Config;
use super::shutdown;
use super::snapshot::DispatcherSnapshot;
use crate::binder::SessionBinder;
use crate::error::{DispatchError, RuntimeError};
use crate::events::{Bus, Event};
use crate::session::SessionKey;
use crate::tasks::{Job, Task, TaskHandle};

/// Routes tasks to session-bound worker slots.
///
/// Dropping the dispatcher without calling [`shutdown`](Self::shutdown) stops every
/// worker; outstanding handles resolve to [`DispatchError::DispatcherClosed`] and
/// session handles are dropped without [`SessionBinder::close`].
pub struct Dispatcher<B: SessionBinder> {
    cfg: Config,
    bus: Bus,
    tx: mpsc::UnboundedSender<Command<B::Handle>>,
    next_id: AtomicU64,
    token: CancellationToken,
    _binder: PhantomData<fn() -> B>,
}

impl<B: SessionBinder> Dispatcher<B> {
    /// Returns a builder for a dispatcher with subscribers.
    pub fn builder(cfg: Config, binder: B) -> DispatcherBuilder<B> {
        DispatcherBuilder::new(cfg, binder)
    }

    /// Creates a dispatcher without subscribers.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn new(cfg: Config, binder: B) -> Self {
        DispatcherBuilder::new(cfg, binder).build()
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        tx: mpsc::UnboundedSender<Command<B::Handle>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            tx,
            next_id: AtomicU64::new(0),
            token,
            _binder: PhantomData,
        }
    }

    /// Submits `task` for `session` and returns its result future immediately.
    ///
    /// Never blocks. The only synchronous error is [`DispatchError::InvalidTarget`]
    /// for an empty session key; every other outcome arrives through the handle.
    pub fn submit<T>(
        &self,
        session: impl AsRef<str>,
        task: T,
    ) -> Result<TaskHandle<T::Output>, DispatchError>
    where
        T: Task<B::Handle>,
    {
        let session = SessionKey::new(session)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (job, handle) = Job::seal(id, session, task);

        // A stopped actor drops the job; the handle then resolves to DispatcherClosed.
        let _ = self.tx.send(Command::Submit(job));
        Ok(handle)
    }

    /// Returns a point-in-time view of slots, pending spawns and overflow.
    pub async fn snapshot(&self) -> Result<DispatcherSnapshot, DispatchError> {
        self.request(Command::Snapshot).await
    }

    /// Resolves `key` through the alias map to the session it routes to.
    pub async fn resolve(&self, key: impl AsRef<str>) -> Result<SessionKey, DispatchError> {
        let key = SessionKey::new(key)?;
        self.request(|reply| Command::Resolve { key, reply }).await
    }

    /// Explicitly points `alias` at `session`, replacing any earlier target.
    ///
    /// Returns the previous target. Aliases learned from binds never overwrite each
    /// other; this is the only way to move one.
    pub async fn rebind_alias(
        &self,
        alias: impl AsRef<str>,
        session: impl AsRef<str>,
    ) -> Result<Option<SessionKey>, DispatchError> {
        let alias = SessionKey::new(alias)?;
        let session = SessionKey::new(session)?;
        self.request(|reply| Command::RebindAlias {
            alias,
            session,
            reply,
        })
        .await
    }

    /// Subscribes to the runtime event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Returns the configuration this dispatcher was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Shuts the dispatcher down.
    ///
    /// Rejects every task that has not finished with [`DispatchError::DispatcherClosed`],
    /// closes every session handle, and waits up to [`Config::grace`] for binds still in
    /// flight. Calling it again, concurrently or afterwards, is harmless.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(tx)).is_err() {
            return Ok(());
        }
        match rx.await {
            Ok(Err(stuck)) => Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            }),
            Ok(Ok(())) | Err(_) => Ok(()),
        }
    }

    /// Waits for a termination signal (SIGINT/SIGTERM/SIGQUIT, Ctrl-C elsewhere), then shuts down.
    pub async fn shutdown_on_signal(&self) -> Result<(), RuntimeError> {
        if let Err(e) = shutdown::wait_for_termination().await {
            tracing::warn!(error = %e, "signal handlers unavailable; shutting down now");
        }
        self.shutdown().await
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> Command<B::Handle>,
    ) -> Result<R, DispatchError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(make(tx))
            .map_err(|_| DispatchError::DispatcherClosed)?;
        rx.await.map_err(|_| DispatchError::DispatcherClosed)
    }
}

impl<B: SessionBinder> Drop for Dispatcher<B> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
