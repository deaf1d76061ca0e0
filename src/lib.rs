//! # slotvisor
//!
//! **Slotvisor** is a session-affinity task dispatcher for Rust.
//!
//! It routes async tasks onto a bounded pool of stateful worker slots (a browser
//! tab, a database session, a connection pinned to a tenant) so that every task
//! for the same session runs on the one slot bound to it, strictly in submission
//! order. When the pool is full, idle slots are rebound to new sessions and
//! waiting sessions are served first-come first-served.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   submit("alice", T1)   submit("bob", T2)   submit("alice", T3)
//!           │                    │                    │
//!           ▼                    ▼                    ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  DispatcherActor (single owner of routing state)                  │
//! │  - AliasMap (alias → canonical session)                           │
//! │  - WorkerSlots (≤ worker_limit, each bound to ≤ 1 session)        │
//! │  - OverflowRegistry (order + pending, FIFO per session)           │
//! └──────┬──────────────────────────┬─────────────────────────┬───────┘
//!        ▼                          ▼                         │
//! ┌──────────────────┐      ┌──────────────────┐              │ create / open / close
//! │ slot 0 "alice"   │      │ slot 1 "bob"     │              ▼
//! │ TaskQueue [T1,T3]│      │ TaskQueue [T2]   │      ┌──────────────────┐
//! └┬─────────────────┘      └┬─────────────────┘      │  SessionBinder   │
//!  │ Publishes               │ Publishes              │  (your adapter)  │
//!  │ - TaskStarting          │ - TaskStarting         └──────────────────┘
//!  │ - TaskCompleted         │ - TimeoutHit
//!  │ - SlotDrained           │ - TaskFailed
//!  ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                     worker1  worker2  workerN
//! ```
//!
//! ### Routing
//! ```text
//! submit(key, task)
//!   ├─► "" ─────────────────────────────────────► Err(InvalidTarget)   (only sync error)
//!   └─► canonical key ─► first matching branch:
//!         1. slot bound/rebinding to key, or spawn pending ─► append to its queue
//!         2. slots + spawning < worker_limit ──────────────► create handle, open(key), new slot
//!         3. idle slot (oldest activity, lowest id) ────────► hand-off: pause, open(key), resume
//!         4. otherwise ────────────────────────────────────► overflow[key] (FIFO)
//!
//! slot drained ─► overflow head? ─► hand-off to it with all of its waiting tasks
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Dispatching**   | Session-affine routing over a bounded pool.                   | [`Dispatcher`], [`DispatcherBuilder`]      |
//! | **Sessions**      | Handles owned by your adapter; keys and aliases.              | [`SessionBinder`], [`SessionKey`]          |
//! | **Tasks**         | One-shot async work against a session handle.                 | [`Task`], [`TaskFn`], [`TaskHandle`]       |
//! | **Subscriber API**| Hook into routing and execution events.                       | [`Subscribe`], [`Event`], [`EventKind`]    |
//! | **Errors**        | Typed per-task outcomes and runtime errors.                   | [`DispatchError`], [`RuntimeError`]        |
//! | **Configuration** | Pool size, budgets, shutdown grace.                           | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber (renders events via `tracing`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use slotvisor::{BindError, BindOutcome, Config, Dispatcher, SessionBinder, SessionKey, TaskError, TaskFn};
//!
//! /// A connection that can be pointed at one conversation at a time.
//! struct Conn;
//!
//! struct Conns;
//!
//! #[async_trait]
//! impl SessionBinder for Conns {
//!     type Handle = Conn;
//!
//!     async fn create(&self) -> Result<Conn, BindError> { Ok(Conn) }
//!
//!     async fn open(&self, _: &Conn, session: &SessionKey) -> Result<BindOutcome, BindError> {
//!         if session.as_str().starts_with("closed-") {
//!             return Err(BindError::rejected(session.as_str(), "conversation archived"));
//!         }
//!         Ok(BindOutcome::unchanged())
//!     }
//!
//!     async fn close(&self, _: &Conn) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.worker_limit = 2;
//!     cfg.task_timeout = Duration::from_secs(5);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn slotvisor::Subscribe>> = vec![Arc::new(slotvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn slotvisor::Subscribe>> = Vec::new();
//!
//!     let dispatcher = Dispatcher::builder(cfg, Conns).with_subscribers(subs).build();
//!
//!     let send = dispatcher.submit(
//!         "alice",
//!         TaskFn::new("send", |_conn: Arc<Conn>| async move { Ok::<_, TaskError>(42) }),
//!     )?;
//!     assert_eq!(send.await?, 42);
//!
//!     let rejected = dispatcher.submit(
//!         "closed-bob",
//!         TaskFn::new("send", |_conn: Arc<Conn>| async move { Ok::<_, TaskError>(0) }),
//!     )?;
//!     assert_eq!(rejected.await.unwrap_err().as_label(), "bind_failure");
//!
//!     dispatcher.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod binder;
mod core;
mod error;
mod events;
mod session;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use binder::{BindOutcome, SessionBinder};
pub use core::{Config, Dispatcher, DispatcherBuilder, DispatcherSnapshot, SlotSnapshot};
pub use error::{BindError, DispatchError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use session::SessionKey;
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskHandle};

// Optional: expose the built-in tracing subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
