//! # DispatcherActor: single owner of routing state.
//!
//! Every state transition (routing a submission, finishing a bind, reacting to a
//! drained queue, shutdown) is serialised through one command channel consumed by
//! this actor. Binder I/O and task execution never run on it: binds are spawned and
//! report back with [`Command::Bound`] / [`Command::Spawned`], queues report with
//! [`Command::Drained`]. With a queue timeout configured, every submission arms a
//! timer that reports [`Command::Expire`]; a task still waiting anywhere by then is
//! dropped with `QueueTimeout`.
//!
//! ## Routing (one branch per submission, in order)
//! ```text
//! Submit(job) ─► canonical key (AliasMap)
//!   ├─ 1. affinity:   slot bound / rebinding to key, or spawn pending ─► append
//!   ├─ 2. capacity:   slots + spawning < worker_limit ─► spawn slot (create + open)
//!   ├─ 3. eviction:   idle slot, oldest activity (tie: lowest id) ─► hand-off
//!   └─ 4. overflow:   park in OverflowRegistry
//! ```
//! Branches 2 and 3 carry the key's overflowed tasks ahead of the new one.
//!
//! ## Hand-off
//! ```text
//! begin_handoff (pause) ─► push tasks ─► spawn open() ─► Bound ─┬─ Ok  ─► finish_handoff (resume), record alias
//!                                                               └─ Err ─► reject queued (BindFailure), offer slot to overflow head
//! ```
//!
//! ## Shutdown
//! ```text
//! Shutdown ─► ShutdownRequested ─► reject overflow/spawning ─► stop queues ─► close idle handles
//!          ─► wait for in-flight binds (≤ grace) ─► ShutdownComplete | GraceExceeded
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::alias::AliasMap;
use super::config::Config;
use super::overflow::OverflowRegistry;
use super::queue::TaskQueue;
use super::runner::Budgets;
use super::slot::WorkerSlot;
use super::snapshot::{DispatcherSnapshot, SlotSnapshot};
use crate::binder::{BindOutcome, SessionBinder};
use crate::error::{BindError, DispatchError};
use crate::events::{Bus, Event, EventKind};
use crate::session::SessionKey;
use crate::tasks::Job;

/// Outcome reported to `shutdown()` callers: `Err` lists sessions still binding at the deadline.
pub(crate) type ShutdownReport = Result<(), Vec<String>>;

/// Why a slot could not be spawned.
pub(crate) enum SpawnFailure {
    Create(BindError),
    Bind(BindError),
}

/// Messages consumed by the actor.
pub(crate) enum Command<H> {
    Submit(Job<H>),
    Drained {
        slot: usize,
    },
    Expire {
        id: u64,
    },
    Bound {
        slot: usize,
        session: SessionKey,
        result: Result<BindOutcome, BindError>,
    },
    Spawned {
        session: SessionKey,
        result: Result<(H, BindOutcome), SpawnFailure>,
    },
    Snapshot(oneshot::Sender<DispatcherSnapshot>),
    Resolve {
        key: SessionKey,
        reply: oneshot::Sender<SessionKey>,
    },
    RebindAlias {
        alias: SessionKey,
        session: SessionKey,
        reply: oneshot::Sender<Option<SessionKey>>,
    },
    Shutdown(oneshot::Sender<ShutdownReport>),
}

struct Closing {
    waiters: Vec<oneshot::Sender<ShutdownReport>>,
    deadline: Option<Instant>,
}

pub(crate) struct DispatcherActor<B: SessionBinder> {
    cfg: Config,
    binder: Arc<B>,
    bus: Bus,
    tx: mpsc::UnboundedSender<Command<B::Handle>>,
    token: CancellationToken,

    slots: Vec<WorkerSlot<B::Handle>>,
    spawning: HashMap<SessionKey, VecDeque<Job<B::Handle>>>,
    overflow: OverflowRegistry<B::Handle>,
    aliases: AliasMap,
    closing: Option<Closing>,
}

impl<B: SessionBinder> DispatcherActor<B> {
    pub(crate) fn new(
        cfg: Config,
        binder: Arc<B>,
        bus: Bus,
        tx: mpsc::UnboundedSender<Command<B::Handle>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            binder,
            bus,
            tx,
            token,
            slots: Vec::new(),
            spawning: HashMap::new(),
            overflow: OverflowRegistry::new(),
            aliases: AliasMap::new(),
            closing: None,
        }
    }

    /// Serves commands until shutdown completes or the runtime token is cancelled.
    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command<B::Handle>>) {
        let token = self.token.clone();
        tokio::select! {
            _ = token.cancelled() => {}
            _ = self.serve(&mut rx) => {}
        }
        self.abandon();
    }

    async fn serve(&mut self, rx: &mut mpsc::UnboundedReceiver<Command<B::Handle>>) {
        loop {
            let deadline = self.closing.as_ref().and_then(|c| c.deadline);
            let cmd = tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => return,
                },
                _ = grace_elapsed(deadline) => {
                    self.expire_grace();
                    return;
                }
            };
            self.handle(cmd).await;
            if self.try_finish_shutdown() {
                return;
            }
        }
    }

    async fn handle(&mut self, cmd: Command<B::Handle>) {
        match cmd {
            Command::Submit(job) => {
                self.arm_expiry(&job);
                self.route(job);
            }
            Command::Drained { slot } => self.on_drained(slot),
            Command::Expire { id } => self.on_expired(id),
            Command::Bound {
                slot,
                session,
                result,
            } => self.on_bound(slot, session, result).await,
            Command::Spawned { session, result } => self.on_spawned(session, result).await,
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Resolve { key, reply } => {
                let _ = reply.send(self.aliases.canonical(&key));
            }
            Command::RebindAlias {
                alias,
                session,
                reply,
            } => {
                let previous = self.aliases.rebind(alias.as_str(), &session);
                tracing::info!(%alias, %session, ?previous, "alias rebound");
                let _ = reply.send(previous);
            }
            Command::Shutdown(reply) => self.begin_shutdown(reply).await,
        }
    }

    // ---------------------------
    // Routing
    // ---------------------------

    fn route(&mut self, mut job: Job<B::Handle>) {
        if self.closing.is_some() {
            job.reject(DispatchError::DispatcherClosed);
            return;
        }

        let key = self.aliases.canonical(job.session());
        job.set_session(key.clone());

        if let Some(slot) = self.slots.iter().find(|s| s.serves(&key)) {
            self.bus
                .publish(job_event(EventKind::TaskQueued, &job).with_slot(slot.id));
            slot.queue.push(job);
            return;
        }
        if let Some(waiting) = self.spawning.get_mut(&key) {
            self.bus.publish(job_event(EventKind::TaskQueued, &job));
            waiting.push_back(job);
            return;
        }

        if self.has_capacity() {
            let mut jobs = self.overflow.take(&key);
            jobs.push_back(job);
            self.spawn_slot(key, jobs);
            return;
        }

        if let Some(idx) = self.idle_slot() {
            // Sessions already waiting keep their turn; the head may even be this key.
            if let Some((head, waiting)) = self.overflow.pop_next() {
                self.hand_off(idx, head, waiting);
                return self.route(job);
            }
            self.hand_off(idx, key, VecDeque::from([job]));
            return;
        }

        self.bus.publish(job_event(EventKind::TaskOverflowed, &job));
        self.overflow.push(job);
    }

    fn has_capacity(&self) -> bool {
        self.slots.len() + self.spawning.len() < self.cfg.worker_limit_clamped()
    }

    /// Idle slot with the oldest activity; ties go to the lowest id.
    fn idle_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .filter(|s| s.is_idle())
            .min_by_key(|s| (s.last_activity(), s.id))
            .map(|s| s.id)
    }

    /// Spawns slots for overflowed sessions while capacity allows.
    fn fill_capacity(&mut self) {
        while self.has_capacity() {
            let Some((session, jobs)) = self.overflow.pop_next() else {
                break;
            };
            self.spawn_slot(session, jobs);
        }
    }

    /// Offers slot `idx` to the oldest overflowed session.
    fn reassign(&mut self, idx: usize) {
        if let Some((session, jobs)) = self.overflow.pop_next() {
            self.hand_off(idx, session, jobs);
        }
    }

    // ---------------------------
    // Queue timeout
    // ---------------------------

    fn arm_expiry(&self, job: &Job<B::Handle>) {
        let Some(limit) = self.cfg.queue_timeout() else {
            return;
        };
        let Some(at) = job.submitted_at().checked_add(limit) else {
            return;
        };
        let id = job.id();
        let tx = self.tx.clone();
        let token = self.token.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = time::sleep_until(at) => {
                    let _ = tx.send(Command::Expire { id });
                }
            }
        });
    }

    /// Drops task `id` if it has not started yet. Started or settled tasks are left alone.
    fn on_expired(&mut self, id: u64) {
        let Some(limit) = self.cfg.queue_timeout() else {
            return;
        };
        if let Some(job) = self.overflow.remove(id) {
            expire(&self.bus, job, None, limit);
            return;
        }
        for jobs in self.spawning.values_mut() {
            if let Some(pos) = jobs.iter().position(|j| j.id() == id) {
                if let Some(job) = jobs.remove(pos) {
                    expire(&self.bus, job, None, limit);
                }
                return;
            }
        }
        let found = self
            .slots
            .iter()
            .find_map(|s| s.queue.remove(id).map(|job| (s.id, job)));
        if let Some((idx, job)) = found {
            expire(&self.bus, job, Some(idx), limit);
            self.on_drained(idx);
        }
    }

    // ---------------------------
    // Spawning
    // ---------------------------

    fn spawn_slot(&mut self, session: SessionKey, jobs: VecDeque<Job<B::Handle>>) {
        self.bus
            .publish(Event::new(EventKind::SlotSpawning).with_session(&session));
        for job in &jobs {
            self.bus.publish(job_event(EventKind::TaskQueued, job));
        }
        self.spawning.insert(session.clone(), jobs);

        let binder = Arc::clone(&self.binder);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match binder.create().await {
                Err(e) => Err(SpawnFailure::Create(e)),
                Ok(handle) => match binder.open(&handle, &session).await {
                    Ok(outcome) => Ok((handle, outcome)),
                    Err(e) => {
                        binder.close(&handle).await;
                        Err(SpawnFailure::Bind(e))
                    }
                },
            };
            if let Err(mpsc::error::SendError(Command::Spawned {
                result: Ok((handle, _)),
                ..
            })) = tx.send(Command::Spawned { session, result })
            {
                tracing::debug!("dispatcher gone before spawn resolved; releasing handle");
                binder.close(&handle).await;
            }
        });
    }

    async fn on_spawned(
        &mut self,
        session: SessionKey,
        result: Result<(B::Handle, BindOutcome), SpawnFailure>,
    ) {
        let jobs = self.spawning.remove(&session).unwrap_or_default();

        if self.closing.is_some() {
            for job in jobs {
                job.reject(DispatchError::DispatcherClosed);
            }
            if let Ok((handle, _)) = result {
                release(Arc::clone(&self.binder), vec![Arc::new(handle)], self.cfg.grace).await;
            }
            return;
        }

        match result {
            Ok((handle, outcome)) => {
                let id = self.slots.len();
                let handle = Arc::new(handle);
                let queue = self.start_queue(id, Arc::clone(&handle));
                for job in jobs {
                    queue.push(job);
                }
                self.slots
                    .push(WorkerSlot::new(id, handle, queue, session.clone()));
                tracing::debug!(slot = id, %session, "slot spawned");
                self.bus.publish(
                    Event::new(EventKind::SlotSpawned)
                        .with_session(&session)
                        .with_slot(id),
                );
                self.record_alias(outcome, &session);
                // Every reserved task may have expired while the handle was created.
                self.on_drained(id);
            }
            Err(failure) => {
                let (kind, err) = match failure {
                    SpawnFailure::Create(error) => (
                        EventKind::HandleUnavailable,
                        DispatchError::HandleUnavailable {
                            session: session.to_string(),
                            error,
                        },
                    ),
                    SpawnFailure::Bind(error) => (
                        EventKind::BindFailed,
                        DispatchError::BindFailure {
                            session: session.to_string(),
                            error,
                        },
                    ),
                };
                tracing::warn!(%session, rejected = jobs.len(), error = %err, "slot spawn failed");
                self.bus.publish(
                    Event::new(kind)
                        .with_session(&session)
                        .with_reason(err.as_message()),
                );
                for job in jobs {
                    job.reject(err.clone());
                }
                self.fill_capacity();
            }
        }
    }

    fn start_queue(&self, id: usize, handle: Arc<B::Handle>) -> TaskQueue<B::Handle> {
        let tx = self.tx.clone();
        TaskQueue::start(
            id,
            handle,
            Budgets {
                task_timeout: self.cfg.task_timeout(),
                queue_timeout: self.cfg.queue_timeout(),
            },
            self.bus.clone(),
            self.token.child_token(),
            Box::new(move || {
                let _ = tx.send(Command::Drained { slot: id });
            }),
        )
    }

    // ---------------------------
    // Hand-off
    // ---------------------------

    fn hand_off(&mut self, idx: usize, session: SessionKey, jobs: VecDeque<Job<B::Handle>>) {
        let Some(slot) = self.slots.get_mut(idx) else {
            for job in jobs {
                job.reject(DispatchError::DispatcherClosed);
            }
            return;
        };

        let from = slot.begin_handoff(session.clone());
        for job in jobs {
            self.bus
                .publish(job_event(EventKind::TaskQueued, &job).with_slot(idx));
            slot.queue.push(job);
        }
        let from = from.map_or_else(|| "unbound".to_string(), |k| k.to_string());
        tracing::debug!(slot = idx, %session, %from, "hand-off started");
        self.bus.publish(
            Event::new(EventKind::HandoffStarted)
                .with_session(&session)
                .with_slot(idx)
                .with_reason(from),
        );

        let binder = Arc::clone(&self.binder);
        let handle = Arc::clone(&slot.handle);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = binder.open(&handle, &session).await;
            let report = Command::Bound {
                slot: idx,
                session,
                result,
            };
            if tx.send(report).is_err() {
                tracing::debug!(
                    slot = idx,
                    "dispatcher gone before hand-off resolved; releasing handle"
                );
                binder.close(&handle).await;
            }
        });
    }

    async fn on_bound(
        &mut self,
        idx: usize,
        session: SessionKey,
        result: Result<BindOutcome, BindError>,
    ) {
        let Some(slot) = self.slots.get_mut(idx) else {
            return;
        };
        if slot.rebinding() != Some(&session) {
            tracing::debug!(slot = idx, %session, "stale bind report ignored");
            return;
        }

        if self.closing.is_some() {
            slot.abort_handoff();
            let handle = Arc::clone(&slot.handle);
            release(Arc::clone(&self.binder), vec![handle], self.cfg.grace).await;
            return;
        }

        match result {
            Ok(outcome) => {
                slot.finish_handoff();
                self.bus.publish(
                    Event::new(EventKind::SlotBound)
                        .with_session(&session)
                        .with_slot(idx),
                );
                self.record_alias(outcome, &session);
                self.on_drained(idx);
            }
            Err(error) => {
                slot.abort_handoff();
                let err = DispatchError::BindFailure {
                    session: session.to_string(),
                    error: error.clone(),
                };
                let rejected = slot.queue.reject_all(&err);
                tracing::warn!(slot = idx, %session, rejected, %error, "hand-off bind failed");
                self.bus.publish(
                    Event::new(EventKind::BindFailed)
                        .with_session(&session)
                        .with_slot(idx)
                        .with_reason(error.to_string()),
                );
                self.reassign(idx);
            }
        }
    }

    fn on_drained(&mut self, idx: usize) {
        if self.closing.is_some() {
            return;
        }
        let Some(slot) = self.slots.get(idx) else {
            return;
        };
        // A submission may have landed between the queue emptying and this report.
        if slot.in_transition() || slot.queue.is_active() {
            return;
        }

        let mut ev = Event::new(EventKind::SlotDrained).with_slot(idx);
        if let Some(session) = slot.bound() {
            ev = ev.with_session(session);
        }
        self.bus.publish(ev);
        self.reassign(idx);
    }

    fn record_alias(&mut self, outcome: BindOutcome, session: &SessionKey) {
        let Some(alias) = outcome.alias else {
            return;
        };
        if let Err(existing) = self.aliases.record(&alias, session) {
            tracing::warn!(%alias, %existing, %session, "alias already points at another session; keeping it");
            self.bus.publish(
                Event::new(EventKind::AliasConflict)
                    .with_session(session)
                    .with_reason(format!("alias={alias} kept={existing}")),
            );
        }
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    fn snapshot(&self) -> DispatcherSnapshot {
        let mut spawning: Vec<SessionKey> = self.spawning.keys().cloned().collect();
        spawning.sort_unstable();

        DispatcherSnapshot {
            slots: self
                .slots
                .iter()
                .map(|s| SlotSnapshot {
                    id: s.id,
                    bound: s.bound().cloned(),
                    rebinding: s.rebinding().cloned(),
                    active: s.queue.is_active(),
                    queued: s.queue.len(),
                    last_activity: s.last_activity(),
                })
                .collect(),
            spawning,
            overflow: self.overflow.summary(),
            aliases: self.aliases.len(),
            closing: self.closing.is_some(),
        }
    }

    // ---------------------------
    // Shutdown
    // ---------------------------

    async fn begin_shutdown(&mut self, reply: oneshot::Sender<ShutdownReport>) {
        if let Some(closing) = self.closing.as_mut() {
            closing.waiters.push(reply);
            return;
        }

        tracing::info!(slots = self.slots.len(), "dispatcher shutting down");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.closing = Some(Closing {
            waiters: vec![reply],
            deadline: Instant::now().checked_add(self.cfg.grace),
        });

        let closed = DispatchError::DispatcherClosed;
        for job in self.overflow.drain() {
            job.reject(closed.clone());
        }
        // Keys stay until their spawn reports back.
        for jobs in self.spawning.values_mut() {
            for job in jobs.drain(..) {
                job.reject(closed.clone());
            }
        }

        join_all(self.slots.iter_mut().map(|s| s.queue.stop())).await;
        let mut idle = Vec::new();
        for slot in &self.slots {
            slot.queue.reject_all(&closed);
            if !slot.in_transition() {
                idle.push(Arc::clone(&slot.handle));
            }
        }
        release(Arc::clone(&self.binder), idle, self.cfg.grace).await;
    }

    fn in_flight(&self) -> usize {
        self.spawning.len() + self.slots.iter().filter(|s| s.in_transition()).count()
    }

    fn try_finish_shutdown(&mut self) -> bool {
        if self.closing.is_none() || self.in_flight() > 0 {
            return false;
        }
        let Some(closing) = self.closing.take() else {
            return false;
        };
        tracing::info!("dispatcher shut down");
        self.bus.publish(Event::new(EventKind::ShutdownComplete));
        for waiter in closing.waiters {
            let _ = waiter.send(Ok(()));
        }
        true
    }

    fn expire_grace(&mut self) {
        let mut stuck = self.snapshot().binding();
        stuck.sort_unstable();

        tracing::error!(?stuck, grace = ?self.cfg.grace, "shutdown grace exceeded");
        self.bus.publish(
            Event::new(EventKind::GraceExceeded).with_reason(format!("stuck={stuck:?}")),
        );
        if let Some(closing) = self.closing.take() {
            for waiter in closing.waiters {
                let _ = waiter.send(Err(stuck.clone()));
            }
        }
    }

    /// Final cleanup: stops every worker and resolves whatever is still queued.
    fn abandon(&mut self) {
        self.token.cancel();
        let closed = DispatchError::DispatcherClosed;
        for job in self.overflow.drain() {
            job.reject(closed.clone());
        }
        for (_, jobs) in self.spawning.drain() {
            for job in jobs {
                job.reject(closed.clone());
            }
        }
        for slot in &self.slots {
            slot.queue.reject_all(&closed);
        }
    }
}

fn job_event<H>(kind: EventKind, job: &Job<H>) -> Event {
    Event::new(kind)
        .with_session(job.session())
        .with_task(Arc::clone(job.name()), job.id())
}

fn expire<H>(bus: &Bus, job: Job<H>, slot: Option<usize>, limit: Duration) {
    let mut ev = job_event(EventKind::QueueTimeoutHit, &job).with_timeout(limit);
    if let Some(slot) = slot {
        ev = ev.with_slot(slot);
    }
    bus.publish(ev);
    let waited = job.waited();
    job.reject(DispatchError::QueueTimeout { waited, limit });
}

async fn grace_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Closes `handles` concurrently, giving up after `grace`.
async fn release<B: SessionBinder>(binder: Arc<B>, handles: Vec<Arc<B::Handle>>, grace: Duration) {
    if handles.is_empty() {
        return;
    }
    let closes = handles.iter().map(|h| binder.close(h));
    if time::timeout(grace, join_all(closes)).await.is_err() {
        tracing::warn!(count = handles.len(), ?grace, "closing session handles exceeded grace");
    }
}
