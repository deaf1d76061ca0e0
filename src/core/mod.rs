//! Runtime core: routing, worker slots and lifecycle.
//!
//! The public API from this module is [`Dispatcher`] (with its builder, config and
//! snapshot types). Everything else is owned by the dispatcher actor.
//!
//! Internal modules:
//! - [`actor`]: single owner of routing state, fed by a command channel;
//! - [`queue`]: per-slot sequential executor with pause/resume;
//! - [`runner`]: executes one task with budgets and event publishing;
//! - [`slot`]: worker slot and the hand-off state machine;
//! - [`overflow`]: sessions waiting for capacity, first-come first-served;
//! - [`alias`]: alternative textual forms of a session;
//! - [`shutdown`]: cross-platform termination signals.

mod actor;
mod alias;
mod builder;
mod config;
mod dispatcher;
mod overflow;
mod queue;
mod runner;
mod shutdown;
mod slot;
mod snapshot;

pub use builder::DispatcherBuilder;
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use snapshot::{DispatcherSnapshot, SlotSnapshot};
