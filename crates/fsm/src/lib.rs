//! # hf-fsm
//!
//! Table-driven finite state machine engine with prioritized event delivery,
//! used by the hands-free call session core.
//!
//! ## Module Overview
//! - [`event`]   – Symbols, events and delivery priorities.
//! - [`table`]   – Transition table model and builder.
//! - [`machine`] – The [`Machine`] trait and single-event dispatch.
//! - [`engine`]  – Bounded queues plus the dispatch loop, inline or threaded.
//! - [`time`]    – Tick-driven software timers feeding the queues.
//!
//! A machine is described once as an immutable [`TransitionTable`] keyed by
//! `(state, event kind)`. The [`Engine`] pulls events from its high and low
//! priority queues and runs them through the table one at a time, so actions
//! never run concurrently with each other.

pub mod engine;
pub mod error;
pub mod event;
pub mod machine;
mod queue;
pub mod table;
pub mod time;
mod trace;

pub use engine::{Engine, EngineBuilder, EngineConfig, EngineConfigBuilder, EngineHandle};
pub use error::{EngineError, SubmitError, TableError};
pub use event::{Envelope, Event, Priority, Symbol};
pub use machine::{Action, KindOf, Machine, Outcome, Resolver, StateMachine, Step};
pub use queue::Submitter;
pub use table::{Branch, Next, TableBuilder, Transition, TransitionTable};
pub use time::{TimeEvent, TimerConfig, TimerWheel, Ticker};
pub use trace::{TraceError, TraceHook};

#[cfg(test)]
mod tests;
