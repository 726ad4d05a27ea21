//! Dispatch engine: one consumer draining a high and a low priority queue.
//!
//! Each scheduling round drains the high queue completely, then processes at
//! most one low-priority event before looking at the high queue again. High
//! priority events therefore always preempt pending low priority ones.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use hf_trace::dict::{machine_info_payload, symbol_payload, MachineInfo};
use hf_trace::records::dict;

use crate::error::{EngineError, SubmitError};
use crate::event::{Envelope, Event, Priority, Symbol};
use crate::machine::{KindOf, Machine, Outcome, StateMachine};
use crate::queue::{EventQueues, Submitter};
use crate::table::TransitionTable;
use crate::trace::{self, TraceHook};

/// Sizing and naming of an engine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub name: String,
    pub high_capacity: usize,
    pub low_capacity: usize,
    /// Upper bound on events raised with immediate priority per dispatch.
    pub max_immediate_chain: usize,
    /// Dispatch thread name; defaults to `name`.
    pub thread_name: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "fsm".to_string(),
            high_capacity: 8,
            low_capacity: 32,
            max_immediate_chain: 16,
            thread_name: None,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    fn thread_name(&self) -> String {
        self.thread_name.clone().unwrap_or_else(|| self.name.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets both queue capacities.
    pub fn capacities(mut self, high: usize, low: usize) -> Self {
        self.config.high_capacity = high;
        self.config.low_capacity = low;
        self
    }

    pub fn max_immediate_chain(mut self, max: usize) -> Self {
        self.config.max_immediate_chain = max;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = Some(name.into());
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

/// First construction phase: owns the queues so that producers (timers,
/// collaborators) can be wired to a [`Submitter`] before the machine context
/// exists.
pub struct EngineBuilder<E: Event> {
    config: EngineConfig,
    queues: Arc<EventQueues<E>>,
    trace: Option<TraceHook>,
}

impl<E: Event> EngineBuilder<E> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_trace(config, None)
    }

    pub fn with_trace(config: EngineConfig, trace: Option<TraceHook>) -> Self {
        let queues = Arc::new(EventQueues::new(
            config.high_capacity,
            config.low_capacity,
            trace.clone(),
        ));
        Self {
            config,
            queues,
            trace,
        }
    }

    pub fn submitter(&self) -> Submitter<E> {
        Submitter::new(Arc::clone(&self.queues))
    }

    pub fn trace_hook(&self) -> Option<TraceHook> {
        self.trace.clone()
    }

    pub fn build<M>(self, table: Arc<TransitionTable<M>>, initial: M::State, context: M) -> Engine<M>
    where
        M: Machine<Event = E>,
    {
        let mut machine = StateMachine::new(table, initial, context);
        machine.set_trace_hook(self.trace.clone());
        Engine {
            config: self.config,
            machine,
            submitter: Submitter::new(Arc::clone(&self.queues)),
            queues: self.queues,
            trace: self.trace,
        }
    }
}

pub struct Engine<M: Machine> {
    config: EngineConfig,
    machine: StateMachine<M>,
    queues: Arc<EventQueues<M::Event>>,
    submitter: Submitter<M::Event>,
    trace: Option<TraceHook>,
}

impl<M: Machine> Engine<M> {
    pub fn builder(config: EngineConfig) -> EngineBuilder<M::Event> {
        EngineBuilder::new(config)
    }

    /// One-step construction for machines without external producers.
    pub fn new(config: EngineConfig, table: TransitionTable<M>, initial: M::State, context: M) -> Self {
        EngineBuilder::new(config).build(Arc::new(table), initial, context)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn submitter(&self) -> Submitter<M::Event> {
        self.submitter.clone()
    }

    pub fn submit(&self, event: M::Event, priority: Priority) -> Result<(), SubmitError> {
        self.submitter.submit(event, priority)
    }

    pub fn state(&self) -> M::State {
        self.machine.state()
    }

    pub fn previous(&self) -> M::State {
        self.machine.previous()
    }

    pub fn context(&self) -> &M {
        self.machine.context()
    }

    pub fn context_mut(&mut self) -> &mut M {
        self.machine.context_mut()
    }

    pub fn machine(&self) -> &StateMachine<M> {
        &self.machine
    }

    /// Dispatches `event` synchronously on the caller's thread, bypassing
    /// the queues.
    pub fn dispatch(&mut self, event: M::Event) -> Outcome<M::State> {
        self.machine
            .dispatch(&event, &self.submitter, self.config.max_immediate_chain)
    }

    /// One scheduling round. Returns whether any event was processed.
    pub fn dispatch_once(&mut self) -> bool {
        let mut processed = false;
        while let Some(envelope) = self.queues.pop_high() {
            self.process(envelope);
            processed = true;
        }
        if let Some(envelope) = self.queues.pop_low() {
            self.process(envelope);
            processed = true;
        }
        processed
    }

    pub fn run_until_idle(&mut self) {
        while self.dispatch_once() {}
    }

    /// Emits the machine, state and event dictionaries to the trace hook.
    pub fn announce(&self) {
        let Some(hook) = &self.trace else {
            return;
        };
        let info = MachineInfo {
            name: self.config.name.clone(),
            high_capacity: u16::try_from(self.config.high_capacity).unwrap_or(u16::MAX),
            low_capacity: u16::try_from(self.config.low_capacity).unwrap_or(u16::MAX),
        };
        let mut records = vec![(dict::MACHINE_INFO, machine_info_payload(&info))];
        records.extend(
            M::State::ALL
                .iter()
                .map(|s| (dict::STATE, symbol_payload(s.id(), s.name()))),
        );
        records.extend(
            KindOf::<M>::ALL
                .iter()
                .map(|k| (dict::EVENT, symbol_payload(k.id(), k.name()))),
        );
        for (record, payload) in records {
            trace::emit_payload(hook, record, &payload, false);
        }
    }

    /// Moves the engine onto its own dispatch thread.
    pub fn spawn(self) -> Result<EngineHandle<M>, EngineError> {
        let queues = Arc::clone(&self.queues);
        let submitter = self.submitter.clone();
        let name = self.config.thread_name();
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || self.run())
            .map_err(EngineError::Spawn)?;
        Ok(EngineHandle {
            submitter,
            queues,
            thread: Some(thread),
        })
    }

    fn run(mut self) -> Self {
        info!("{}: dispatch thread started in {:?}", self.config.name, self.state());
        while self.queues.wait_for_work() {
            self.dispatch_once();
        }
        info!("{}: dispatch thread stopped in {:?}", self.config.name, self.state());
        self
    }

    fn process(&mut self, envelope: Envelope<M::Event>) {
        trace!(
            "{}: {:?} ({}) waited {:?}",
            self.config.name,
            envelope.event.kind(),
            envelope.priority,
            envelope.age()
        );
        self.dispatch(envelope.event);
    }
}

/// Owner of a running dispatch thread.
pub struct EngineHandle<M: Machine> {
    submitter: Submitter<M::Event>,
    queues: Arc<EventQueues<M::Event>>,
    thread: Option<JoinHandle<Engine<M>>>,
}

impl<M: Machine> EngineHandle<M> {
    pub fn submitter(&self) -> Submitter<M::Event> {
        self.submitter.clone()
    }

    pub fn submit(&self, event: M::Event, priority: Priority) -> Result<(), SubmitError> {
        self.submitter.submit(event, priority)
    }

    /// Stops the dispatch thread without draining the queues and hands the
    /// engine back. An action already running finishes first. Returns `None`
    /// if the dispatch thread panicked.
    pub fn shutdown(mut self) -> Option<Engine<M>> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Engine<M>> {
        self.queues.close();
        let handle = self.thread.take()?;
        match handle.join() {
            Ok(engine) => Some(engine),
            Err(_) => {
                error!("dispatch thread panicked");
                None
            }
        }
    }
}

impl<M: Machine> Drop for EngineHandle<M> {
    fn drop(&mut self) {
        self.stop();
    }
}
