//! Table-driven state machine and its execution step.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};

use hf_trace::records::sm;

use crate::error::SubmitError;
use crate::event::{Event, Priority, Symbol};
use crate::queue::Submitter;
use crate::table::{Branch, Transition, TransitionTable};
use crate::trace::{self, TraceHook};

/// Binds together the types of a concrete machine. The implementing type is
/// the machine's context: the only data actions may mutate.
pub trait Machine: Send + Sized + 'static {
    type State: Symbol;
    type Event: Event;
    /// Static per-branch parameter handed to actions.
    type Param: Copy + Default + fmt::Debug + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;
}

/// Event kind type of a machine.
pub type KindOf<M> = <<M as Machine>::Event as Event>::Kind;

/// Side-effecting transition action.
pub type Action<M> = fn(
    &mut M,
    &mut Step<'_, M>,
    &<M as Machine>::Event,
    <M as Machine>::Param,
) -> Result<(), <M as Machine>::Error>;

/// Pure branch selector of a choice transition.
pub type Resolver<M> = fn(&M, &<M as Machine>::Event) -> usize;

/// What a single dispatch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<S> {
    Transitioned { from: S, to: S },
    Ignored,
    Unhandled,
    BadChoice(usize),
}

/// View of the running transition given to actions.
pub struct Step<'a, M: Machine> {
    current: M::State,
    target: M::State,
    raised: &'a mut VecDeque<M::Event>,
    submitter: &'a Submitter<M::Event>,
}

impl<'a, M: Machine> Step<'a, M> {
    /// State the transition leaves.
    pub fn current(&self) -> M::State {
        self.current
    }

    /// State the transition commits to once the action returns.
    pub fn target(&self) -> M::State {
        self.target
    }

    /// Dispatches `event` right after this transition commits.
    pub fn raise(&mut self, event: M::Event) {
        self.raised.push_back(event);
    }

    pub fn post(&mut self, event: M::Event, priority: Priority) -> Result<(), SubmitError> {
        match priority {
            Priority::Immediate => {
                self.raise(event);
                Ok(())
            }
            _ => self.submitter.submit(event, priority),
        }
    }

    pub fn submitter(&self) -> &Submitter<M::Event> {
        self.submitter
    }
}

/// Current/previous state plus the context, driven by a shared table.
pub struct StateMachine<M: Machine> {
    table: Arc<TransitionTable<M>>,
    current: M::State,
    previous: M::State,
    context: M,
    trace: Option<TraceHook>,
}

impl<M: Machine> StateMachine<M> {
    pub fn new(table: Arc<TransitionTable<M>>, initial: M::State, context: M) -> Self {
        Self {
            table,
            current: initial,
            previous: initial,
            context,
            trace: None,
        }
    }

    pub(crate) fn set_trace_hook(&mut self, hook: Option<TraceHook>) {
        self.trace = hook;
    }

    pub fn state(&self) -> M::State {
        self.current
    }

    pub fn previous(&self) -> M::State {
        self.previous
    }

    pub fn context(&self) -> &M {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut M {
        &mut self.context
    }

    pub fn table(&self) -> &TransitionTable<M> {
        &self.table
    }

    /// Runs `event` and then every event its actions raised with immediate
    /// priority, in order. At most `max_chain` raised events are processed;
    /// the rest are dropped with an error log.
    pub fn dispatch(
        &mut self,
        event: &M::Event,
        submitter: &Submitter<M::Event>,
        max_chain: usize,
    ) -> Outcome<M::State> {
        let mut raised = VecDeque::new();
        let outcome = self.step(event, &mut raised, submitter);

        let mut chain = 0;
        while let Some(next) = raised.pop_front() {
            chain += 1;
            if chain > max_chain {
                error!(
                    "immediate chain exceeded {max_chain} events in {:?}, dropping {:?} and {} more",
                    self.current,
                    next,
                    raised.len()
                );
                break;
            }
            let (state, kind) = (self.current, next.kind());
            trace::emit(self.trace.as_ref(), sm::IMMEDIATE, true, |p| {
                p.u16(state.id()).u16(kind.id());
            });
            self.step(&next, &mut raised, submitter);
        }

        outcome
    }

    fn step(
        &mut self,
        event: &M::Event,
        raised: &mut VecDeque<M::Event>,
        submitter: &Submitter<M::Event>,
    ) -> Outcome<M::State> {
        let state = self.current;
        let kind = event.kind();
        trace::emit(self.trace.as_ref(), sm::DISPATCH, true, |p| {
            p.u16(state.id()).u16(kind.id());
        });

        let table = Arc::clone(&self.table);
        let branch = match table.lookup(state, kind) {
            None => {
                warn!("{state:?}: no transition for {kind:?}, dropping {event:?}");
                trace::emit(self.trace.as_ref(), sm::UNHANDLED, true, |p| {
                    p.u16(state.id()).u16(kind.id());
                });
                return Outcome::Unhandled;
            }
            Some(Transition::Ignore) => {
                debug!("{state:?}: ignoring {kind:?}");
                trace::emit(self.trace.as_ref(), sm::IGNORED, true, |p| {
                    p.u16(state.id()).u16(kind.id());
                });
                return Outcome::Ignored;
            }
            Some(Transition::Direct(branch)) => branch,
            Some(Transition::Choice { resolver, branches }) => {
                let index = resolver(&self.context, event);
                match branches.get(index) {
                    Some(branch) => branch,
                    None => {
                        error!(
                            "{state:?}: resolver for {kind:?} chose branch {index} of {}",
                            branches.len()
                        );
                        trace::emit(self.trace.as_ref(), sm::BAD_CHOICE, true, |p| {
                            p.u16(state.id())
                                .u16(kind.id())
                                .u16(u16::try_from(index).unwrap_or(u16::MAX));
                        });
                        return Outcome::BadChoice(index);
                    }
                }
            }
        };

        self.fire(branch, event, raised, submitter)
    }

    fn fire(
        &mut self,
        branch: &Branch<M>,
        event: &M::Event,
        raised: &mut VecDeque<M::Event>,
        submitter: &Submitter<M::Event>,
    ) -> Outcome<M::State> {
        let from = self.current;
        let to = branch.next.resolve(from);
        let kind = event.kind();

        if let Some(action) = branch.action {
            let mut step = Step {
                current: from,
                target: to,
                raised,
                submitter,
            };
            if let Err(err) = action(&mut self.context, &mut step, event, branch.param) {
                warn!("{from:?} --{kind:?}--> {to:?}: action failed: {err}");
                trace::emit(self.trace.as_ref(), sm::ACTION_FAILED, true, |p| {
                    p.u16(from.id()).u16(kind.id());
                });
            }
        }

        self.previous = from;
        self.current = to;

        if from != to {
            info!("{from:?} --{kind:?}--> {to:?}");
        }
        trace::emit(self.trace.as_ref(), sm::TRAN, true, |p| {
            p.u16(kind.id()).u16(from.id()).u16(to.id());
        });

        Outcome::Transitioned { from, to }
    }
}
