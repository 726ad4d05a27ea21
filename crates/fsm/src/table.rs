//! Transition table model.
//!
//! A table maps `(state, event kind)` to a [`Transition`]:
//!
//! * [`Transition::Direct`] always takes the same [`Branch`];
//! * [`Transition::Choice`] asks a [`Resolver`] which branch to take for the
//!   event at hand;
//! * [`Transition::Ignore`] is an explicit no-op.
//!
//! A pair with no entry at all is "unhandled": the engine logs and drops the
//! event. Tables are assembled once with [`TableBuilder`] and are immutable
//! afterwards.

use std::collections::HashMap;
use std::fmt;

use crate::error::TableError;
use crate::event::Symbol;
use crate::machine::{Action, KindOf, Machine, Resolver};

/// Where a branch leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next<S> {
    /// Keep the current state (the action still runs).
    Stay,
    To(S),
}

impl<S: Copy> Next<S> {
    pub fn resolve(self, current: S) -> S {
        match self {
            Self::Stay => current,
            Self::To(state) => state,
        }
    }
}

/// Next state, optional action and static parameter of one transition path.
pub struct Branch<M: Machine> {
    pub next: Next<M::State>,
    pub action: Option<Action<M>>,
    pub param: M::Param,
}

impl<M: Machine> Branch<M> {
    pub fn to(state: M::State) -> Self {
        Self {
            next: Next::To(state),
            action: None,
            param: M::Param::default(),
        }
    }

    pub fn stay() -> Self {
        Self {
            next: Next::Stay,
            action: None,
            param: M::Param::default(),
        }
    }

    pub fn run(mut self, action: Action<M>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn param(mut self, param: M::Param) -> Self {
        self.param = param;
        self
    }
}

impl<M: Machine> Clone for Branch<M> {
    fn clone(&self) -> Self {
        Self {
            next: self.next,
            action: self.action,
            param: self.param,
        }
    }
}

impl<M: Machine> fmt::Debug for Branch<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("next", &self.next)
            .field("has_action", &self.action.is_some())
            .field("param", &self.param)
            .finish()
    }
}

pub enum Transition<M: Machine> {
    Direct(Branch<M>),
    Choice {
        resolver: Resolver<M>,
        branches: Vec<Branch<M>>,
    },
    Ignore,
}

impl<M: Machine> Clone for Transition<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct(branch) => Self::Direct(branch.clone()),
            Self::Choice { resolver, branches } => Self::Choice {
                resolver: *resolver,
                branches: branches.clone(),
            },
            Self::Ignore => Self::Ignore,
        }
    }
}

impl<M: Machine> fmt::Debug for Transition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(branch) => f.debug_tuple("Direct").field(branch).finish(),
            Self::Choice { branches, .. } => {
                f.debug_struct("Choice").field("branches", branches).finish()
            }
            Self::Ignore => f.write_str("Ignore"),
        }
    }
}

/// Immutable `(state, event kind) -> transition` map.
pub struct TransitionTable<M: Machine> {
    entries: HashMap<(M::State, KindOf<M>), Transition<M>>,
}

impl<M: Machine> TransitionTable<M> {
    pub fn builder() -> TableBuilder<M> {
        TableBuilder::new()
    }

    pub fn lookup(&self, state: M::State, kind: KindOf<M>) -> Option<&Transition<M>> {
        self.entries.get(&(state, kind))
    }

    pub fn contains(&self, state: M::State, kind: KindOf<M>) -> bool {
        self.entries.contains_key(&(state, kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Event kinds with an entry (of any sort) in `state`, sorted.
    pub fn kinds_in(&self, state: M::State) -> Vec<KindOf<M>> {
        let mut kinds: Vec<_> = self
            .entries
            .keys()
            .filter(|(s, _)| *s == state)
            .map(|(_, k)| *k)
            .collect();
        kinds.sort();
        kinds
    }
}

impl<M: Machine> fmt::Debug for TransitionTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Declarative table assembly. Conflicts are collected and reported by
/// [`TableBuilder::build`].
pub struct TableBuilder<M: Machine> {
    entries: HashMap<(M::State, KindOf<M>), Transition<M>>,
    errors: Vec<TableError>,
}

impl<M: Machine> Default for TableBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Machine> TableBuilder<M> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Direct transition.
    pub fn on(self, state: M::State, kind: KindOf<M>, branch: Branch<M>) -> Self {
        self.insert(state, kind, Transition::Direct(branch))
    }

    /// Runtime choice among `branches`.
    pub fn choice<I>(self, state: M::State, kind: KindOf<M>, resolver: Resolver<M>, branches: I) -> Self
    where
        I: IntoIterator<Item = Branch<M>>,
    {
        let branches: Vec<_> = branches.into_iter().collect();
        if branches.is_empty() {
            return self.fail(TableError::EmptyChoice {
                state: state.name(),
                event: kind.name(),
            });
        }
        self.insert(state, kind, Transition::Choice { resolver, branches })
    }

    /// Explicit no-op.
    pub fn ignore(self, state: M::State, kind: KindOf<M>) -> Self {
        self.insert(state, kind, Transition::Ignore)
    }

    pub fn on_each(mut self, states: &[M::State], kind: KindOf<M>, branch: Branch<M>) -> Self {
        for &state in states {
            self = self.on(state, kind, branch.clone());
        }
        self
    }

    pub fn choice_each(
        mut self,
        states: &[M::State],
        kind: KindOf<M>,
        resolver: Resolver<M>,
        branches: &[Branch<M>],
    ) -> Self {
        for &state in states {
            self = self.choice(state, kind, resolver, branches.iter().cloned());
        }
        self
    }

    pub fn ignore_each(mut self, states: &[M::State], kind: KindOf<M>) -> Self {
        for &state in states {
            self = self.ignore(state, kind);
        }
        self
    }

    pub fn build(mut self) -> Result<TransitionTable<M>, TableError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        Ok(TransitionTable {
            entries: self.entries,
        })
    }

    fn insert(mut self, state: M::State, kind: KindOf<M>, transition: Transition<M>) -> Self {
        if self.entries.contains_key(&(state, kind)) {
            return self.fail(TableError::Duplicate {
                state: state.name(),
                event: kind.name(),
            });
        }
        self.entries.insert((state, kind), transition);
        self
    }

    fn fail(mut self, error: TableError) -> Self {
        self.errors.push(error);
        self
    }
}
