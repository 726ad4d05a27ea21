//! Bounded two-level event queue shared between producers and the dispatch
//! thread.

use std::collections::VecDeque;
use std::sync::Arc;

use log::warn;
use parking_lot::{Condvar, Mutex};

use hf_trace::records::queue;

use crate::error::SubmitError;
use crate::event::{Envelope, Event, Priority, Symbol};
use crate::trace::{self, TraceHook};

struct QueueState<E> {
    high: VecDeque<Envelope<E>>,
    low: VecDeque<Envelope<E>>,
    high_capacity: usize,
    low_capacity: usize,
    closed: bool,
}

pub(crate) struct EventQueues<E> {
    state: Mutex<QueueState<E>>,
    ready: Condvar,
    trace: Option<TraceHook>,
}

impl<E: Event> EventQueues<E> {
    pub(crate) fn new(high_capacity: usize, low_capacity: usize, trace: Option<TraceHook>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                high: VecDeque::with_capacity(high_capacity),
                low: VecDeque::with_capacity(low_capacity),
                high_capacity,
                low_capacity,
                closed: false,
            }),
            ready: Condvar::new(),
            trace,
        }
    }

    pub(crate) fn push(&self, event: E, priority: Priority) -> Result<(), SubmitError> {
        let kind = event.kind();
        let depth = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.closed {
                return Err(SubmitError::Closed);
            }
            let (queue, capacity) = match priority {
                Priority::High => (&mut state.high, state.high_capacity),
                Priority::Low => (&mut state.low, state.low_capacity),
                Priority::Immediate => return Err(SubmitError::ImmediateOutsideDispatch),
            };
            if queue.len() >= capacity {
                drop(guard);
                warn!("{priority} queue full, rejecting {kind:?}");
                trace::emit(self.trace.as_ref(), queue::FULL, true, |p| {
                    p.u16(kind.id()).u8(priority.trace_code());
                });
                return Err(SubmitError::QueueFull(priority));
            }
            queue.push_back(Envelope::new(event, priority));
            queue.len()
        };
        self.ready.notify_one();

        trace::emit(self.trace.as_ref(), queue::POST, true, |p| {
            p.u16(kind.id())
                .u8(priority.trace_code())
                .u16(u16::try_from(depth).unwrap_or(u16::MAX));
        });
        Ok(())
    }
}

impl<E> EventQueues<E> {
    pub(crate) fn pop_high(&self) -> Option<Envelope<E>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.high.pop_front()
    }

    pub(crate) fn pop_low(&self) -> Option<Envelope<E>> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.low.pop_front()
    }

    /// Blocks until an event is queued or the queues are closed. Returns
    /// `false` once closed.
    pub(crate) fn wait_for_work(&self) -> bool {
        let mut state = self.state.lock();
        while !state.closed && state.high.is_empty() && state.low.is_empty() {
            self.ready.wait(&mut state);
        }
        !state.closed
    }

    /// Stops accepting and handing out events. Anything still queued is
    /// discarded.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.high.clear();
        state.low.clear();
        drop(state);
        self.ready.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub(crate) fn len(&self, priority: Priority) -> usize {
        let state = self.state.lock();
        match priority {
            Priority::High => state.high.len(),
            Priority::Low => state.low.len(),
            Priority::Immediate => 0,
        }
    }
}

/// Thread-safe entry point for producers: transport callbacks, timers and
/// the host-facing API.
pub struct Submitter<E> {
    queues: Arc<EventQueues<E>>,
}

impl<E> Clone for Submitter<E> {
    fn clone(&self) -> Self {
        Self {
            queues: Arc::clone(&self.queues),
        }
    }
}

impl<E: Event> Submitter<E> {
    pub(crate) fn new(queues: Arc<EventQueues<E>>) -> Self {
        Self { queues }
    }

    /// Enqueues `event` and returns without waiting for it to be processed.
    pub fn submit(&self, event: E, priority: Priority) -> Result<(), SubmitError> {
        self.queues.push(event, priority)
    }

    pub fn is_closed(&self) -> bool {
        self.queues.is_closed()
    }

    /// Number of events currently waiting at `priority`.
    pub fn pending(&self, priority: Priority) -> usize {
        self.queues.len(priority)
    }
}
