//! Software timers driven by a tick source.
//!
//! A [`TimerWheel`] owns a set of [`TimeEvent`]s and advances all of them on
//! every [`TimerWheel::tick`]. When a timer expires its event is submitted to
//! the engine like any other producer's. Ticks come either from a
//! [`Ticker`] thread or, in tests, from calling `tick` by hand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::Mutex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use hf_trace::dict::symbol_payload;
use hf_trace::records::{dict, timer};

use crate::error::{EngineError, SubmitError};
use crate::event::{Event, Priority};
use crate::queue::Submitter;
use crate::trace::{self, TraceHook};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Tick period. Timer durations are rounded up to whole ticks.
    pub tick: Duration,
    pub thread_name: String,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(10),
            thread_name: "fsm-ticker".to_string(),
        }
    }
}

impl TimerConfig {
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

#[derive(Debug, Default)]
struct TimerState {
    remaining: u32,
    interval: u32,
    armed: bool,
}

/// One-shot or periodic timer producing a fixed event on expiry.
pub struct TimeEvent<E> {
    id: u16,
    name: &'static str,
    tick: Duration,
    make: fn() -> E,
    priority: Priority,
    state: Mutex<TimerState>,
    trace: Option<TraceHook>,
}

impl<E: Event> TimeEvent<E> {
    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Arms the timer for `after`, repeating with the same period if
    /// `periodic`. Re-arming an armed timer restarts it.
    pub fn start(&self, after: Duration, periodic: bool) {
        let ticks = self.ticks_for(after);
        self.arm(ticks, if periodic { ticks } else { 0 });
    }

    /// Arms the timer in raw ticks. An `interval` of zero means one-shot.
    pub fn arm(&self, ticks: u32, interval: u32) {
        let ticks = ticks.max(1);
        {
            let mut state = self.state.lock();
            state.remaining = ticks;
            state.interval = interval;
            state.armed = true;
        }
        debug!("timer {} armed: {ticks} ticks, interval {interval}", self.name);
        trace::emit(self.trace.as_ref(), timer::ARM, true, |p| {
            p.u16(self.id).u32(ticks).u32(interval);
        });
    }

    /// Disarms the timer. Stopping an idle timer is a no-op.
    pub fn stop(&self) {
        let was_armed = {
            let mut state = self.state.lock();
            std::mem::replace(&mut state.armed, false)
        };
        if was_armed {
            debug!("timer {} disarmed", self.name);
            trace::emit(self.trace.as_ref(), timer::DISARM, true, |p| {
                p.u16(self.id);
            });
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    /// Advances by one tick and returns the event if the timer expired.
    fn poll(&self) -> Option<E> {
        let periodic = {
            let mut state = self.state.lock();
            if !state.armed {
                return None;
            }
            state.remaining = state.remaining.saturating_sub(1);
            if state.remaining > 0 {
                return None;
            }
            if state.interval > 0 {
                state.remaining = state.interval;
            } else {
                state.armed = false;
            }
            state.interval > 0
        };
        debug!("timer {} fired", self.name);
        trace::emit(self.trace.as_ref(), timer::FIRE, true, |p| {
            p.u16(self.id).u8(u8::from(periodic));
        });
        Some((self.make)())
    }

    fn ticks_for(&self, after: Duration) -> u32 {
        let tick = self.tick.as_nanos().max(1);
        let ticks = after.as_nanos().div_ceil(tick);
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }
}

/// Set of timers advanced together.
pub struct TimerWheel<E> {
    config: TimerConfig,
    submitter: Submitter<E>,
    timers: Mutex<Vec<Arc<TimeEvent<E>>>>,
    trace: Option<TraceHook>,
}

impl<E: Event> TimerWheel<E> {
    pub fn new(config: TimerConfig, submitter: Submitter<E>) -> Self {
        Self {
            config,
            submitter,
            timers: Mutex::new(Vec::new()),
            trace: None,
        }
    }

    pub fn with_trace_hook(mut self, hook: Option<TraceHook>) -> Self {
        self.trace = hook;
        self
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Registers a disarmed timer posting `make()` at `priority` on expiry.
    pub fn create(&self, name: &'static str, make: fn() -> E, priority: Priority) -> Arc<TimeEvent<E>> {
        let mut timers = self.timers.lock();
        let timer = Arc::new(TimeEvent {
            id: u16::try_from(timers.len()).unwrap_or(u16::MAX),
            name,
            tick: self.config.tick,
            make,
            priority,
            state: Mutex::new(TimerState::default()),
            trace: self.trace.clone(),
        });
        timers.push(Arc::clone(&timer));
        timer
    }

    /// Advances every timer by one tick. All expired timers are submitted even
    /// if one submission fails; the first failure is returned.
    pub fn tick(&self) -> Result<(), SubmitError> {
        let timers = self.timers.lock().clone();
        let mut first_error = None;
        for timer in &timers {
            let Some(event) = timer.poll() else {
                continue;
            };
            if let Err(err) = self.submitter.submit(event, timer.priority) {
                warn!("timer {}: {err}", timer.name);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Emits the timer dictionary to the trace hook.
    pub fn announce(&self) {
        let Some(hook) = &self.trace else {
            return;
        };
        for timer in self.timers.lock().iter() {
            trace::emit_payload(hook, dict::TIMER, &symbol_payload(timer.id, timer.name), false);
        }
    }

    /// Starts a thread calling [`TimerWheel::tick`] every tick period. The
    /// thread exits when the [`Ticker`] is stopped or the engine shuts down.
    pub fn spawn_ticker(self: &Arc<Self>) -> Result<Ticker, EngineError> {
        let running = Arc::new(AtomicBool::new(true));
        let wheel = Arc::clone(self);
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || wheel.run(&flag))
            .map_err(EngineError::Spawn)?;
        Ok(Ticker {
            running,
            handle: Some(handle),
        })
    }

    fn run(&self, running: &AtomicBool) {
        let period = self.config.tick;
        let mut next_tick = Instant::now();
        while running.load(Ordering::Relaxed) {
            // absolute deadlines keep the tick rate from drifting
            next_tick += period;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            }
            if self.submitter.is_closed() || matches!(self.tick(), Err(SubmitError::Closed)) {
                debug!("engine closed, ticker exiting");
                break;
            }
        }
    }
}

/// Handle to a ticker thread; stops it on drop.
pub struct Ticker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.halt();
    }
}
