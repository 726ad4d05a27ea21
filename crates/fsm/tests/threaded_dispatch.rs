//! Dispatch on a background thread with timers driven by a real ticker.

use std::convert::Infallible;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::time::Duration;

use hf_fsm::{
    symbols, Branch, Engine, EngineBuilder, EngineConfig, Event, Machine, Priority, Step,
    SubmitError, TimerConfig, TimerWheel, TransitionTable,
};

symbols! {
    enum Phase { Waiting, Counting, Done }
}

symbols! {
    enum Kind { Go, Tick, Stop }
}

#[derive(Debug)]
enum Signal {
    Go,
    Tick,
    Stop,
}

impl Event for Signal {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        match self {
            Self::Go => Kind::Go,
            Self::Tick => Kind::Tick,
            Self::Stop => Kind::Stop,
        }
    }
}

struct Counter {
    ticks: u32,
    limit: u32,
    done: Sender<u32>,
}

impl Machine for Counter {
    type State = Phase;
    type Event = Signal;
    type Param = ();
    type Error = Infallible;
}

fn count(ctx: &mut Counter, step: &mut Step<'_, Counter>, _: &Signal, _: ()) -> Result<(), Infallible> {
    ctx.ticks += 1;
    if ctx.ticks == ctx.limit {
        step.raise(Signal::Stop);
    }
    Ok(())
}

fn report(ctx: &mut Counter, _: &mut Step<'_, Counter>, _: &Signal, _: ()) -> Result<(), Infallible> {
    let _ = ctx.done.send(ctx.ticks);
    Ok(())
}

fn table() -> TransitionTable<Counter> {
    TransitionTable::builder()
        .on(Phase::Waiting, Kind::Go, Branch::to(Phase::Counting))
        .on(Phase::Counting, Kind::Tick, Branch::stay().run(count))
        .on(Phase::Counting, Kind::Stop, Branch::to(Phase::Done).run(report))
        .ignore(Phase::Done, Kind::Tick)
        .build()
        .unwrap()
}

#[test]
fn ticker_drives_engine_thread() {
    let (tx, rx) = mpsc::channel();
    let builder = EngineBuilder::new(EngineConfig::builder().name("counter").build());
    let wheel = Arc::new(TimerWheel::new(
        TimerConfig::default().with_tick(Duration::from_millis(1)),
        builder.submitter(),
    ));
    let timer = wheel.create("tick", || Signal::Tick, Priority::High);

    let engine: Engine<Counter> = builder.build(
        Arc::new(table()),
        Phase::Waiting,
        Counter {
            ticks: 0,
            limit: 5,
            done: tx,
        },
    );
    let handle = engine.spawn().unwrap();
    let ticker = wheel.spawn_ticker().unwrap();

    handle.submit(Signal::Go, Priority::Low).unwrap();
    timer.start(Duration::from_millis(2), true);

    let ticks = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(ticks, 5);

    ticker.stop();
    let engine = handle.shutdown().unwrap();
    assert_eq!(engine.state(), Phase::Done);
}

#[test]
fn submit_after_shutdown_is_refused() {
    let (tx, _rx) = mpsc::channel();
    let engine = Engine::new(
        EngineConfig::default(),
        table(),
        Phase::Waiting,
        Counter {
            ticks: 0,
            limit: 1,
            done: tx,
        },
    );
    let handle = engine.spawn().unwrap();
    let submitter = handle.submitter();

    let engine = handle.shutdown().unwrap();
    assert_eq!(engine.state(), Phase::Waiting);
    assert!(submitter.is_closed());
    assert!(matches!(submitter.submit(Signal::Go, Priority::High), Err(SubmitError::Closed)));
}
