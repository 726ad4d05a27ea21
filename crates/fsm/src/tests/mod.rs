use std::fmt;

use crate::{symbols, Branch, Event, Machine, Priority, Step, TransitionTable};

mod table;

symbols! {
    pub enum DoorState { Closed, Open, Locked }
}

symbols! {
    pub enum DoorKind { Push, Pull, Lock, Unlock, Knock, Slam, Bounce }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorEvent {
    Push,
    Pull,
    Lock,
    Unlock(u32),
    Knock,
    Slam,
    Bounce,
}

impl Event for DoorEvent {
    type Kind = DoorKind;

    fn kind(&self) -> DoorKind {
        match self {
            Self::Push => DoorKind::Push,
            Self::Pull => DoorKind::Pull,
            Self::Lock => DoorKind::Lock,
            Self::Unlock(_) => DoorKind::Unlock,
            Self::Knock => DoorKind::Knock,
            Self::Slam => DoorKind::Slam,
            Self::Bounce => DoorKind::Bounce,
        }
    }
}

#[derive(Debug)]
pub struct Jammed;

impl fmt::Display for Jammed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("door jammed")
    }
}

impl std::error::Error for Jammed {}

#[derive(Debug, Default)]
pub struct Door {
    pub code: u32,
    pub jammed: bool,
    pub log: Vec<String>,
}

impl Machine for Door {
    type State = DoorState;
    type Event = DoorEvent;
    type Param = u8;
    type Error = Jammed;
}

fn note(door: &mut Door, step: &mut Step<'_, Door>, event: &DoorEvent, param: u8) -> Result<(), Jammed> {
    door.log.push(format!("{:?}->{:?} {:?} {param}", step.current(), step.target(), event.kind()));
    if door.jammed {
        return Err(Jammed);
    }
    Ok(())
}

fn slam(door: &mut Door, step: &mut Step<'_, Door>, _event: &DoorEvent, _param: u8) -> Result<(), Jammed> {
    door.log.push("slam".into());
    step.post(DoorEvent::Bounce, Priority::Immediate).map_err(|_| Jammed)
}

fn bounce(door: &mut Door, step: &mut Step<'_, Door>, _event: &DoorEvent, _param: u8) -> Result<(), Jammed> {
    door.log.push(format!("bounce in {:?}", step.current()));
    step.raise(DoorEvent::Bounce);
    Ok(())
}

fn code_matches(door: &Door, event: &DoorEvent) -> usize {
    match event {
        DoorEvent::Unlock(code) if *code == door.code => 0,
        DoorEvent::Unlock(99) => 7,
        _ => 1,
    }
}

/// Closed --Pull--> Open --Push--> Closed --Lock--> Locked --Unlock(code)--> Closed | Locked.
/// Knock is ignored everywhere except Open, where it has no entry. Slam in Open
/// closes the door and raises an immediate Bounce, which in Closed raises
/// another Bounce forever.
pub fn door_table() -> TransitionTable<Door> {
    TransitionTable::builder()
        .on(DoorState::Closed, DoorKind::Pull, Branch::to(DoorState::Open).run(note))
        .on(DoorState::Open, DoorKind::Push, Branch::to(DoorState::Closed).run(note).param(1))
        .on(DoorState::Closed, DoorKind::Lock, Branch::to(DoorState::Locked).run(note).param(2))
        .choice(
            DoorState::Locked,
            DoorKind::Unlock,
            code_matches,
            [
                Branch::to(DoorState::Closed).run(note).param(3),
                Branch::stay().run(note).param(4),
            ],
        )
        .ignore_each(&[DoorState::Closed, DoorState::Locked], DoorKind::Knock)
        .on(DoorState::Open, DoorKind::Slam, Branch::to(DoorState::Closed).run(slam))
        .on(DoorState::Closed, DoorKind::Bounce, Branch::stay().run(bounce))
        .build()
        .expect("door table")
}
