use super::{door_table, Door, DoorKind, DoorState};
use crate::{Branch, TableError, Transition, TransitionTable};

#[test]
fn lookup_distinguishes_entry_kinds() {
    let table = door_table();

    assert!(matches!(
        table.lookup(DoorState::Closed, DoorKind::Pull),
        Some(Transition::Direct(_))
    ));
    assert!(matches!(
        table.lookup(DoorState::Locked, DoorKind::Unlock),
        Some(Transition::Choice { branches, .. }) if branches.len() == 2
    ));
    assert!(matches!(
        table.lookup(DoorState::Locked, DoorKind::Knock),
        Some(Transition::Ignore)
    ));
    assert!(table.lookup(DoorState::Open, DoorKind::Knock).is_none());
    assert!(!table.contains(DoorState::Open, DoorKind::Lock));
}

#[test]
fn kinds_in_lists_every_entry_of_a_state() {
    let table = door_table();
    assert_eq!(
        table.kinds_in(DoorState::Closed),
        vec![DoorKind::Pull, DoorKind::Lock, DoorKind::Knock, DoorKind::Bounce]
    );
    assert_eq!(table.len(), 8);
}

#[test]
fn duplicate_entries_are_rejected() {
    let result = TransitionTable::<Door>::builder()
        .on(DoorState::Closed, DoorKind::Pull, Branch::to(DoorState::Open))
        .ignore(DoorState::Closed, DoorKind::Pull)
        .build();

    assert_eq!(
        result.unwrap_err(),
        TableError::Duplicate {
            state: "Closed",
            event: "Pull"
        }
    );
}

#[test]
fn empty_choice_is_rejected() {
    fn first(_: &Door, _: &super::DoorEvent) -> usize {
        0
    }

    let result = TransitionTable::<Door>::builder()
        .choice(DoorState::Locked, DoorKind::Unlock, first, Vec::new())
        .build();

    assert!(matches!(result, Err(TableError::EmptyChoice { state: "Locked", .. })));
}

#[test]
fn branch_defaults() {
    let branch = Branch::<Door>::stay();
    assert!(branch.action.is_none());
    assert_eq!(branch.param, 0);
    assert_eq!(branch.next.resolve(DoorState::Open), DoorState::Open);
    assert_eq!(
        Branch::<Door>::to(DoorState::Locked).next.resolve(DoorState::Open),
        DoorState::Locked
    );
}
