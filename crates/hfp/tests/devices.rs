mod common;

use common::{Call, Harness, Setup, PHONE, STRANGER};
use hf_fsm::Outcome;
use handsfree::{
    AtResponse, Fault, HfpEvent, HfpEventKind, HfpState, HfpStatus, NotifyFields,
};

#[test]
fn unknown_device_from_idle_is_reported_once() {
    let mut hf = Harness::new();
    hf.send(HfpEvent::SelectDevice(STRANGER));

    assert_eq!(hf.state(), HfpState::Idle);
    assert_eq!(hf.host.with_status(HfpStatus::UnknownDevice).len(), 1);
    assert!(hf.engine.context().session().device.is_none());
    assert!(hf
        .host
        .snapshot()
        .iter()
        .filter_map(|n| n.params.as_ref())
        .all(|params| params.cur_device.is_none()));
    assert_eq!(hf.journal.len(), 0);
}

#[test]
fn known_device_starts_connecting() {
    let mut hf = Harness::new();
    hf.send(HfpEvent::SelectDevice(PHONE));

    assert_eq!(hf.state(), HfpState::Connecting);
    assert_eq!(hf.journal.calls(), vec![Call::Connect(PHONE)]);

    let selected = &hf.host.snapshot()[0];
    assert_eq!(selected.state, HfpState::Disconnected);
    assert!(selected.fields.contains(NotifyFields::DEVICE));
    let device = selected.params.as_ref().and_then(|p| p.cur_device.clone()).unwrap();
    assert_eq!(device.addr, PHONE);
    assert_eq!(device.name, "Pixel");
}

#[test]
fn unknown_device_while_connected_keeps_the_session() {
    let mut hf = Harness::new();
    hf.service_up();
    hf.send(HfpEvent::SelectDevice(STRANGER));

    assert_eq!(hf.state(), HfpState::HfpConnected);
    assert_eq!(hf.host.with_status(HfpStatus::UnknownDevice).len(), 1);
    assert_eq!(hf.engine.context().session().device.as_ref().map(|d| d.addr), Some(PHONE));
    assert_eq!(hf.journal.len(), 0);
}

#[test]
fn reselecting_while_linked_disconnects_first() {
    let mut hf = Harness::new();
    hf.service_up();
    hf.send(HfpEvent::SelectDevice(PHONE));

    assert_eq!(hf.state(), HfpState::Connecting);
    assert_eq!(hf.journal.calls(), vec![Call::Disconnect, Call::Connect(PHONE)]);
}

#[test]
fn forgetting_the_device_returns_to_idle() {
    let mut hf = Harness::new();
    hf.service_up();
    hf.send(HfpEvent::ForgetDevice);

    assert_eq!(hf.state(), HfpState::Idle);
    assert_eq!(hf.journal.calls(), vec![Call::Disconnect]);
    assert!(hf.engine.context().session().device.is_none());

    let last = hf.host.last().unwrap();
    assert_eq!(last.state, HfpState::Idle);
    assert_eq!(last.params.and_then(|p| p.cur_device), None);

    // polling is off: nothing reconnects
    hf.tick(250);
    assert_eq!(hf.state(), HfpState::Idle);
    assert_eq!(hf.journal.len(), 1);
}

#[test]
fn device_unpaired_during_selection_returns_to_idle() {
    // the table's lookup still sees the phone, the action's does not
    let mut hf = Harness::with(Setup {
        paired_for: Some(1),
        ..Setup::default()
    });
    hf.send(HfpEvent::SelectDevice(PHONE));

    assert_eq!(hf.state(), HfpState::Idle);
    assert!(hf.engine.context().session().device.is_none());
    assert_eq!(hf.host.with_status(HfpStatus::UnknownDevice).len(), 1);
    assert_eq!(hf.journal.len(), 0);

    hf.tick(250);
    assert_eq!(hf.state(), HfpState::Idle);
    assert_eq!(hf.journal.len(), 0);
}

#[test]
fn device_unpaired_during_reselection_releases_the_link() {
    // service_up uses two lookups, reselecting passes the third
    let mut hf = Harness::with(Setup {
        paired_for: Some(3),
        ..Setup::default()
    });
    hf.service_up();
    hf.send(HfpEvent::SelectDevice(PHONE));

    assert_eq!(hf.state(), HfpState::Idle);
    assert_eq!(hf.journal.calls(), vec![Call::Disconnect]);
    assert!(hf.engine.context().session().device.is_none());
    assert_eq!(hf.host.with_status(HfpStatus::UnknownDevice).len(), 1);
}

#[test]
fn user_disconnect_stops_polling() {
    let mut hf = Harness::new();
    hf.service_up();
    hf.send(HfpEvent::Disconnect);

    assert_eq!(hf.state(), HfpState::Disconnected);
    assert_eq!(hf.journal.calls(), vec![Call::Disconnect]);

    hf.tick(250);
    assert_eq!(hf.state(), HfpState::Disconnected);
    assert_eq!(hf.journal.count(&Call::Connect(PHONE)), 0);
}

#[test]
fn link_failure_drops_the_link() {
    let mut hf = Harness::new();
    hf.service_up();
    hf.inbound(HfpEvent::Failure(Fault::Link { code: 104 }));

    assert_eq!(hf.state(), HfpState::Disconnected);
    assert_eq!(hf.host.with_status(HfpStatus::ConnectFailure).len(), 1);
    assert_eq!(hf.journal.calls(), vec![Call::Disconnect]);
}

#[test]
fn stray_voice_failure_is_absorbed_when_connected() {
    let mut hf = Harness::new();
    hf.service_up();
    hf.inbound(HfpEvent::Failure(Fault::Voice { code: 5, report: true }));

    assert_eq!(hf.state(), HfpState::HfpConnected);
    assert!(hf.host.snapshot().is_empty());
}

fn samples() -> Vec<HfpEvent> {
    vec![
        HfpEvent::SelectDevice(PHONE),
        HfpEvent::ForgetDevice,
        HfpEvent::ConnectStart,
        HfpEvent::Connected,
        HfpEvent::Disconnected,
        HfpEvent::Disconnect,
        HfpEvent::HfpConnectStart,
        HfpEvent::HfpConnected,
        HfpEvent::NegotiationTimeout,
        HfpEvent::AtResponse(AtResponse::Ok),
        HfpEvent::StartOutgoingCall("1".into()),
        HfpEvent::IncomingCall,
        HfpEvent::Answer,
        HfpEvent::EndCall,
        HfpEvent::SendDtmf('5'),
        HfpEvent::PutOnHold,
        HfpEvent::Headset(false),
        HfpEvent::Failure(Fault::Negotiation),
    ]
}

#[test]
fn unhandled_events_leave_no_trace() {
    let table = handsfree::transition_table().unwrap();

    // one harness per starting state keeps each dispatch independent
    let setups: [(HfpState, fn(&mut Harness)); 3] = [
        (HfpState::Idle, |_| {}),
        (HfpState::HfpConnected, Harness::service_up),
        (HfpState::Calling, |hf| {
            hf.service_up();
            hf.send(HfpEvent::StartOutgoingCall("12345".into()));
            hf.journal.clear();
            hf.host.clear();
        }),
    ];

    for (state, setup) in setups {
        for event in samples() {
            let kind = hf_fsm::Event::kind(&event);
            if table.contains(state, kind) {
                continue;
            }
            let mut hf = Harness::new();
            setup(&mut hf);
            assert_eq!(hf.state(), state);

            assert_eq!(hf.engine.dispatch(event), Outcome::Unhandled, "{state:?} {kind:?}");
            assert_eq!(hf.state(), state);
            assert_eq!(hf.journal.len(), 0, "{state:?} {kind:?}");
            assert!(hf.host.snapshot().is_empty(), "{state:?} {kind:?}");
        }
    }
}

#[test]
fn ignored_events_leave_no_trace() {
    let mut hf = Harness::new();
    hf.service_up();
    for event in [HfpEvent::Connected, HfpEvent::NegotiationTimeout, HfpEvent::EndCall] {
        assert_eq!(hf.engine.dispatch(event), Outcome::Ignored);
    }
    assert_eq!(hf.state(), HfpState::HfpConnected);
    assert_eq!(hf.journal.len(), 0);
    assert!(!hf.engine.context().session().voice_active);
    assert!(handsfree::transition_table()
        .unwrap()
        .contains(HfpState::HfpConnected, HfpEventKind::ConnectStart));
}
