//! The session transition table and its choice resolvers.
//!
//! Resolvers only look at the event and the session; every side effect
//! lives in the branch actions of [`crate::actions`].

use hf_fsm::{Branch, TableError, TransitionTable};

use crate::actions::*;
use crate::at::{AtResponse, CallSetupPhase, CallSignal};
use crate::event::{Fault, HfpEvent, HfpEventKind as K};
use crate::machine::HandsFree;
use crate::notify::HfpStatus;
use crate::state::HfpState::{self, *};

type B = Branch<HandsFree>;

/// Branch index of the in-call state matching the headset preference:
/// `0` for headset on, `1` for headset off.
fn preferred_call_branch(hf: &HandsFree) -> usize {
    usize::from(!hf.session.pc_sound)
}

fn device_known(hf: &HandsFree, event: &HfpEvent) -> usize {
    match event {
        HfpEvent::SelectDevice(addr) if hf.transport.find_device(*addr).is_some() => 0,
        _ => 1,
    }
}

/// Timeout leniency: a negotiation that already delivered the indicator
/// mapping counts as connected.
fn negotiation_timed_out(hf: &HandsFree, _: &HfpEvent) -> usize {
    usize::from(hf.session.indicators.is_none())
}

fn headset_preference(hf: &HandsFree, _: &HfpEvent) -> usize {
    preferred_call_branch(hf)
}

/// Calling: 0/1 in call (per preference), 2 failed, 3 keep waiting.
fn outgoing_progress(hf: &HandsFree, event: &HfpEvent) -> usize {
    let HfpEvent::AtResponse(response) = event else {
        return 3;
    };
    match (response, hf.signal(response)) {
        (AtResponse::Error, _) | (_, Some(CallSignal::CallSetup(CallSetupPhase::Idle))) => 2,
        (
            _,
            Some(
                CallSignal::CallSetup(CallSetupPhase::Outgoing | CallSetupPhase::Alerting)
                | CallSignal::CallActive(true),
            ),
        ) => preferred_call_branch(hf),
        _ => 3,
    }
}

/// Ringing: 0/1 answered on the phone, 2 caller gave up, 3 keep ringing.
fn ringing_progress(hf: &HandsFree, event: &HfpEvent) -> usize {
    let HfpEvent::AtResponse(response) = event else {
        return 3;
    };
    match hf.signal(response) {
        Some(CallSignal::CallActive(true)) => preferred_call_branch(hf),
        Some(CallSignal::CallSetup(CallSetupPhase::Idle)) => {
            let active = hf
                .session
                .indicators
                .as_ref()
                .and_then(|map| map.status("call"))
                .unwrap_or(0);
            if active == 0 {
                2
            } else {
                3
            }
        }
        _ => 3,
    }
}

/// In call: 0 remote hang-up, 1 anything else.
fn in_call_progress(hf: &HandsFree, event: &HfpEvent) -> usize {
    match event {
        HfpEvent::AtResponse(response) if hf.signal(response) == Some(CallSignal::CallActive(false)) => 0,
        _ => 1,
    }
}

/// In call: 0 reroute live, 1 only record the preference. A reroute happens
/// when the requested routing differs from the one the state implies.
fn headset_while_on(_: &HandsFree, event: &HfpEvent) -> usize {
    usize::from(matches!(event, HfpEvent::Headset(true)))
}

fn headset_while_off(_: &HandsFree, event: &HfpEvent) -> usize {
    usize::from(matches!(event, HfpEvent::Headset(false)))
}

/// Service connected: 0 link failure, 1 stray voice failure.
fn link_fault(_: &HandsFree, event: &HfpEvent) -> usize {
    usize::from(matches!(event, HfpEvent::Failure(Fault::Voice { .. })))
}

/// In call: 0 reported voice failure, 1 silent channel close, 2 anything
/// else.
fn in_call_fault(_: &HandsFree, event: &HfpEvent) -> usize {
    match event {
        HfpEvent::Failure(Fault::Voice { report: true, .. }) => 0,
        HfpEvent::Failure(Fault::Voice { report: false, .. }) => 1,
        _ => 2,
    }
}

fn all_but(excluded: &[HfpState]) -> Vec<HfpState> {
    <HfpState as hf_fsm::Symbol>::ALL
        .iter()
        .copied()
        .filter(|state| !excluded.contains(state))
        .collect()
}

pub fn build() -> Result<TransitionTable<HandsFree>, TableError> {
    let all = all_but(&[]);
    let linked = HfpState::LINKED;
    let in_call = HfpState::IN_CALL;
    let call_states = [Calling, Ringing, InCallHeadsetOn, InCallHeadsetOff];

    TransitionTable::builder()
        // device selection
        .choice_each(
            &all,
            K::SelectDevice,
            device_known,
            &[B::to(Disconnected).run(select_device), B::stay().run(reject_device)],
        )
        .on_each(&all, K::ForgetDevice, B::to(Idle).run(forget_device))
        // link
        .on(Disconnected, K::ConnectStart, B::to(Connecting).run(begin_connect))
        .ignore_each(&all_but(&[Disconnected]), K::ConnectStart)
        .on(Connecting, K::Connected, B::to(Connected).run(link_up))
        .ignore_each(&all_but(&[Connecting]), K::Connected)
        .on(
            Connecting,
            K::Disconnected,
            B::to(Disconnected).run(link_lost).param(HfpStatus::ConnectFailure),
        )
        .on_each(
            &[Connected, HfpConnecting],
            K::Disconnected,
            B::to(Disconnected)
                .run(link_lost)
                .param(HfpStatus::ServiceConnectFailure),
        )
        .on(HfpConnected, K::Disconnected, B::to(Disconnected).run(link_lost))
        .on_each(
            &call_states,
            K::Disconnected,
            B::to(Disconnected).run(link_lost).param(HfpStatus::CallFailure),
        )
        .ignore_each(&[Idle, Disconnected], K::Disconnected)
        .on_each(&linked, K::Disconnect, B::to(Disconnected).run(disconnect))
        .on(Disconnected, K::Disconnect, B::stay().run(stop_polling))
        .ignore(Idle, K::Disconnect)
        // service level negotiation
        .on(Connected, K::HfpConnectStart, B::to(HfpConnecting).run(begin_negotiation))
        .on(HfpConnecting, K::AtResponse, B::stay().run(negotiate))
        .on(HfpConnecting, K::HfpConnected, B::to(HfpConnected).run(service_up))
        .choice(
            HfpConnecting,
            K::NegotiationTimeout,
            negotiation_timed_out,
            [
                B::to(HfpConnected).run(service_up),
                B::to(Disconnected)
                    .run(drop_link)
                    .param(HfpStatus::ServiceConnectFailure),
            ],
        )
        .ignore_each(&all_but(&[HfpConnecting]), K::NegotiationTimeout)
        // call setup
        .on(HfpConnected, K::AtResponse, B::stay().run(observe))
        .ignore_each(&[Idle, Disconnected, Connecting, Connected], K::AtResponse)
        .on(HfpConnected, K::StartOutgoingCall, B::to(Calling).run(dial))
        .on_each(&all_but(&[HfpConnected]), K::StartOutgoingCall, B::stay().run(reject_call))
        .choice(
            Calling,
            K::AtResponse,
            outgoing_progress,
            [
                B::to(InCallHeadsetOn).run(enter_call),
                B::to(InCallHeadsetOff).run(enter_call),
                B::to(HfpConnected).run(call_failed).param(HfpStatus::CallFailure),
                B::stay().run(observe),
            ],
        )
        .on(HfpConnected, K::IncomingCall, B::to(Ringing).run(ring))
        .ignore_each(&call_states, K::IncomingCall)
        .choice(
            Ringing,
            K::AtResponse,
            ringing_progress,
            [
                B::to(InCallHeadsetOn).run(enter_call),
                B::to(InCallHeadsetOff).run(enter_call),
                B::to(HfpConnected).run(call_ended).param(HfpStatus::CallEnded),
                B::stay().run(observe),
            ],
        )
        .choice(
            Ringing,
            K::Answer,
            headset_preference,
            [
                B::to(InCallHeadsetOn).run(answer),
                B::to(InCallHeadsetOff).run(answer),
            ],
        )
        .on_each(&all_but(&[Ringing]), K::Answer, B::stay().run(reject_call))
        // in call
        .choice_each(
            &in_call,
            K::AtResponse,
            in_call_progress,
            &[
                B::to(HfpConnected).run(call_ended).param(HfpStatus::CallEnded),
                B::stay().run(observe),
            ],
        )
        .on_each(
            &call_states,
            K::EndCall,
            B::to(HfpConnected).run(hang_up).param(HfpStatus::CallEnded),
        )
        .ignore(HfpConnected, K::EndCall)
        .on_each(&in_call, K::SendDtmf, B::stay().run(send_dtmf))
        .on_each(&in_call, K::PutOnHold, B::stay().run(put_on_hold))
        // headset routing
        .on_each(&all_but(&in_call), K::Headset, B::stay().run(set_preference))
        .choice(
            InCallHeadsetOn,
            K::Headset,
            headset_while_on,
            [B::to(InCallHeadsetOff).run(route_audio), B::stay().run(set_preference)],
        )
        .choice(
            InCallHeadsetOff,
            K::Headset,
            headset_while_off,
            [B::to(InCallHeadsetOn).run(route_audio), B::stay().run(set_preference)],
        )
        // failures
        .on_each(
            &[Connecting, Connected],
            K::Failure,
            B::to(Disconnected).run(drop_link).param(HfpStatus::ConnectFailure),
        )
        .on(
            HfpConnecting,
            K::Failure,
            B::to(Disconnected)
                .run(drop_link)
                .param(HfpStatus::ServiceConnectFailure),
        )
        .choice(
            HfpConnected,
            K::Failure,
            link_fault,
            [
                B::to(Disconnected).run(drop_link).param(HfpStatus::ConnectFailure),
                B::stay(),
            ],
        )
        .on_each(
            &[Calling, Ringing],
            K::Failure,
            B::to(HfpConnected).run(call_failed).param(HfpStatus::CallFailure),
        )
        .choice_each(
            &in_call,
            K::Failure,
            in_call_fault,
            &[
                B::to(HfpConnected).run(voice_failed).param(HfpStatus::VoiceFailure),
                B::to(HfpConnected).run(voice_failed).param(HfpStatus::CallEnded),
                B::to(HfpConnected).run(call_failed).param(HfpStatus::CallFailure),
            ],
        )
        .ignore_each(&[Idle, Disconnected], K::Failure)
        .build()
}
