//! Transition actions. Each one performs the side effects of a single table
//! branch; the branch's static parameter is the status reported to the host.

use log::{debug, info, warn};

use crate::at::{AtResponse, CallSetupPhase, CallSignal};
use crate::call_info::CallInfo;
use crate::error::HfpError;
use crate::event::{Fault, HfpEvent};
use crate::indicators::DerivedCallState;
use crate::machine::{HandsFree, HfpStep};
use crate::notify::{HfpStatus, NotifyFields};
use crate::state::HfpState;

type ActionResult = Result<(), HfpError>;

// --- device selection -------------------------------------------------------

pub(crate) fn select_device(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    let HfpEvent::SelectDevice(addr) = event else {
        return Ok(());
    };
    let linked = step.current().is_linked();
    let Some(device) = hf.transport.find_device(*addr) else {
        // Unpaired between resolution and now: fall back to a clean Idle.
        warn!("{addr} vanished from the paired devices");
        hf.release_link(linked);
        hf.notify(step.target(), HfpStatus::UnknownDevice, NotifyFields::NONE);
        step.raise(HfpEvent::ForgetDevice);
        return Err(HfpError::UnknownDevice(*addr));
    };

    if linked {
        hf.release_link(true);
    }
    info!("selected {device}");
    hf.session.device = Some(device);
    hf.connect_poll.start(hf.config.connect_poll_interval, true);
    hf.notify(step.target(), status, NotifyFields::DEVICE | NotifyFields::STATE);
    step.raise(HfpEvent::ConnectStart);
    Ok(())
}

pub(crate) fn reject_device(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, _: HfpStatus) -> ActionResult {
    if let HfpEvent::SelectDevice(addr) = event {
        warn!("{addr} is not a paired device");
    }
    hf.notify(step.target(), HfpStatus::UnknownDevice, NotifyFields::NONE);
    if step.current() == HfpState::Idle {
        step.raise(HfpEvent::ForgetDevice);
    }
    Ok(())
}

pub(crate) fn forget_device(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.connect_poll.stop();
    hf.release_link(step.current().is_linked());
    if let Some(device) = hf.session.device.take() {
        info!("forgot {device}");
    }
    hf.notify(step.target(), status, NotifyFields::DEVICE | NotifyFields::STATE);
    Ok(())
}

// --- link -------------------------------------------------------------------

pub(crate) fn begin_connect(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    let addr = match hf.device_addr() {
        Ok(addr) => addr,
        Err(err) => {
            step.raise(HfpEvent::Failure(Fault::Link { code: -1 }));
            return Err(err);
        }
    };
    hf.transport_op(step, |transport| transport.begin_connect(addr))?;
    hf.notify(step.target(), status, NotifyFields::STATE);
    Ok(())
}

pub(crate) fn link_up(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.notify(step.target(), status, NotifyFields::STATE);
    step.raise(HfpEvent::HfpConnectStart);
    Ok(())
}

/// Transport reported the link down. Polling stays armed so the link is
/// brought back up.
pub(crate) fn link_lost(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.release_link(false);
    hf.notify(step.target(), status, NotifyFields::STATE);
    Ok(())
}

/// Tears the link down after a failure. Polling stays armed.
pub(crate) fn drop_link(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.release_link(true);
    hf.notify(step.target(), status, NotifyFields::STATE);
    Ok(())
}

/// Host-requested disconnect: stops polling as well.
pub(crate) fn disconnect(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.connect_poll.stop();
    drop_link(hf, step, event, status)
}

pub(crate) fn stop_polling(hf: &mut HandsFree, _: &mut HfpStep<'_>, _: &HfpEvent, _: HfpStatus) -> ActionResult {
    hf.connect_poll.stop();
    Ok(())
}

// --- service level negotiation ----------------------------------------------

pub(crate) fn begin_negotiation(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.session.reset_link();
    hf.session.negotiating = true;
    hf.negotiation_timer.start(hf.config.negotiation_timeout, false);

    let commands = hf.config.negotiation_sequence();
    match hf.transport.begin_service_negotiation(&commands) {
        Ok(expected) => hf.session.expected_responses = expected,
        Err(err) => {
            step.raise(HfpEvent::Failure(Fault::Link { code: err.code() }));
            return Err(err.into());
        }
    }
    debug!("negotiating, expecting {} responses", hf.session.expected_responses);
    hf.notify(step.target(), status, NotifyFields::STATE);
    Ok(())
}

/// Counts final result codes during negotiation. Once all expected ones are
/// in, the outcome depends only on whether an indicator mapping arrived.
pub(crate) fn negotiate(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, _: HfpStatus) -> ActionResult {
    let HfpEvent::AtResponse(response) = event else {
        return Ok(());
    };
    if !hf.session.negotiating {
        debug!("late negotiation response {response}");
        return Ok(());
    }

    let absorbed = hf.absorb(response);
    if response.is_final() {
        hf.session.received_responses += 1;
        if hf.session.received_responses >= hf.session.expected_responses {
            hf.session.negotiating = false;
            if hf.session.indicators.is_some() {
                step.raise(HfpEvent::HfpConnected);
            } else {
                warn!("negotiation finished without an indicator mapping");
                step.raise(HfpEvent::Failure(Fault::Negotiation));
            }
        }
    }
    absorbed.map(drop).map_err(Into::into)
}

pub(crate) fn service_up(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.negotiation_timer.stop();
    hf.session.negotiating = false;
    info!("service level connection up");
    hf.notify(step.target(), status, NotifyFields::STATE);

    let ringing = hf
        .session
        .indicators
        .as_ref()
        .is_some_and(|map| map.current_state() == DerivedCallState::Ringing);
    if ringing {
        step.raise(HfpEvent::IncomingCall);
    }
    Ok(())
}

// --- calls ------------------------------------------------------------------

pub(crate) fn reject_call(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, _: HfpStatus) -> ActionResult {
    warn!("{:?} not allowed in {:?}", event, step.current());
    hf.notify(step.target(), HfpStatus::IncorrectState4Call, NotifyFields::NONE);
    Ok(())
}

pub(crate) fn dial(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    let HfpEvent::StartOutgoingCall(number) = event else {
        return Ok(());
    };
    info!("calling {number}");
    hf.session.caller = Some(CallInfo::from_number(number));
    hf.transport_op(step, |transport| transport.start_call(number))?;
    hf.notify(step.target(), status, NotifyFields::STATE | NotifyFields::CALLER);
    Ok(())
}

pub(crate) fn ring(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    info!("incoming call");
    hf.session.caller = None;
    hf.notify(step.target(), status, NotifyFields::STATE);
    // Caller info only; the call goes on without it.
    if let Err(err) = hf.transport.list_current_calls() {
        warn!("listing current calls: {err}");
    }
    Ok(())
}

/// Call established: starts the voice path when the target state routes
/// audio to the PC.
pub(crate) fn enter_call(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    let absorbed = match event {
        HfpEvent::AtResponse(response) => hf.absorb(response).map(drop),
        _ => Ok(()),
    };
    if step.target() == HfpState::InCallHeadsetOn {
        hf.start_voice(step)?;
    }
    info!("call active, audio on {}", if hf.session.voice_active { "PC" } else { "phone" });
    hf.notify(step.target(), status, NotifyFields::STATE | NotifyFields::CALLER);
    absorbed.map_err(Into::into)
}

pub(crate) fn answer(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.transport_op(step, |transport| transport.answer())?;
    enter_call(hf, step, event, status)
}

/// Local hang-up.
pub(crate) fn hang_up(hf: &mut HandsFree, step: &mut HfpStep<'_>, _: &HfpEvent, status: HfpStatus) -> ActionResult {
    hf.stop_voice();
    hf.session.caller = None;
    info!("call ended locally");
    hf.notify(step.target(), status, NotifyFields::STATE);
    hf.transport.end_call()?;
    Ok(())
}

/// The call went away on the gateway side.
pub(crate) fn call_ended(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    if let HfpEvent::AtResponse(response) = event {
        if let Err(err) = hf.absorb(response) {
            debug!("ignoring malformed response: {err}");
        }
    }
    hf.stop_voice();
    hf.session.caller = None;
    info!("call ended by gateway");
    hf.notify(step.target(), status, NotifyFields::STATE);
    Ok(())
}

pub(crate) fn call_failed(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    if let HfpEvent::AtResponse(response) = event {
        if let Err(err) = hf.absorb(response) {
            debug!("ignoring malformed response: {err}");
        }
    }
    hf.stop_voice();
    if let Err(err) = hf.transport.end_call() {
        debug!("end call after failure: {err}");
    }
    hf.session.caller = None;
    warn!("call failed ({status})");
    hf.notify(step.target(), status, NotifyFields::STATE);
    Ok(())
}

/// Voice channel failure during a call. The call is ended; `status`
/// separates failures to show the user from a plain channel close.
pub(crate) fn voice_failed(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    if let HfpEvent::Failure(Fault::Voice { code, .. }) = event {
        warn!("voice channel failed with code {code}");
    }
    call_failed(hf, step, event, status)
}

pub(crate) fn send_dtmf(hf: &mut HandsFree, _: &mut HfpStep<'_>, event: &HfpEvent, _: HfpStatus) -> ActionResult {
    if let HfpEvent::SendDtmf(digit) = event {
        hf.transport.send_dtmf(*digit)?;
    }
    Ok(())
}

pub(crate) fn put_on_hold(hf: &mut HandsFree, _: &mut HfpStep<'_>, _: &HfpEvent, _: HfpStatus) -> ActionResult {
    hf.transport.put_on_hold()?;
    Ok(())
}

/// Keeps the session in sync with unsolicited responses that do not change
/// state. In `HfpConnected` an incoming call setup or `RING` starts ringing.
pub(crate) fn observe(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    let HfpEvent::AtResponse(response) = event else {
        return Ok(());
    };
    let signal = hf.absorb(response)?;

    if step.current() == HfpState::HfpConnected
        && (*response == AtResponse::Ring
            || signal == Some(CallSignal::CallSetup(CallSetupPhase::Incoming)))
    {
        step.raise(HfpEvent::IncomingCall);
    }
    if matches!(response, AtResponse::CallerId(_) | AtResponse::CurrentCall(_)) {
        hf.notify(step.target(), status, NotifyFields::CALLER);
    }
    Ok(())
}

// --- headset routing ----------------------------------------------------------

pub(crate) fn set_preference(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    let HfpEvent::Headset(pc_sound) = event else {
        return Ok(());
    };
    let changed = hf.session.pc_sound != *pc_sound;
    hf.session.pc_sound = *pc_sound;
    if changed && hf.config.notify_on_preference {
        hf.notify(step.target(), status, NotifyFields::PC_SOUND);
    }
    Ok(())
}

/// Moves live call audio between the PC and the phone.
pub(crate) fn route_audio(hf: &mut HandsFree, step: &mut HfpStep<'_>, event: &HfpEvent, status: HfpStatus) -> ActionResult {
    let HfpEvent::Headset(pc_sound) = event else {
        return Ok(());
    };
    hf.session.pc_sound = *pc_sound;
    if *pc_sound {
        hf.start_voice(step)?;
    } else {
        hf.stop_voice();
    }
    hf.notify(step.target(), status, NotifyFields::STATE | NotifyFields::PC_SOUND);
    Ok(())
}
