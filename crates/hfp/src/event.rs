//! Events fed to the session machine.

use hf_fsm::{symbols, Event};

use crate::at::AtResponse;
use crate::device::BdAddr;

symbols! {
    pub enum HfpEventKind {
        SelectDevice,
        ForgetDevice,
        ConnectStart,
        Connected,
        Disconnected,
        Disconnect,
        HfpConnectStart,
        HfpConnected,
        NegotiationTimeout,
        AtResponse,
        StartOutgoingCall,
        IncomingCall,
        Answer,
        EndCall,
        SendDtmf,
        PutOnHold,
        Headset,
        Failure,
    }
}

/// Origin of a `Failure` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Transport reported an error.
    Link { code: i32 },
    /// Service-level negotiation finished without an indicator mapping.
    Negotiation,
    /// Voice channel failed; `report` is false for a plain channel close.
    Voice { code: i32, report: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HfpEvent {
    /// Host picked a device.
    SelectDevice(BdAddr),
    ForgetDevice,
    /// Try to bring the link up; posted by the polling timer.
    ConnectStart,
    /// Transport: link is up.
    Connected,
    /// Transport: link went down.
    Disconnected,
    /// Host asked to disconnect.
    Disconnect,
    HfpConnectStart,
    HfpConnected,
    NegotiationTimeout,
    AtResponse(AtResponse),
    StartOutgoingCall(String),
    IncomingCall,
    Answer,
    EndCall,
    SendDtmf(char),
    PutOnHold,
    /// Host changed the headset preference: `true` routes audio to the PC.
    Headset(bool),
    Failure(Fault),
}

impl Event for HfpEvent {
    type Kind = HfpEventKind;

    fn kind(&self) -> HfpEventKind {
        match self {
            Self::SelectDevice(_) => HfpEventKind::SelectDevice,
            Self::ForgetDevice => HfpEventKind::ForgetDevice,
            Self::ConnectStart => HfpEventKind::ConnectStart,
            Self::Connected => HfpEventKind::Connected,
            Self::Disconnected => HfpEventKind::Disconnected,
            Self::Disconnect => HfpEventKind::Disconnect,
            Self::HfpConnectStart => HfpEventKind::HfpConnectStart,
            Self::HfpConnected => HfpEventKind::HfpConnected,
            Self::NegotiationTimeout => HfpEventKind::NegotiationTimeout,
            Self::AtResponse(_) => HfpEventKind::AtResponse,
            Self::StartOutgoingCall(_) => HfpEventKind::StartOutgoingCall,
            Self::IncomingCall => HfpEventKind::IncomingCall,
            Self::Answer => HfpEventKind::Answer,
            Self::EndCall => HfpEventKind::EndCall,
            Self::SendDtmf(_) => HfpEventKind::SendDtmf,
            Self::PutOnHold => HfpEventKind::PutOnHold,
            Self::Headset(_) => HfpEventKind::Headset,
            Self::Failure(_) => HfpEventKind::Failure,
        }
    }
}
