//! Threaded session facade.

use log::info;

use hf_fsm::{Engine, EngineError, EngineHandle, Priority, SubmitError, Submitter, Ticker, TraceHook};

use crate::at::AtResponse;
use crate::config::HandsFreeConfig;
use crate::device::BdAddr;
use crate::event::{Fault, HfpEvent};
use crate::machine::{Assembly, Collaborators, HandsFree};
use crate::notify::HostNotifier;
use crate::transport::{Transport, VoiceChannel};

/// A session running on its own dispatch thread, with a ticker thread for
/// its timers.
///
/// Host requests are queued at low priority; transport and voice
/// notifications at high priority, so they are always handled first.
/// Every method returns as soon as the event is queued.
pub struct HandsFreeRuntime {
    submitter: Submitter<HfpEvent>,
    ticker: Option<Ticker>,
    handle: Option<EngineHandle<HandsFree>>,
}

impl HandsFreeRuntime {
    pub fn start<T, V, H>(config: HandsFreeConfig, transport: T, voice: V, host: H) -> Result<Self, EngineError>
    where
        T: Transport + 'static,
        V: VoiceChannel + 'static,
        H: HostNotifier + 'static,
    {
        Self::start_traced(config, Collaborators::new(transport, voice, host), None)
    }

    /// Like [`HandsFreeRuntime::start`], also emitting trace records and
    /// the dictionaries describing them.
    pub fn start_traced(
        config: HandsFreeConfig,
        collaborators: Collaborators,
        trace: Option<TraceHook>,
    ) -> Result<Self, EngineError> {
        let Assembly { engine, timers } = HandsFree::build_traced(&config, collaborators, trace)?;
        engine.announce();
        timers.announce();

        let submitter = engine.submitter();
        let handle = engine.spawn()?;
        let ticker = timers.spawn_ticker()?;
        info!("hands-free session started");
        Ok(Self {
            submitter,
            ticker: Some(ticker),
            handle: Some(handle),
        })
    }

    pub fn submitter(&self) -> Submitter<HfpEvent> {
        self.submitter.clone()
    }

    // host requests

    pub fn select_device(&self, addr: BdAddr) -> Result<(), SubmitError> {
        self.host(HfpEvent::SelectDevice(addr))
    }

    pub fn forget_device(&self) -> Result<(), SubmitError> {
        self.host(HfpEvent::ForgetDevice)
    }

    pub fn disconnect(&self) -> Result<(), SubmitError> {
        self.host(HfpEvent::Disconnect)
    }

    pub fn start_call(&self, number: impl Into<String>) -> Result<(), SubmitError> {
        self.host(HfpEvent::StartOutgoingCall(number.into()))
    }

    pub fn answer(&self) -> Result<(), SubmitError> {
        self.host(HfpEvent::Answer)
    }

    pub fn end_call(&self) -> Result<(), SubmitError> {
        self.host(HfpEvent::EndCall)
    }

    pub fn send_dtmf(&self, digit: char) -> Result<(), SubmitError> {
        self.host(HfpEvent::SendDtmf(digit))
    }

    pub fn put_on_hold(&self) -> Result<(), SubmitError> {
        self.host(HfpEvent::PutOnHold)
    }

    /// `true` routes call audio through the PC.
    pub fn set_headset(&self, pc_sound: bool) -> Result<(), SubmitError> {
        self.host(HfpEvent::Headset(pc_sound))
    }

    // transport and voice notifications

    pub fn on_connected(&self) -> Result<(), SubmitError> {
        self.inbound(HfpEvent::Connected)
    }

    pub fn on_disconnected(&self) -> Result<(), SubmitError> {
        self.inbound(HfpEvent::Disconnected)
    }

    /// Classifies one raw response line and queues it.
    pub fn on_at_line(&self, line: &str) -> Result<(), SubmitError> {
        self.inbound(HfpEvent::AtResponse(AtResponse::parse(line)))
    }

    pub fn on_failure(&self, code: i32) -> Result<(), SubmitError> {
        self.inbound(HfpEvent::Failure(Fault::Link { code }))
    }

    /// `report` is false when the channel merely closed.
    pub fn on_voice_failure(&self, code: i32, report: bool) -> Result<(), SubmitError> {
        self.inbound(HfpEvent::Failure(Fault::Voice { code, report }))
    }

    /// Stops the ticker, then the dispatch thread. Queued events are
    /// dropped; an action already running completes. Returns the stopped
    /// engine for inspection.
    pub fn shutdown(mut self) -> Option<Engine<HandsFree>> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Engine<HandsFree>> {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
        let engine = self.handle.take()?.shutdown();
        info!("hands-free session stopped");
        engine
    }

    fn host(&self, event: HfpEvent) -> Result<(), SubmitError> {
        self.submitter.submit(event, Priority::Low)
    }

    fn inbound(&self, event: HfpEvent) -> Result<(), SubmitError> {
        self.submitter.submit(event, Priority::High)
    }
}

impl Drop for HandsFreeRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}
