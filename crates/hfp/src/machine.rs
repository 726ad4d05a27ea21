//! The session machine: context type, assembly and the helpers shared by
//! transition actions.

use std::sync::Arc;

use log::{debug, warn};

use hf_fsm::{
    Engine, EngineBuilder, EngineError, Machine, Priority, Step, TimeEvent, TimerWheel, TraceHook,
};

use crate::at::{AtResponse, CallSignal};
use crate::call_info::CallInfo;
use crate::config::{HandsFreeConfig, HfpConfig};
use crate::device::BdAddr;
use crate::error::{HfpError, ParseError, TransportError};
use crate::event::{Fault, HfpEvent};
use crate::indicators::IndicatorMap;
use crate::notify::{HfpStatus, HostNotifier, Notification, NotifyFields};
use crate::session::Session;
use crate::state::HfpState;
use crate::table;
use crate::transport::{Transport, VoiceChannel};

pub(crate) type HfpStep<'a> = Step<'a, HandsFree>;

/// The three collaborators a session talks to.
pub struct Collaborators {
    pub transport: Box<dyn Transport>,
    pub voice: Box<dyn VoiceChannel>,
    pub host: Box<dyn HostNotifier>,
}

impl Collaborators {
    pub fn new<T, V, H>(transport: T, voice: V, host: H) -> Self
    where
        T: Transport + 'static,
        V: VoiceChannel + 'static,
        H: HostNotifier + 'static,
    {
        Self {
            transport: Box::new(transport),
            voice: Box::new(voice),
            host: Box::new(host),
        }
    }
}

/// An engine not yet running, with the timer wheel feeding it.
pub struct Assembly {
    pub engine: Engine<HandsFree>,
    pub timers: Arc<TimerWheel<HfpEvent>>,
}

/// Session context. Only transition actions mutate it, always on the
/// dispatch thread.
pub struct HandsFree {
    pub(crate) config: HfpConfig,
    pub(crate) session: Session,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) voice: Box<dyn VoiceChannel>,
    host: Box<dyn HostNotifier>,
    pub(crate) connect_poll: Arc<TimeEvent<HfpEvent>>,
    pub(crate) negotiation_timer: Arc<TimeEvent<HfpEvent>>,
}

impl Machine for HandsFree {
    type State = HfpState;
    type Event = HfpEvent;
    type Param = HfpStatus;
    type Error = HfpError;
}

impl HandsFree {
    /// Assembles an idle session without starting any thread. Drive it with
    /// [`Engine::run_until_idle`] and [`TimerWheel::tick`], or hand it to
    /// [`crate::HandsFreeRuntime`].
    pub fn build(config: &HandsFreeConfig, collaborators: Collaborators) -> Result<Assembly, EngineError> {
        Self::build_traced(config, collaborators, None)
    }

    pub fn build_traced(
        config: &HandsFreeConfig,
        collaborators: Collaborators,
        trace: Option<TraceHook>,
    ) -> Result<Assembly, EngineError> {
        let table = Arc::new(table::build()?);
        let builder = EngineBuilder::with_trace(config.engine.clone(), trace.clone());
        let timers = Arc::new(
            TimerWheel::new(config.timers.clone(), builder.submitter()).with_trace_hook(trace),
        );
        let connect_poll = timers.create("connect_poll", || HfpEvent::ConnectStart, Priority::Low);
        let negotiation_timer =
            timers.create("negotiation", || HfpEvent::NegotiationTimeout, Priority::High);

        let context = Self {
            config: config.hfp.clone(),
            session: Session::new(config.hfp.pc_sound),
            transport: collaborators.transport,
            voice: collaborators.voice,
            host: collaborators.host,
            connect_poll,
            negotiation_timer,
        };
        let engine = builder.build(table, HfpState::Idle, context);
        Ok(Assembly { engine, timers })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &HfpConfig {
        &self.config
    }

    pub(crate) fn notify(&mut self, state: HfpState, status: HfpStatus, fields: NotifyFields) {
        let notification = Notification {
            state,
            status,
            fields,
            params: (!fields.is_empty()).then(|| self.session.public_params()),
        };
        debug!("notify {state:?} {status} fields={:#06b}", fields.bits());
        self.host.notify(&notification);
    }

    pub(crate) fn device_addr(&self) -> Result<BdAddr, HfpError> {
        self.session
            .device
            .as_ref()
            .map(|device| device.addr)
            .ok_or(HfpError::NoDevice)
    }

    /// Runs a transport operation whose failure must be recovered from: the
    /// error is turned into a `Failure` event dispatched right after the
    /// current transition.
    pub(crate) fn transport_op<F>(&mut self, step: &mut HfpStep<'_>, op: F) -> Result<(), HfpError>
    where
        F: FnOnce(&mut dyn Transport) -> Result<(), TransportError>,
    {
        op(self.transport.as_mut()).map_err(|err| {
            step.raise(HfpEvent::Failure(Fault::Link { code: err.code() }));
            err.into()
        })
    }

    pub(crate) fn start_voice(&mut self, step: &mut HfpStep<'_>) -> Result<(), HfpError> {
        if self.session.voice_active {
            return Ok(());
        }
        let addr = self.device_addr()?;
        let result = self.voice.open(addr).and_then(|()| {
            let started = self.voice.start();
            if started.is_err() {
                if let Err(err) = self.voice.close() {
                    warn!("closing voice channel: {err}");
                }
            }
            started
        });
        match result {
            Ok(()) => {
                self.session.voice_active = true;
                Ok(())
            }
            Err(err) => {
                step.raise(HfpEvent::Failure(Fault::Voice {
                    code: err.code(),
                    report: err.should_report(),
                }));
                Err(err.into())
            }
        }
    }

    /// Stops and closes the voice channel if it is running. Calling it again
    /// does nothing.
    pub(crate) fn stop_voice(&mut self) {
        if !std::mem::replace(&mut self.session.voice_active, false) {
            return;
        }
        if let Err(err) = self.voice.stop() {
            warn!("stopping voice channel: {err}");
        }
        if let Err(err) = self.voice.close() {
            warn!("closing voice channel: {err}");
        }
    }

    /// Drops everything tied to the current link. With `hang_up` the
    /// transport is also asked to disconnect.
    pub(crate) fn release_link(&mut self, hang_up: bool) {
        self.negotiation_timer.stop();
        self.stop_voice();
        if hang_up {
            if let Err(err) = self.transport.disconnect() {
                warn!("disconnect: {err}");
            }
        }
        self.session.reset_link();
    }

    /// Meaning of an indicator update under the current mapping.
    pub(crate) fn signal(&self, response: &AtResponse) -> Option<CallSignal> {
        match response {
            AtResponse::IndicatorEvent { index, value } => {
                self.session.indicators.as_ref()?.interpret(*index, *value)
            }
            _ => None,
        }
    }

    /// Folds an AT response into the session: indicator mapping and
    /// statuses, gateway features and caller info.
    pub(crate) fn absorb(&mut self, response: &AtResponse) -> Result<Option<CallSignal>, ParseError> {
        debug!("AT {response}");
        match response {
            AtResponse::IndicatorMap(text) => {
                self.session.indicators = None;
                self.session.indicators = Some(IndicatorMap::construct(text)?);
            }
            AtResponse::IndicatorStatus(text) => {
                if let Some(map) = self.session.indicators.as_mut() {
                    map.set_statuses(text)?;
                }
            }
            AtResponse::IndicatorEvent { index, value } => {
                return Ok(self
                    .session
                    .indicators
                    .as_mut()
                    .and_then(|map| map.update(*index, *value)));
            }
            AtResponse::Features(bits) => self.session.gateway_features = Some(*bits),
            AtResponse::CallerId(text) | AtResponse::CurrentCall(text) => {
                self.session.caller = Some(CallInfo::parse(text)?);
            }
            _ => {}
        }
        Ok(None)
    }
}
