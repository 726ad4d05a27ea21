#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use hf_fsm::{Engine, EngineConfig, Priority, TimerConfig, TimerWheel};
use handsfree::{
    BdAddr, Collaborators, DeviceInfo, HandsFree, HandsFreeConfig, HfpConfig, HfpEvent, HfpState,
    NotificationLog, Transport, TransportError, VoiceChannel, VoiceError,
};

pub const PHONE: BdAddr = BdAddr([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);
pub const STRANGER: BdAddr = BdAddr([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);

pub const INDICATORS: &str =
    r#"+CIND: ("call",(0,1)),("callsetup",(0-3)),("callheld",(0-2)),("signal",(0-5))"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Everything a collaborator was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(BdAddr),
    Disconnect,
    Command(String),
    Negotiate(usize),
    Dial(String),
    Dtmf(char),
    Answer,
    EndCall,
    Hold,
    ListCalls,
    VoiceOpen(BdAddr),
    VoiceStart,
    VoiceStop,
    VoiceClose,
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.0.lock().iter().filter(|c| *c == call).count()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

pub struct MockTransport {
    pub journal: Journal,
    pub devices: Vec<DeviceInfo>,
    /// Overrides the number of expected negotiation responses.
    pub expected: Option<usize>,
    pub refuse_dial: bool,
    pub refuse_list_calls: bool,
    /// Number of device lookups answered before the devices are unpaired.
    pub paired_for: Option<usize>,
    pub lookups: AtomicUsize,
}

impl Transport for MockTransport {
    fn find_device(&self, addr: BdAddr) -> Option<DeviceInfo> {
        let lookup = self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.paired_for.map_or(false, |limit| lookup >= limit) {
            return None;
        }
        self.devices.iter().find(|d| d.addr == addr).cloned()
    }

    fn begin_connect(&mut self, addr: BdAddr) -> Result<(), TransportError> {
        self.journal.push(Call::Connect(addr));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.journal.push(Call::Disconnect);
        Ok(())
    }

    fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        self.journal.push(Call::Command(command.to_string()));
        Ok(())
    }

    fn begin_service_negotiation(&mut self, commands: &[String]) -> Result<usize, TransportError> {
        let expected = self.expected.unwrap_or(commands.len());
        self.journal.push(Call::Negotiate(expected));
        Ok(expected)
    }

    fn start_call(&mut self, number: &str) -> Result<(), TransportError> {
        if self.refuse_dial {
            return Err(TransportError::Code(7));
        }
        self.journal.push(Call::Dial(number.to_string()));
        Ok(())
    }

    fn send_dtmf(&mut self, digit: char) -> Result<(), TransportError> {
        self.journal.push(Call::Dtmf(digit));
        Ok(())
    }

    fn answer(&mut self) -> Result<(), TransportError> {
        self.journal.push(Call::Answer);
        Ok(())
    }

    fn end_call(&mut self) -> Result<(), TransportError> {
        self.journal.push(Call::EndCall);
        Ok(())
    }

    fn put_on_hold(&mut self) -> Result<(), TransportError> {
        self.journal.push(Call::Hold);
        Ok(())
    }

    fn list_current_calls(&mut self) -> Result<(), TransportError> {
        if self.refuse_list_calls {
            return Err(TransportError::Busy);
        }
        self.journal.push(Call::ListCalls);
        Ok(())
    }
}

pub struct MockVoice {
    pub journal: Journal,
    pub fail_start: Option<VoiceError>,
}

impl VoiceChannel for MockVoice {
    fn open(&mut self, addr: BdAddr) -> Result<(), VoiceError> {
        self.journal.push(Call::VoiceOpen(addr));
        Ok(())
    }

    fn start(&mut self) -> Result<(), VoiceError> {
        if let Some(err) = self.fail_start.clone() {
            return Err(err);
        }
        self.journal.push(Call::VoiceStart);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), VoiceError> {
        self.journal.push(Call::VoiceStop);
        Ok(())
    }

    fn close(&mut self) -> Result<(), VoiceError> {
        self.journal.push(Call::VoiceClose);
        Ok(())
    }
}

/// Options for [`Harness::with`].
#[derive(Default)]
pub struct Setup {
    pub hfp: Option<HfpConfig>,
    pub expected: Option<usize>,
    pub refuse_dial: bool,
    pub refuse_list_calls: bool,
    pub paired_for: Option<usize>,
    pub fail_voice: Option<VoiceError>,
}

/// Test configuration: 10 ms ticks, 1 s polling, 100 ms negotiation timeout.
pub fn test_hfp() -> HfpConfig {
    HfpConfig::builder()
        .connect_poll_interval(Duration::from_secs(1))
        .negotiation_timeout(Duration::from_millis(100))
        .build()
}

pub fn collaborators(setup: &Setup, journal: &Journal, host: &NotificationLog) -> Collaborators {
    let transport = MockTransport {
        journal: journal.clone(),
        devices: vec![DeviceInfo::new(PHONE, "Pixel")],
        expected: setup.expected,
        refuse_dial: setup.refuse_dial,
        refuse_list_calls: setup.refuse_list_calls,
        paired_for: setup.paired_for,
        lookups: AtomicUsize::new(0),
    };
    let voice = MockVoice {
        journal: journal.clone(),
        fail_start: setup.fail_voice.clone(),
    };
    Collaborators::new(transport, voice, host.clone())
}

/// Session driven by hand: events are dispatched on the test thread.
pub struct Harness {
    pub engine: Engine<HandsFree>,
    pub timers: Arc<TimerWheel<HfpEvent>>,
    pub journal: Journal,
    pub host: NotificationLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Setup::default())
    }

    pub fn with(setup: Setup) -> Self {
        init_logging();
        let journal = Journal::default();
        let host = NotificationLog::new();
        let config = HandsFreeConfig::default()
            .with_engine(EngineConfig::builder().name("hfp-test").build())
            .with_timers(TimerConfig::default().with_tick(Duration::from_millis(10)))
            .with_hfp(setup.hfp.clone().unwrap_or_else(test_hfp));
        let assembly = HandsFree::build(&config, collaborators(&setup, &journal, &host)).unwrap();
        Self {
            engine: assembly.engine,
            timers: assembly.timers,
            journal,
            host,
        }
    }

    pub fn state(&self) -> HfpState {
        self.engine.state()
    }

    /// Host request (low priority), processed to completion.
    pub fn send(&mut self, event: HfpEvent) {
        self.engine.submit(event, Priority::Low).unwrap();
        self.engine.run_until_idle();
    }

    /// Transport notification (high priority), processed to completion.
    pub fn inbound(&mut self, event: HfpEvent) {
        self.engine.submit(event, Priority::High).unwrap();
        self.engine.run_until_idle();
    }

    pub fn at(&mut self, line: &str) {
        self.inbound(HfpEvent::AtResponse(handsfree::AtResponse::parse(line)));
    }

    pub fn ok(&mut self, times: usize) {
        for _ in 0..times {
            self.at("OK");
        }
    }

    pub fn tick(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.timers.tick().unwrap();
            self.engine.run_until_idle();
        }
    }

    /// Idle -> HfpConnecting.
    pub fn link_up(&mut self) {
        self.send(HfpEvent::SelectDevice(PHONE));
        assert_eq!(self.state(), HfpState::Connecting);
        self.inbound(HfpEvent::Connected);
        assert_eq!(self.state(), HfpState::HfpConnecting);
    }

    /// Idle -> HfpConnected with the standard five-command negotiation.
    pub fn service_up(&mut self) {
        self.link_up();
        self.at(INDICATORS);
        self.ok(2);
        self.at("+CIND: 0,0,0,4");
        self.ok(3);
        assert_eq!(self.state(), HfpState::HfpConnected);
        self.journal.clear();
        self.host.clear();
    }

    /// Idle -> in call via an outgoing call.
    pub fn outgoing_call(&mut self) {
        self.service_up();
        self.send(HfpEvent::StartOutgoingCall("12345".into()));
        self.at("+CIEV: 2,2");
        assert!(self.state().is_in_call());
    }
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
