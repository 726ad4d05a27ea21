//! A scripted phone on the far side of the link.
//!
//! The transport and voice channel handed to the session only forward what
//! they are asked to do to the phone thread, which answers the way a real
//! audio gateway would: asynchronously, through the session's inbound queue.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use handsfree::{
    AtResponse, BdAddr, DeviceInfo, HfpEvent, Transport, TransportError, VoiceChannel, VoiceError,
};
use hf_fsm::{Priority, Submitter};

const INDICATORS: &str =
    r#"+CIND: ("call",(0,1)),("callsetup",(0-3)),("callheld",(0-2)),("service",(0,1)),("signal",(0-5))"#;

/// Gateway feature bits advertised in `+BRSF`.
const GATEWAY_FEATURES: u32 = 871;

/// What the session asked of the link, plus the user's own actions on the
/// phone.
#[derive(Debug)]
pub enum Wire {
    Connect(BdAddr),
    Disconnect,
    Command(String),
    /// Someone calls the phone.
    Incoming { number: String, name: String },
    /// The far end hangs up.
    RemoteHangUp,
    Quit,
}

pub struct Phone {
    addr: BdAddr,
    name: String,
    latency: Duration,
    tx: Sender<Wire>,
    rx: Option<Receiver<Wire>>,
}

impl Phone {
    pub fn new(addr: BdAddr, name: impl Into<String>, latency: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            addr,
            name: name.into(),
            latency,
            tx,
            rx: Some(rx),
        }
    }

    pub fn addr(&self) -> BdAddr {
        self.addr
    }

    pub fn transport(&self) -> PhoneLink {
        PhoneLink {
            paired: DeviceInfo::new(self.addr, self.name.clone()),
            tx: self.tx.clone(),
        }
    }

    pub fn user(&self) -> Sender<Wire> {
        self.tx.clone()
    }

    /// Starts answering on its own thread. Replies go to `session`.
    pub fn spawn(mut self, session: Submitter<HfpEvent>) -> io::Result<JoinHandle<()>> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "phone already running"))?;
        let latency = self.latency;
        thread::Builder::new()
            .name("phone".into())
            .spawn(move || Gateway::new(session, latency).run(rx))
    }
}

/// Transport half handed to the session.
pub struct PhoneLink {
    paired: DeviceInfo,
    tx: Sender<Wire>,
}

impl PhoneLink {
    fn forward(&self, wire: Wire) -> Result<(), TransportError> {
        self.tx.send(wire).map_err(|_| TransportError::NotConnected)
    }
}

impl Transport for PhoneLink {
    fn find_device(&self, addr: BdAddr) -> Option<DeviceInfo> {
        (addr == self.paired.addr).then(|| self.paired.clone())
    }

    fn begin_connect(&mut self, addr: BdAddr) -> Result<(), TransportError> {
        self.forward(Wire::Connect(addr))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.forward(Wire::Disconnect)
    }

    fn send_command(&mut self, command: &str) -> Result<(), TransportError> {
        debug!("HF -> AG {command}");
        self.forward(Wire::Command(command.to_string()))
    }
}

/// Voice half: logs the audio path changes.
#[derive(Debug, Default)]
pub struct SpeakerVoice {
    open: Option<BdAddr>,
}

impl VoiceChannel for SpeakerVoice {
    fn open(&mut self, addr: BdAddr) -> Result<(), VoiceError> {
        info!("SCO link to {addr} opened");
        self.open = Some(addr);
        Ok(())
    }

    fn start(&mut self) -> Result<(), VoiceError> {
        match self.open {
            Some(addr) => {
                info!("audio from {addr} now on the PC speaker");
                Ok(())
            }
            None => Err(VoiceError::Open(-1)),
        }
    }

    fn stop(&mut self) -> Result<(), VoiceError> {
        info!("audio back on the phone");
        Ok(())
    }

    fn close(&mut self) -> Result<(), VoiceError> {
        self.open = None;
        Ok(())
    }
}

struct Gateway {
    session: Submitter<HfpEvent>,
    latency: Duration,
    linked: bool,
    in_call: bool,
    dialled: Option<String>,
}

impl Gateway {
    fn new(session: Submitter<HfpEvent>, latency: Duration) -> Self {
        Self {
            session,
            latency,
            linked: false,
            in_call: false,
            dialled: None,
        }
    }

    fn run(mut self, rx: Receiver<Wire>) {
        while let Ok(wire) = rx.recv() {
            if matches!(wire, Wire::Quit) {
                break;
            }
            if let Err(err) = self.handle(wire) {
                warn!("phone: session stopped listening ({err})");
                break;
            }
        }
        debug!("phone thread exiting");
    }

    fn handle(&mut self, wire: Wire) -> Result<(), hf_fsm::SubmitError> {
        thread::sleep(self.latency);
        match wire {
            Wire::Connect(addr) => {
                info!("phone: RFCOMM link from HF accepted ({addr})");
                self.linked = true;
                self.session.submit(HfpEvent::Connected, Priority::High)
            }
            Wire::Disconnect => {
                self.linked = false;
                self.in_call = false;
                self.session.submit(HfpEvent::Disconnected, Priority::High)
            }
            Wire::Command(command) if self.linked => self.command(&command),
            Wire::Command(command) => {
                warn!("phone: {command} without a link");
                Ok(())
            }
            Wire::Incoming { number, name } => {
                self.dialled = Some(number.clone());
                self.reply(&["+CIEV: 2,1", "RING"])?;
                self.reply(&[&format!(r#"+CLIP: "{number}",129,,,"{name}""#)])
            }
            Wire::RemoteHangUp => self.hang_up(),
            Wire::Quit => Ok(()),
        }
    }

    fn command(&mut self, command: &str) -> Result<(), hf_fsm::SubmitError> {
        if command.starts_with("AT+BRSF=") {
            return self.reply(&[&format!("+BRSF: {GATEWAY_FEATURES}"), "OK"]);
        }
        if let Some(number) = command.strip_prefix("ATD") {
            self.dialled = Some(number.trim_end_matches(';').to_string());
            self.reply(&["OK", "+CIEV: 2,2"])?;
            thread::sleep(self.latency * 4);
            self.reply(&["+CIEV: 2,3"])?;
            thread::sleep(self.latency * 4);
            self.in_call = true;
            return self.reply(&["+CIEV: 1,1", "+CIEV: 2,0"]);
        }
        match command {
            "AT+CIND=?" => self.reply(&[INDICATORS, "OK"]),
            "AT+CIND?" => self.reply(&["+CIND: 0,0,0,1,4", "OK"]),
            "ATA" => {
                self.in_call = true;
                self.reply(&["OK", "+CIEV: 1,1", "+CIEV: 2,0"])
            }
            "AT+CHUP" => {
                self.reply(&["OK"])?;
                self.hang_up()
            }
            "AT+CLCC" => {
                let status = if self.in_call { 0 } else { 4 };
                match self.dialled.clone() {
                    Some(number) => {
                        self.reply(&[&format!(r#"+CLCC: 1,1,{status},0,0,"{number}",129"#), "OK"])
                    }
                    None => self.reply(&["OK"]),
                }
            }
            _ => self.reply(&["OK"]),
        }
    }

    fn hang_up(&mut self) -> Result<(), hf_fsm::SubmitError> {
        self.dialled = None;
        if std::mem::take(&mut self.in_call) {
            self.reply(&["+CIEV: 1,0"])
        } else {
            self.reply(&["+CIEV: 2,0"])
        }
    }

    fn reply(&self, lines: &[&str]) -> Result<(), hf_fsm::SubmitError> {
        for line in lines {
            debug!("AG -> HF {line}");
            self.session
                .submit(HfpEvent::AtResponse(AtResponse::parse(line)), Priority::High)?;
        }
        Ok(())
    }
}
