//! Collaborator interfaces: Bluetooth transport and voice channel.
//!
//! Both are called from transition actions on the dispatch thread and must
//! return promptly. Results of long operations (link up, link down, AT
//! responses, channel failures) come back later as events through the
//! runtime's inbound methods.

use crate::device::{BdAddr, DeviceInfo};
use crate::error::{TransportError, VoiceError};

/// RFCOMM/AT side of the link.
///
/// Only device lookup, connection management and [`Transport::send_command`]
/// are required; the call-control operations default to the standard HFP AT
/// commands.
pub trait Transport: Send {
    /// Looks `addr` up in the set of paired devices.
    fn find_device(&self, addr: BdAddr) -> Option<DeviceInfo>;

    /// Starts bringing the link up. Completion is reported by a `Connected`
    /// or `Disconnected` notification.
    fn begin_connect(&mut self, addr: BdAddr) -> Result<(), TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Queues one AT command line, without the trailing CR.
    fn send_command(&mut self, command: &str) -> Result<(), TransportError>;

    /// Sends the service-level negotiation sequence and returns how many
    /// final result codes (`OK`/`ERROR`) to expect back.
    fn begin_service_negotiation(&mut self, commands: &[String]) -> Result<usize, TransportError> {
        for command in commands {
            self.send_command(command)?;
        }
        Ok(commands.len())
    }

    fn start_call(&mut self, number: &str) -> Result<(), TransportError> {
        self.send_command(&format!("ATD{number};"))
    }

    fn send_dtmf(&mut self, digit: char) -> Result<(), TransportError> {
        self.send_command(&format!("AT+VTS={digit}"))
    }

    fn answer(&mut self) -> Result<(), TransportError> {
        self.send_command("ATA")
    }

    fn end_call(&mut self) -> Result<(), TransportError> {
        self.send_command("AT+CHUP")
    }

    fn put_on_hold(&mut self) -> Result<(), TransportError> {
        self.send_command("AT+CHLD=2")
    }

    fn list_current_calls(&mut self) -> Result<(), TransportError> {
        self.send_command("AT+CLCC")
    }
}

/// SCO audio path between the phone and the PC.
pub trait VoiceChannel: Send {
    fn open(&mut self, addr: BdAddr) -> Result<(), VoiceError>;

    fn start(&mut self) -> Result<(), VoiceError>;

    fn stop(&mut self) -> Result<(), VoiceError>;

    fn close(&mut self) -> Result<(), VoiceError>;
}

/// Standard service-level connection sequence.
pub fn default_negotiation(supported_features: u32) -> Vec<String> {
    vec![
        format!("AT+BRSF={supported_features}"),
        "AT+CIND=?".to_string(),
        "AT+CIND?".to_string(),
        "AT+CMER=3,0,0,1".to_string(),
        "AT+CLIP=1".to_string(),
    ]
}
