//! Remote device identity.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// 48-bit Bluetooth device address, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BdAddr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::Address(s.to_string());
        let mut bytes = [0u8; 6];
        let mut parts = s.trim().split(|c| c == ':' || c == '-');
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

/// A device known to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub addr: BdAddr,
    pub name: String,
}

impl DeviceInfo {
    pub fn new(addr: BdAddr, name: impl Into<String>) -> Self {
        Self {
            addr,
            name: name.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trip() {
        let addr: BdAddr = "00:1a:7D:da:71:13".parse().unwrap();
        assert_eq!(addr, BdAddr([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]));
        assert_eq!(addr.to_string(), "00:1A:7D:DA:71:13");
        assert_eq!("00-1A-7D-DA-71-13".parse::<BdAddr>(), Ok(addr));
    }

    #[test]
    fn malformed_addresses() {
        for text in ["", "00:1A:7D:DA:71", "00:1A:7D:DA:71:13:00", "0:1A:7D:DA:71:13", "zz:1A:7D:DA:71:13"] {
            assert!(text.parse::<BdAddr>().is_err(), "{text}");
        }
    }
}
