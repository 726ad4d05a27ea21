//! Payload helpers for dictionary records.
//!
//! Dictionaries let the host viewer print names instead of raw ids. They are
//! sent once when an engine starts.

use crate::payload::PayloadBuilder;

/// Builds the payload shared by the state, event and timer dictionaries.
pub fn symbol_payload(id: u16, name: &str) -> Vec<u8> {
    let mut builder = PayloadBuilder::with_capacity(2 + name.len() + 1);
    builder.u16(id).str(name);
    builder.into_vec()
}

/// Describes the traced machine.
#[derive(Debug, Clone)]
pub struct MachineInfo {
    pub name: String,
    pub high_capacity: u16,
    pub low_capacity: u16,
}

pub fn machine_info_payload(info: &MachineInfo) -> Vec<u8> {
    let mut builder = PayloadBuilder::with_capacity(4 + info.name.len() + 1);
    builder
        .u16(info.high_capacity)
        .u16(info.low_capacity)
        .str(&info.name);
    builder.into_vec()
}
