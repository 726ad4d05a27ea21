use std::collections::HashMap;

use hf_trace::records::{dict, priority, queue, sm, timer};
use serde::Serialize;

use crate::Frame;

/// Record families, used for filtering and colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordGroup {
    StateMachine,
    Queue,
    Timer,
    Dictionary,
    Unknown,
}

impl RecordGroup {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sm" | "statemachine" => Some(Self::StateMachine),
            "queue" | "eq" => Some(Self::Queue),
            "timer" | "te" => Some(Self::Timer),
            "dict" | "dictionary" => Some(Self::Dictionary),
            _ => None,
        }
    }
}

/// A trace record with every id resolved against the dictionaries seen so
/// far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Entry {
    MachineInfo { name: String, high_capacity: u16, low_capacity: u16 },
    StateDict { id: u16, name: String },
    EventDict { id: u16, name: String },
    TimerDict { id: u16, name: String },
    Dispatch { state: String, event: String },
    Transition { event: String, from: String, to: String },
    Ignored { state: String, event: String },
    Unhandled { state: String, event: String },
    ActionFailed { state: String, event: String },
    BadChoice { state: String, event: String, index: u16 },
    Immediate { state: String, event: String },
    Post { event: String, priority: String, depth: u16 },
    QueueFull { event: String, priority: String },
    TimerArm { timer: String, ticks: u32, interval: u32 },
    TimerDisarm { timer: String },
    TimerFire { timer: String, periodic: bool },
    /// Unknown record type, or a known one whose payload was truncated.
    Raw { record_type: u8, data: String },
}

impl Entry {
    pub fn group(&self) -> RecordGroup {
        match self {
            Self::MachineInfo { .. }
            | Self::StateDict { .. }
            | Self::EventDict { .. }
            | Self::TimerDict { .. } => RecordGroup::Dictionary,
            Self::Dispatch { .. }
            | Self::Transition { .. }
            | Self::Ignored { .. }
            | Self::Unhandled { .. }
            | Self::ActionFailed { .. }
            | Self::BadChoice { .. }
            | Self::Immediate { .. } => RecordGroup::StateMachine,
            Self::Post { .. } | Self::QueueFull { .. } => RecordGroup::Queue,
            Self::TimerArm { .. } | Self::TimerDisarm { .. } | Self::TimerFire { .. } => {
                RecordGroup::Timer
            }
            Self::Raw { .. } => RecordGroup::Unknown,
        }
    }

    /// Whether the record reports something going wrong.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            Self::Unhandled { .. }
                | Self::ActionFailed { .. }
                | Self::BadChoice { .. }
                | Self::QueueFull { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub seq: u8,
    /// Microseconds since the tracer was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_us: Option<u32>,
    #[serde(flatten)]
    pub entry: Entry,
}

/// Translates frames into [`Record`]s while tracking the dictionaries the
/// engine announces on start.
#[derive(Debug)]
pub struct FrameInterpreter {
    timestamps: bool,
    dict: Dictionaries,
}

impl Default for FrameInterpreter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FrameInterpreter {
    /// `timestamps` tells whether the producer prefixes non-dictionary
    /// records with a timestamp.
    pub fn new(timestamps: bool) -> Self {
        Self {
            timestamps,
            dict: Dictionaries::default(),
        }
    }

    pub fn interpret(&mut self, frame: &Frame) -> Record {
        let is_dict = matches!(
            frame.record_type,
            dict::STATE | dict::EVENT | dict::TIMER | dict::MACHINE_INFO
        );
        let mut cur = Cursor::new(&frame.payload);
        let timestamp_us = if self.timestamps && !is_dict {
            cur.read_u32()
        } else {
            None
        };

        let entry = self
            .decode(frame.record_type, &mut cur)
            .unwrap_or_else(|| Entry::Raw {
                record_type: frame.record_type,
                data: hex_bytes(&frame.payload),
            });

        Record {
            seq: frame.seq,
            timestamp_us,
            entry,
        }
    }

    fn decode(&mut self, record_type: u8, cur: &mut Cursor<'_>) -> Option<Entry> {
        let entry = match record_type {
            dict::MACHINE_INFO => {
                let (high_capacity, low_capacity) = (cur.read_u16()?, cur.read_u16()?);
                let name = cur.read_c_string()?;
                self.dict.machine = Some(name.clone());
                Entry::MachineInfo {
                    name,
                    high_capacity,
                    low_capacity,
                }
            }
            dict::STATE => {
                let (id, name) = (cur.read_u16()?, cur.read_c_string()?);
                self.dict.states.insert(id, name.clone());
                Entry::StateDict { id, name }
            }
            dict::EVENT => {
                let (id, name) = (cur.read_u16()?, cur.read_c_string()?);
                self.dict.events.insert(id, name.clone());
                Entry::EventDict { id, name }
            }
            dict::TIMER => {
                let (id, name) = (cur.read_u16()?, cur.read_c_string()?);
                self.dict.timers.insert(id, name.clone());
                Entry::TimerDict { id, name }
            }
            sm::DISPATCH | sm::IGNORED | sm::UNHANDLED | sm::ACTION_FAILED | sm::IMMEDIATE => {
                let state = self.dict.state(cur.read_u16()?);
                let event = self.dict.event(cur.read_u16()?);
                match record_type {
                    sm::DISPATCH => Entry::Dispatch { state, event },
                    sm::IGNORED => Entry::Ignored { state, event },
                    sm::UNHANDLED => Entry::Unhandled { state, event },
                    sm::ACTION_FAILED => Entry::ActionFailed { state, event },
                    _ => Entry::Immediate { state, event },
                }
            }
            sm::BAD_CHOICE => Entry::BadChoice {
                state: self.dict.state(cur.read_u16()?),
                event: self.dict.event(cur.read_u16()?),
                index: cur.read_u16()?,
            },
            sm::TRAN => Entry::Transition {
                event: self.dict.event(cur.read_u16()?),
                from: self.dict.state(cur.read_u16()?),
                to: self.dict.state(cur.read_u16()?),
            },
            queue::POST => Entry::Post {
                event: self.dict.event(cur.read_u16()?),
                priority: priority_name(cur.read_u8()?),
                depth: cur.read_u16()?,
            },
            queue::FULL => Entry::QueueFull {
                event: self.dict.event(cur.read_u16()?),
                priority: priority_name(cur.read_u8()?),
            },
            timer::ARM => Entry::TimerArm {
                timer: self.dict.timer(cur.read_u16()?),
                ticks: cur.read_u32()?,
                interval: cur.read_u32()?,
            },
            timer::DISARM => Entry::TimerDisarm {
                timer: self.dict.timer(cur.read_u16()?),
            },
            timer::FIRE => Entry::TimerFire {
                timer: self.dict.timer(cur.read_u16()?),
                periodic: cur.read_u8()? != 0,
            },
            _ => return None,
        };
        Some(entry)
    }

    pub fn machine_name(&self) -> Option<&str> {
        self.dict.machine.as_deref()
    }
}

fn priority_name(code: u8) -> String {
    match code {
        priority::IMMEDIATE => "immediate".to_string(),
        priority::HIGH => "high".to_string(),
        priority::LOW => "low".to_string(),
        other => format!("prio{other}"),
    }
}

#[derive(Debug, Default)]
struct Dictionaries {
    machine: Option<String>,
    states: HashMap<u16, String>,
    events: HashMap<u16, String>,
    timers: HashMap<u16, String>,
}

impl Dictionaries {
    fn state(&self, id: u16) -> String {
        lookup(&self.states, id, "State")
    }

    fn event(&self, id: u16) -> String {
        lookup(&self.events, id, "Event")
    }

    fn timer(&self, id: u16) -> String {
        lookup(&self.timers, id, "Timer")
    }
}

fn lookup(names: &HashMap<u16, String>, id: u16, kind: &str) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("{kind}({id})"))
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        let slice = self.data.get(self.pos..self.pos + count)?;
        self.pos += count;
        Some(slice)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    fn read_u16(&mut self) -> Option<u16> {
        self.read_bytes(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_bytes(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_c_string(&mut self) -> Option<String> {
        let remaining = self.data.get(self.pos..)?;
        let end = remaining.iter().position(|&b| b == 0)?;
        self.pos += end + 1;
        Some(String::from_utf8_lossy(&remaining[..end]).into_owned())
    }
}

pub(crate) fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write;
        let _ = write!(&mut out, "{byte:02X}");
    }
    out
}
