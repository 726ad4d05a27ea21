//! Record identifiers shared by the engine and the host viewer.
//!
//! Layouts list the payload fields after the optional timestamp.

/// State machine dispatch records.
pub mod sm {
    /// `state: u16, event: u16`
    pub const DISPATCH: u8 = 1;
    /// `event: u16, from: u16, to: u16`
    pub const TRAN: u8 = 2;
    /// Explicit no-op entry. `state: u16, event: u16`
    pub const IGNORED: u8 = 3;
    /// No table entry, event dropped. `state: u16, event: u16`
    pub const UNHANDLED: u8 = 4;
    /// Action reported an error; state still committed. `state: u16, event: u16`
    pub const ACTION_FAILED: u8 = 5;
    /// Resolver picked a branch that does not exist. `state: u16, event: u16, index: u16`
    pub const BAD_CHOICE: u8 = 6;
    /// Event raised with immediate priority from an action. `state: u16, event: u16`
    pub const IMMEDIATE: u8 = 7;
}

/// Event queue records.
pub mod queue {
    /// `event: u16, priority: u8, depth: u16`
    pub const POST: u8 = 20;
    /// `event: u16, priority: u8`
    pub const FULL: u8 = 21;
}

/// Timer records.
pub mod timer {
    /// `timer: u16, ticks: u32, interval: u32`
    pub const ARM: u8 = 32;
    /// `timer: u16`
    pub const DISARM: u8 = 33;
    /// `timer: u16, periodic: u8`
    pub const FIRE: u8 = 34;
}

/// Dictionary records, emitted without timestamps.
pub mod dict {
    /// `id: u16, name: str`
    pub const STATE: u8 = 60;
    /// `id: u16, name: str`
    pub const EVENT: u8 = 61;
    /// `id: u16, name: str`
    pub const TIMER: u8 = 62;
    /// `high_capacity: u16, low_capacity: u16, name: str`
    pub const MACHINE_INFO: u8 = 64;
}

/// Priority byte values used in queue records.
pub mod priority {
    pub const IMMEDIATE: u8 = 0;
    pub const HIGH: u8 = 1;
    pub const LOW: u8 = 2;
}
