//! Host-side viewer for hands-free session traces.
//!
//! The dispatch engine frames its trace records HDLC-style (see
//! [`hf_trace`]). This crate deframes them, resolves state, event and timer
//! ids through the dictionaries announced at start-up, and renders the
//! result for a terminal or as JSON lines.

mod decoder;
pub mod formatter;
pub mod interpreter;

pub use decoder::{DecodeError, Frame, HdlcDecoder};
pub use formatter::RecordFormatter;
pub use interpreter::{Entry, FrameInterpreter, Record, RecordGroup};

#[cfg(test)]
mod tests;
