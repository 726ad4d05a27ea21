//! # handsfree
//!
//! Bluetooth Hands-Free Profile call session built on [`hf_fsm`].
//!
//! ## Module Overview
//! - [`at`]         – AT response classification.
//! - [`indicators`] – `+CIND` mapping and derived call state.
//! - [`call_info`]  – Caller number/name from `+CLIP` and `+CLCC`.
//! - [`transport`]  – Transport and voice channel collaborator traits.
//! - [`notify`]     – Host notifications.
//! - [`machine`]    – Session context and assembly.
//! - [`runtime`]    – Threaded facade.
//!
//! The transition table lives in a private module; [`HandsFree::build`]
//! assembles it together with the engine and the session timers.

pub mod at;
pub mod call_info;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod indicators;
pub mod machine;
pub mod notify;
pub mod runtime;
pub mod session;
pub mod state;
pub mod transport;

mod actions;
mod table;

pub use at::{AtResponse, CallSetupPhase, CallSignal};
pub use call_info::CallInfo;
pub use config::{HandsFreeConfig, HfpConfig, HfpConfigBuilder};
pub use device::{BdAddr, DeviceInfo};
pub use error::{HfpError, ParseError, TransportError, VoiceError};
pub use event::{Fault, HfpEvent, HfpEventKind};
pub use indicators::{DerivedCallState, IndicatorMap};
pub use machine::{Assembly, Collaborators, HandsFree};
pub use notify::{HfpStatus, HostNotifier, Notification, NotificationLog, NotifyFields, PublicParams};
pub use runtime::HandsFreeRuntime;
pub use session::Session;
pub use state::HfpState;
pub use transport::{Transport, VoiceChannel};

/// Builds the session transition table. Exposed for inspection; sessions
/// assembled with [`HandsFree::build`] use it already.
pub fn transition_table() -> Result<hf_fsm::TransitionTable<HandsFree>, hf_fsm::TableError> {
    table::build()
}
