//! Host-visible notifications.

use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::call_info::CallInfo;
use crate::device::DeviceInfo;
use crate::state::HfpState;

/// Outcome attached to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HfpStatus {
    #[default]
    Ok,
    UnknownDevice,
    /// A call operation was requested in a state that does not allow it.
    IncorrectState4Call,
    ConnectFailure,
    ServiceConnectFailure,
    CallFailure,
    CallEnded,
    VoiceFailure,
}

impl HfpStatus {
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Ok | Self::CallEnded)
    }
}

impl fmt::Display for HfpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which parts of [`PublicParams`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NotifyFields(u8);

impl NotifyFields {
    pub const NONE: Self = Self(0);
    pub const DEVICE: Self = Self(1 << 0);
    pub const PC_SOUND: Self = Self(1 << 1);
    pub const CALLER: Self = Self(1 << 2);
    pub const STATE: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for NotifyFields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Snapshot of the session data a host may display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicParams {
    pub cur_device: Option<DeviceInfo>,
    pub pc_sound: bool,
    pub caller: Option<CallInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub state: HfpState,
    pub status: HfpStatus,
    pub fields: NotifyFields,
    /// Present whenever `fields` is not empty.
    pub params: Option<PublicParams>,
}

/// Host callback, invoked on the dispatch thread. Implementations must not
/// block.
pub trait HostNotifier: Send {
    fn notify(&mut self, notification: &Notification);
}

impl<F> HostNotifier for F
where
    F: FnMut(&Notification) + Send,
{
    fn notify(&mut self, notification: &Notification) {
        self(notification)
    }
}

/// Notifier that keeps every notification for later inspection.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.entries.lock().last().cloned()
    }

    /// Notifications carrying `status`.
    pub fn with_status(&self, status: HfpStatus) -> Vec<Notification> {
        self.entries
            .lock()
            .iter()
            .filter(|n| n.status == status)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl HostNotifier for NotificationLog {
    fn notify(&mut self, notification: &Notification) {
        self.entries.lock().push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_flags() {
        let fields = NotifyFields::STATE | NotifyFields::CALLER;
        assert!(fields.contains(NotifyFields::CALLER));
        assert!(!fields.contains(NotifyFields::DEVICE));
        assert!(NotifyFields::NONE.is_empty());
        assert_eq!(fields.bits(), 0b1100);
    }

    #[test]
    fn statuses() {
        assert!(!HfpStatus::CallEnded.is_error());
        assert!(HfpStatus::VoiceFailure.is_error());
        assert_eq!(HfpStatus::default(), HfpStatus::Ok);
    }
}
