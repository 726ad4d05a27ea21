//! Mutable per-session data, owned by the dispatch thread.

use crate::call_info::CallInfo;
use crate::device::DeviceInfo;
use crate::indicators::IndicatorMap;
use crate::notify::PublicParams;

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub device: Option<DeviceInfo>,
    /// Mapping negotiated on the current service-level connection.
    pub indicators: Option<IndicatorMap>,
    /// Final result codes expected during negotiation.
    pub expected_responses: usize,
    pub received_responses: usize,
    pub negotiating: bool,
    pub pc_sound: bool,
    pub caller: Option<CallInfo>,
    /// Feature bitmap reported by the gateway.
    pub gateway_features: Option<u32>,
    pub voice_active: bool,
}

impl Session {
    pub fn new(pc_sound: bool) -> Self {
        Self {
            pc_sound,
            ..Self::default()
        }
    }

    pub fn public_params(&self) -> PublicParams {
        PublicParams {
            cur_device: self.device.clone(),
            pc_sound: self.pc_sound,
            caller: self.caller.clone(),
        }
    }

    /// Forgets everything learned on the current link.
    pub fn reset_link(&mut self) {
        self.indicators = None;
        self.expected_responses = 0;
        self.received_responses = 0;
        self.negotiating = false;
        self.caller = None;
        self.gateway_features = None;
    }
}
