use hf_fsm::symbols;

symbols! {
    /// Session states, initial first.
    pub enum HfpState {
        /// No device selected.
        Idle,
        Disconnected,
        Connecting,
        /// Baseband link up, service level not negotiated yet.
        Connected,
        HfpConnecting,
        HfpConnected,
        Calling,
        Ringing,
        /// Call audio routed through the PC.
        InCallHeadsetOn,
        /// Call audio left on the phone.
        InCallHeadsetOff,
    }
}

impl HfpState {
    pub const IN_CALL: [Self; 2] = [Self::InCallHeadsetOn, Self::InCallHeadsetOff];

    /// States in which the transport holds (or is bringing up) a link.
    pub const LINKED: [Self; 8] = [
        Self::Connecting,
        Self::Connected,
        Self::HfpConnecting,
        Self::HfpConnected,
        Self::Calling,
        Self::Ringing,
        Self::InCallHeadsetOn,
        Self::InCallHeadsetOff,
    ];

    pub fn is_linked(self) -> bool {
        Self::LINKED.contains(&self)
    }

    pub fn is_in_call(self) -> bool {
        Self::IN_CALL.contains(&self)
    }

    /// In-call state matching a headset preference.
    pub fn in_call(pc_sound: bool) -> Self {
        if pc_sound {
            Self::InCallHeadsetOn
        } else {
            Self::InCallHeadsetOff
        }
    }
}
