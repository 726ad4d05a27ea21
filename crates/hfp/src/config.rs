//! Session and runtime configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use hf_fsm::{EngineConfig, TimerConfig};

use crate::transport::default_negotiation;

/// CLI presentation and remote volume control.
pub const DEFAULT_FEATURES: u32 = 0x14;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HfpConfig {
    /// Period of connection attempts while a device is selected and the link
    /// is down.
    pub connect_poll_interval: Duration,
    pub negotiation_timeout: Duration,
    /// Service-level sequence; `None` uses the standard one built from
    /// `supported_features`.
    pub negotiation_commands: Option<Vec<String>>,
    /// Initial headset preference: route call audio to the PC.
    pub pc_sound: bool,
    /// Notify the host when the preference changes outside a live reroute.
    pub notify_on_preference: bool,
    /// `AT+BRSF` feature bitmap.
    pub supported_features: u32,
}

impl Default for HfpConfig {
    fn default() -> Self {
        Self {
            connect_poll_interval: Duration::from_secs(5),
            negotiation_timeout: Duration::from_secs(10),
            negotiation_commands: None,
            pc_sound: true,
            notify_on_preference: true,
            supported_features: DEFAULT_FEATURES,
        }
    }
}

impl HfpConfig {
    pub fn builder() -> HfpConfigBuilder {
        HfpConfigBuilder::default()
    }

    pub fn negotiation_sequence(&self) -> Vec<String> {
        self.negotiation_commands
            .clone()
            .unwrap_or_else(|| default_negotiation(self.supported_features))
    }
}

#[derive(Debug, Clone, Default)]
pub struct HfpConfigBuilder {
    config: HfpConfig,
}

impl HfpConfigBuilder {
    pub fn connect_poll_interval(mut self, interval: Duration) -> Self {
        self.config.connect_poll_interval = interval;
        self
    }

    pub fn negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.config.negotiation_timeout = timeout;
        self
    }

    pub fn negotiation_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.negotiation_commands = Some(commands.into_iter().map(Into::into).collect());
        self
    }

    pub fn pc_sound(mut self, enabled: bool) -> Self {
        self.config.pc_sound = enabled;
        self
    }

    pub fn notify_on_preference(mut self, enabled: bool) -> Self {
        self.config.notify_on_preference = enabled;
        self
    }

    pub fn supported_features(mut self, features: u32) -> Self {
        self.config.supported_features = features;
        self
    }

    pub fn build(self) -> HfpConfig {
        self.config
    }
}

/// Everything needed to assemble a session.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandsFreeConfig {
    pub engine: EngineConfig,
    pub timers: TimerConfig,
    pub hfp: HfpConfig,
}

impl Default for HandsFreeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::builder()
                .name("hfp")
                .thread_name("hfp-dispatch")
                .build(),
            timers: TimerConfig {
                thread_name: "hfp-ticker".to_string(),
                ..TimerConfig::default()
            },
            hfp: HfpConfig::default(),
        }
    }
}

impl HandsFreeConfig {
    pub fn with_hfp(mut self, hfp: HfpConfig) -> Self {
        self.hfp = hfp;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_timers(mut self, timers: TimerConfig) -> Self {
        self.timers = timers;
        self
    }
}
