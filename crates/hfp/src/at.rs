//! Classification of AT response lines received from the audio gateway.

use std::fmt;

/// One response line from the phone, classified by prefix.
///
/// Payload-carrying variants keep the text after the `+XXX:` prefix so that
/// the indicator and call-info parsers can work on it later, on the dispatch
/// thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtResponse {
    Ok,
    /// `ERROR`, `+CME ERROR`, `NO CARRIER`, `BUSY` or `NO ANSWER`.
    Error,
    Ring,
    /// `+CIND: ("call",(0,1)),...`: indicator names in gateway order.
    IndicatorMap(String),
    /// `+CIND: 0,0,1,...`: indicator values in gateway order.
    IndicatorStatus(String),
    /// `+CIEV: <index>,<value>` with a 1-based index.
    IndicatorEvent { index: u8, value: u8 },
    CallerId(String),
    CurrentCall(String),
    Features(u32),
    Unsolicited(String),
}

const ERROR_LINES: [&str; 4] = ["ERROR", "NO CARRIER", "BUSY", "NO ANSWER"];

impl AtResponse {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_matches(|c: char| c.is_whitespace() || c == '\0');

        if line == "OK" {
            return Self::Ok;
        }
        if ERROR_LINES.contains(&line) || line.starts_with("+CME ERROR") {
            return Self::Error;
        }
        if line == "RING" {
            return Self::Ring;
        }

        let Some((prefix, rest)) = line.split_once(':') else {
            return Self::Unsolicited(line.to_string());
        };
        let rest = rest.trim();
        match prefix {
            "+CIND" if rest.starts_with('(') => Self::IndicatorMap(rest.to_string()),
            "+CIND" => Self::IndicatorStatus(rest.to_string()),
            "+CIEV" => parse_indicator_event(rest).unwrap_or_else(|| Self::Unsolicited(line.to_string())),
            "+CLIP" => Self::CallerId(rest.to_string()),
            "+CLCC" => Self::CurrentCall(rest.to_string()),
            "+BRSF" => rest
                .parse()
                .map(Self::Features)
                .unwrap_or_else(|_| Self::Unsolicited(line.to_string())),
            _ => Self::Unsolicited(line.to_string()),
        }
    }

    /// Final result codes terminate a command; everything else is
    /// informational.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Ok | Self::Error)
    }
}

fn parse_indicator_event(rest: &str) -> Option<AtResponse> {
    let (index, value) = rest.split_once(',')?;
    Some(AtResponse::IndicatorEvent {
        index: index.trim().parse().ok()?,
        value: value.trim().parse().ok()?,
    })
}

impl fmt::Display for AtResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Error => f.write_str("ERROR"),
            Self::Ring => f.write_str("RING"),
            Self::IndicatorMap(text) | Self::IndicatorStatus(text) => write!(f, "+CIND: {text}"),
            Self::IndicatorEvent { index, value } => write!(f, "+CIEV: {index},{value}"),
            Self::CallerId(text) => write!(f, "+CLIP: {text}"),
            Self::CurrentCall(text) => write!(f, "+CLCC: {text}"),
            Self::Features(bits) => write!(f, "+BRSF: {bits}"),
            Self::Unsolicited(text) => f.write_str(text),
        }
    }
}

/// Phase reported by the `callsetup` indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSetupPhase {
    Idle,
    Incoming,
    Outgoing,
    /// Remote party is being alerted.
    Alerting,
}

impl CallSetupPhase {
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Incoming),
            2 => Some(Self::Outgoing),
            3 => Some(Self::Alerting),
            _ => None,
        }
    }
}

/// Meaning of an indicator update once the negotiated mapping is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSignal {
    CallSetup(CallSetupPhase),
    CallActive(bool),
    CallHeld(u8),
}
