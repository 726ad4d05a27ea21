//! Negotiated indicator mapping (`+CIND`) and the status values tracked
//! against it.
//!
//! The gateway reports its indicators in a vendor-defined order. Only the
//! position of the three call-related indicators matters to the session;
//! they are looked up by name once per service-level connection.

use crate::at::{CallSetupPhase, CallSignal};
use crate::error::ParseError;

/// Maximum number of indicator names considered.
pub const MAX_INDICATORS: usize = 10;

const CALL: &str = "call";
const CALL_SETUP: [&str; 2] = ["callsetup", "call_setup"];
const CALL_HELD: &str = "callheld";

/// Coarse call state derived from the three tracked indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedCallState {
    /// Service connected, no call activity.
    Connected,
    Outgoing,
    Ringing,
    InCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorMap {
    names: Vec<String>,
    values: Vec<Option<u8>>,
    call: usize,
    call_setup: usize,
    call_held: usize,
}

impl IndicatorMap {
    /// Parses a `+CIND=?` response body. Every quoted string is an indicator
    /// name; nested value ranges are skipped.
    pub fn construct(text: &str) -> Result<Self, ParseError> {
        let text = strip_prefix(text);
        if !text.starts_with('(') {
            return Err(ParseError::NotAList);
        }

        let names: Vec<String> = quoted(text)
            .take(MAX_INDICATORS)
            .map(str::to_string)
            .collect();
        let position = |wanted: &[&str]| {
            names
                .iter()
                .position(|name| wanted.iter().any(|w| name.eq_ignore_ascii_case(w)))
                .map(|index| index + 1)
        };

        let call = position(&[CALL]).ok_or(ParseError::MissingIndicator(CALL))?;
        let call_setup = position(&CALL_SETUP).ok_or(ParseError::MissingIndicator(CALL_SETUP[0]))?;
        let call_held = position(&[CALL_HELD]).ok_or(ParseError::MissingIndicator(CALL_HELD))?;

        Ok(Self {
            values: vec![None; names.len()],
            names,
            call,
            call_setup,
            call_held,
        })
    }

    /// Applies a `+CIND?` response body. Values are matched to names by
    /// position; a short list (or one cut off by a NUL) leaves the remaining
    /// indicators untouched.
    pub fn set_statuses(&mut self, text: &str) -> Result<(), ParseError> {
        let text = strip_prefix(text);
        let text = text.split('\0').next().unwrap_or_default();
        let text = text.trim_matches(|c| c == '(' || c == ')');

        for (slot, raw) in self.values.iter_mut().zip(text.split(',')) {
            let raw = raw.trim();
            if raw.is_empty() {
                break;
            }
            let value = raw
                .parse()
                .map_err(|_| ParseError::InvalidStatus(raw.to_string()))?;
            *slot = Some(value);
        }
        Ok(())
    }

    /// Records a `+CIEV` update and interprets it if it concerns one of the
    /// call indicators.
    pub fn update(&mut self, index: u8, value: u8) -> Option<CallSignal> {
        let slot = usize::from(index).checked_sub(1)?;
        *self.values.get_mut(slot)? = Some(value);
        self.interpret(index, value)
    }

    /// Meaning of `index = value` without recording it.
    pub fn interpret(&self, index: u8, value: u8) -> Option<CallSignal> {
        let index = usize::from(index);
        if index == self.call {
            Some(CallSignal::CallActive(value != 0))
        } else if index == self.call_setup {
            CallSetupPhase::from_value(value).map(CallSignal::CallSetup)
        } else if index == self.call_held {
            Some(CallSignal::CallHeld(value))
        } else {
            None
        }
    }

    /// Call activity wins over an incoming setup, which wins over an
    /// outgoing or alerting one.
    pub fn current_state(&self) -> DerivedCallState {
        if self.value_at(self.call).unwrap_or(0) != 0 {
            return DerivedCallState::InCall;
        }
        match self.value_at(self.call_setup).and_then(CallSetupPhase::from_value) {
            Some(CallSetupPhase::Incoming) => DerivedCallState::Ringing,
            Some(CallSetupPhase::Outgoing | CallSetupPhase::Alerting) => DerivedCallState::Outgoing,
            _ => DerivedCallState::Connected,
        }
    }

    /// Current value of the named indicator, if reported.
    pub fn status(&self, name: &str) -> Option<u8> {
        let slot = self.names.iter().position(|n| n.eq_ignore_ascii_case(name))?;
        self.values[slot]
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// 1-based positions of `call`, `callsetup` and `callheld`.
    pub fn positions(&self) -> (usize, usize, usize) {
        (self.call, self.call_setup, self.call_held)
    }

    fn value_at(&self, position: usize) -> Option<u8> {
        self.values.get(position.checked_sub(1)?).copied().flatten()
    }
}

fn strip_prefix(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix("+CIND:").map(str::trim_start).unwrap_or(text)
}

/// Contents of successive `"..."` pairs. An unterminated quote ends the
/// sequence.
pub(crate) fn quoted(text: &str) -> impl Iterator<Item = &str> {
    quoted_spans(text).map(move |(start, end)| &text[start..end])
}

/// Byte ranges of the contents of successive `"..."` pairs.
pub(crate) fn quoted_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        let open = cursor + text[cursor..].find('"')? + 1;
        let close = open + text[open..].find('"')?;
        cursor = close + 1;
        Some((open, close))
    })
}
