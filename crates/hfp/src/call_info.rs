//! Caller number and name extracted from `+CLIP` / `+CLCC` lines.

use std::fmt;
use std::ops::Range;

use crate::error::ParseError;
use crate::indicators::quoted_spans;

/// Owned response text plus the byte ranges of its first two quoted fields:
/// the number and, when present, the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    raw: String,
    number: Range<usize>,
    name: Option<Range<usize>>,
}

impl CallInfo {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut spans = quoted_spans(line);
        let (start, end) = spans.next().ok_or(ParseError::NoQuotedField)?;
        let name = spans.next().map(|(start, end)| start..end);
        Ok(Self {
            raw: line.to_string(),
            number: start..end,
            name,
        })
    }

    /// Call info for a number dialled locally.
    pub fn from_number(number: &str) -> Self {
        Self {
            raw: number.to_string(),
            number: 0..number.len(),
            name: None,
        }
    }

    pub fn number(&self) -> &str {
        &self.raw[self.number.clone()]
    }

    pub fn name(&self) -> Option<&str> {
        self.name.clone().map(|range| &self.raw[range])
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CallInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) if !name.is_empty() => write!(f, "{name} <{}>", self.number()),
            _ => f.write_str(self.number()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_and_name() {
        let info = CallInfo::parse(r#""+15551234",145,,,"Alice""#).unwrap();
        assert_eq!(info.number(), "+15551234");
        assert_eq!(info.name(), Some("Alice"));
        assert_eq!(info.to_string(), "Alice <+15551234>");
    }

    #[test]
    fn missing_name_is_fine() {
        let info = CallInfo::parse(r#"1,1,4,0,0,"5551234",129"#).unwrap();
        assert_eq!(info.number(), "5551234");
        assert_eq!(info.name(), None);
    }

    #[test]
    fn unterminated_name_is_dropped() {
        let info = CallInfo::parse(r#""12345",129,"Bo"#).unwrap();
        assert_eq!(info.number(), "12345");
        assert_eq!(info.name(), None);
    }

    #[test]
    fn no_quotes_is_an_error() {
        assert_eq!(CallInfo::parse("1,1,4,0,0"), Err(ParseError::NoQuotedField));
    }

    #[test]
    fn dialled_number() {
        let info = CallInfo::from_number("12345");
        assert_eq!(info.number(), "12345");
        assert_eq!(info.to_string(), "12345");
    }
}
