//! Serial code validation.
//!
//! Appliance serials are `EM` followed by exactly four digits. While a user
//! is still typing, `EM` followed by fewer digits is accepted as a partial
//! state so the input is not flagged as wrong halfway through.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Number of digits in a complete serial.
pub const SERIAL_DIGITS: usize = 4;

/// Message shown while the typed input cannot become a valid serial.
pub const INVALID_INPUT_MESSAGE: &str = "Invalid format. Use EMxxxx format.";

static IN_PROGRESS_PATTERN: OnceLock<Regex> = OnceLock::new();

fn in_progress_pattern() -> &'static Regex {
    IN_PROGRESS_PATTERN.get_or_init(|| {
        Regex::new(r"^EM([0-9]{0,4})$").expect("Failed to compile serial pattern")
    })
}

/// Validation state of a (possibly partial) serial input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationState {
    Empty,
    Partial,
    Complete,
    Invalid,
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationState::Empty => "empty",
            ValidationState::Partial => "partial",
            ValidationState::Complete => "complete",
            ValidationState::Invalid => "invalid",
        };
        write!(f, "{}", s)
    }
}

/// Result of validating raw input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub normalized: String,
    pub state: ValidationState,
}

impl Validation {
    /// Whether the connect action should be enabled for this input.
    pub fn can_connect(&self) -> bool {
        self.state == ValidationState::Complete
    }

    /// The explanatory message to show next to the input, if any.
    pub fn message(&self) -> Option<&'static str> {
        match self.state {
            ValidationState::Invalid => Some(INVALID_INPUT_MESSAGE),
            _ => None,
        }
    }
}

/// Normalize and classify raw serial input.
pub fn validate(raw: &str) -> Validation {
    let normalized = raw.trim().to_uppercase();

    let state = if normalized.is_empty() {
        ValidationState::Empty
    } else {
        match in_progress_pattern().captures(&normalized) {
            Some(caps) if caps[1].len() == SERIAL_DIGITS => ValidationState::Complete,
            Some(_) => ValidationState::Partial,
            None => ValidationState::Invalid,
        }
    };

    Validation { normalized, state }
}

/// A complete, upper-cased appliance serial.
///
/// Only constructible from input that validates as [`ValidationState::Complete`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerialCode(String);

impl SerialCode {
    /// Parse raw user input into a serial, normalizing case.
    pub fn parse(raw: &str) -> Result<Self> {
        let validation = validate(raw);
        if validation.state == ValidationState::Complete {
            Ok(Self(validation.normalized))
        } else {
            Err(Error::InvalidFormat(validation.normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used as the appliance host label.
    pub fn host_label(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for SerialCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SerialCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SerialCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SerialCode> for String {
    fn from(serial: SerialCode) -> Self {
        serial.0
    }
}

impl AsRef<str> for SerialCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(validate("").state, ValidationState::Empty);
        assert_eq!(validate("   ").state, ValidationState::Empty);
        assert!(validate("").message().is_none());
        assert!(!validate("").can_connect());
    }

    #[test]
    fn test_partial_input() {
        for input in ["EM", "em1", "EM12", "Em123"] {
            let v = validate(input);
            assert_eq!(v.state, ValidationState::Partial, "input {:?}", input);
            assert!(!v.can_connect());
            assert!(v.message().is_none());
        }
    }

    #[test]
    fn test_lone_prefix_letter_is_invalid() {
        assert_eq!(validate("E").state, ValidationState::Invalid);
    }

    #[test]
    fn test_complete_input_is_normalized() {
        let v = validate("em1234");
        assert_eq!(v.normalized, "EM1234");
        assert_eq!(v.state, ValidationState::Complete);
        assert!(v.can_connect());
        assert!(v.message().is_none());

        let v = validate("  EM0042 ");
        assert_eq!(v.normalized, "EM0042");
        assert_eq!(v.state, ValidationState::Complete);
    }

    #[test]
    fn test_invalid_input() {
        for input in ["EM12AB", "EM12345", "XX1234", "1234", "EM-123", "EM 1234"] {
            let v = validate(input);
            assert_eq!(v.state, ValidationState::Invalid, "input {:?}", input);
            assert_eq!(v.message(), Some(INVALID_INPUT_MESSAGE));
            assert!(!v.can_connect());
        }
    }

    #[test]
    fn test_non_ascii_digits_are_invalid() {
        assert_eq!(
            validate("EM\u{0661}\u{0662}\u{0663}\u{0664}").state,
            ValidationState::Invalid
        );
    }

    #[test]
    fn test_serial_code_parse() {
        let serial = SerialCode::parse("em1234").unwrap();
        assert_eq!(serial.as_str(), "EM1234");
        assert_eq!(serial.host_label(), "em1234");
        assert_eq!(serial.to_string(), "EM1234");

        assert!(matches!(
            SerialCode::parse("EM12"),
            Err(Error::InvalidFormat(s)) if s == "EM12"
        ));
        assert!("EM12AB".parse::<SerialCode>().is_err());
    }

    #[test]
    fn test_serial_code_serde() {
        let serial: SerialCode = serde_json::from_str("\"em0001\"").unwrap();
        assert_eq!(serial.as_str(), "EM0001");
        assert_eq!(serde_json::to_string(&serial).unwrap(), "\"EM0001\"");
        assert!(serde_json::from_str::<SerialCode>("\"EM00\"").is_err());
    }
}
