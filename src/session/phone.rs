use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::login::LoginError;

/// Digits required in a phone number.
pub const PHONE_DIGITS: usize = 10;

/// Drops everything but ASCII digits, as the phone field does on each keystroke.
pub fn sanitize_phone(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// A validated 10-digit national phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Sanitizes `text` and accepts it only when exactly ten digits remain.
    pub fn parse(text: &str) -> Result<Self, LoginError> {
        let digits = sanitize_phone(text);
        if digits.len() != PHONE_DIGITS {
            return Err(LoginError::InvalidPhone);
        }
        Ok(Self(digits))
    }

    /// The ten digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PhoneNumber {
    type Err = LoginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = LoginError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
