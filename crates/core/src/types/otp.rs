//! One-time signup codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    #[error("OTP must be exactly {len} digits")]
    InvalidLength { len: usize },
    #[error("OTP must contain only digits")]
    NonDigit,
}

/// A six-digit verification code as typed by the user.
///
/// Leading zeros are significant, so the code is kept as a string.
///
/// ```
/// use exprz_core::OtpCode;
///
/// assert_eq!(OtpCode::parse(" 012345 ").unwrap().as_str(), "012345");
/// assert!(OtpCode::parse("12345").is_err());
/// assert!(OtpCode::parse("12a456").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a code.
    pub const LENGTH: usize = 6;

    /// Parse a code, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is not exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        let trimmed = s.trim();

        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpCodeError::NonDigit);
        }

        if trimmed.len() != Self::LENGTH {
            return Err(OtpCodeError::InvalidLength { len: Self::LENGTH });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Build a code from the last six digits of `n`, zero-padded.
    #[must_use]
    pub fn from_number(n: u32) -> Self {
        Self(format!("{:06}", n % 1_000_000))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_leading_zeros() {
        assert_eq!(OtpCode::parse("000042").unwrap().as_str(), "000042");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(
            OtpCode::parse("1234567"),
            Err(OtpCodeError::InvalidLength { len: 6 })
        );
        assert_eq!(
            OtpCode::parse(""),
            Err(OtpCodeError::InvalidLength { len: 6 })
        );
    }

    #[test]
    fn test_parse_rejects_non_digits() {
        assert_eq!(OtpCode::parse("12 456"), Err(OtpCodeError::NonDigit));
        assert_eq!(OtpCode::parse("١٢٣٤٥٦"), Err(OtpCodeError::NonDigit));
    }

    #[test]
    fn test_from_number_pads() {
        assert_eq!(OtpCode::from_number(7).as_str(), "000007");
        assert_eq!(OtpCode::from_number(1_234_567).as_str(), "234567");
    }
}
