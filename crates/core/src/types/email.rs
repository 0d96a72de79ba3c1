//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input is not of the form `local@domain`.
    #[error("email must look like name@domain")]
    Malformed,
}

/// An email address.
///
/// Validation is structural only: one `@` with non-empty parts on both
/// sides, within the RFC 5321 length limit. The server performs its own
/// checks at registration; this type exists so obviously broken input
/// never reaches the network.
///
/// Deserialization is transparent and unvalidated - values received from
/// the server are assumed well-formed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 254 characters,
    /// or not of the form `local@domain` with both parts non-empty.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        for input in [
            "user@example.com",
            "user.name+tag@example.co.uk",
            "a@b",
        ] {
            assert!(Email::parse(input).is_ok(), "{input} should parse");
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["no-at-symbol", "@domain.com", "user@", "a@b@c"] {
            assert_eq!(Email::parse(input), Err(EmailError::Malformed), "{input}");
        }
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_serde_roundtrip() {
        let email = Email::parse("user@example.com").unwrap();
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"user@example.com\"");
        let back: Email = serde_json::from_str(&json).unwrap();
        assert_eq!(back, email);
    }

    #[test]
    fn test_from_str_and_display() {
        let email: Email = "user@example.com".parse().unwrap();
        assert_eq!(email.to_string(), "user@example.com");
    }
}
