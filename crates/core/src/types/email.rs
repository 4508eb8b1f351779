//! Normalized email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty (after trimming).
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not contain an @ symbol.
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain part (after @) is empty.
    #[error("email domain cannot be empty")]
    EmptyDomain,
}

/// A normalized email address.
///
/// Parsing trims surrounding whitespace and lowercases the address, so two
/// `Email` values compare equal exactly when they identify the same contact
/// in both the marketing and the commerce platform. This makes `Email` the
/// deduplication key for segment profiles and for the resumability set.
///
/// ## Constraints
///
/// - Length: 1-254 characters (RFC 5321 limit)
/// - Must contain an @ symbol
/// - Local part (before @) must not be empty
/// - Domain part (after @) must not be empty
///
/// ## Examples
///
/// ```
/// use segment_enrich_core::Email;
///
/// let email = Email::parse("  Jane.Doe@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "jane.doe@example.com");
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("no-at-symbol").is_err());
/// assert!(Email::parse("@domain.com").is_err());
/// assert!(Email::parse("user@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input:
    /// - Is empty
    /// - Is longer than 254 characters
    /// - Does not contain an @ symbol
    /// - Has an empty local part or domain
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(EmailError::Empty);
        }

        if normalized.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let at_pos = normalized.find('@').ok_or(EmailError::MissingAtSymbol)?;

        if at_pos == 0 {
            return Err(EmailError::EmptyLocalPart);
        }

        if at_pos == normalized.len() - 1 {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(normalized))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
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

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
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
    fn test_parse_valid_emails() {
        assert!(Email::parse("user@example.com").is_ok());
        assert!(Email::parse("user.name+tag@example.com").is_ok());
        assert!(Email::parse("user@subdomain.example.co.uk").is_ok());
        assert!(Email::parse("a@b.c").is_ok());
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let email = Email::parse("\t Jane.Doe@Example.COM \n").unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
        assert_eq!(email, Email::parse("jane.doe@example.com").unwrap());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(Email::parse(""), Err(EmailError::Empty)));
        assert!(matches!(Email::parse("   "), Err(EmailError::Empty)));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_missing_at() {
        assert!(matches!(
            Email::parse("no-at-symbol"),
            Err(EmailError::MissingAtSymbol)
        ));
    }

    #[test]
    fn test_parse_empty_parts() {
        assert!(matches!(
            Email::parse("@domain.com"),
            Err(EmailError::EmptyLocalPart)
        ));
        assert!(matches!(
            Email::parse("user@ "),
            Err(EmailError::EmptyDomain)
        ));
    }

    #[test]
    fn test_deserialize_normalizes() {
        let parsed: Email = serde_json::from_str("\" USER@Example.com\"").unwrap();
        assert_eq!(parsed.as_str(), "user@example.com");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"user@example.com\"");
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
