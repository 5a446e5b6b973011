//! Email addresses for order confirmations and invitations.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidEmail {
    #[error("email address is required")]
    Blank,
    #[error("email address is longer than {max} characters")]
    TooLong { max: usize },
    #[error("email address contains whitespace")]
    Whitespace,
    #[error("email address needs exactly one @")]
    AtSign,
    #[error("email address has nothing before the @")]
    NoMailbox,
    #[error("email domain `{0}` is not a valid host")]
    Domain(String),
}

/// A validated email address.
///
/// Surrounding whitespace is trimmed and the domain is lower-cased; the
/// mailbox keeps its case. Only the shape is checked; deliverability is up to
/// the email and auth APIs.
///
/// ```
/// use wholesale_core::Email;
///
/// assert_eq!(Email::parse(" Orders@Farm.LT ").unwrap().as_str(), "Orders@farm.lt");
/// assert!(Email::parse("user@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEmail`] describing the first problem found.
    pub fn parse(input: &str) -> Result<Self, InvalidEmail> {
        let input = input.trim();
        if input.is_empty() {
            return Err(InvalidEmail::Blank);
        }
        if input.len() > Self::MAX_LENGTH {
            return Err(InvalidEmail::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if input.contains(char::is_whitespace) {
            return Err(InvalidEmail::Whitespace);
        }

        let Some((mailbox, domain)) = input.split_once('@') else {
            return Err(InvalidEmail::AtSign);
        };
        if domain.contains('@') {
            return Err(InvalidEmail::AtSign);
        }
        if mailbox.is_empty() {
            return Err(InvalidEmail::NoMailbox);
        }
        if !is_host(domain) {
            return Err(InvalidEmail::Domain(domain.to_owned()));
        }

        Ok(Self(format!("{mailbox}@{}", domain.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// At least two non-empty dot-separated labels.
fn is_host(domain: &str) -> bool {
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = InvalidEmail;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = InvalidEmail;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_is_normalized() {
        let email = Email::parse("  Orders@Farm.LT  ").unwrap();
        assert_eq!(email.as_str(), "Orders@farm.lt");
        assert_eq!(email.to_string(), "Orders@farm.lt");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(InvalidEmail::Blank));
        assert_eq!(Email::parse("buyer"), Err(InvalidEmail::AtSign));
        assert_eq!(Email::parse("a@b@example.com"), Err(InvalidEmail::AtSign));
        assert_eq!(Email::parse("@example.com"), Err(InvalidEmail::NoMailbox));
        assert_eq!(
            Email::parse("first last@example.com"),
            Err(InvalidEmail::Whitespace)
        );
    }

    #[test]
    fn test_domain_needs_labels() {
        for domain in ["", "localhost", "example.", ".lt", "farm..lt"] {
            assert_eq!(
                Email::parse(&format!("buyer@{domain}")),
                Err(InvalidEmail::Domain(domain.to_string())),
                "{domain}"
            );
        }
    }

    #[test]
    fn test_length_limit() {
        let long = format!("{}@example.com", "a".repeat(250));
        let result = Email::parse(&long);
        assert!(matches!(result, Err(InvalidEmail::TooLong { .. })));
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: Email = serde_json::from_str("\"buyer@example.com\"").unwrap();
        assert_eq!(parsed.as_str(), "buyer@example.com");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}
