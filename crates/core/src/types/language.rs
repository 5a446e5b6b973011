//! Language codes and `Accept-Language` negotiation.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`LanguageCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageCodeError {
    /// The input string is empty.
    #[error("language code cannot be empty")]
    Empty,
    /// The primary subtag is not 2-3 ASCII letters.
    #[error("invalid language code: {0}")]
    Invalid(String),
}

/// A primary language subtag such as `en` or `lt`.
///
/// Region subtags are accepted on input (`en-GB`) and dropped, because
/// translation rows are keyed by the bare language code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parse a language tag, keeping only its lower-cased primary subtag.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or the primary subtag is not
    /// 2-3 ASCII letters.
    pub fn parse(s: &str) -> Result<Self, LanguageCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LanguageCodeError::Empty);
        }

        let primary = s.split(['-', '_']).next().unwrap_or_default();
        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(LanguageCodeError::Invalid(s.to_owned()));
        }

        Ok(Self(primary.to_ascii_lowercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pick the best supported language for an `Accept-Language` header value.
    ///
    /// Entries are ranked by their `q` weight (default 1.0); ties keep header
    /// order. Entries with `q=0`, wildcards and malformed tags are skipped.
    /// Returns `None` when nothing in the header is supported.
    #[must_use]
    pub fn negotiate(accept_language: &str, supported: &[Self]) -> Option<Self> {
        let mut candidates: Vec<(Self, f32)> = accept_language
            .split(',')
            .filter_map(|entry| {
                let mut parts = entry.split(';');
                let tag = parts.next()?.trim();
                if tag == "*" {
                    return None;
                }
                let quality = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .map_or(Some(1.0), |q| q.trim().parse::<f32>().ok())?;
                if quality <= 0.0 {
                    return None;
                }
                Self::parse(tag).ok().map(|code| (code, quality))
            })
            .collect();

        // Stable sort keeps header order for equal weights.
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        candidates
            .into_iter()
            .map(|(code, _)| code)
            .find(|code| supported.contains(code))
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LanguageCode {
    type Err = LanguageCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = LanguageCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<LanguageCode> {
        list.iter().map(|c| LanguageCode::parse(c).unwrap()).collect()
    }

    #[test]
    fn test_parse_strips_region() {
        assert_eq!(LanguageCode::parse("en-GB").unwrap().as_str(), "en");
        assert_eq!(LanguageCode::parse(" LT ").unwrap().as_str(), "lt");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(LanguageCode::parse(""), Err(LanguageCodeError::Empty));
        assert!(LanguageCode::parse("english").is_err());
        assert!(LanguageCode::parse("e1").is_err());
    }

    #[test]
    fn test_negotiate_prefers_highest_quality() {
        let supported = codes(&["en", "lt"]);
        let picked = LanguageCode::negotiate("en;q=0.5, lt-LT;q=0.9, de", &supported);
        assert_eq!(picked.unwrap().as_str(), "lt");
    }

    #[test]
    fn test_negotiate_keeps_header_order_on_ties() {
        let supported = codes(&["en", "lt"]);
        let picked = LanguageCode::negotiate("lt, en", &supported);
        assert_eq!(picked.unwrap().as_str(), "lt");
    }

    #[test]
    fn test_negotiate_skips_unsupported_and_zero_weight() {
        let supported = codes(&["en", "lt"]);
        let negotiated = LanguageCode::negotiate("de, fr;q=0.8, lt;q=0", &supported);
        assert!(negotiated.is_none());
        assert!(LanguageCode::negotiate("*", &supported).is_none());
        assert!(LanguageCode::negotiate("", &supported).is_none());
    }
}
