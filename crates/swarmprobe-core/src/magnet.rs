//! Magnet URI parsing and the normalized info-hash identifier.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static BTIH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)xt=urn:btih:([a-z0-9]+)").expect("btih regex is valid"));

/// Lowercase info hash addressing a single task at the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash(String);

impl InfoHash {
    /// Borrow the normalized hash text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InfoHash {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for InfoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Raised when a bare identifier is not a usable info hash.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid info hash '{value}'")]
pub struct InvalidInfoHash {
    /// Rejected input, trimmed.
    pub value: String,
}

impl FromStr for InfoHash {
    type Err = InvalidInfoHash;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(InvalidInfoHash {
                value: trimmed.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}

/// Extract the info hash carried by the `xt=urn:btih:` parameter of a magnet link.
///
/// Returns `None` when the link has no such parameter.
#[must_use]
pub fn extract_identifier(link: &str) -> Option<InfoHash> {
    BTIH_PATTERN
        .captures(link)
        .and_then(|captures| captures.get(1))
        .map(|hash| InfoHash(hash.as_str().to_ascii_lowercase()))
}
