//! Parsing of user-entered identifiers.
//!
//! Users type ids into a free-form box, so anything can arrive: padding,
//! signs, letters, zero. A [`Candidate`] keeps whatever was typed and decides
//! once whether it is a usable id. Classification against the directory
//! (base range, already added) happens later, on the server.

use core::fmt;

/// One user-entered token, parsed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Candidate {
    /// A positive decimal integer.
    Id(u64),
    /// Anything else, kept as the trimmed text that was entered.
    Malformed(String),
}

impl Candidate {
    /// Parses a raw token.
    ///
    /// Only ASCII digits are accepted after trimming, so `"+5"`, `"-5"` and
    /// `"5.0"` are malformed. Leading zeros are dropped (`"007"` is `7`), zero
    /// itself is malformed, and values past `u64::MAX` are malformed.
    pub fn parse(raw: &str) -> Self {
        let token = raw.trim();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Malformed(token.to_owned());
        }
        match token.parse::<u64>() {
            Ok(id) if id > 0 => Self::Id(id),
            _ => Self::Malformed(token.to_owned()),
        }
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Malformed(_) => None,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Malformed(text) => f.write_str(text),
        }
    }
}
