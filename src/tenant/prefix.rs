use crate::error::PrefixError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The three per-tenant tables the expiration job touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Translates,
    Edges,
    Nodes,
}

impl TableKind {
    /// Link rows go before the node rows they point at.
    pub const EXPIRATION_ORDER: [Self; 3] = [Self::Translates, Self::Edges, Self::Nodes];

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Translates => "_translates",
            Self::Edges => "_edges",
            Self::Nodes => "_nodes",
        }
    }
}

/// A validated tenant namespace token (`^\w+$`, ASCII).
///
/// Only values of this type are ever interpolated into table names, so
/// statement text built from it cannot carry anything but word characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Prefix(String);

impl Prefix {
    pub fn parse(raw: &str) -> Result<Self, PrefixError> {
        if raw.is_empty() {
            return Err(PrefixError::Empty);
        }
        if !raw.bytes().all(is_word_byte) {
            return Err(PrefixError::Invalid(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn table(&self, kind: TableKind) -> String {
        format!("{}{}", self.0, kind.suffix())
    }
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl FromStr for Prefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Prefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
