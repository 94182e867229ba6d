//! Commit identifier
//!
//! Object IDs are the hexadecimal names the producer prints for commits. The
//! engine never interprets them beyond equality and abbreviation, so any
//! non-empty string the producer emits is accepted.
//!
//! ## Format
//!
//! - Full: as emitted (40 hex characters for SHA-1 repositories)
//! - Short: first 7 characters

use crate::artifacts::objects::SHORT_OID_LENGTH;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse an object ID, rejecting blank input
    ///
    /// Surrounding whitespace is trimmed.
    pub fn try_parse(id: impl AsRef<str>) -> Result<Self> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(EngineError::EmptyHash);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(EngineError::ParseFailure(format!(
                "object ID contains whitespace: {id:?}"
            )));
        }
        Ok(Self(id.to_string()))
    }

    /// Abbreviated form, or the whole ID when it is already short
    pub fn to_short_oid(&self) -> &str {
        match self.0.char_indices().nth(SHORT_OID_LENGTH) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
