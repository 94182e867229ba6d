//! Commit record
//!
//! Commits arrive fully formed from the producer's log stream and are never
//! mutated afterwards. They contain:
//! - The commit's object ID
//! - Parent commit ID(s), first parent being the mainline
//! - Author and committer signatures
//! - The raw commit message

use crate::artifacts::objects::object_id::ObjectId;
use chrono::{DateTime, FixedOffset};
use derive_new::new;

/// Author or committer information
///
/// The timestamp is `None` when the producer emitted an instant that could not
/// be parsed; such signatures display the zero date.
#[derive(Debug, Clone, Eq, PartialEq, Default, new)]
pub struct Signature {
    name: String,
    email: String,
    timestamp: Option<DateTime<FixedOffset>>,
}

impl Signature {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamp
    }

    /// Format author name and email for display
    ///
    /// # Returns
    ///
    /// String in format "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Calendar date of the signature, `0000-00-00` for the zero instant
    pub fn short_date(&self) -> String {
        match self.timestamp {
            Some(timestamp) => timestamp.format("%Y-%m-%d").to_string(),
            None => "0000-00-00".to_string(),
        }
    }

    /// Format timestamp in human-readable form
    ///
    /// # Returns
    ///
    /// String like "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        match self.timestamp {
            Some(timestamp) => timestamp.format("%a %b %-d %H:%M:%S %Y %z").to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    oid: ObjectId,
    /// Parent commit IDs (empty for a root commit, several for merges)
    parents: Vec<ObjectId>,
    author: Signature,
    committer: Signature,
    message: String,
}

impl Commit {
    pub fn new(
        oid: ObjectId,
        parents: Vec<ObjectId>,
        author: Signature,
        committer: Signature,
        message: String,
    ) -> Self {
        Commit {
            oid,
            parents,
            author,
            committer,
            message,
        }
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    /// The mainline parent
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn author(&self) -> &Signature {
        &self.author
    }

    pub fn committer(&self) -> &Signature {
        &self.committer
    }

    /// Get the full commit message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the first line of the commit message
    ///
    /// Useful for short-form display (e.g. the summary column)
    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}
