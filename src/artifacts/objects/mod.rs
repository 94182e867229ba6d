//! Commit data types
//!
//! - `object_id`: opaque commit identifiers
//! - `commit`: immutable commit records with signatures

pub mod commit;
pub mod object_id;

/// Length of an abbreviated object ID
pub const SHORT_OID_LENGTH: usize = 7;
