//! Diff text handling
//!
//! Diff text itself comes from the producer; this module only prepares it for
//! display:
//!
//! - `display`: file-section indexing, section separators and path decoding

pub mod display;
