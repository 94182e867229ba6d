//! History data structures and algorithms
//!
//! This module contains the types and pure algorithms of the history engine:
//!
//! - `branch`: branch names and reference listings
//! - `core`: shared utilities (debouncer, pager wrapper)
//! - `diff`: diff display preparation
//! - `log`: log stream decoding, ancestry graph, entries and filtering
//! - `objects`: commit records and object IDs
//! - `status`: local change summary

pub mod branch;
pub mod core;
pub mod diff;
pub mod log;
pub mod objects;
pub mod status;
