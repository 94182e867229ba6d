//! Commit history decoding and decoration
//!
//! - `record`: decoder for the producer's NUL-delimited log stream
//! - `graph`: incremental single-column-per-line ancestry graph
//! - `entry`: commits decorated with summary, search index and graph cell
//! - `filter`: case-insensitive substring filter over entries
//!
//! ## Pipeline
//!
//! Records are decoded one at a time as the list scrolls; every decoded commit
//! passes through the graph builder exactly once, in emission order, so the
//! cells stay stable no matter how the stream is batched.

pub mod entry;
pub mod filter;
pub mod graph;
pub mod record;
