//! Core utilities and shared types
//!
//! - `debounce`: one-shot timers collapsing bursts of triggers
//! - `pager`: output sink for the rendered history (pager or plain stdout)

pub mod debounce;
pub mod pager;
