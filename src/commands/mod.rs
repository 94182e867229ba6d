//! Host rendering
//!
//! The engine only produces snapshots; these commands turn them into text:
//!
//! - `log`: the history list with its pseudo-rows, graph cells and labels
//! - `show`: a commit header or pseudo-row title followed by its prepared diff
//!
//! Both write to any `std::io::Write`, normally a
//! [`HistoryOutput`](crate::artifacts::core::pager::HistoryOutput).

pub mod log;
pub mod show;
