//! History engine components
//!
//! The stateful parts of the engine, leaves first:
//!
//! - `producer`: the contract the engine needs from a history source
//! - `git`: that contract on top of the `git` command line
//! - `session`: live log streams with their ancestry graph
//! - `model`: the loaded and visible commit sequences and the selection
//! - `refs`: commit labels derived from refs and the head
//! - `local_changes`: the unstaged and staged pseudo-rows
//! - `diff_cache`: generation-guarded diff slots
//! - `watcher`: filesystem-driven auto-reload
//! - `executor`: the single-owner callback queue
//! - `controller`: ties everything together

pub mod controller;
pub mod diff_cache;
pub mod executor;
pub mod git;
pub mod local_changes;
pub mod model;
pub mod producer;
pub mod refs;
pub mod session;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;
