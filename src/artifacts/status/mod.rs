//! Local change detection
//!
//! - `porcelain`: fold the producer's porcelain status into worktree/staged flags

pub mod porcelain;
