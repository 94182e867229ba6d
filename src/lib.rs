//! Incremental commit-history engine
//!
//! `bitview` streams a repository's history in batches, draws its ancestry
//! graph, labels commits with their refs and loads commit and working-tree
//! diffs off the UI path. The engine is host-agnostic: [`areas::controller`]
//! owns the state and reports changes as events, [`commands`] renders
//! snapshots as text.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod error;
