//! Engine tunables
//!
//! The defaults match what the desktop viewer ships with. The binary overrides
//! a handful of them from the command line.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_MAX_GRAPH_COLUMNS: usize = 32;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Commits fetched per `load-more`
    pub batch_size: usize,
    /// Horizontal budget of the graph column
    pub max_graph_columns: usize,
    pub commit_diff_debounce: Duration,
    pub filter_debounce: Duration,
    pub auto_reload_debounce: Duration,
    /// Scroll fraction at which the next batch is requested
    pub autoload_threshold: f64,
    pub commit_diff_capacity: usize,
    pub auto_reload: bool,
    pub git_binary: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            max_graph_columns: DEFAULT_MAX_GRAPH_COLUMNS,
            commit_diff_debounce: Duration::from_millis(120),
            filter_debounce: Duration::from_millis(240),
            auto_reload_debounce: Duration::from_millis(350),
            autoload_threshold: 0.98,
            commit_diff_capacity: 64,
            auto_reload: true,
            git_binary: PathBuf::from("git"),
        }
    }
}

impl EngineConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}
