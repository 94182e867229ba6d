//! Filesystem-driven auto-reload
//!
//! The watcher follows the repository metadata directory when the repository
//! has one (`<root>/.git` as a directory), the worktree root otherwise. A
//! qualifying event re-arms a debouncer; its fire runs the reload callback.
//!
//! Qualifying events are creates, removes, renames and content writes on at
//! least one path that is not producer bookkeeping (`*.lock`, `*.ipc`).

use crate::artifacts::core::debounce::Debouncer;
use crate::error::{EngineError, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const METADATA_DIR: &str = ".git";
const IGNORED_SUFFIXES: [&str; 2] = [".lock", ".ipc"];

/// Directory the watcher subscribes to for `root`
pub fn watch_target(root: &Path) -> PathBuf {
    let metadata = root.join(METADATA_DIR);
    if metadata.is_dir() { metadata } else { root.to_path_buf() }
}

fn is_ignored_path(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| IGNORED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

pub fn is_qualifying_event(event: &Event) -> bool {
    let kind_qualifies = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    );

    kind_qualifies && event.paths.iter().any(|path| !is_ignored_path(path))
}

pub struct AutoReloadWatcher {
    target: PathBuf,
    debouncer: Arc<Debouncer>,
    // dropping the watcher unsubscribes
    _watcher: RecommendedWatcher,
}

impl AutoReloadWatcher {
    pub fn start(
        root: &Path,
        delay: Duration,
        runtime: Handle,
        on_change: impl Fn() + Send + Sync + 'static,
    ) -> Result<Self> {
        let target = watch_target(root);
        let debouncer = Arc::new(Debouncer::new(runtime, delay, on_change));

        let failure = |error: notify::Error| EngineError::WatcherFailure {
            path: target.clone(),
            reason: error.to_string(),
        };

        let events = debouncer.clone();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            match event {
                Ok(event) if is_qualifying_event(&event) => {
                    tracing::trace!(paths = ?event.paths, "repository changed");
                    events.trigger();
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(%error, "watch error"),
            }
        })
        .map_err(failure)?;
        watcher
            .watch(&target, RecursiveMode::Recursive)
            .map_err(failure)?;

        tracing::info!(target = %target.display(), "auto-reload watching");
        Ok(AutoReloadWatcher {
            target,
            debouncer,
            _watcher: watcher,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn stop(&self) {
        self.debouncer.stop();
    }
}

impl Drop for AutoReloadWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
