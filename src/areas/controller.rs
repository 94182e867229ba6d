//! History engine controller
//!
//! The [`Controller`] is the single owner of the engine state. It lives on an
//! [`Executor`] and every mutation happens in a callback posted there. Producer
//! I/O runs on blocking workers that post their outcome back.
//!
//! The host talks to the controller through its [`ControllerHandle`] and
//! listens to [`EngineEvent`]s.
//!
//! ## Loading
//!
//! - `reload_all` closes the scan session, reads the first batch of a fresh
//!   one, rebuilds the labels and refreshes the local-change rows
//! - `load_more` appends a batch from the current session; with `prefetch`
//!   it keeps chaining while the session has more
//! - one batch is in flight at a time; a reload requested meanwhile runs once
//!   the batch lands, other requests are dropped
//! - every batch is stamped with the repository epoch; closing the repository
//!   bumps it and batches from an older epoch are dropped unapplied
//!
//! ## Diffs
//!
//! Selecting a commit fills a single pending slot and re-arms the commit diff
//! debouncer. When it fires, one load runs for the pending commit, and its
//! result is only delivered if that commit is still selected. Local diffs are
//! guarded by their slot generation.

use crate::areas::diff_cache::{CommitDiffCache, DiffSlot, DiffSnapshot};
use crate::areas::executor::{Executor, ExecutorHandle};
use crate::areas::local_changes::{LocalChanges, Side, Visibility};
use crate::areas::model::{CommitModel, Row, Selection};
use crate::areas::producer::Producer;
use crate::areas::refs::BranchLabels;
use crate::areas::session::{Batch, Scanner};
use crate::areas::watcher::AutoReloadWatcher;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::core::debounce::{Debouncer, ensure};
use crate::artifacts::log::entry::Entry;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::porcelain::LocalChangeFlags;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type ControllerHandle = ExecutorHandle<Controller>;

/// Start of the status message posted after a successful branch switch
pub const SWITCHED_STATUS_PREFIX: &str = "Switched to branch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffTarget {
    Commit(ObjectId),
    Local(Side),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A fresh session replaced the list
    Reloaded { visible: usize, has_more: bool },
    /// A batch was appended to the list
    BatchLoaded { appended: usize, has_more: bool },
    /// The filter changed the visible rows
    Filtered { visible: usize },
    LocalChanges(Visibility),
    DiffReady { target: DiffTarget, diff: DiffSnapshot },
    /// New status-line message
    Status(String),
}

/// Snapshot of what the list shows
#[derive(Debug, Clone)]
pub struct HistoryView {
    pub rows: Vec<Row>,
    pub labels: BranchLabels,
    pub head_name: String,
    pub has_more: bool,
    pub selection: Selection,
    pub status: Option<String>,
}

struct Reload {
    batch: Batch,
    labels: BranchLabels,
    flags: LocalChangeFlags,
}

type PendingCommitDiff = (Arc<Entry>, ObjectId);

pub struct Controller {
    config: EngineConfig,
    producer: Arc<dyn Producer>,
    scanner: Arc<tokio::sync::Mutex<Scanner>>,
    epoch: Arc<AtomicU64>,
    model: CommitModel,
    local: LocalChanges,
    commit_diffs: Arc<CommitDiffCache>,
    selected: Arc<RwLock<Option<ObjectId>>>,
    pending_commit_diff: Arc<Mutex<Option<PendingCommitDiff>>>,
    pending_filter: Arc<Mutex<Option<String>>>,
    commit_diff_debounce: OnceLock<Debouncer>,
    filter_debounce: OnceLock<Debouncer>,
    watcher: Option<AutoReloadWatcher>,
    repo_ready: bool,
    reload_requested: bool,
    status: Option<String>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl Controller {
    pub fn new(
        config: EngineConfig,
        producer: Arc<dyn Producer>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let scanner = Scanner::new(producer.clone(), config.max_graph_columns);

        let controller = Controller {
            commit_diffs: Arc::new(CommitDiffCache::new(config.commit_diff_capacity)),
            config,
            producer,
            scanner: Arc::new(tokio::sync::Mutex::new(scanner)),
            epoch: Arc::new(AtomicU64::new(0)),
            model: CommitModel::new(),
            local: LocalChanges::new(),
            selected: Arc::new(RwLock::new(None)),
            pending_commit_diff: Arc::new(Mutex::new(None)),
            pending_filter: Arc::new(Mutex::new(None)),
            commit_diff_debounce: OnceLock::new(),
            filter_debounce: OnceLock::new(),
            watcher: None,
            repo_ready: false,
            reload_requested: false,
            status: None,
            events,
        };
        (controller, receiver)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model(&self) -> &CommitModel {
        &self.model
    }

    pub fn local_changes(&self) -> &LocalChanges {
        &self.local
    }

    pub fn is_repo_ready(&self) -> bool {
        self.repo_ready
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn view(&self) -> HistoryView {
        HistoryView {
            rows: self.model.rows(&self.local),
            labels: self.model.labels().clone(),
            head_name: self.model.head_name().to_string(),
            has_more: self.model.has_more(),
            selection: self.model.selection().clone(),
            status: self.status.clone(),
        }
    }

    pub fn commit_diff(&self, oid: &ObjectId) -> Option<DiffSnapshot> {
        self.commit_diffs
            .get(oid)
            .map(|slot| slot.snapshot())
            .filter(|snapshot| snapshot.ready)
    }

    pub fn local_diff(&self, side: Side) -> DiffSnapshot {
        self.local.snapshot(side)
    }

    fn emit(&self, event: EngineEvent) {
        // the host may have stopped listening
        let _ = self.events.send(event);
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = Some(message.clone());
        self.emit(EngineEvent::Status(message));
    }

    fn report(&mut self, error: EngineError) {
        if error.is_silent() {
            tracing::debug!(%error, "dropped");
            return;
        }
        tracing::warn!(%error, "engine operation failed");
        self.set_status(error.to_string());
    }

    /// Open the repository containing `path` and load its history
    pub fn open(&mut self, handle: &ControllerHandle, path: PathBuf) {
        self.close_repository(handle);

        let producer = self.producer.clone();
        handle.spawn_blocking(
            move || producer.open(&path),
            |this: &mut Controller, handle, result| match result {
                Ok(root) => {
                    this.repo_ready = true;
                    this.start_watcher(handle, &root);
                    this.reload_all(handle);
                }
                Err(error) => this.report(error),
            },
        );
    }

    fn close_repository(&mut self, handle: &ControllerHandle) {
        self.stop_watcher();
        self.repo_ready = false;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.reload_requested = false;
        self.model.clear();
        self.local.hide_all();
        self.commit_diffs.clear();
        *self.selected.write() = None;
        self.pending_commit_diff.lock().take();

        let scanner = self.scanner.clone();
        handle
            .runtime()
            .spawn_blocking(move || scanner.blocking_lock().close());
    }

    pub fn reload_all(&mut self, handle: &ControllerHandle) {
        if !self.repo_ready {
            self.report(EngineError::NotInitialized);
            return;
        }
        if !self.model.begin_batch() {
            self.reload_requested = true;
            return;
        }

        let producer = self.producer.clone();
        let scanner = self.scanner.clone();
        let epoch = self.epoch.clone();
        let started = self.current_epoch();
        let batch_size = self.config.batch_size;
        handle.spawn_blocking(
            move || read_reload(producer.as_ref(), &scanner, &epoch, started, batch_size),
            move |this: &mut Controller, handle, result| this.finish_reload(handle, started, result),
        );
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Whether a batch started at `started` still belongs to the open repository
    fn is_current_batch(&self, started: u64) -> bool {
        let current = self.current_epoch();
        if started != current {
            tracing::debug!(started, current, "batch from a closed repository dropped");
            return false;
        }
        true
    }

    fn finish_reload(&mut self, handle: &ControllerHandle, started: u64, result: Result<Reload>) {
        if !self.is_current_batch(started) {
            return;
        }
        match result {
            Ok(reload) => {
                self.model.replace(reload.batch, reload.labels);
                tracing::info!(
                    loaded = self.model.loaded().len(),
                    has_more = self.model.has_more(),
                    head = self.model.head_name(),
                    "history reloaded"
                );
                self.refresh_local(handle, true, reload.flags);
                self.sync_selection(handle);
                self.emit(EngineEvent::Reloaded {
                    visible: self.model.visible().len(),
                    has_more: self.model.has_more(),
                });
            }
            Err(error) => self.fail_batch(error),
        }
        self.run_requested_reload(handle);
    }

    /// Append the next batch from the current session
    pub fn load_more(&mut self, handle: &ControllerHandle, prefetch: bool) {
        if !self.repo_ready || !self.model.has_more() || !self.model.begin_batch() {
            return;
        }

        let producer = self.producer.clone();
        let scanner = self.scanner.clone();
        let epoch = self.epoch.clone();
        let started = self.current_epoch();
        let skip = self.model.scanned();
        let batch_size = self.config.batch_size;
        handle.spawn_blocking(
            move || -> Result<(Batch, LocalChangeFlags)> {
                let mut scanner = scanner.blocking_lock();
                check_epoch(&epoch, started)?;
                let batch = scanner.fetch_batch(skip, batch_size)?;
                drop(scanner);
                Ok((batch, producer.local_changes_status()?))
            },
            move |this: &mut Controller, handle, result| {
                this.finish_load_more(handle, started, prefetch, result)
            },
        );
    }

    fn finish_load_more(
        &mut self,
        handle: &ControllerHandle,
        started: u64,
        prefetch: bool,
        result: Result<(Batch, LocalChangeFlags)>,
    ) {
        if !self.is_current_batch(started) {
            return;
        }
        match result {
            Ok((batch, flags)) => {
                let appended = self.model.append(batch);
                tracing::debug!(appended, has_more = self.model.has_more(), "batch appended");
                self.refresh_local(handle, false, flags);
                self.sync_selection(handle);
                self.emit(EngineEvent::BatchLoaded {
                    appended,
                    has_more: self.model.has_more(),
                });

                if prefetch && self.model.has_more() && !self.reload_requested {
                    handle.post(|this: &mut Controller, handle| this.load_more(handle, true));
                }
            }
            Err(error) => self.fail_batch(error),
        }
        self.run_requested_reload(handle);
    }

    fn fail_batch(&mut self, error: EngineError) {
        self.model.fail_batch();
        if matches!(error, EngineError::InvalidStart(_) | EngineError::NotInitialized) {
            self.model.clear();
            *self.selected.write() = None;
        }
        self.report(error);
    }

    fn run_requested_reload(&mut self, handle: &ControllerHandle) {
        if std::mem::take(&mut self.reload_requested) {
            self.reload_all(handle);
        }
    }

    /// Scroll feedback from the view
    pub fn on_scroll(&mut self, handle: &ControllerHandle, fraction: f64, last_row_visible: bool) {
        if self
            .model
            .should_autoload(fraction, last_row_visible, self.config.autoload_threshold)
        {
            self.load_more(handle, false);
        }
    }

    /// Debounced filter input
    pub fn set_filter(&mut self, handle: &ControllerHandle, query: &str) {
        *self.pending_filter.lock() = Some(query.to_string());

        let poster = handle.clone();
        ensure(
            &self.filter_debounce,
            handle.runtime(),
            self.config.filter_debounce,
            move || {
                poster.post(|this: &mut Controller, handle| this.apply_pending_filter(handle));
            },
        )
        .trigger();
    }

    fn apply_pending_filter(&mut self, handle: &ControllerHandle) {
        let Some(query) = self.pending_filter.lock().take() else {
            return;
        };
        self.apply_filter(handle, &query);
    }

    /// Filter immediately, bypassing the debouncer
    pub fn apply_filter(&mut self, handle: &ControllerHandle, query: &str) {
        if !self.model.set_filter(query) {
            return;
        }
        tracing::debug!(query, visible = self.model.visible().len(), "filter applied");
        self.sync_selection(handle);
        self.emit(EngineEvent::Filtered {
            visible: self.model.visible().len(),
        });
    }

    pub fn select(&mut self, handle: &ControllerHandle, selection: Selection) {
        self.model.select(selection);
        *self.selected.write() = self.model.selection().oid().cloned();

        match self.model.selection().clone() {
            Selection::Commit { oid, .. } => self.schedule_commit_diff(handle, oid),
            Selection::Local(side) => self.load_local_diff(handle, side, false),
            Selection::None => {}
        }
    }

    /// Select the row at `index` of [`CommitModel::rows`]
    pub fn select_row(&mut self, handle: &ControllerHandle, index: usize) {
        let selection = match self.model.rows(&self.local).get(index) {
            Some(Row::Local(side)) => Selection::Local(*side),
            Some(Row::Commit(entry)) => Selection::Commit {
                oid: entry.oid().clone(),
                hint: index,
            },
            None => Selection::None,
        };
        self.select(handle, selection);
    }

    /// Publish a selection change caused by the model, e.g. a vanished hash
    fn sync_selection(&mut self, handle: &ControllerHandle) {
        self.model.retain_local_selection(&self.local);

        let current = self.model.selection().oid().cloned();
        let previous = std::mem::replace(&mut *self.selected.write(), current.clone());
        if let Some(oid) = current
            && previous.as_ref() != Some(&oid)
        {
            self.schedule_commit_diff(handle, oid);
        }
    }

    fn schedule_commit_diff(&mut self, handle: &ControllerHandle, oid: ObjectId) {
        let Some(entry) = self.model.entry(&oid).cloned() else {
            return;
        };
        *self.pending_commit_diff.lock() = Some((entry, oid));

        let poster = handle.clone();
        ensure(
            &self.commit_diff_debounce,
            handle.runtime(),
            self.config.commit_diff_debounce,
            move || {
                poster.post(|this: &mut Controller, handle| this.run_commit_diff(handle));
            },
        )
        .trigger();
    }

    fn run_commit_diff(&mut self, handle: &ControllerHandle) {
        let Some((entry, oid)) = self.pending_commit_diff.lock().take() else {
            return;
        };
        if !self.is_selected(&oid) {
            return;
        }

        let slot = self.commit_diffs.slot(&oid);
        let (generation, started) = slot.start_loading(false);
        if !started {
            // a load already in flight delivers on its own
            if slot.is_ready() {
                self.emit(EngineEvent::DiffReady {
                    target: DiffTarget::Commit(oid),
                    diff: slot.snapshot(),
                });
            }
            return;
        }

        tracing::debug!(%oid, "loading commit diff");
        let producer = self.producer.clone();
        let selected = self.selected.clone();
        let target = oid.clone();
        handle.spawn_blocking(
            move || {
                // selection moved while queued
                if selected.read().as_ref() != Some(&target) {
                    return None;
                }
                let parent = entry.commit().parent();
                Some(producer.commit_diff_text(&target, parent))
            },
            move |this: &mut Controller, _, result| {
                this.finish_commit_diff(&slot, generation, oid, result)
            },
        );
    }

    fn finish_commit_diff(
        &mut self,
        slot: &DiffSlot,
        generation: u64,
        oid: ObjectId,
        result: Option<Result<String>>,
    ) {
        let Some(result) = result else {
            slot.abandon(generation);
            return;
        };
        if let Err(error) = slot.finish(generation, result) {
            self.report(error);
            return;
        }

        if self.is_selected(&oid) {
            self.emit(EngineEvent::DiffReady {
                target: DiffTarget::Commit(oid),
                diff: slot.snapshot(),
            });
        } else {
            tracing::debug!(%oid, "commit diff no longer selected");
        }
    }

    fn is_selected(&self, oid: &ObjectId) -> bool {
        self.selected.read().as_ref() == Some(oid)
    }

    /// Load the diff behind a local-change row
    pub fn load_local_diff(&mut self, handle: &ControllerHandle, side: Side, force: bool) {
        if !self.local.is_visible(side) {
            return;
        }

        let slot = self.local.slot(side).clone();
        let (generation, started) = slot.start_loading(force);
        if !started {
            if slot.is_ready() {
                self.emit(EngineEvent::DiffReady {
                    target: DiffTarget::Local(side),
                    diff: slot.snapshot(),
                });
            }
            return;
        }

        tracing::debug!(?side, generation, "loading local diff");
        let producer = self.producer.clone();
        handle.spawn_blocking(
            move || producer.worktree_diff_text(side.is_staged()),
            move |this: &mut Controller, _, result| {
                if let Err(error) = slot.finish(generation, result) {
                    this.report(error);
                    return;
                }
                this.emit(EngineEvent::DiffReady {
                    target: DiffTarget::Local(side),
                    diff: slot.snapshot(),
                });
            },
        );
    }

    fn refresh_local(&mut self, handle: &ControllerHandle, prefetch: bool, flags: LocalChangeFlags) {
        let before = self.local.visibility();
        let load = self.local.refresh(self.repo_ready, prefetch, flags);
        if self.local.visibility() != before || prefetch {
            self.emit(EngineEvent::LocalChanges(self.local.visibility()));
        }
        for side in load {
            self.load_local_diff(handle, side, prefetch);
        }
    }

    /// Switch the producer to `name`, then reload
    pub fn switch_branch(&mut self, handle: &ControllerHandle, name: &str) {
        let branch = match BranchName::try_parse(name) {
            Ok(branch) => branch,
            Err(error) => return self.report(error),
        };
        if !self.repo_ready {
            return self.report(EngineError::NotInitialized);
        }

        let producer = self.producer.clone();
        let scanner = self.scanner.clone();
        handle.spawn_blocking(
            move || -> Result<BranchName> {
                producer.switch_branch(&branch)?;
                // the old session's stream no longer matches the head
                scanner.blocking_lock().close();
                Ok(branch)
            },
            |this: &mut Controller, handle, result| match result {
                Ok(branch) => {
                    this.set_status(format!("{SWITCHED_STATUS_PREFIX} '{branch}'"));
                    this.reload_all(handle);
                }
                Err(error) => this.report(error),
            },
        );
    }

    pub fn set_auto_reload(&mut self, handle: &ControllerHandle, enabled: bool) {
        self.config.auto_reload = enabled;
        self.stop_watcher();
        if enabled && let Some(root) = self.producer.repo_path() {
            self.start_watcher(handle, &root);
        }
    }

    fn start_watcher(&mut self, handle: &ControllerHandle, root: &Path) {
        self.stop_watcher();
        if !self.config.auto_reload {
            return;
        }

        let poster = handle.clone();
        let watcher = AutoReloadWatcher::start(
            root,
            self.config.auto_reload_debounce,
            handle.runtime().clone(),
            move || {
                poster.post(|this: &mut Controller, handle| {
                    tracing::info!("repository changed, reloading");
                    this.reload_all(handle);
                });
            },
        );
        match watcher {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(error) => {
                self.config.auto_reload = false;
                self.report(error);
            }
        }
    }

    fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }

    /// Cancel pending work and release the scan session
    pub fn shutdown(&mut self) {
        for debouncer in [&self.commit_diff_debounce, &self.filter_debounce] {
            if let Some(debouncer) = debouncer.get() {
                debouncer.stop();
            }
        }
        self.stop_watcher();
        if let Ok(mut scanner) = self.scanner.try_lock() {
            scanner.close();
        }
    }
}

/// Fail with `StaleGeneration` once the repository epoch moved past `started`
fn check_epoch(epoch: &AtomicU64, started: u64) -> Result<()> {
    let current = epoch.load(Ordering::SeqCst);
    if current != started {
        return Err(EngineError::StaleGeneration { started, current });
    }
    Ok(())
}

fn read_reload(
    producer: &dyn Producer,
    scanner: &tokio::sync::Mutex<Scanner>,
    epoch: &AtomicU64,
    started: u64,
    batch_size: usize,
) -> Result<Reload> {
    let mut scanner = scanner.blocking_lock();
    check_epoch(epoch, started)?;
    scanner.close();
    let batch = scanner.fetch_batch(0, batch_size)?;
    drop(scanner);

    let refs = producer.list_refs()?;
    let labels = BranchLabels::build(&refs, &batch.head);
    let flags = producer.local_changes_status()?;

    Ok(Reload {
        batch,
        labels,
        flags,
    })
}

/// A controller running on its own executor task
pub struct Engine {
    handle: ControllerHandle,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    task: JoinHandle<Controller>,
}

impl Engine {
    pub fn start(config: EngineConfig, producer: Arc<dyn Producer>, runtime: &Handle) -> Self {
        let (controller, events) = Controller::new(config, producer);
        let executor = Executor::new(runtime.clone());
        let handle = executor.handle();
        let task = runtime.spawn(executor.run(controller));

        Engine {
            handle,
            events,
            task,
        }
    }

    pub fn handle(&self) -> &ControllerHandle {
        &self.handle
    }

    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    /// Shut the controller down and wait for its executor to drain
    pub async fn stop(self) -> Option<Controller> {
        self.handle.post(|this: &mut Controller, _| this.shutdown());
        self.handle.shutdown();
        self.task.await.ok()
    }
}
