//! Commit model
//!
//! The model keeps the append-only sequence of loaded entries, the visible
//! sequence derived from it by the filter, and the current selection.
//!
//! ## Invariants
//!
//! - A hash appears at most once in `loaded`
//! - Appending never removes or reorders earlier entries
//! - `visible` is recomputed after every change to `loaded` or the filter
//!
//! Only one batch may be in flight: `begin_batch` closes the gate and every
//! batch outcome reopens it.

use crate::areas::local_changes::{LocalChanges, Side};
use crate::areas::refs::BranchLabels;
use crate::areas::session::Batch;
use crate::artifacts::log::entry::Entry;
use crate::artifacts::log::filter::EntryFilter;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    None,
    /// A commit, with the visible row it was last seen at
    Commit { oid: ObjectId, hint: usize },
    Local(Side),
}

impl Selection {
    pub fn oid(&self) -> Option<&ObjectId> {
        match self {
            Selection::Commit { oid, .. } => Some(oid),
            _ => None,
        }
    }
}

/// A row of the history list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Local(Side),
    Commit(Arc<Entry>),
}

#[derive(Debug, Default)]
pub struct CommitModel {
    loaded: Vec<Arc<Entry>>,
    seen: HashSet<ObjectId>,
    visible: Vec<Arc<Entry>>,
    filter: EntryFilter,
    /// Commits consumed from the scan session, duplicates included
    scanned: usize,
    has_more: bool,
    loading_batch: bool,
    head_name: String,
    labels: BranchLabels,
    selection: Selection,
}

impl CommitModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> &[Arc<Entry>] {
        &self.loaded
    }

    pub fn visible(&self) -> &[Arc<Entry>] {
        &self.visible
    }

    pub fn filter(&self) -> &EntryFilter {
        &self.filter
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading_batch
    }

    pub fn head_name(&self) -> &str {
        &self.head_name
    }

    pub fn labels(&self) -> &BranchLabels {
        &self.labels
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Close the batch gate; `false` when a batch is already in flight
    pub fn begin_batch(&mut self) -> bool {
        if self.loading_batch {
            return false;
        }
        self.loading_batch = true;
        true
    }

    /// Install the first batch of a fresh session
    pub fn replace(&mut self, batch: Batch, labels: BranchLabels) {
        self.loaded.clear();
        self.seen.clear();
        self.scanned = 0;
        self.labels = labels;
        self.append(batch);
    }

    /// Append a batch from the current session, returning how many entries it added
    pub fn append(&mut self, batch: Batch) -> usize {
        self.loading_batch = false;
        self.scanned += batch.entries.len();
        self.has_more = batch.has_more;
        self.head_name = batch.head.display_name();

        let before = self.loaded.len();
        for entry in batch.entries {
            if self.seen.insert(entry.oid().clone()) {
                self.loaded.push(Arc::new(entry));
            }
        }

        self.refilter();
        self.loaded.len() - before
    }

    /// Record a failed batch; loading stops until the next reload
    pub fn fail_batch(&mut self) {
        self.loading_batch = false;
        self.has_more = false;
    }

    /// Drop everything, e.g. when the repository goes away
    pub fn clear(&mut self) {
        let filter = std::mem::take(&mut self.filter);
        *self = CommitModel {
            filter,
            ..CommitModel::default()
        };
    }

    /// Change the filter query, returning whether it changed
    pub fn set_filter(&mut self, query: &str) -> bool {
        let filter = EntryFilter::new(query);
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.refilter();
        true
    }

    fn refilter(&mut self) {
        self.visible = self.filter.apply(&self.loaded);
        self.resolve_selection();
    }

    pub fn position(&self, oid: &ObjectId) -> Option<usize> {
        self.visible.iter().position(|entry| entry.oid() == oid)
    }

    pub fn entry(&self, oid: &ObjectId) -> Option<&Arc<Entry>> {
        self.loaded.iter().find(|entry| entry.oid() == oid)
    }

    /// Loaded entry whose hash starts with `prefix`, if exactly one does
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Arc<Entry>> {
        let mut matches = self
            .loaded
            .iter()
            .filter(|entry| entry.oid().as_ref().starts_with(prefix));
        let found = matches.next()?;
        matches.next().is_none().then_some(found)
    }

    pub fn select_commit(&mut self, oid: ObjectId) {
        let hint = self.position(&oid).unwrap_or_default();
        self.selection = Selection::Commit { oid, hint };
    }

    pub fn select(&mut self, selection: Selection) {
        match selection {
            Selection::Commit { oid, .. } => self.select_commit(oid),
            other => self.selection = other,
        }
    }

    /// Re-resolve a commit selection against the visible rows
    ///
    /// A vanished hash moves the selection to the row at its clamped hint.
    fn resolve_selection(&mut self) {
        let Selection::Commit { oid, hint } = &self.selection else {
            return;
        };

        self.selection = match self.position(oid) {
            Some(position) => Selection::Commit {
                oid: oid.clone(),
                hint: position,
            },
            None if self.visible.is_empty() => Selection::None,
            None => {
                let position = (*hint).min(self.visible.len() - 1);
                Selection::Commit {
                    oid: self.visible[position].oid().clone(),
                    hint: position,
                }
            }
        };
    }

    /// Drop a pseudo-row selection whose row is gone
    pub fn retain_local_selection(&mut self, local: &LocalChanges) {
        if let Selection::Local(side) = self.selection
            && !local.is_visible(side)
        {
            self.selection = Selection::None;
        }
    }

    /// Whether scrolling to `scroll_fraction` should fetch the next batch
    ///
    /// With a filter active any position past `threshold` loads more.
    /// Unfiltered, the last loaded row must also be on screen, so a full
    /// viewport short of the end never grows the list.
    pub fn should_autoload(&self, scroll_fraction: f64, last_row_visible: bool, threshold: f64) -> bool {
        if !self.has_more || self.loading_batch || scroll_fraction < threshold {
            return false;
        }
        !self.filter.is_blank() || last_row_visible
    }

    /// Pseudo-rows followed by the visible commits
    pub fn rows(&self, local: &LocalChanges) -> Vec<Row> {
        local
            .visible_sides()
            .into_iter()
            .map(Row::Local)
            .chain(self.visible.iter().cloned().map(Row::Commit))
            .collect()
    }
}
