//! History producer contract
//!
//! The engine never reads repository storage itself. Everything it shows comes
//! from a [`Producer`]: a commit stream, the ref listing, the current head,
//! diff text and a cheap local-change summary. `areas::git` implements it on
//! top of the `git` command line; tests use in-memory producers.

use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::refs::Ref;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::porcelain::LocalChangeFlags;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Name shown for a detached or unborn head
pub const HEAD_REF_NAME: &str = "HEAD";

/// A live stream of commits in topological order
pub trait LogStream: Send {
    /// Next commit, or `Ok(None)` at end of stream
    fn next(&mut self) -> Result<Option<Commit>>;

    /// Release the stream; idempotent and bounded in time
    fn close(&mut self);
}

/// The resolved head of the repository
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeadState {
    /// `None` on an unborn head
    pub oid: Option<ObjectId>,
    /// Branch the head is attached to, if any
    pub branch: Option<BranchName>,
}

impl HeadState {
    pub fn new(oid: Option<ObjectId>, branch: Option<BranchName>) -> Self {
        HeadState { oid, branch }
    }

    pub fn is_present(&self) -> bool {
        self.oid.is_some()
    }

    /// Branch name, or `HEAD` when detached or unborn
    pub fn display_name(&self) -> String {
        match (&self.oid, &self.branch) {
            (Some(_), Some(branch)) => branch.to_string(),
            _ => HEAD_REF_NAME.to_string(),
        }
    }

    /// Label placed first on the head commit
    pub fn label(&self) -> String {
        match &self.branch {
            Some(branch) => format!("{HEAD_REF_NAME} -> {branch}"),
            None => HEAD_REF_NAME.to_string(),
        }
    }
}

pub trait Producer: Send + Sync {
    /// Root of the open repository, `None` when nothing is open
    fn repo_path(&self) -> Option<PathBuf>;

    /// Open the repository containing `path`, returning its root
    fn open(&self, path: &Path) -> Result<PathBuf>;

    /// Stream commits reachable from `from`
    ///
    /// Fails with `NotInitialized` without a repository and `InvalidStart`
    /// when `from` does not resolve to a commit.
    fn start_log_stream(&self, from: &ObjectId) -> Result<Box<dyn LogStream>>;

    fn head_state(&self) -> Result<HeadState>;

    /// Snapshot of branch, remote and tag refs, tags already peeled
    fn list_refs(&self) -> Result<Vec<Ref>>;

    /// Unified diff of `oid` against `parent`, or against the empty tree
    fn commit_diff_text(&self, oid: &ObjectId, parent: Option<&ObjectId>) -> Result<String>;

    /// Unified diff of uncommitted changes, index side when `staged`
    fn worktree_diff_text(&self, staged: bool) -> Result<String>;

    fn local_changes_status(&self) -> Result<LocalChangeFlags>;

    fn switch_branch(&self, name: &BranchName) -> Result<()>;
}
