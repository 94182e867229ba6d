//! In-memory producer for engine tests

use crate::areas::producer::{HeadState, LogStream, Producer};
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::refs::{Ref, RefKind};
use crate::artifacts::objects::commit::{Commit, Signature};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::porcelain::LocalChangeFlags;
use crate::error::{EngineError, Result};
use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn oid(name: &str) -> ObjectId {
    ObjectId::try_parse(name).unwrap()
}

pub fn commit(name: &str, parents: &[&str], message: &str) -> Commit {
    let when = DateTime::<FixedOffset>::parse_from_rfc3339("2024-03-01T10:00:00+00:00").unwrap();
    let author = Signature::new("Ada".to_string(), "ada@example.com".to_string(), Some(when));
    Commit::new(
        oid(name),
        parents.iter().map(|parent| oid(parent)).collect(),
        author.clone(),
        author,
        message.to_string(),
    )
}

/// `count` linear commits `c{count}` .. `c1`, newest first
pub fn linear(count: usize) -> Vec<Commit> {
    (1..=count)
        .rev()
        .map(|index| {
            let parent = format!("c{}", index - 1);
            let parents = if index == 1 { vec![] } else { vec![parent.as_str()] };
            commit(&format!("c{index}"), &parents, &format!("commit {index}"))
        })
        .collect()
}

#[derive(Default)]
struct State {
    commits: Vec<Commit>,
    head: HeadState,
    refs: Vec<Ref>,
    status: LocalChangeFlags,
    commit_diffs: HashMap<ObjectId, String>,
    worktree_diffs: [String; 2],
    fail_stream_at: Option<usize>,
    failing_commit_diffs: usize,
}

#[derive(Default)]
pub struct FakeProducer {
    state: Mutex<State>,
    root: Mutex<Option<PathBuf>>,
    pub streams_opened: AtomicUsize,
    pub commit_diff_calls: AtomicUsize,
    pub worktree_diff_calls: AtomicUsize,
}

impl FakeProducer {
    /// Repository at `/repo` with `commits` reachable from `main`
    pub fn with_history(commits: Vec<Commit>) -> Arc<Self> {
        let producer = FakeProducer::default();
        producer.set_history(commits);
        *producer.root.lock() = Some(PathBuf::from("/repo"));
        Arc::new(producer)
    }

    pub fn set_history(&self, commits: Vec<Commit>) {
        let mut state = self.state.lock();
        let head = commits.first().map(|commit| commit.oid().clone());
        state.refs = head
            .iter()
            .map(|head| Ref::new(RefKind::LocalBranch, "main".to_string(), head.clone()))
            .collect();
        state.head = HeadState::new(head, Some(BranchName::try_parse("main").unwrap()));
        state.commits = commits;
    }

    pub fn set_refs(&self, refs: Vec<Ref>) {
        self.state.lock().refs = refs;
    }

    pub fn set_status(&self, status: LocalChangeFlags) {
        self.state.lock().status = status;
    }

    pub fn set_commit_diff(&self, oid: &ObjectId, text: &str) {
        self.state
            .lock()
            .commit_diffs
            .insert(oid.clone(), text.to_string());
    }

    pub fn set_worktree_diff(&self, staged: bool, text: &str) {
        self.state.lock().worktree_diffs[usize::from(staged)] = text.to_string();
    }

    /// The next `count` commit diffs fail with a transport error
    pub fn fail_commit_diffs(&self, count: usize) {
        self.state.lock().failing_commit_diffs = count;
    }

    /// Streams fail with a transport error after yielding `index` commits
    pub fn fail_stream_at(&self, index: usize) {
        self.state.lock().fail_stream_at = Some(index);
    }
}

pub struct FakeStream {
    commits: std::vec::IntoIter<Commit>,
    yielded: usize,
    fail_at: Option<usize>,
    closed: bool,
}

impl LogStream for FakeStream {
    fn next(&mut self) -> Result<Option<Commit>> {
        if self.closed {
            return Ok(None);
        }
        if self.fail_at == Some(self.yielded) {
            return Err(EngineError::transport("git log", "broken pipe"));
        }
        self.yielded += 1;
        Ok(self.commits.next())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

impl Producer for FakeProducer {
    fn repo_path(&self) -> Option<PathBuf> {
        self.root.lock().clone()
    }

    fn open(&self, path: &Path) -> Result<PathBuf> {
        *self.root.lock() = Some(path.to_path_buf());
        Ok(path.to_path_buf())
    }

    fn start_log_stream(&self, from: &ObjectId) -> Result<Box<dyn LogStream>> {
        if self.root.lock().is_none() {
            return Err(EngineError::NotInitialized);
        }
        let state = self.state.lock();
        let Some(start) = state.commits.iter().position(|commit| commit.oid() == from) else {
            return Err(EngineError::InvalidStart(from.to_string()));
        };
        self.streams_opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(FakeStream {
            commits: state.commits[start..].to_vec().into_iter(),
            yielded: 0,
            fail_at: state.fail_stream_at,
            closed: false,
        }))
    }

    fn head_state(&self) -> Result<HeadState> {
        Ok(self.state.lock().head.clone())
    }

    fn list_refs(&self) -> Result<Vec<Ref>> {
        Ok(self.state.lock().refs.clone())
    }

    fn commit_diff_text(&self, oid: &ObjectId, _parent: Option<&ObjectId>) -> Result<String> {
        self.commit_diff_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.failing_commit_diffs > 0 {
            state.failing_commit_diffs -= 1;
            return Err(EngineError::transport("git diff", "connection reset"));
        }
        Ok(state.commit_diffs.get(oid).cloned().unwrap_or_default())
    }

    fn worktree_diff_text(&self, staged: bool) -> Result<String> {
        self.worktree_diff_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().worktree_diffs[usize::from(staged)].clone())
    }

    fn local_changes_status(&self) -> Result<LocalChangeFlags> {
        Ok(self.state.lock().status)
    }

    fn switch_branch(&self, name: &BranchName) -> Result<()> {
        let mut state = self.state.lock();
        let target = state
            .refs
            .iter()
            .find(|reference| reference.kind == RefKind::LocalBranch && reference.name == name.as_ref())
            .map(|reference| reference.oid.clone())
            .ok_or_else(|| EngineError::InvalidStart(name.to_string()))?;
        state.head = HeadState::new(Some(target), Some(name.clone()));
        Ok(())
    }
}
