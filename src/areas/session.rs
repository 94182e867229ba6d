//! Scan sessions
//!
//! A [`ScanSession`] wraps one live log stream and the graph builder fed by
//! it. Every commit read from the stream passes through the builder exactly
//! once, in emission order, and its cell is cached by hash.
//!
//! The [`Scanner`] owns at most one session at a time and replaces it when the
//! head moves. A session is never repaired: an error closes it, and the next
//! batch opens a new one.

use crate::areas::producer::{HeadState, LogStream, Producer};
use crate::artifacts::log::entry::Entry;
use crate::artifacts::log::graph::GraphBuilder;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ScanSession {
    start: ObjectId,
    head_name: String,
    stream: Box<dyn LogStream>,
    lookahead: Option<Commit>,
    done: bool,
    returned: usize,
    graph: GraphBuilder,
    cells: HashMap<ObjectId, String>,
}

impl ScanSession {
    pub fn open(
        producer: &dyn Producer,
        start: ObjectId,
        head_name: String,
        max_columns: usize,
    ) -> Result<Self> {
        let stream = producer.start_log_stream(&start)?;
        tracing::debug!(%start, %head_name, "scan session opened");

        Ok(ScanSession {
            start,
            head_name,
            stream,
            lookahead: None,
            done: false,
            returned: 0,
            graph: GraphBuilder::with_max_columns(max_columns),
            cells: HashMap::new(),
        })
    }

    pub fn start(&self) -> &ObjectId {
        &self.start
    }

    pub fn head_name(&self) -> &str {
        &self.head_name
    }

    /// Number of commits handed out by `next` and `discard`
    pub fn returned(&self) -> usize {
        self.returned
    }

    pub fn is_done(&self) -> bool {
        self.done && self.lookahead.is_none()
    }

    /// Whether `next` would yield a commit, without consuming it
    pub fn has_more(&mut self) -> Result<bool> {
        if self.lookahead.is_none() && !self.done {
            self.lookahead = self.pull()?;
        }
        Ok(self.lookahead.is_some())
    }

    pub fn next(&mut self) -> Result<Option<Commit>> {
        let commit = match self.lookahead.take() {
            Some(commit) => Some(commit),
            None if self.done => None,
            None => self.pull()?,
        };

        if commit.is_some() {
            self.returned += 1;
        }
        Ok(commit)
    }

    /// Consume and drop up to `count` commits, returning how many were dropped
    pub fn discard(&mut self, count: usize) -> Result<usize> {
        let mut dropped = 0;
        while dropped < count && self.next()?.is_some() {
            dropped += 1;
        }
        Ok(dropped)
    }

    pub fn cell(&self, oid: &ObjectId) -> Option<&str> {
        self.cells.get(oid).map(String::as_str)
    }

    /// Copy cached cells into `entries`, matching by hash
    pub fn assign_graph_cells(&self, entries: &mut [Entry]) {
        for entry in entries {
            if let Some(cell) = self.cells.get(entry.oid()) {
                entry.set_graph(cell.clone());
            }
        }
    }

    pub fn close(&mut self) {
        if !self.done {
            tracing::debug!(start = %self.start, returned = self.returned, "scan session closed");
        }
        self.stream.close();
        self.lookahead = None;
        self.done = true;
    }

    fn pull(&mut self) -> Result<Option<Commit>> {
        match self.stream.next() {
            Ok(Some(commit)) => {
                let cell = self.graph.push(&commit);
                self.cells.insert(commit.oid().clone(), cell);
                Ok(Some(commit))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(error) => {
                tracing::warn!(%error, start = %self.start, "log stream failed");
                self.close();
                Err(error)
            }
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.stream.close();
    }
}

/// One window of freshly decoded entries
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub entries: Vec<Entry>,
    /// The session can still yield at least one commit
    pub has_more: bool,
    /// Head the batch was read from
    pub head: HeadState,
}

/// Owner of the current scan session
pub struct Scanner {
    producer: Arc<dyn Producer>,
    max_columns: usize,
    session: Option<ScanSession>,
}

impl Scanner {
    pub fn new(producer: Arc<dyn Producer>, max_columns: usize) -> Self {
        Scanner {
            producer,
            max_columns,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    /// Session starting at `head`, reusing the current one when it matches
    ///
    /// `None` on an unborn head.
    pub fn ensure_session(&mut self, head: &HeadState) -> Result<Option<&mut ScanSession>> {
        let Some(start) = &head.oid else {
            self.close();
            return Ok(None);
        };

        let reusable = self
            .session
            .as_ref()
            .is_some_and(|session| session.start() == start);
        if !reusable {
            self.reset(head)?;
        }
        Ok(self.session.as_mut())
    }

    /// Replace the session unconditionally
    pub fn reset(&mut self, head: &HeadState) -> Result<Option<&mut ScanSession>> {
        self.close();

        let Some(start) = &head.oid else {
            return Ok(None);
        };
        let session = ScanSession::open(
            self.producer.as_ref(),
            start.clone(),
            head.display_name(),
            self.max_columns,
        )?;
        self.session = Some(session);

        Ok(self.session.as_mut())
    }

    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    /// Read up to `count` entries following the first `skip` commits
    ///
    /// The session is aligned to `skip` first: commits it has not handed out
    /// yet are discarded, and a session that is already past `skip` is
    /// replaced. An error closes the session.
    pub fn fetch_batch(&mut self, skip: usize, count: usize) -> Result<Batch> {
        let result = self.read_batch(skip, count);
        if result.is_err() {
            self.close();
        }
        result
    }

    fn read_batch(&mut self, skip: usize, count: usize) -> Result<Batch> {
        let head = self.producer.head_state()?;

        let ahead = self
            .session
            .as_ref()
            .is_some_and(|session| session.returned() > skip);
        if ahead {
            self.reset(&head)?;
        }

        let Some(session) = self.ensure_session(&head)? else {
            return Ok(Batch {
                head,
                ..Batch::default()
            });
        };

        if session.returned() < skip {
            let behind = skip - session.returned();
            session.discard(behind)?;
        }

        let mut entries = Vec::with_capacity(count);
        while entries.len() < count {
            match session.next()? {
                Some(commit) => entries.push(Entry::new(commit)),
                None => break,
            }
        }
        session.assign_graph_cells(&mut entries);

        let batch = Batch {
            entries,
            has_more: session.has_more()?,
            head,
        };
        tracing::debug!(
            skip,
            fetched = batch.entries.len(),
            has_more = batch.has_more,
            "batch fetched"
        );

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::testing::{FakeProducer, commit, linear, oid};
    use crate::error::EngineError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    fn scanner(producer: &Arc<FakeProducer>) -> Scanner {
        Scanner::new(producer.clone(), 32)
    }

    fn hashes(batch: &Batch) -> Vec<String> {
        batch
            .entries
            .iter()
            .map(|entry| entry.oid().to_string())
            .collect()
    }

    #[test]
    fn has_more_does_not_consume() {
        let producer = FakeProducer::with_history(linear(2));
        let mut session =
            ScanSession::open(producer.as_ref(), oid("c2"), "main".to_string(), 32).unwrap();

        assert!(session.has_more().unwrap());
        assert!(session.has_more().unwrap());
        assert_eq!(session.returned(), 0);

        assert_eq!(session.next().unwrap().unwrap().oid(), &oid("c2"));
        assert_eq!(session.next().unwrap().unwrap().oid(), &oid("c1"));
        assert!(!session.has_more().unwrap());
        assert!(session.next().unwrap().is_none());
        assert_eq!(session.returned(), 2);
        assert!(session.is_done());
    }

    #[test]
    fn close_drops_the_buffered_commit() {
        let producer = FakeProducer::with_history(linear(2));
        let mut session =
            ScanSession::open(producer.as_ref(), oid("c2"), "main".to_string(), 32).unwrap();
        assert!(session.has_more().unwrap());

        session.close();

        assert!(session.is_done());
        assert!(!session.has_more().unwrap());
        assert!(session.next().unwrap().is_none());
        assert_eq!(session.returned(), 0);
    }

    #[test]
    fn discard_stops_at_end_of_stream() {
        let producer = FakeProducer::with_history(linear(3));
        let mut session =
            ScanSession::open(producer.as_ref(), oid("c3"), "main".to_string(), 32).unwrap();

        assert_eq!(session.discard(10).unwrap(), 3);
        assert!(!session.has_more().unwrap());
    }

    #[test]
    fn linear_batch_has_single_column_cells() {
        let producer = FakeProducer::with_history(linear(3));
        let mut scanner = scanner(&producer);

        let batch = scanner.fetch_batch(0, 3).unwrap();

        assert_eq!(hashes(&batch), vec!["c3", "c2", "c1"]);
        assert!(batch.entries.iter().all(|entry| entry.graph() == "*"));
        assert!(!batch.has_more);
        assert_eq!(batch.head.display_name(), "main");
    }

    #[test]
    fn merge_cells_follow_emission_order() {
        let producer = FakeProducer::with_history(vec![
            commit("m", &["p1", "p2"], "merge"),
            commit("p1", &["a"], "left"),
            commit("p2", &["a"], "right"),
            commit("a", &[], "root"),
        ]);
        let mut scanner = scanner(&producer);

        // split across batches; cells must not depend on batching
        let first = scanner.fetch_batch(0, 1).unwrap();
        let second = scanner.fetch_batch(1, 3).unwrap();

        let cells = first
            .entries
            .iter()
            .chain(&second.entries)
            .map(|entry| entry.graph().to_string())
            .collect::<Vec<_>>();
        assert_eq!(cells, vec!["*", "* |", "| *", "*"]);
        assert!(first.has_more);
        assert!(!second.has_more);
    }

    #[test]
    fn consecutive_batches_reuse_the_session() {
        let producer = FakeProducer::with_history(linear(5));
        let mut scanner = scanner(&producer);

        let first = scanner.fetch_batch(0, 2).unwrap();
        let second = scanner.fetch_batch(2, 2).unwrap();

        assert_eq!(hashes(&first), vec!["c5", "c4"]);
        assert_eq!(hashes(&second), vec!["c3", "c2"]);
        assert!(second.has_more);
        assert_eq!(producer.streams_opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn skip_behind_the_session_discards() {
        let producer = FakeProducer::with_history(linear(5));
        let mut scanner = scanner(&producer);

        let batch = scanner.fetch_batch(3, 10).unwrap();

        assert_eq!(hashes(&batch), vec!["c2", "c1"]);
    }

    #[test]
    fn skip_before_the_session_replaces_it() {
        let producer = FakeProducer::with_history(linear(4));
        let mut scanner = scanner(&producer);

        scanner.fetch_batch(0, 3).unwrap();
        let batch = scanner.fetch_batch(1, 1).unwrap();

        assert_eq!(hashes(&batch), vec!["c3"]);
        assert_eq!(producer.streams_opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn moved_head_replaces_the_session() {
        let producer = FakeProducer::with_history(linear(2));
        let mut scanner = scanner(&producer);
        scanner.fetch_batch(0, 1).unwrap();

        producer.set_history(linear(3));
        let batch = scanner.fetch_batch(0, 1).unwrap();

        assert_eq!(hashes(&batch), vec!["c3"]);
        assert_eq!(scanner.session().unwrap().start(), &oid("c3"));
    }

    #[test]
    fn unborn_head_yields_an_empty_batch() {
        let producer = FakeProducer::with_history(Vec::new());
        let mut scanner = scanner(&producer);

        let batch = scanner.fetch_batch(0, 10).unwrap();

        assert!(batch.entries.is_empty());
        assert!(!batch.has_more);
        assert_eq!(batch.head.display_name(), "HEAD");
        assert!(scanner.session().is_none());
    }

    #[test]
    fn stream_error_closes_the_session() {
        let producer = FakeProducer::with_history(linear(4));
        producer.fail_stream_at(2);
        let mut scanner = scanner(&producer);

        let error = scanner.fetch_batch(0, 4).unwrap_err();

        assert!(matches!(error, EngineError::Transport { .. }));
        assert!(scanner.session().is_none());
    }
}
