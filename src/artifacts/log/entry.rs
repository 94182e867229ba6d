use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;

/// Visible width of a summary line
pub const SUMMARY_WIDTH: usize = 80;

const ELLIPSIS: char = '…';

/// A commit decorated for display in the history list
///
/// The summary and search index depend only on the commit; the graph cell is
/// filled in by the scan session that emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    commit: Commit,
    summary: String,
    search_index: String,
    graph: String,
}

impl Entry {
    pub fn new(commit: Commit) -> Self {
        let summary = summarize(&commit);
        let search_index = search_index(&commit);

        Entry {
            commit,
            summary,
            search_index,
            graph: String::new(),
        }
    }

    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    pub fn oid(&self) -> &ObjectId {
        self.commit.oid()
    }

    /// "shorthash  date  subject", at most [`SUMMARY_WIDTH`] characters
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn search_index(&self) -> &str {
        &self.search_index
    }

    pub fn graph(&self) -> &str {
        &self.graph
    }

    pub fn set_graph(&mut self, graph: String) {
        self.graph = graph;
    }

    /// `needle` must already be lowercase
    pub fn matches(&self, needle: &str) -> bool {
        self.search_index.contains(needle)
    }
}

fn summarize(commit: &Commit) -> String {
    let line = format!(
        "{}  {}  {}",
        commit.oid().to_short_oid(),
        commit.author().short_date(),
        commit.short_message()
    );
    truncate(&line, SUMMARY_WIDTH)
}

fn truncate(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }

    let mut truncated = line.chars().take(width - 1).collect::<String>();
    truncated.push(ELLIPSIS);
    truncated
}

fn search_index(commit: &Commit) -> String {
    [
        commit.oid().as_ref(),
        commit.author().name(),
        commit.author().email(),
        commit.message(),
    ]
    .join("\n")
    .to_lowercase()
}
