//! Incremental ancestry graph
//!
//! The builder keeps one column per line of history that is still "open",
//! each remembering the commit it expects to see next. Commits must arrive in
//! topological order (children before parents), which is what `git log
//! --topo-order` emits.
//!
//! ## Algorithm
//!
//! For a commit `C` with parents `P1..Pn`:
//!
//! 1. `C` takes the first column expecting it, or a new column at position 0
//! 2. The cell is one glyph per column: `*` for `C`, `|` for the others
//! 3. The column advances to `P1` (or closes for a root commit, or when another
//!    column already expects `P1`); every further parent `Pk` moves to
//!    position `min(i + k - 1, len)`

use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;

pub const COMMIT_GLYPH: &str = "*";
pub const LINE_GLYPH: &str = "|";

#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    columns: Vec<ObjectId>,
    max_columns: Option<usize>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder whose active columns never exceed `max_columns`
    pub fn with_max_columns(max_columns: usize) -> Self {
        GraphBuilder {
            columns: Vec::new(),
            max_columns: Some(max_columns.max(1)),
        }
    }

    pub fn columns(&self) -> &[ObjectId] {
        &self.columns
    }

    /// Place `commit` and return its graph cell
    pub fn push(&mut self, commit: &Commit) -> String {
        let column = self.locate(commit.oid());
        let cell = self.cell(column);
        self.advance(column, commit.parents());
        cell
    }

    fn locate(&mut self, oid: &ObjectId) -> usize {
        match self.columns.iter().position(|expected| expected == oid) {
            Some(column) => column,
            None => {
                self.columns.insert(0, oid.clone());
                0
            }
        }
    }

    fn cell(&self, column: usize) -> String {
        (0..self.columns.len())
            .map(|index| {
                if index == column {
                    COMMIT_GLYPH
                } else {
                    LINE_GLYPH
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn advance(&mut self, column: usize, parents: &[ObjectId]) {
        let Some((mainline, others)) = parents.split_first() else {
            self.columns.remove(column);
            return;
        };

        let already_expected = self
            .columns
            .iter()
            .enumerate()
            .any(|(index, expected)| index != column && expected == mainline);
        if already_expected {
            // the mainline joins a line that is already open
            self.columns.remove(column);
        } else {
            self.columns[column] = mainline.clone();
        }

        for (offset, parent) in others.iter().enumerate() {
            if parent == mainline {
                continue;
            }
            self.columns.retain(|expected| expected != parent);
            let k = offset + 2;
            let position = (column + k - 1).min(self.columns.len());
            self.columns.insert(position, parent.clone());
        }

        if let Some(max_columns) = self.max_columns {
            self.columns.truncate(max_columns);
        }
    }
}
