//! Porcelain status summary
//!
//! Each tracked change is a line starting with `1` (ordinary), `2` (rename or
//! copy) or `u` (unmerged), followed by the two-character `XY` state where `X`
//! is the index side and `Y` the worktree side, `.` meaning unchanged:
//!
//! ```text
//! 1 M. N... 100644 100644 100644 3f2a... 3f2a... src/lib.rs
//! 1 .M N... 100644 100644 100644 9c1d... 9c1d... README.md
//! ? notes.txt
//! ```
//!
//! Untracked (`?`) and ignored (`!`) lines never count as local changes.

use bitflags::bitflags;

const UNCHANGED: char = '.';

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LocalChangeFlags: u8 {
        const WORKTREE = 0b01;
        const STAGED = 0b10;
    }
}

impl LocalChangeFlags {
    pub fn has_worktree_change(&self) -> bool {
        self.contains(LocalChangeFlags::WORKTREE)
    }

    pub fn has_staged_change(&self) -> bool {
        self.contains(LocalChangeFlags::STAGED)
    }

    pub fn from_parts(has_worktree: bool, has_staged: bool) -> Self {
        let mut flags = LocalChangeFlags::empty();
        flags.set(LocalChangeFlags::WORKTREE, has_worktree);
        flags.set(LocalChangeFlags::STAGED, has_staged);
        flags
    }
}

/// Fold porcelain status lines into the two local-change flags
pub fn parse_status(output: &str) -> LocalChangeFlags {
    output
        .lines()
        .filter(|line| matches!(line.chars().next(), Some('1' | '2' | 'u')))
        .fold(LocalChangeFlags::empty(), |mut flags, line| {
            let mut state = line.chars().skip(2);
            if let Some(index_state) = state.next()
                && index_state != UNCHANGED
            {
                flags |= LocalChangeFlags::STAGED;
            }
            if let Some(worktree_state) = state.next()
                && worktree_state != UNCHANGED
            {
                flags |= LocalChangeFlags::WORKTREE;
            }
            flags
        })
}
