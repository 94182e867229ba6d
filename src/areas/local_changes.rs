//! Local-change pseudo-rows
//!
//! Two optional rows sit on top of the history list: unstaged (worktree)
//! changes and staged (index) changes. Each has its own diff slot.
//!
//! [`local_change_plan`] is the pure transition: given whether a repository is
//! ready, whether this refresh is a prefetch (full reload) and the current
//! status summary, it decides which rows show, which slots reset and which
//! diffs load. [`LocalChanges`] applies plans to the live state.

use crate::areas::diff_cache::{DiffSlot, DiffSnapshot};
use crate::artifacts::status::porcelain::LocalChangeFlags;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Unstaged,
    Staged,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Unstaged, Side::Staged];

    pub fn is_staged(self) -> bool {
        self == Side::Staged
    }

    pub fn title(self) -> &'static str {
        match self {
            Side::Unstaged => "Unstaged changes",
            Side::Staged => "Staged changes",
        }
    }
}

/// Row visibility for both sides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub unstaged: bool,
    pub staged: bool,
}

impl Visibility {
    pub fn get(&self, side: Side) -> bool {
        match side {
            Side::Unstaged => self.unstaged,
            Side::Staged => self.staged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalChangePlan {
    pub show: Visibility,
    pub reset: Visibility,
    pub load: Visibility,
}

pub fn local_change_plan(
    repo_ready: bool,
    prefetch: bool,
    flags: LocalChangeFlags,
    previous: Visibility,
) -> LocalChangePlan {
    if !repo_ready {
        return LocalChangePlan {
            show: Visibility::default(),
            reset: Visibility {
                unstaged: true,
                staged: true,
            },
            load: Visibility::default(),
        };
    }

    let show = Visibility {
        unstaged: flags.has_worktree_change(),
        staged: flags.has_staged_change(),
    };
    let reset = Visibility {
        unstaged: !show.unstaged,
        staged: !show.staged,
    };
    let load = if prefetch {
        show
    } else {
        Visibility {
            unstaged: show.unstaged && !previous.unstaged,
            staged: show.staged && !previous.staged,
        }
    };

    LocalChangePlan { show, reset, load }
}

#[derive(Debug, Default)]
pub struct LocalChanges {
    visible: Visibility,
    unstaged: Arc<DiffSlot>,
    staged: Arc<DiffSlot>,
}

impl LocalChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visibility(&self) -> Visibility {
        self.visible
    }

    pub fn is_visible(&self, side: Side) -> bool {
        self.visible.get(side)
    }

    /// Visible sides in display order
    pub fn visible_sides(&self) -> Vec<Side> {
        Side::ALL
            .into_iter()
            .filter(|side| self.is_visible(*side))
            .collect()
    }

    pub fn slot(&self, side: Side) -> &Arc<DiffSlot> {
        match side {
            Side::Unstaged => &self.unstaged,
            Side::Staged => &self.staged,
        }
    }

    pub fn snapshot(&self, side: Side) -> DiffSnapshot {
        self.slot(side).snapshot()
    }

    /// Plan against the current visibility and apply it
    ///
    /// # Returns
    ///
    /// The sides whose diff should now be loaded
    pub fn refresh(&mut self, repo_ready: bool, prefetch: bool, flags: LocalChangeFlags) -> Vec<Side> {
        let plan = local_change_plan(repo_ready, prefetch, flags, self.visible);
        self.apply(&plan)
    }

    pub fn apply(&mut self, plan: &LocalChangePlan) -> Vec<Side> {
        self.visible = plan.show;
        for side in Side::ALL {
            if plan.reset.get(side) {
                self.slot(side).reset();
            }
        }

        let load = Side::ALL
            .into_iter()
            .filter(|side| plan.load.get(*side))
            .collect::<Vec<_>>();
        if plan.show != Visibility::default() || !load.is_empty() {
            tracing::debug!(show = ?plan.show, ?load, "local changes refreshed");
        }
        load
    }

    pub fn hide_all(&mut self) {
        self.apply(&local_change_plan(
            false,
            false,
            LocalChangeFlags::empty(),
            self.visible,
        ));
    }
}
