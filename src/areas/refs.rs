//! Commit labels
//!
//! [`BranchLabels`] maps commit hashes to the labels drawn next to them. It is
//! derived from a ref snapshot and the head state and replaced wholesale on
//! every reload.
//!
//! ## Label order
//!
//! - The head commit's first label is `HEAD -> <branch>`, or `HEAD` when
//!   detached
//! - The remaining labels follow the ref listing order
//! - Tags display as `tag: <name>`, branches by their short name

use crate::areas::producer::HeadState;
use crate::artifacts::branch::refs::{Ref, RefKind};
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::HashMap;

const REMOTE_HEAD_SUFFIX: &str = "/HEAD";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchLabels {
    labels: HashMap<ObjectId, Vec<String>>,
}

impl BranchLabels {
    pub fn build(refs: &[Ref], head: &HeadState) -> Self {
        let mut labels = HashMap::<ObjectId, Vec<String>>::new();

        for reference in refs {
            if reference.kind == RefKind::RemoteBranch
                && reference.name.ends_with(REMOTE_HEAD_SUFFIX)
            {
                continue;
            }
            labels
                .entry(reference.oid.clone())
                .or_default()
                .push(reference.label());
        }

        if let Some(oid) = &head.oid {
            labels.entry(oid.clone()).or_default().insert(0, head.label());
        }

        BranchLabels { labels }
    }

    /// Labels of `oid`, head label first
    pub fn get(&self, oid: &ObjectId) -> &[String] {
        self.labels.get(oid).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
