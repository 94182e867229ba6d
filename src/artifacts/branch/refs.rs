//! Reference listings
//!
//! The producer lists refs one per line as `<hash> <full ref name>`. Annotated
//! tags are followed by a peeled line naming the commit they point at:
//!
//! ```text
//! 1f3c... refs/heads/main
//! 9a0b... refs/remotes/origin/HEAD
//! 1f3c... refs/remotes/origin/main
//! 77de... refs/tags/v1.0
//! 1f3c... refs/tags/v1.0^{}
//! ```
//!
//! The peeled hash replaces the tag-object hash, and remote `HEAD` aliases are
//! dropped.

use crate::artifacts::branch::{PEELED_SUFFIX, REF_NAMESPACES};
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::{EngineError, Result};
use derive_new::new;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    LocalBranch,
    RemoteBranch,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Ref {
    pub kind: RefKind,
    /// Name without the `refs/<namespace>/` prefix, e.g. `origin/main`
    pub name: String,
    pub oid: ObjectId,
}

impl Ref {
    /// Label shown next to the commit
    pub fn label(&self) -> String {
        match self.kind {
            RefKind::Tag => format!("tag: {}", self.name),
            RefKind::LocalBranch | RefKind::RemoteBranch => self.name.clone(),
        }
    }
}

/// Split a full ref name into its kind and short name
pub fn classify(full_name: &str) -> Option<(RefKind, &str)> {
    REF_NAMESPACES.entries().find_map(|(prefix, kind)| {
        full_name
            .strip_prefix(prefix)
            .filter(|short_name| !short_name.is_empty())
            .map(|short_name| (*kind, short_name))
    })
}

/// Parse a `<hash> <refname>` listing into refs, in listing order
pub fn parse_ref_listing(listing: &str) -> Result<Vec<Ref>> {
    let mut refs = Vec::<Ref>::new();

    for line in listing.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let (hash, full_name) = line
            .split_once(' ')
            .ok_or_else(|| EngineError::ParseFailure(format!("malformed ref line: {line:?}")))?;
        let oid = ObjectId::try_parse(hash)?;
        let full_name = full_name.trim();

        if let Some(tag_name) = full_name.strip_suffix(PEELED_SUFFIX) {
            if let Some((RefKind::Tag, short_name)) = classify(tag_name) {
                match refs
                    .iter_mut()
                    .rev()
                    .find(|r| r.kind == RefKind::Tag && r.name == short_name)
                {
                    Some(tag) => tag.oid = oid,
                    None => refs.push(Ref::new(RefKind::Tag, short_name.to_string(), oid)),
                }
            }
            continue;
        }

        let Some((kind, short_name)) = classify(full_name) else {
            continue;
        };
        if kind == RefKind::RemoteBranch && short_name.ends_with("/HEAD") {
            continue;
        }

        refs.push(Ref::new(kind, short_name.to_string(), oid));
    }

    Ok(refs)
}
