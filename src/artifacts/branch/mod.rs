//! Branch names and reference listings
//!
//! - `branch_name`: validated branch names and symbolic ref names
//! - `refs`: refs as listed by the producer (branches, remotes, tags)

use crate::artifacts::branch::refs::RefKind;

pub mod branch_name;
pub mod refs;

pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Suffix the producer appends to the peeled line of an annotated tag
pub const PEELED_SUFFIX: &str = "^{}";

pub const REF_NAMESPACES: phf::Map<&'static str, RefKind> = phf::phf_map! {
    "refs/heads/" => RefKind::LocalBranch,
    "refs/remotes/" => RefKind::RemoteBranch,
    "refs/tags/" => RefKind::Tag,
};
