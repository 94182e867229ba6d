//! Process-wide `git` version
//!
//! The version is probed once, by [`init`], the first time a repository is
//! opened. Later callers read it with [`get`].

use crate::error::{EngineError, Result};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

static VERSION: OnceLock<GitVersion> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        GitVersion {
            major,
            minor,
            patch,
        }
    }

    /// Parse `git version 2.39.3 (Apple Git-145)` style output
    pub fn parse(output: &str) -> Option<Self> {
        let number = output.trim().strip_prefix("git version ")?;
        let number = number.split_whitespace().next()?;
        let mut parts = number
            .split('.')
            .map(|part| part.parse::<u32>().ok());

        let major = parts.next()??;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(GitVersion::new(major, minor, patch))
    }

    /// `git switch` appeared in 2.23
    pub fn supports_switch(&self) -> bool {
        *self >= GitVersion::new(2, 23, 0)
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Probe `git --version` unless a version is already cached
pub fn init(git: &Path) -> Result<GitVersion> {
    if let Some(version) = VERSION.get() {
        return Ok(*version);
    }

    let output = Command::new(git).arg("--version").output()?;
    if !output.status.success() {
        return Err(EngineError::transport(
            "git --version",
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = GitVersion::parse(&stdout)
        .ok_or_else(|| EngineError::ParseFailure(format!("unrecognized git version: {stdout}")))?;
    tracing::debug!(%version, "probed git version");

    Ok(*VERSION.get_or_init(|| version))
}

pub fn get() -> Option<GitVersion> {
    VERSION.get().copied()
}
