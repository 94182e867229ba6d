//! `git` command line producer
//!
//! Every operation runs `git -C <root> ...` as a child process. The log stream
//! keeps its process alive and decodes stdout as it is consumed; everything
//! else runs to completion and parses the captured output.
//!
//! `git diff` and `git show-ref` exit with 1 and an empty stderr to say "there
//! are differences" or "there is nothing". That exit is treated as success.

pub mod stream;
pub mod version;

use crate::areas::git::stream::GitLogStream;
use crate::areas::producer::{HeadState, LogStream, Producer};
use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::branch::refs::{Ref, parse_ref_listing};
use crate::artifacts::log::record::LOG_FORMAT;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::porcelain::{LocalChangeFlags, parse_status};
use crate::error::{EngineError, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Keeps `git status` from refreshing the index, which would wake the watcher
const OPTIONAL_LOCKS_ENV: (&str, &str) = ("GIT_OPTIONAL_LOCKS", "0");

#[derive(Debug)]
pub struct GitProducer {
    git: PathBuf,
    root: RwLock<Option<PathBuf>>,
}

impl GitProducer {
    pub fn new(git: impl Into<PathBuf>) -> Self {
        GitProducer {
            git: git.into(),
            root: RwLock::new(None),
        }
    }

    fn root(&self) -> Result<PathBuf> {
        self.root.read().clone().ok_or(EngineError::NotInitialized)
    }

    fn command(&self, root: &Path, args: &[&str]) -> Command {
        let mut command = Command::new(&self.git);
        command
            .arg("-C")
            .arg(root)
            .args(args)
            .env(OPTIONAL_LOCKS_ENV.0, OPTIONAL_LOCKS_ENV.1)
            .stdin(Stdio::null());
        command
    }

    fn output(&self, args: &[&str]) -> Result<Output> {
        let root = self.root()?;
        tracing::trace!(?args, "running git");
        Ok(self.command(&root, args).output()?)
    }

    /// Run to completion, failing on any non-zero exit
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(transport_error(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run to completion, accepting the quiet exit 1
    fn run_tolerating_differences(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() && !is_difference_exit(&output) {
            return Err(transport_error(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `None` when a `-q` query found nothing
    fn query(&self, args: &[&str]) -> Result<Option<String>> {
        let output = self.output(args)?;
        if output.status.success() {
            return Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()));
        }
        if is_difference_exit(&output) {
            return Ok(None);
        }
        Err(transport_error(args, &output))
    }
}

impl Producer for GitProducer {
    fn repo_path(&self) -> Option<PathBuf> {
        self.root.read().clone()
    }

    fn open(&self, path: &Path) -> Result<PathBuf> {
        version::init(&self.git)?;

        let args = ["rev-parse", "--show-toplevel"];
        let output = self.command(path, &args).output()?;
        if !output.status.success() {
            return Err(transport_error(&args, &output));
        }

        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        tracing::info!(root = %root.display(), "opened repository");
        *self.root.write() = Some(root.clone());

        Ok(root)
    }

    fn start_log_stream(&self, from: &ObjectId) -> Result<Box<dyn LogStream>> {
        let root = self.root()?;

        let target = format!("{from}^{{commit}}");
        if self.query(&["rev-parse", "--verify", "-q", &target])?.is_none() {
            return Err(EngineError::InvalidStart(from.to_string()));
        }

        let format = format!("--format={LOG_FORMAT}");
        let args = ["log", "-z", "--topo-order", format.as_str(), from.as_ref()];
        let child = self
            .command(&root, &args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        tracing::debug!(%from, "log stream started");
        Ok(Box::new(GitLogStream::new(describe(&args), child)?))
    }

    fn head_state(&self) -> Result<HeadState> {
        let Some(oid) = self.query(&["rev-parse", "--verify", "-q", "HEAD"])? else {
            // unborn
            return Ok(HeadState::default());
        };
        let oid = ObjectId::try_parse(oid)?;

        let branch = self
            .query(&["symbolic-ref", "-q", "HEAD"])?
            .map(|sym_ref| BranchName::try_parse_sym_ref_name(&SymRefName::new(sym_ref)))
            .transpose()?;

        Ok(HeadState::new(Some(oid), branch))
    }

    fn list_refs(&self) -> Result<Vec<Ref>> {
        let listing = self.run_tolerating_differences(&["show-ref", "--dereference"])?;
        parse_ref_listing(&listing)
    }

    fn commit_diff_text(&self, oid: &ObjectId, parent: Option<&ObjectId>) -> Result<String> {
        match parent {
            Some(parent) => self.run_tolerating_differences(&[
                "diff",
                "--no-color",
                "--no-ext-diff",
                "-M",
                parent.as_ref(),
                oid.as_ref(),
            ]),
            None => self.run(&[
                "diff-tree",
                "-p",
                "--root",
                "--no-commit-id",
                "--no-color",
                "--no-ext-diff",
                "-M",
                oid.as_ref(),
            ]),
        }
    }

    fn worktree_diff_text(&self, staged: bool) -> Result<String> {
        let mut args = vec!["diff", "--no-color", "--no-ext-diff"];
        if staged {
            args.push("--cached");
        }
        self.run_tolerating_differences(&args)
    }

    fn local_changes_status(&self) -> Result<LocalChangeFlags> {
        let status = self.run(&["status", "--porcelain=v2", "--untracked-files=no"])?;
        Ok(parse_status(&status))
    }

    fn switch_branch(&self, name: &BranchName) -> Result<()> {
        let version = match version::get() {
            Some(version) => version,
            None => version::init(&self.git)?,
        };
        let verb = if version.supports_switch() {
            "switch"
        } else {
            "checkout"
        };

        self.run(&[verb, "--quiet", name.as_ref()])?;
        tracing::info!(branch = %name, "switched branch");

        Ok(())
    }
}

fn is_difference_exit(output: &Output) -> bool {
    output.status.code() == Some(1) && output.stderr.iter().all(u8::is_ascii_whitespace)
}

fn describe(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

fn transport_error(args: &[&str], output: &Output) -> EngineError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let stderr = if stderr.is_empty() {
        output.status.to_string()
    } else {
        stderr.to_string()
    };
    EngineError::transport(describe(args), stderr)
}
