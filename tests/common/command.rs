use crate::common::file::{FileSpec, write_file};
use assert_cmd::Command;
use assert_fs::TempDir;
use derive_new::new;
use rstest::fixture;
use std::path::Path;

const COMMIT_DATE: &str = "2023-01-01T12:00:00+00:00";

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Empty repository whose unborn head points at `main`
#[fixture]
pub fn empty_repository_dir(repository_dir: TempDir) -> TempDir {
    run_git_command(repository_dir.path(), &["init", "-q"])
        .assert()
        .success();
    run_git_command(
        repository_dir.path(),
        &["symbolic-ref", "HEAD", "refs/heads/main"],
    )
    .assert()
    .success();

    repository_dir
}

/// Two commits on `main`: "Initial commit" then "Add nested file"
#[fixture]
pub fn init_repository_dir(empty_repository_dir: TempDir) -> TempDir {
    let dir = empty_repository_dir.path();

    write_file(FileSpec::new(dir.join("1.txt"), "one\n".to_string()));
    write_file(FileSpec::new(dir.join("a").join("2.txt"), "two\n".to_string()));
    run_git_command(dir, &["add", "."]).assert().success();
    git_commit(dir, "Initial commit").assert().success();

    write_file(FileSpec::new(
        dir.join("a").join("b").join("3.txt"),
        "three\n".to_string(),
    ));
    run_git_command(dir, &["add", "."]).assert().success();
    git_commit(dir, "Add nested file").assert().success();

    empty_repository_dir
}

pub fn run_bitview_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("bitview").expect("Failed to find bitview binary");
    cmd.envs(vec![("NO_COLOR", "1")]);
    cmd.env_remove("RUST_LOG");
    cmd.current_dir(dir);
    cmd.arg("--no-pager");
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// `git` isolated from the user's and the system's configuration
pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    cmd.envs(vec![
        ("GIT_CONFIG_NOSYSTEM", "1"),
        ("GIT_CONFIG_GLOBAL", "/dev/null"),
        ("GIT_AUTHOR_NAME", "fake_user"),
        ("GIT_AUTHOR_EMAIL", "fake_email@email.com"),
        ("GIT_AUTHOR_DATE", COMMIT_DATE),
        ("GIT_COMMITTER_NAME", "fake_user"),
        ("GIT_COMMITTER_EMAIL", "fake_email@email.com"),
        ("GIT_COMMITTER_DATE", COMMIT_DATE),
    ]);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

#[derive(Debug, Clone, new)]
pub struct RandomAuthor {
    pub name: String,
    pub email: String,
}

fn generate_random_author() -> RandomAuthor {
    use fake::Fake;
    use fake::faker::internet::en::FreeEmail;
    use fake::faker::name::en::Name;

    let name = Name().fake::<String>().replace(" ", "_");
    let email = FreeEmail().fake::<String>();
    RandomAuthor::new(name, email)
}

pub fn git_commit(dir: &Path, message: &str) -> Command {
    let author = generate_random_author();
    let mut cmd = run_git_command(dir, &["commit", "-q", "--no-gpg-sign", "-m", message]);
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", author.name.as_str()),
        ("GIT_AUTHOR_EMAIL", author.email.as_str()),
    ]);
    cmd
}

/// Write `name`, stage it and commit it with `message`
pub fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    write_file(FileSpec::new(dir.join(name), content.to_string()));
    run_git_command(dir, &["add", name]).assert().success();
    git_commit(dir, message).assert().success();
}

/// Resolve `rev` with `git rev-parse`
pub fn rev_parse(dir: &Path, rev: &str) -> Result<String, Box<dyn std::error::Error>> {
    git_output(dir, &["rev-parse", rev])
}

pub fn get_head_commit_sha(dir: &Path) -> Result<String, Box<dyn std::error::Error>> {
    rev_parse(dir, "HEAD")
}

/// Trimmed stdout of a successful `git` run
pub fn git_output(dir: &Path, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
    let output = run_git_command(dir, args).output()?;
    if !output.status.success() {
        return Err(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }

    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}
