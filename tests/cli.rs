use assert_fs::TempDir;
use common::command::{
    empty_repository_dir, init_repository_dir, repository_dir, rev_parse, run_bitview_command,
    run_git_command,
};
use common::file::{FileSpec, write_file};
use predicates::prelude::{PredicateBooleanExt, predicate};
use rstest::rstest;

mod common;

#[rstest]
fn history_is_listed_newest_first_with_labels(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let head = rev_parse(dir, "HEAD")?;
    let first = rev_parse(dir, "HEAD~1")?;
    let expected = format!(
        "  * {}  2023-01-01  Add nested file (HEAD -> main, main)\n  * {}  2023-01-01  Initial commit\n",
        &head[..7],
        &first[..7]
    );

    run_bitview_command(dir, &[])
        .assert()
        .success()
        .stdout(expected);

    Ok(())
}

#[rstest]
fn repository_path_can_be_given_explicitly(
    init_repository_dir: TempDir,
    repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let nested = init_repository_dir.path().join("a").join("b");

    run_bitview_command(repository_dir.path(), &[nested.to_str().ok_or("non-utf8 path")?])
        .assert()
        .success()
        .stdout(predicate::str::contains("Add nested file (HEAD -> main, main)"));

    Ok(())
}

#[rstest]
fn tags_and_other_branches_decorate_their_commits(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_git_command(dir, &["branch", "feature", "HEAD~1"])
        .assert()
        .success();
    run_git_command(dir, &["tag", "-a", "v1", "-m", "First release", "HEAD~1"])
        .assert()
        .success();

    run_bitview_command(dir, &[])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Initial commit (feature, tag: v1)",
        ));
}

#[rstest]
fn opening_outside_a_repository_fails(repository_dir: TempDir) {
    run_bitview_command(repository_dir.path(), &[])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open repository"));
}

#[rstest]
fn empty_repository_lists_no_commits(empty_repository_dir: TempDir) {
    run_bitview_command(empty_repository_dir.path(), &[])
        .assert()
        .success()
        .stdout("No commits\n");
}

#[rstest]
fn limit_loads_one_batch(init_repository_dir: TempDir) {
    run_bitview_command(init_repository_dir.path(), &["--limit", "1"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Add nested file")
                .and(predicate::str::contains("Initial commit").not())
                .and(predicate::str::ends_with("...\n")),
        );
}

#[rstest]
fn filter_keeps_matching_commits(init_repository_dir: TempDir) {
    run_bitview_command(init_repository_dir.path(), &["--filter", "NESTED"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Add nested file")
                .and(predicate::str::contains("Initial commit").not()),
        );
}

#[rstest]
fn pending_changes_appear_above_the_history(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "staged\n".to_string()));
    run_git_command(dir, &["add", "1.txt"]).assert().success();
    write_file(FileSpec::new(dir.join("a").join("2.txt"), "unstaged\n".to_string()));

    run_bitview_command(dir, &[])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "  Unstaged changes\n  Staged changes\n  * ",
        ));
}

#[rstest]
fn show_staged_prints_the_index_diff(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "staged\n".to_string()));
    run_git_command(dir, &["add", "1.txt"]).assert().success();

    run_bitview_command(dir, &["--show", "staged"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("> Staged changes\n")
                .and(predicate::str::contains(
                    "Staged changes\n\ndiff --git a/1.txt b/1.txt\n",
                ))
                .and(predicate::str::contains("\n-one\n+staged\n")),
        );
}

#[rstest]
fn show_unstaged_on_a_clean_tree_reports_no_changes(init_repository_dir: TempDir) {
    run_bitview_command(init_repository_dir.path(), &["--show", "unstaged"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("Unstaged changes\n\nNo changes\n"));
}

#[rstest]
fn show_commit_prints_header_and_diff(
    init_repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = init_repository_dir.path();
    let first = rev_parse(dir, "HEAD~1")?;

    run_bitview_command(dir, &["--show", &first[..10]])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(format!("> * {}", &first[..7]))
                .and(predicate::str::contains(format!("commit {first}\n")))
                .and(predicate::str::contains("\n    Initial commit\n"))
                .and(predicate::str::contains(
                    "diff --git a/1.txt b/1.txt\nnew file mode 100644\n",
                ))
                .and(predicate::str::contains("3.txt").not()),
        );

    Ok(())
}

#[rstest]
fn show_unknown_commit_fails(init_repository_dir: TempDir) {
    run_bitview_command(init_repository_dir.path(), &["--show", "ffffffffff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown revision 'ffffffffff'"));
}

#[rstest]
fn switch_checks_out_the_branch_before_listing(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    run_git_command(dir, &["branch", "feature", "HEAD~1"])
        .assert()
        .success();

    run_bitview_command(dir, &["--switch", "feature"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Initial commit (HEAD -> feature, feature)")
                .and(predicate::str::contains("Add nested file").not()),
        );
    run_git_command(dir, &["symbolic-ref", "--short", "HEAD"])
        .assert()
        .success()
        .stdout("feature\n");
}

#[rstest]
fn switch_to_an_invalid_branch_name_fails(init_repository_dir: TempDir) {
    run_bitview_command(init_repository_dir.path(), &["--switch", "bad..name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to switch branch"));
}
