use crate::areas::diff_cache::DiffSnapshot;
use crate::areas::local_changes::Side;
use crate::artifacts::diff::display::PreparedDiff;
use crate::artifacts::log::entry::Entry;
use crate::commands::log::decoration;
use colored::{ColoredString, Colorize};
use std::io::Write;

const HEADER_PREFIXES: [&str; 8] = [
    "diff --git ",
    "index ",
    "--- ",
    "+++ ",
    "new file mode ",
    "deleted file mode ",
    "old mode ",
    "new mode ",
];

/// Commit header in medium format followed by the commit's diff
pub fn render_commit(
    writer: &mut dyn Write,
    entry: &Entry,
    labels: &[String],
    diff: &DiffSnapshot,
) -> anyhow::Result<()> {
    let commit = entry.commit();

    writeln!(
        writer,
        "{}{}",
        format!("commit {}", commit.oid()).yellow(),
        decoration(labels)
    )?;
    writeln!(writer, "Author: {}", commit.author().display_name())?;
    writeln!(writer, "Date:   {}", commit.author().readable_timestamp())?;
    writeln!(writer)?;
    for message_line in commit.message().lines() {
        writeln!(writer, "    {message_line}")?;
    }
    writeln!(writer)?;

    render_snapshot(writer, diff)
}

pub fn render_local(writer: &mut dyn Write, side: Side, diff: &DiffSnapshot) -> anyhow::Result<()> {
    writeln!(writer, "{}", side.title().bold())?;
    writeln!(writer)?;

    render_snapshot(writer, diff)
}

fn render_snapshot(writer: &mut dyn Write, diff: &DiffSnapshot) -> anyhow::Result<()> {
    if let Some(error) = &diff.error {
        writeln!(writer, "{}", error.red())?;
        return Ok(());
    }

    if diff.diff.is_empty() {
        writeln!(writer, "{}", "No changes".dimmed())?;
        return Ok(());
    }

    render_diff(writer, &diff.diff)
}

/// Prepared diff text, coloured line by line
pub fn render_diff(writer: &mut dyn Write, diff: &PreparedDiff) -> anyhow::Result<()> {
    for line in diff.text.lines() {
        writeln!(writer, "{}", colored_line(line))?;
    }

    Ok(())
}

fn colored_line(line: &str) -> ColoredString {
    if HEADER_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        line.bold()
    } else if line.starts_with("@@") {
        line.cyan()
    } else if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else {
        line.normal()
    }
}
