use crate::areas::controller::HistoryView;
use crate::areas::local_changes::Side;
use crate::areas::model::{Row, Selection};
use crate::artifacts::log::entry::Entry;
use colored::{ColoredString, Colorize};
use std::io::Write;

const HEAD_LABEL: &str = "HEAD";
const ATTACHED_HEAD_PREFIX: &str = "HEAD -> ";
const TAG_LABEL_PREFIX: &str = "tag: ";
const SELECTED_MARKER: &str = "> ";
const UNSELECTED_MARKER: &str = "  ";

/// Write every row of `view`, one per line
pub fn render_history(writer: &mut dyn Write, view: &HistoryView) -> anyhow::Result<()> {
    for row in &view.rows {
        match row {
            Row::Local(side) => render_local_row(writer, *side, &view.selection)?,
            Row::Commit(entry) => render_commit_row(writer, entry, view)?,
        }
    }

    if view.rows.is_empty() {
        writeln!(writer, "{}", "No commits".dimmed())?;
    }
    if view.has_more {
        writeln!(writer, "{}", "...".dimmed())?;
    }
    if let Some(status) = &view.status {
        writeln!(writer, "{}", status.red())?;
    }

    Ok(())
}

fn render_local_row(
    writer: &mut dyn Write,
    side: Side,
    selection: &Selection,
) -> anyhow::Result<()> {
    let marker = marker(*selection == Selection::Local(side));
    let title = match side {
        Side::Unstaged => side.title().red(),
        Side::Staged => side.title().green(),
    };

    writeln!(writer, "{marker}{title}")?;
    Ok(())
}

fn render_commit_row(
    writer: &mut dyn Write,
    entry: &Entry,
    view: &HistoryView,
) -> anyhow::Result<()> {
    let marker = marker(view.selection.oid() == Some(entry.oid()));

    writeln!(
        writer,
        "{marker}{} {}{}",
        entry.graph(),
        entry.summary(),
        decoration(view.labels.get(entry.oid()))
    )?;

    Ok(())
}

/// ` (HEAD -> main, tag: v1)`, empty for an unlabelled commit
pub fn decoration(labels: &[String]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let names = labels
        .iter()
        .map(|label| colored_label(label).to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!(" ({names})")
}

fn colored_label(label: &str) -> ColoredString {
    if label == HEAD_LABEL || label.starts_with(ATTACHED_HEAD_PREFIX) {
        label.cyan().bold()
    } else if label.starts_with(TAG_LABEL_PREFIX) {
        label.yellow().bold()
    } else {
        label.green().bold()
    }
}

fn marker(selected: bool) -> &'static str {
    if selected {
        SELECTED_MARKER
    } else {
        UNSELECTED_MARKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::producer::HeadState;
    use crate::areas::refs::BranchLabels;
    use crate::areas::testing::{commit, oid};
    use crate::artifacts::branch::branch_name::BranchName;
    use crate::artifacts::branch::refs::{Ref, RefKind};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn view(rows: Vec<Row>, labels: BranchLabels, selection: Selection) -> HistoryView {
        HistoryView {
            rows,
            labels,
            head_name: "main".to_string(),
            has_more: false,
            selection,
            status: None,
        }
    }

    fn entry(name: &str, parents: &[&str], message: &str, graph: &str) -> Arc<Entry> {
        let mut entry = Entry::new(commit(name, parents, message));
        entry.set_graph(graph.to_string());
        Arc::new(entry)
    }

    fn rendered(view: &HistoryView) -> String {
        colored::control::set_override(false);
        let mut output = Vec::new();
        render_history(&mut output, view).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn commit_rows_carry_graph_labels_and_summary() {
        let head = HeadState::new(Some(oid("c2")), Some(BranchName::try_parse("main").unwrap()));
        let refs = vec![
            Ref {
                kind: RefKind::LocalBranch,
                name: "main".to_string(),
                oid: oid("c2"),
            },
            Ref {
                kind: RefKind::Tag,
                name: "v1".to_string(),
                oid: oid("c1"),
            },
        ];
        let rows = vec![
            Row::Commit(entry("c2", &["c1"], "second\n\nbody", "*")),
            Row::Commit(entry("c1", &[], "first", "*")),
        ];

        let output = rendered(&view(
            rows,
            BranchLabels::build(&refs, &head),
            Selection::None,
        ));

        assert_eq!(
            output,
            "  * c2  2024-03-01  second (HEAD -> main, main)\n  * c1  2024-03-01  first (tag: v1)\n"
        );
    }

    #[test]
    fn pseudo_rows_come_first_and_follow_the_selection() {
        let rows = vec![
            Row::Local(Side::Unstaged),
            Row::Local(Side::Staged),
            Row::Commit(entry("c1", &[], "first", "*")),
        ];

        let output = rendered(&view(
            rows,
            BranchLabels::default(),
            Selection::Local(Side::Staged),
        ));

        assert_eq!(
            output,
            "  Unstaged changes\n> Staged changes\n  * c1  2024-03-01  first\n"
        );
    }

    #[test]
    fn empty_history_with_status_line() {
        let mut view = view(Vec::new(), BranchLabels::default(), Selection::None);
        view.status = Some("cannot resolve starting revision 'HEAD'".to_string());

        assert_eq!(
            rendered(&view),
            "No commits\ncannot resolve starting revision 'HEAD'\n"
        );
    }

    #[test]
    fn unlabelled_commits_have_no_decoration() {
        assert_eq!(decoration(&[]), "");
    }
}
