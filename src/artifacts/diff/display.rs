//! Diff display preparation
//!
//! Raw unified diffs are normalized before they reach the view:
//!
//! - every `diff --git` header opens a file section, recorded with its 1-based
//!   line number in the prepared text
//! - consecutive sections are separated by one blank line
//! - section paths are unquoted (C-style escapes, octal bytes) and lose the
//!   `a/` / `b/` decorations
//!
//! Apart from the separators the text is kept byte for byte, carriage returns
//! included. Preparing an already prepared diff returns it unchanged.

const FILE_HEADER_PREFIX: &str = "diff --git ";
const NULL_PATH: &str = "/dev/null";
const PATH_PREFIXES: [&str; 2] = ["a/", "b/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection {
    pub path: String,
    /// 1-based line of the section header
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedDiff {
    pub text: String,
    pub sections: Vec<FileSection>,
}

impl PreparedDiff {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Section containing the given 1-based line
    pub fn section_at(&self, line: usize) -> Option<&FileSection> {
        self.sections
            .iter()
            .take_while(|section| section.line <= line)
            .last()
    }
}

pub fn prepare_diff_display(raw: &str) -> PreparedDiff {
    let mut lines = Vec::<&str>::new();
    let mut sections = Vec::<FileSection>::new();

    for line in raw.split('\n') {
        let content = line.strip_suffix('\r').unwrap_or(line);
        if let Some(header) = content.strip_prefix(FILE_HEADER_PREFIX) {
            if !sections.is_empty() && lines.last().is_some_and(|last| !last.is_empty()) {
                lines.push("");
            }
            sections.push(FileSection {
                path: header_path(header),
                line: lines.len() + 1,
            });
        }
        lines.push(line);
    }

    PreparedDiff {
        text: lines.join("\n"),
        sections,
    }
}

/// Display path of a `diff --git <old> <new>` header
fn header_path(header: &str) -> String {
    let (old, new) = split_header_paths(header);

    let path = if new == NULL_PATH { old } else { new };
    strip_path_prefix(&path).to_string()
}

fn split_header_paths(header: &str) -> (String, String) {
    if header.starts_with('"') {
        let (old, rest) = unquote(header);
        let rest = rest.trim_start();
        let new = if rest.starts_with('"') {
            unquote(rest).0
        } else {
            rest.to_string()
        };
        return (old, new);
    }

    if let Some(quote) = header.find(" \"") {
        return (header[..quote].to_string(), unquote(&header[quote + 1..]).0);
    }

    // unquoted paths may contain spaces; `a/X b/X` splits in the middle
    if header.len() % 2 == 1 {
        let middle = header.len() / 2;
        if header.is_char_boundary(middle)
            && header.as_bytes()[middle] == b' '
            && strip_path_prefix(&header[..middle]) == strip_path_prefix(&header[middle + 1..])
        {
            return (header[..middle].to_string(), header[middle + 1..].to_string());
        }
    }

    match header.find(" b/") {
        Some(split) => (header[..split].to_string(), header[split + 1..].to_string()),
        None => (header.to_string(), header.to_string()),
    }
}

fn strip_path_prefix(path: &str) -> &str {
    PATH_PREFIXES
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
        .unwrap_or(path)
}

/// Decode a leading double-quoted path, returning it and the remaining input
fn unquote(input: &str) -> (String, &str) {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 1;

    while index < bytes.len() {
        match bytes[index] {
            b'"' => {
                return (
                    String::from_utf8_lossy(&decoded).into_owned(),
                    &input[index + 1..],
                );
            }
            b'\\' if index + 1 < bytes.len() => {
                let escaped = bytes[index + 1];
                index += 2;
                match escaped {
                    b'n' => decoded.push(b'\n'),
                    b't' => decoded.push(b'\t'),
                    b'r' => decoded.push(b'\r'),
                    b'a' => decoded.push(0x07),
                    b'b' => decoded.push(0x08),
                    b'f' => decoded.push(0x0c),
                    b'v' => decoded.push(0x0b),
                    b'0'..=b'7' => {
                        let mut value = u32::from(escaped - b'0');
                        let mut digits = 1;
                        while digits < 3 && index < bytes.len() && (b'0'..=b'7').contains(&bytes[index])
                        {
                            value = value * 8 + u32::from(bytes[index] - b'0');
                            index += 1;
                            digits += 1;
                        }
                        decoded.push((value & 0xff) as u8);
                    }
                    other => decoded.push(other),
                }
            }
            byte => {
                decoded.push(byte);
                index += 1;
            }
        }
    }

    // unterminated quote: keep everything after the opening quote
    (String::from_utf8_lossy(&decoded).into_owned(), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_FILES: &str = "diff --git a/src/lib.rs b/src/lib.rs\n\
index 1111111..2222222 100644\n\
--- a/src/lib.rs\n\
+++ b/src/lib.rs\n\
@@ -1 +1 @@\n\
-old\n\
+new\n\
diff --git a/README.md b/README.md\n\
new file mode 100644\n\
--- /dev/null\n\
+++ b/README.md\n\
@@ -0,0 +1 @@\n\
+hello\n";

    #[test]
    fn separates_sections_and_records_their_lines() {
        let prepared = prepare_diff_display(TWO_FILES);

        assert_eq!(
            prepared.sections,
            vec![
                FileSection {
                    path: "src/lib.rs".to_string(),
                    line: 1
                },
                FileSection {
                    path: "README.md".to_string(),
                    line: 9
                },
            ]
        );
        let lines = prepared.text.lines().collect::<Vec<_>>();
        assert_eq!(lines[7], "");
        assert_eq!(lines[8], "diff --git a/README.md b/README.md");
        assert!(prepared.text.ends_with("+hello\n"));
    }

    #[test]
    fn preparation_is_idempotent() {
        let once = prepare_diff_display(TWO_FILES);
        let twice = prepare_diff_display(&once.text);

        assert_eq!(once, twice);
    }

    #[test]
    fn carriage_returns_are_kept() {
        let raw = "diff --git a/win.txt b/win.txt\r\n--- a/win.txt\r\n+++ b/win.txt\r\n@@ -1 +1 @@\r\n-old\r\n+new\r\n";

        let prepared = prepare_diff_display(raw);

        assert_eq!(prepared.text, raw);
        assert_eq!(prepared.sections[0].path, "win.txt");
        assert_eq!(prepare_diff_display(&prepared.text), prepared);
    }

    #[test]
    fn quoted_paths_are_decoded() {
        let prepared = prepare_diff_display(
            "diff --git \"a/caf\\303\\251 menu.txt\" \"b/caf\\303\\251 menu.txt\"\n",
        );
        assert_eq!(prepared.sections[0].path, "café menu.txt");

        let prepared = prepare_diff_display("diff --git a/x \"b/with \\\"quote\\\"\"\n");
        assert_eq!(prepared.sections[0].path, "with \"quote\"");
    }

    #[test]
    fn unquoted_paths_with_spaces_split_in_the_middle() {
        let prepared = prepare_diff_display("diff --git a/my file.txt b/my file.txt\n");
        assert_eq!(prepared.sections[0].path, "my file.txt");
    }

    #[test]
    fn renames_use_the_new_path() {
        let prepared = prepare_diff_display("diff --git a/old.rs b/new.rs\n");
        assert_eq!(prepared.sections[0].path, "new.rs");
    }

    #[test]
    fn section_lookup_by_line() {
        let prepared = prepare_diff_display(TWO_FILES);

        assert_eq!(prepared.section_at(3).unwrap().path, "src/lib.rs");
        assert_eq!(prepared.section_at(12).unwrap().path, "README.md");
    }

    #[test]
    fn empty_diff_has_no_sections() {
        let prepared = prepare_diff_display("");
        assert!(prepared.is_empty());
        assert!(prepared.sections.is_empty());
    }
}
