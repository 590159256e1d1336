//! Line-oriented source text editing helpers.
//!
//! Strategies locate syntax nodes through `proc-macro2` span locations and
//! splice whole lines of the original text, so transformed units keep the
//! author's formatting outside the edited region. All line numbers here are
//! 1-based and ranges are inclusive, matching span conventions.

use syn::spanned::Spanned;

/// First and last source line covered by a syntax node.
pub fn node_lines<T: Spanned>(node: &T) -> (usize, usize) {
    let span = node.span();
    (span.start().line, span.end().line)
}

/// Extract lines `start..=end` of `source`, preserving line endings.
pub fn extract_lines(source: &str, start: usize, end: usize) -> String {
    source
        .lines()
        .skip(start.saturating_sub(1))
        .take(end.saturating_sub(start) + 1)
        .map(|l| format!("{l}\n"))
        .collect()
}

/// Replace lines `start..=end` with `replacement` (which may span any number
/// of lines, or be empty to delete the range).
pub fn replace_lines(source: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(source.len() + replacement.len());
    for (idx, line) in source.lines().enumerate() {
        let lineno = idx + 1;
        if lineno < start || lineno > end {
            out.push_str(line);
            out.push('\n');
        } else if lineno == start {
            out.push_str(replacement);
            if !replacement.is_empty() && !replacement.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

/// Append `text` after line `line` (0 inserts at the top).
pub fn insert_after_line(source: &str, line: usize, text: &str) -> String {
    let mut out = String::with_capacity(source.len() + text.len());
    if line == 0 {
        out.push_str(text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
    }
    for (idx, l) in source.lines().enumerate() {
        out.push_str(l);
        out.push('\n');
        if idx + 1 == line {
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

/// Leading whitespace of the given line (1-based), empty if out of range.
pub fn indent_of_line(source: &str, line: usize) -> String {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).collect())
        .unwrap_or_default()
}

/// Strip the longest common leading whitespace from every non-blank line.
pub fn dedent(text: &str) -> String {
    let common = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::from("\n")
            } else {
                format!("{}\n", &l[common.min(l.len())..])
            }
        })
        .collect()
}

/// One pending line-range edit against a source text.
#[derive(Debug, Clone)]
pub enum Edit {
    Replace {
        start: usize,
        end: usize,
        text: String,
    },
    InsertAfter {
        line: usize,
        text: String,
    },
}

impl Edit {
    fn anchor(&self) -> usize {
        match self {
            Edit::Replace { start, .. } => *start,
            Edit::InsertAfter { line, .. } => *line,
        }
    }
}

/// Apply a batch of non-overlapping edits. Edits are applied bottom-up so
/// line numbers recorded against the original text stay valid throughout.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.anchor().cmp(&a.anchor()));
    let mut text = source.to_string();
    for edit in edits {
        text = match edit {
            Edit::Replace { start, end, text: t } => replace_lines(&text, start, end, &t),
            Edit::InsertAfter { line, text: t } => insert_after_line(&text, line, &t),
        };
    }
    text
}

/// Prefix every non-blank line with `prefix`.
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::from("\n")
            } else {
                format!("{prefix}{l}\n")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "one\ntwo\nthree\nfour\n";

    #[test]
    fn extract_inclusive_range() {
        assert_eq!(extract_lines(SRC, 2, 3), "two\nthree\n");
    }

    #[test]
    fn replace_middle_lines() {
        assert_eq!(replace_lines(SRC, 2, 3, "TWO\n"), "one\nTWO\nfour\n");
    }

    #[test]
    fn replace_with_empty_deletes() {
        assert_eq!(replace_lines(SRC, 2, 3, ""), "one\nfour\n");
    }

    #[test]
    fn insert_after_line_zero_prepends() {
        assert_eq!(insert_after_line(SRC, 0, "zero"), "zero\none\ntwo\nthree\nfour\n");
    }

    #[test]
    fn insert_after_last_line_appends() {
        assert_eq!(insert_after_line(SRC, 4, "five"), "one\ntwo\nthree\nfour\nfive\n");
    }

    #[test]
    fn dedent_strips_common_indent() {
        assert_eq!(dedent("    a\n      b\n"), "a\n  b\n");
    }

    #[test]
    fn node_lines_reports_span_rows() {
        let file: syn::File = syn::parse_str("fn a() {\n    let x = 1;\n}\n").unwrap();
        let (start, end) = node_lines(&file.items[0]);
        assert_eq!((start, end), (1, 3));
    }
}
