//! Diagnostics and text edits produced by the validator and formatter.

use serde::Serialize;
use std::fmt;

/// A text range in zero-based line/character coordinates.
///
/// Characters are counted in Unicode scalar values; the end is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_line: usize,
    pub start_char: usize,
    pub end_line: usize,
    pub end_char: usize,
}

impl Range {
    /// Create a range spanning two positions.
    pub fn new(start_line: usize, start_char: usize, end_line: usize, end_char: usize) -> Self {
        Self {
            start_line,
            start_char,
            end_line,
            end_char,
        }
    }

    /// Create a range within a single line.
    pub fn on_line(line: usize, start_char: usize, end_char: usize) -> Self {
        Self::new(line, start_char, line, end_char)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line + 1,
            self.start_char + 1,
            self.end_line + 1,
            self.end_char + 1
        )
    }
}

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
        };
        f.write_str(name)
    }
}

/// A single problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(range: Range, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity,
            message: message.into(),
        }
    }

    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Error, message)
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Warning, message)
    }

    pub fn hint(range: Range, message: impl Into<String>) -> Self {
        Self::new(range, Severity::Hint, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.range, self.severity, self.message)
    }
}

/// A replacement of the text covered by `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

/// Options controlling indentation during formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingOptions {
    pub tab_size: u32,
    pub insert_spaces: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            tab_size: 2,
            insert_spaces: true,
        }
    }
}

impl FormattingOptions {
    /// The whitespace added for one level of nesting.
    pub fn indent_unit(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size as usize)
        } else {
            "\t".to_string()
        }
    }
}

/// Apply non-overlapping edits to `text`, returning the edited document.
///
/// Edits are applied from the end of the document backwards so earlier
/// ranges stay valid. Lines are split on `\n`.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let mut lines: Vec<String> = text.split('\n').map(String::from).collect();
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.range.cmp(&a.range));

    for edit in ordered {
        let r = &edit.range;
        if r.start_line != r.end_line || r.start_line >= lines.len() {
            continue;
        }
        let line = &lines[r.start_line];
        let start = char_to_byte(line, r.start_char);
        let end = char_to_byte(line, r.end_char);
        let mut replaced = String::with_capacity(line.len() + edit.new_text.len());
        replaced.push_str(&line[..start]);
        replaced.push_str(&edit.new_text);
        replaced.push_str(&line[end..]);
        lines[r.start_line] = replaced;
    }

    lines.join("\n")
}

fn char_to_byte(line: &str, char_idx: usize) -> usize {
    line.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_unit() {
        let spaces = FormattingOptions {
            tab_size: 4,
            insert_spaces: true,
        };
        assert_eq!(spaces.indent_unit(), "    ");
        let tabs = FormattingOptions {
            tab_size: 4,
            insert_spaces: false,
        };
        assert_eq!(tabs.indent_unit(), "\t");
    }

    #[test]
    fn test_apply_edits_same_line() {
        let edits = vec![
            TextEdit::replace(Range::on_line(0, 0, 4), "  "),
            TextEdit::replace(Range::on_line(0, 5, 7), ""),
        ];
        assert_eq!(apply_edits("    a  \nb", &edits), "  a\nb");
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::error(Range::on_line(0, 0, 3), "for has no matching endfor");
        assert_eq!(d.to_string(), "1:1-1:4 error: for has no matching endfor");
    }

    #[test]
    fn test_serialize_camel_case() {
        let edit = TextEdit::replace(Range::on_line(1, 0, 2), "");
        let json = serde_json::to_string(&edit).unwrap();
        assert!(json.contains("\"newText\""));
        assert!(json.contains("\"startLine\":1"));
    }
}
