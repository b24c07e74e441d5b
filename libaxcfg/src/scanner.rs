//! Phase 1: Scanner
//!
//! The scanner converts raw source text into lines. It performs:
//! - Line splitting (a trailing `\r` is dropped from each line)
//! - Comment blanking (`/* ... */` blocks and `#` line comments become spaces)
//! - ASCII lower-casing for keyword and name matching
//!
//! Comments are blanked rather than removed so that every character keeps
//! its original column and ranges computed on scanned lines stay valid in
//! the source document.

use crate::diagnostic::Range;

/// A single line after the scanning phase.
#[derive(Debug, Clone)]
pub struct Line {
    /// Zero-based line number.
    pub index: usize,
    /// The line as written, without line terminator.
    pub raw: String,
    /// The line with comments replaced by spaces.
    pub text: String,
    /// `text` lower-cased (ASCII only, so byte offsets are shared with `text`).
    pub normalized: String,
}

impl Line {
    /// True if nothing but whitespace remains after comment blanking.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Convert a byte offset into `text` to a character column.
    pub fn column(&self, byte: usize) -> usize {
        let byte = byte.min(self.text.len());
        self.text[..byte].chars().count()
    }

    /// Range covering bytes `start..end` of `text`.
    pub fn range(&self, start: usize, end: usize) -> Range {
        Range::on_line(self.index, self.column(start), self.column(end))
    }

    /// Range covering the whole line.
    pub fn full_range(&self) -> Range {
        Range::on_line(self.index, 0, self.raw.chars().count())
    }
}

/// Scan source text into lines with comments blanked out.
pub fn scan(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut in_block_comment = false;

    for (index, raw) in source.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let text = blank_comments(raw, &mut in_block_comment);
        let normalized = text.to_ascii_lowercase();
        lines.push(Line {
            index,
            raw: raw.to_string(),
            text,
            normalized,
        });
    }

    lines
}

/// Replace comment characters on one line with spaces.
///
/// `in_block` carries the open `/* ... */` state from line to line.
fn blank_comments(raw: &str, in_block: &mut bool) -> String {
    if !*in_block && raw.trim_start().starts_with('#') {
        return blank(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if *in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                out.push_str("  ");
                *in_block = false;
            } else {
                out.push(' ');
            }
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            out.push_str("  ");
            *in_block = true;
        } else {
            out.push(c);
        }
    }
    out
}

fn blank(s: &str) -> String {
    " ".repeat(s.chars().count())
}
