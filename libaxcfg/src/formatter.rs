//! Indentation formatter.
//!
//! The formatter computes the canonical indentation of every line from two
//! things only: the nesting of section headers (via the static parent table)
//! and the control blocks opened by keywords (via the same openability rules
//! the validator uses). It emits one edit per line whose leading whitespace
//! differs from the canonical indent, plus one edit per line carrying
//! trailing whitespace. Applying the edits and formatting again yields no
//! edits.
//!
//! Bodies of `script` and multi-line `var` blocks are left untouched apart
//! from trailing whitespace. Blank and comment-only lines are never
//! re-indented.

use crate::block::{BlockStack, Close};
use crate::catalog;
use crate::diagnostic::{FormattingOptions, Range, TextEdit};
use crate::keyword::{self, Keyword, LineKind};
use crate::scanner::{self, Line};
use tracing::debug;

/// Compute the edits that re-indent `text`.
pub fn format(text: &str, options: &FormattingOptions) -> Vec<TextEdit> {
    let lines = scanner::scan(text);
    debug!(lines = lines.len(), tab_size = options.tab_size, "format");

    let mut formatter = Formatter::new(options.indent_unit());
    for idx in 0..lines.len() {
        formatter.line(&lines, idx);
    }

    debug!(edits = formatter.edits.len(), "format done");
    formatter.edits
}

enum Body {
    /// Not inside a raw block body.
    Outside,
    /// `script` or multi-line `var` text, left as written.
    Opaque,
    /// `csv` or `list` rows, indented one level inside the block.
    Rows,
}

struct Formatter {
    unit: String,
    /// Indent of the next ordinary line.
    indent: String,
    /// Open blocks, each remembering the indent in effect when it opened.
    blocks: BlockStack<String>,
    /// Open sections and their nesting depth.
    sections: Vec<(String, usize)>,
    edits: Vec<TextEdit>,
}

impl Formatter {
    fn new(unit: String) -> Self {
        Self {
            unit,
            indent: String::new(),
            blocks: BlockStack::new(),
            sections: Vec::new(),
            edits: Vec::new(),
        }
    }

    fn line(&mut self, lines: &[Line], idx: usize) {
        let line = &lines[idx];
        if self.trim_trailing(line) || line.is_blank() {
            return;
        }

        let target = match self.body(line) {
            Body::Opaque => return,
            Body::Rows => self.indent.clone(),
            Body::Outside => match keyword::classify(line) {
                LineKind::Section(header) => self.section(&header.name),
                LineKind::Keyword(token) => match token.keyword() {
                    Ok(keyword) => self.keywords(lines, idx, keyword, token.end),
                    Err(_) => self.indent.clone(),
                },
                LineKind::Blank | LineKind::Setting(_) | LineKind::Other => self.indent.clone(),
            },
        };
        self.reindent(line, &target);
    }

    /// Trim trailing whitespace. Returns `true` when the line was nothing but
    /// whitespace and needs no further work.
    fn trim_trailing(&mut self, line: &Line) -> bool {
        let trimmed = line.raw.trim_end();
        if trimmed.len() == line.raw.len() {
            return false;
        }
        let start = trimmed.chars().count();
        let end = line.raw.chars().count();
        self.edits
            .push(TextEdit::replace(Range::on_line(line.index, start, end), ""));
        trimmed.is_empty()
    }

    /// How a line relates to the innermost open block.
    fn body(&self, line: &Line) -> Body {
        let Some(top) = self.blocks.top_keyword() else {
            return Body::Outside;
        };
        let found = keyword::recognize(line, 0).and_then(|t| t.keyword().ok());
        if found.is_some() && found == top.terminator() {
            return Body::Outside;
        }
        match top {
            Keyword::Script | Keyword::Var => Body::Opaque,
            Keyword::Csv | Keyword::List => Body::Rows,
            _ => Body::Outside,
        }
    }

    fn reindent(&mut self, line: &Line, target: &str) {
        let leading = &line.raw[..line.raw.len() - line.raw.trim_start().len()];
        if leading != target {
            let range = Range::on_line(line.index, 0, leading.chars().count());
            self.edits.push(TextEdit::replace(range, target));
        }
    }

    /// Indent a section header and set the indent of its content.
    fn section(&mut self, name: &str) -> String {
        let same_level = self
            .sections
            .last()
            .filter(|(top, _)| catalog::same_level(top, name))
            .map(|&(_, depth)| depth);
        let depth = match same_level {
            Some(depth) => {
                self.sections.pop();
                depth
            }
            None => {
                let parents = catalog::parent_sections(name);
                while let Some((top, _)) = self.sections.last() {
                    if parents.contains(&top.as_str()) {
                        break;
                    }
                    self.sections.pop();
                }
                self.sections.last().map_or(0, |&(_, depth)| depth + 1)
            }
        };
        self.sections.push((name.to_string(), depth));

        let mut header = self.unit.repeat(depth + self.blocks.len());
        // A header inside a block sits at least one level under the block.
        if let Some(top) = self.blocks.top() {
            let inner = format!("{}{}", top.data, self.unit);
            if inner.len() > header.len() {
                header = inner;
            }
        }
        self.indent = format!("{}{}", header, self.unit);
        header
    }

    /// Indent a keyword line and update the block levels. Further
    /// terminators on the same line close their blocks too.
    fn keywords(&mut self, lines: &[Line], idx: usize, keyword: Keyword, end: usize) -> String {
        let target = self.keyword(lines, idx, keyword);
        if keyword.is_terminator() {
            let mut from = end;
            while let Some(token) = keyword::recognize(&lines[idx], from) {
                match token.keyword() {
                    Ok(next) if next.is_terminator() => {
                        self.keyword(lines, idx, next);
                        from = token.end;
                    }
                    _ => break,
                }
            }
        }
        target
    }

    fn keyword(&mut self, lines: &[Line], idx: usize, keyword: Keyword) -> String {
        match keyword {
            Keyword::EndIf
            | Keyword::EndFor
            | Keyword::EndVar
            | Keyword::EndList
            | Keyword::EndCsv
            | Keyword::EndScript => {
                match self.blocks.close(keyword) {
                    Close::Matched(frame) | Close::OutOfOrder { removed: frame, .. } => {
                        self.indent = frame.data;
                    }
                    Close::Unmatched => {}
                }
                self.indent.clone()
            }
            Keyword::Else | Keyword::ElseIf => {
                if self.blocks.top_keyword() != Some(Keyword::If) {
                    return self.indent.clone();
                }
                let Close::Matched(frame) = self.blocks.close(Keyword::EndIf) else {
                    return self.indent.clone();
                };
                let target = frame.data;
                self.open(Keyword::If, target.clone());
                target
            }
            Keyword::If
            | Keyword::For
            | Keyword::Var
            | Keyword::List
            | Keyword::Csv
            | Keyword::Script => {
                let target = self.indent.clone();
                if keyword::opens_block(keyword, lines, idx) {
                    self.open(keyword, target.clone());
                }
                target
            }
            Keyword::Import => self.indent.clone(),
        }
    }

    fn open(&mut self, keyword: Keyword, at: String) {
        self.indent = format!("{}{}", at, self.unit);
        self.blocks.push(keyword, at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::apply_edits;

    fn formatted(text: &str) -> String {
        apply_edits(text, &format(text, &FormattingOptions::default()))
    }

    #[test]
    fn test_canonical_text_has_no_edits() {
        let text = "[configuration]\n\
                    \x20 height-units = 2\n\
                    [group]\n\
                    \x20 [widget]\n\
                    \x20   type = chart\n\
                    \x20   [series]\n\
                    \x20     entity = a\n";
        assert!(format(text, &FormattingOptions::default()).is_empty());
    }

    #[test]
    fn test_sections_nest() {
        let text = "[widget]\ntype = chart\n[series]\nentity = a\n[series]\n  entity = b\n[widget]\n";
        assert_eq!(
            formatted(text),
            "[widget]\n  type = chart\n  [series]\n    entity = a\n  [series]\n    entity = b\n[widget]\n"
        );
    }

    #[test]
    fn test_same_level_sections() {
        let text = "[widget]\n[node]\n[link]\n[series]\n";
        assert_eq!(formatted(text), "[widget]\n  [node]\n  [link]\n  [series]\n");
    }

    #[test]
    fn test_blocks_indent() {
        let text = "for s in servers\nif @{s}\nentity = @{s}\nelse\nentity = x\nendif\nendfor\n";
        assert_eq!(
            formatted(text),
            "for s in servers\n  if @{s}\n    entity = @{s}\n  else\n    entity = x\n  endif\nendfor\n"
        );
    }

    #[test]
    fn test_section_inside_loop() {
        let text = "[widget]\ntype = chart\nfor s in servers\n[series]\nentity = @{s}\nendfor\n";
        assert_eq!(
            formatted(text),
            "[widget]\n  type = chart\n  for s in servers\n    [series]\n      entity = @{s}\n  endfor\n"
        );
    }

    #[test]
    fn test_section_inside_nested_if() {
        let text = "[widget]\ntype = chart\n[series]\nentity = a\nif @{x}\n[series]\nentity = b\nendif\n";
        let once = formatted(text);
        assert_eq!(
            once,
            "[widget]\n  type = chart\n  [series]\n    entity = a\n    if @{x}\n      [series]\n        entity = b\n    endif\n"
        );
        assert!(format(&once, &FormattingOptions::default()).is_empty());
    }

    #[test]
    fn test_script_body_untouched() {
        let text = "script\n      x();\n  y();   \nendscript\n";
        assert_eq!(formatted(text), "script\n      x();\n  y();\nendscript\n");
    }

    #[test]
    fn test_csv_rows_indented() {
        let text = "csv c = a, b\n1, 2\n    3, 4\nendcsv\n";
        assert_eq!(formatted(text), "csv c = a, b\n  1, 2\n  3, 4\nendcsv\n");
    }

    #[test]
    fn test_csv_rows_never_classified() {
        let text = "[widget]\ncsv c = a, b\n[series], 2\nendcsv\nentity = x\n";
        assert_eq!(
            formatted(text),
            "[widget]\n  csv c = a, b\n    [series], 2\n  endcsv\n  entity = x\n"
        );
    }

    #[test]
    fn test_single_line_declarations_do_not_indent() {
        let text = "var a = 1\n  list b = x, y\nscript = f()\n";
        assert_eq!(formatted(text), "var a = 1\nlist b = x, y\nscript = f()\n");
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let text = "[widget]\n   \n      # note\ntype = chart\n";
        let edits = format(text, &FormattingOptions::default());
        assert_eq!(
            edits,
            vec![
                TextEdit::replace(Range::on_line(1, 0, 3), ""),
                TextEdit::replace(Range::on_line(3, 0, 0), "  "),
            ]
        );
    }

    #[test]
    fn test_tabs() {
        let options = FormattingOptions {
            tab_size: 4,
            insert_spaces: false,
        };
        let text = "[widget]\n    type = chart\n";
        assert_eq!(
            apply_edits(text, &format(text, &options)),
            "[widget]\n\ttype = chart\n"
        );
    }

    #[test]
    fn test_fixed_point() {
        let text = "[widget]\n type = chart   \nfor s in xs\n      [series]\n entity = @{s}\n   endfor\n";
        let once = formatted(text);
        assert!(format(&once, &FormattingOptions::default()).is_empty());
    }
}
