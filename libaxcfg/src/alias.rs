//! Alias declarations and `value('name')` references within one widget.

use crate::diagnostic::{Diagnostic, Range};
use crate::scanner::Line;
use crate::suggest::unknown_message;
use regex::Regex;
use std::sync::OnceLock;

fn dealias_regex() -> &'static Regex {
    static DEALIAS: OnceLock<Regex> = OnceLock::new();
    DEALIAS.get_or_init(|| {
        Regex::new(r#"value\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#).expect("valid dealias regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Reference {
    name: String,
    range: Range,
}

/// Aliases and references seen since the last `[widget]`.
#[derive(Debug, Clone, Default)]
pub struct AliasScope {
    aliases: Vec<String>,
    references: Vec<Reference>,
}

impl AliasScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, alias: &str) {
        self.aliases.push(alias.to_string());
    }

    /// Record every `value('name')` reference in bytes `start..end` of `line`.
    pub fn scan_references(&mut self, line: &Line, start: usize, end: usize) {
        let Some(text) = line.text.get(start..end) else {
            return;
        };
        for caps in dealias_regex().captures_iter(text) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                self.references.push(Reference {
                    name: m.as_str().to_string(),
                    range: line.range(start + m.start(), start + m.end()),
                });
            }
        }
    }

    /// Report references with no matching alias and start a fresh scope.
    pub fn close(&mut self, diagnostics: &mut Vec<Diagnostic>) {
        for reference in self.references.drain(..) {
            if self.aliases.iter().any(|a| a == &reference.name) {
                continue;
            }
            let message = unknown_message(
                &reference.name,
                self.aliases.iter().map(String::as_str),
            );
            diagnostics.push(Diagnostic::error(reference.range, message));
        }
        self.aliases.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    #[test]
    fn test_reference_before_declaration() {
        let lines = scan("value = value('cpu') / 100");
        let mut scope = AliasScope::new();
        scope.scan_references(&lines[0], 8, lines[0].text.len());
        scope.declare("cpu");
        let mut diagnostics = Vec::new();
        scope.close(&mut diagnostics);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_reference_suggests() {
        let lines = scan(r#"value = value("cpu_bsy") + value('mem')"#);
        let mut scope = AliasScope::new();
        scope.declare("cpu_busy");
        scope.scan_references(&lines[0], 8, lines[0].text.len());
        let mut diagnostics = Vec::new();
        scope.close(&mut diagnostics);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].message, "cpu_bsy is unknown. Suggestion: cpu_busy");
        assert_eq!(diagnostics[0].range, Range::on_line(0, 15, 22));
        assert_eq!(diagnostics[1].message, "mem is unknown. Suggestion: cpu_busy");
    }

    #[test]
    fn test_scope_resets_on_close() {
        let lines = scan("value = value('a')");
        let mut scope = AliasScope::new();
        scope.declare("a");
        scope.close(&mut Vec::new());
        scope.scan_references(&lines[0], 0, lines[0].text.len());
        let mut diagnostics = Vec::new();
        scope.close(&mut diagnostics);
        assert_eq!(diagnostics[0].message, "a is unknown.");
    }
}
