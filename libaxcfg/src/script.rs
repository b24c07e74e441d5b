//! Embedded script snippets and the sandbox seam.
//!
//! The validator does not evaluate scripts itself. It collects the snippet
//! text of `script` blocks and one-liners, `value` and `replace-value`
//! settings and `options = javascript:` values, together with the names
//! declared by `import` lines. A [`ScriptSandbox`] supplied by the host runs
//! each snippet and reports failures, which become warnings.

use crate::diagnostic::{Diagnostic, Range};
use crate::scanner::Line;

/// Where a snippet was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetKind {
    Script,
    Value,
    ReplaceValue,
    Options,
}

/// Script text extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSnippet {
    pub kind: SnippetKind,
    pub text: String,
    pub range: Range,
}

/// A failure reported by the sandbox for one snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    pub message: String,
    /// The failure refers to an imported name and is not a real problem.
    pub matches_import: bool,
}

/// Evaluates snippets in isolation.
pub trait ScriptSandbox {
    fn evaluate(&self, snippet: &ScriptSnippet, imports: &[String]) -> Option<ScriptFailure>;
}

/// Snippets and imports gathered during one validation pass.
#[derive(Debug, Clone, Default)]
pub struct ScriptCollector {
    snippets: Vec<ScriptSnippet>,
    imports: Vec<String>,
}

impl ScriptCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the name of an `import NAME = url` line. `rest` is the text
    /// after the keyword.
    pub fn import(&mut self, rest: &str) {
        let name = rest.split('=').next().unwrap_or_default().trim();
        if !name.is_empty() {
            self.imports.push(name.to_string());
        }
    }

    /// Record a one-line snippet.
    pub fn snippet(&mut self, kind: SnippetKind, text: &str, range: Range) {
        if text.trim().is_empty() {
            return;
        }
        self.snippets.push(ScriptSnippet {
            kind,
            text: text.to_string(),
            range,
        });
    }

    /// Record a setting value if it carries script.
    ///
    /// `name` is the normalized setting name.
    pub fn setting(&mut self, name: &str, value: &str, range: Range) {
        match name {
            "value" => self.snippet(SnippetKind::Value, value, range),
            "replacevalue" => self.snippet(SnippetKind::ReplaceValue, value, range),
            "options" => {
                let lower = value.to_ascii_lowercase();
                if let Some(script) = lower.strip_prefix("javascript:") {
                    let offset = value.len() - script.len();
                    self.snippet(SnippetKind::Options, &value[offset..], range);
                }
            }
            _ => {}
        }
    }

    /// Record the body of a `script` ... `endscript` block.
    ///
    /// `body` holds the lines strictly between the two keywords.
    pub fn block(&mut self, body: &[Line]) {
        let (Some(first), Some(last)) = (body.first(), body.last()) else {
            return;
        };
        let text = body
            .iter()
            .map(|l| l.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let range = Range::new(first.index, 0, last.index, last.raw.chars().count());
        self.snippet(SnippetKind::Script, &text, range);
    }

    /// Run every snippet through `sandbox`, reporting failures as warnings.
    pub fn evaluate(&self, sandbox: &dyn ScriptSandbox, diagnostics: &mut Vec<Diagnostic>) {
        for snippet in &self.snippets {
            if let Some(failure) = sandbox.evaluate(snippet, &self.imports) {
                if !failure.matches_import {
                    diagnostics.push(Diagnostic::warning(snippet.range, failure.message));
                }
            }
        }
    }
}
