//! Phase 3: Validation
//!
//! A single pass over the scanned lines. Each line either belongs to the
//! body of an open `script`, `csv`, `var` or `list` block, or is classified
//! and dispatched:
//!
//! - section headers update the [`SectionTracker`] and the alias scope
//! - keywords update the [`BlockStack`] and the [`ScopeTracker`]
//! - settings are checked against the [`SettingsCatalog`]
//!
//! Checks that depend on the whole document (loop targets, aliases,
//! unterminated blocks, script snippets) run once every line has been seen.

use crate::alias::AliasScope;
use crate::block::{BlockStack, Branch, Close, Frame};
use crate::catalog::{self, SettingsCatalog};
use crate::csv::CsvBlock;
use crate::diagnostic::{Diagnostic, Range};
use crate::keyword::{self, Keyword, KeywordToken, LineKind, SectionHeader, SettingLine};
use crate::scanner::{self, Line};
use crate::scope::{expression_identifiers, Bucket, ScopeTracker};
use crate::script::{ScriptCollector, ScriptSandbox, SnippetKind};
use crate::section::SectionTracker;
use crate::suggest::unknown_message;
use crate::value::{check_value, is_templated};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn for_regex() -> &'static Regex {
    static FOR: OnceLock<Regex> = OnceLock::new();
    FOR.get_or_init(|| {
        Regex::new(r"^\s*([\w$]+)(?:\s+(in)\b\s*(.*?))?\s*$").expect("valid for regex")
    })
}

fn declaration_regex() -> &'static Regex {
    static DECLARATION: OnceLock<Regex> = OnceLock::new();
    DECLARATION.get_or_init(|| Regex::new(r"^\s*([^\s=]+)").expect("valid declaration regex"))
}

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("valid identifier regex"))
}

/// Validates documents against a settings catalog.
///
/// A validator holds no per-document state; one instance can check any
/// number of documents.
pub struct Validator<'a> {
    catalog: &'a SettingsCatalog,
    sandbox: Option<&'a dyn ScriptSandbox>,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a SettingsCatalog) -> Self {
        Self {
            catalog,
            sandbox: None,
        }
    }

    /// Evaluate extracted script snippets with `sandbox`.
    pub fn with_sandbox(mut self, sandbox: &'a dyn ScriptSandbox) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Validate `text`, returning every diagnostic ordered by position.
    pub fn validate(&self, text: &str) -> Vec<Diagnostic> {
        let lines = scanner::scan(text);
        debug!(lines = lines.len(), "validate");

        let mut pass = Pass::new(self.catalog, &lines);
        for idx in 0..lines.len() {
            pass.line(idx);
        }
        let diagnostics = pass.finish(self.sandbox);

        debug!(diagnostics = diagnostics.len(), "validate done");
        diagnostics
    }
}

// =============================================================================
// Per-document state
// =============================================================================

/// What an open block needs to remember until its terminator.
#[derive(Debug, Clone)]
enum Opened {
    Plain,
    /// A `for` loop and the collection it iterates, if that is a plain name.
    Loop(Option<LoopTarget>),
    Csv(CsvBlock),
    /// A `script` block whose body starts on the given line.
    Script(usize),
}

#[derive(Debug, Clone)]
struct OpenBlock {
    range: Range,
    opened: Opened,
}

#[derive(Debug, Clone)]
struct LoopTarget {
    name: String,
    range: Range,
}

struct Pass<'a, 'l> {
    catalog: &'a SettingsCatalog,
    lines: &'l [Line],
    diagnostics: Vec<Diagnostic>,
    blocks: BlockStack<OpenBlock>,
    scope: ScopeTracker,
    sections: SectionTracker<'a>,
    aliases: AliasScope,
    scripts: ScriptCollector,
    /// Targets of closed loops, resolved once every declaration is known.
    loop_targets: Vec<LoopTarget>,
}

impl<'a, 'l> Pass<'a, 'l> {
    fn new(catalog: &'a SettingsCatalog, lines: &'l [Line]) -> Self {
        Self {
            catalog,
            lines,
            diagnostics: Vec::new(),
            blocks: BlockStack::new(),
            scope: ScopeTracker::new(),
            sections: SectionTracker::new(catalog),
            aliases: AliasScope::new(),
            scripts: ScriptCollector::new(),
            loop_targets: Vec::new(),
        }
    }

    fn error(&mut self, range: Range, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(range, message));
    }

    fn line(&mut self, idx: usize) {
        let lines = self.lines;
        let line = &lines[idx];
        if self.in_block_body(line) {
            return;
        }
        if self.scope.in_loop() {
            self.check_loop_identifiers(line);
        }
        match keyword::classify(line) {
            LineKind::Blank | LineKind::Other => {}
            LineKind::Section(header) => self.section(line, &header),
            LineKind::Keyword(token) => self.keywords(idx, token),
            LineKind::Setting(setting) => self.setting(line, &setting),
        }
    }

    /// Handle a line inside a `script`, `csv`, `var` or `list` body.
    ///
    /// Returns `false` when the line is not body text and must be
    /// dispatched normally.
    fn in_block_body(&mut self, line: &Line) -> bool {
        let Some(top) = self.blocks.top_keyword() else {
            return false;
        };
        let terminator = top.terminator();
        let found = keyword::recognize(line, 0).and_then(|t| t.keyword().ok());
        if found.is_some() && found == terminator {
            return false;
        }
        match top {
            Keyword::Csv => {
                let message = match self.blocks.top_mut() {
                    Some(Frame {
                        data:
                            OpenBlock {
                                opened: Opened::Csv(csv),
                                ..
                            },
                        ..
                    }) => csv.check_row(line),
                    _ => None,
                };
                if let Some(message) = message {
                    self.error(line.full_range(), message);
                }
                true
            }
            Keyword::Script | Keyword::Var | Keyword::List => true,
            _ => false,
        }
    }

    // =========================================================================
    // Sections
    // =========================================================================

    fn section(&mut self, line: &Line, header: &SectionHeader) {
        let range = line.range(header.start, header.end);
        if !catalog::is_known_section(&header.name) {
            let message = unknown_message(&header.name, catalog::SECTIONS.iter().copied());
            self.error(range, message);
        }
        self.sections.enter(&header.name, range, &mut self.diagnostics);
        if header.name == "widget" {
            self.aliases.close(&mut self.diagnostics);
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    fn setting(&mut self, line: &Line, setting: &SettingLine) {
        if is_templated(&setting.name) {
            return;
        }
        if self.sections.current().is_some_and(catalog::is_free_form) {
            return;
        }
        let name_range = line.range(setting.name_start, setting.name_end);
        let value_range = line.range(setting.value_start, setting.value_end);

        let catalog = self.catalog;
        let Some(schema) = catalog.get(&setting.name) else {
            if !is_templated(&setting.value) {
                let message = unknown_message(&setting.name, catalog.display_names());
                self.error(name_range, message);
            }
            return;
        };

        if !setting.value.is_empty() && !is_templated(&setting.value) {
            if let Some(message) = check_value(schema, &setting.value) {
                self.error(value_range, message);
            }
        }
        self.sections.record(schema, name_range, &mut self.diagnostics);

        match schema.name.as_str() {
            "alias" => self.aliases.declare(&setting.value),
            "value" => self
                .aliases
                .scan_references(line, setting.value_start, setting.value_end),
            _ => {}
        }
        self.scripts.setting(&schema.name, &setting.value, value_range);
    }

    fn check_loop_identifiers(&mut self, line: &Line) {
        for id in expression_identifiers(&line.text) {
            if self.scope.resolves(&id.name) {
                continue;
            }
            let message = unknown_message(&id.name, self.scope.all_names());
            self.error(line.range(id.start, id.end), message);
        }
    }

    // =========================================================================
    // Keywords
    // =========================================================================

    /// Dispatch every keyword on a line. Scanning continues past a
    /// terminator so that `endscript endif` closes both blocks.
    fn keywords(&mut self, idx: usize, first: KeywordToken) {
        let lines = self.lines;
        let line = &lines[idx];
        let mut token = Some(first);
        while let Some(current) = token {
            let keyword = match current.keyword() {
                Ok(keyword) => keyword,
                Err(e) => {
                    self.error(line.range(current.start, current.end), e.to_string());
                    return;
                }
            };
            self.keyword(idx, keyword, &current);
            token = if keyword.is_terminator() {
                keyword::recognize(line, current.end)
            } else {
                None
            };
        }
    }

    fn keyword(&mut self, idx: usize, keyword: Keyword, token: &KeywordToken) {
        let lines = self.lines;
        let line = &lines[idx];
        let range = line.range(token.start, token.end);
        let rest = line.text.get(token.end..).unwrap_or_default();

        match keyword {
            Keyword::For => self.open_for(line, token, range),
            Keyword::If => {
                self.open(keyword, range, Opened::Plain);
                self.sections.open_if();
            }
            Keyword::ElseIf | Keyword::Else => match self.blocks.branch() {
                Branch::Ok => self.sections.next_branch(keyword == Keyword::Else),
                Branch::Interrupted { top } => self.error(
                    range,
                    format!("{} has started before {} has finished", token.token, top),
                ),
                Branch::NoIf => {
                    self.error(range, format!("{} has no matching if", token.token))
                }
            },
            Keyword::Var | Keyword::List | Keyword::Csv => self.declare(idx, keyword, token, range),
            Keyword::Script => {
                if keyword::opens_block(keyword, lines, idx) {
                    self.open(keyword, range, Opened::Script(idx + 1));
                } else {
                    self.script_one_liner(line);
                }
            }
            Keyword::Import => self.scripts.import(rest),
            Keyword::EndIf
            | Keyword::EndFor
            | Keyword::EndVar
            | Keyword::EndList
            | Keyword::EndCsv
            | Keyword::EndScript => self.close(idx, keyword, range),
        }
    }

    /// `script = expr` on a single line.
    fn script_one_liner(&mut self, line: &Line) {
        let Some(eq) = line.text.find('=') else {
            return;
        };
        let after = &line.text[eq + 1..];
        let start = eq + 1 + after.len() - after.trim_start().len();
        let inline = after.trim();
        self.scripts.snippet(
            SnippetKind::Script,
            inline,
            line.range(start, start + inline.len()),
        );
    }

    fn open(&mut self, keyword: Keyword, range: Range, opened: Opened) {
        self.blocks.push(keyword, OpenBlock { range, opened });
    }

    fn open_for(&mut self, line: &Line, token: &KeywordToken, range: Range) {
        let offset = token.end;
        let rest = line.text.get(offset..).unwrap_or_default();
        let mut target = None;

        match for_regex().captures(rest) {
            Some(caps) => {
                if let Some(var) = caps.get(1) {
                    if !self.scope.enter_loop(var.as_str()) {
                        self.error(
                            line.range(offset + var.start(), offset + var.end()),
                            format!("{} is already defined", var.as_str()),
                        );
                    }
                }
                match (caps.get(2), caps.get(3)) {
                    (Some(in_token), Some(t)) if t.as_str().is_empty() => {
                        self.error(
                            line.range(offset + in_token.start(), offset + in_token.end()),
                            "Empty 'in' statement",
                        );
                    }
                    (Some(_), Some(t)) if identifier_regex().is_match(t.as_str()) => {
                        target = Some(LoopTarget {
                            name: t.as_str().to_string(),
                            range: line.range(offset + t.start(), offset + t.end()),
                        });
                    }
                    _ => {}
                }
            }
            // Unparseable header: keep the loop stack balanced.
            None => {
                self.scope.enter_loop("");
            }
        }

        self.open(Keyword::For, range, Opened::Loop(target));
    }

    fn declare(&mut self, idx: usize, keyword: Keyword, token: &KeywordToken, range: Range) {
        let lines = self.lines;
        let line = &lines[idx];
        let offset = token.end;
        let rest = line.text.get(offset..).unwrap_or_default();

        if let Some(name) = declaration_regex().captures(rest).and_then(|c| c.get(1)) {
            let bucket = match keyword {
                Keyword::List => Bucket::List,
                Keyword::Csv => Bucket::Csv,
                _ => Bucket::Var,
            };
            if !self.scope.declare(bucket, name.as_str()) {
                self.error(
                    line.range(offset + name.start(), offset + name.end()),
                    format!("{} is already defined", name.as_str()),
                );
            }
        }

        if !keyword::opens_block(keyword, lines, idx) {
            return;
        }
        let opened = match keyword {
            Keyword::Csv => Opened::Csv(CsvBlock::open(line)),
            _ => Opened::Plain,
        };
        self.open(keyword, range, opened);
    }

    fn close(&mut self, idx: usize, terminator: Keyword, range: Range) {
        let Some(opening) = terminator.opening() else {
            return;
        };
        match self.blocks.close(terminator) {
            Close::Matched(frame) => self.closed(idx, frame),
            Close::OutOfOrder { removed, top } => {
                self.error(range, format!("{} has finished before {}", opening, top));
                self.closed(idx, removed);
            }
            Close::Unmatched => {
                self.error(range, format!("{} has no matching {}", terminator, opening));
            }
        }
    }

    /// Bookkeeping for a block that ended on line `idx`.
    fn closed(&mut self, idx: usize, frame: Frame<OpenBlock>) {
        match frame.keyword {
            Keyword::For => {
                self.scope.exit_loop();
                if let Opened::Loop(Some(target)) = frame.data.opened {
                    self.loop_targets.push(target);
                }
            }
            Keyword::If => self.sections.close_if(),
            Keyword::Script => {
                if let Opened::Script(start) = frame.data.opened {
                    if start < idx {
                        self.scripts.block(&self.lines[start..idx]);
                    }
                }
            }
            _ => {}
        }
    }

    // =========================================================================
    // End of document
    // =========================================================================

    fn finish(mut self, sandbox: Option<&dyn ScriptSandbox>) -> Vec<Diagnostic> {
        self.aliases.close(&mut self.diagnostics);

        for target in std::mem::take(&mut self.loop_targets) {
            if self.scope.is_collection(&target.name) {
                continue;
            }
            let message = unknown_message(&target.name, self.scope.collection_names());
            self.error(target.range, message);
        }

        for frame in self.blocks.drain() {
            let terminator = frame.keyword.terminator().unwrap_or(frame.keyword);
            self.diagnostics.push(Diagnostic::error(
                frame.data.range,
                format!("{} has no matching {}", frame.keyword, terminator),
            ));
        }

        self.sections.finish(&mut self.diagnostics);

        if let Some(sandbox) = sandbox {
            self.scripts.evaluate(sandbox, &mut self.diagnostics);
        }

        let mut diagnostics = self.diagnostics;
        diagnostics.sort_by_key(|d| (d.range.start_line, d.range.start_char));
        diagnostics
    }
}
