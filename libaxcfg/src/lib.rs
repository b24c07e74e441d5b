//! Validator and formatter for axcfg dashboard configuration documents.
//!
//! An axcfg document is a sequence of `[section]` headers, `name = value`
//! settings and control keywords (`for`, `if`, `var`, `list`, `csv`,
//! `script`, each closed by its `end*` terminator). There is no syntax tree:
//! the engine works line by line and recovers from every malformed input,
//! reporting problems as [`Diagnostic`]s instead of failing.
//!
//! # Validation Pipeline
//!
//! 1. **Scanner**: Splits source text into lines with comments blanked out,
//!    keeping every character at its original column.
//!
//! 2. **Classifier**: Labels each line as a section header, keyword line or
//!    setting, and decides whether an opening keyword starts a block.
//!
//! 3. **Validator**: Tracks open blocks, declared names, section nesting and
//!    required settings, and checks setting values against the
//!    [`SettingsCatalog`].
//!
//! The formatter shares phases 1 and 2 and computes canonical indentation
//! from section nesting and open blocks alone.

mod alias;
mod block;
mod catalog;
mod csv;
mod diagnostic;
mod error;
mod formatter;
mod keyword;
mod scanner;
mod scope;
mod script;
mod section;
mod suggest;
mod validator;
mod value;

pub use catalog::{normalize_name, Setting, SettingDescriptor, SettingType, SettingsCatalog};
pub use diagnostic::{apply_edits, Diagnostic, FormattingOptions, Range, Severity, TextEdit};
pub use error::{Error, KeywordError, Result};
pub use keyword::Keyword;
pub use script::{ScriptFailure, ScriptSandbox, ScriptSnippet, SnippetKind};
pub use suggest::{edit_distance, nearest};
pub use validator::Validator;

/// Validate a document against the built-in settings catalog.
///
/// # Example
///
/// ```
/// let diagnostics = libaxcfg::validate("[series]\n   metric = hello\n");
/// assert_eq!(diagnostics[0].message, "entity is required");
/// ```
pub fn validate(text: &str) -> Vec<Diagnostic> {
    Validator::new(SettingsCatalog::builtin()).validate(text)
}

/// Compute the edits that re-indent a document.
///
/// # Example
///
/// ```
/// use libaxcfg::{apply_edits, format, FormattingOptions};
///
/// let text = "[widget]\ntype = chart\n";
/// let edits = format(text, &FormattingOptions::default());
/// assert_eq!(apply_edits(text, &edits), "[widget]\n  type = chart\n");
/// ```
pub fn format(text: &str, options: &FormattingOptions) -> Vec<TextEdit> {
    formatter::format(text, options)
}

/// Format a document and return the re-indented text.
pub fn format_text(text: &str, options: &FormattingOptions) -> String {
    apply_edits(text, &format(text, options))
}
