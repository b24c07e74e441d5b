//! Phase 2: Line classification
//!
//! Every scanned line is exactly one of:
//! - a section header `[name]`
//! - a control keyword line (`for`, `if`, `endfor`, `list`, ...)
//! - a setting `name = value`
//! - anything else (list items, csv rows, script bodies, free text)
//!
//! The classes are tried in that order. This module also owns the rules
//! deciding whether an opening keyword starts a multi-line block, since the
//! validator and the formatter must agree on them.

use crate::error::KeywordError;
use crate::scanner::Line;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A control keyword from the closed keyword set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    ElseIf,
    Else,
    EndIf,
    For,
    EndFor,
    Var,
    EndVar,
    List,
    EndList,
    Csv,
    EndCsv,
    Script,
    EndScript,
    Import,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::ElseIf => "elseif",
            Keyword::Else => "else",
            Keyword::EndIf => "endif",
            Keyword::For => "for",
            Keyword::EndFor => "endfor",
            Keyword::Var => "var",
            Keyword::EndVar => "endvar",
            Keyword::List => "list",
            Keyword::EndList => "endlist",
            Keyword::Csv => "csv",
            Keyword::EndCsv => "endcsv",
            Keyword::Script => "script",
            Keyword::EndScript => "endscript",
            Keyword::Import => "import",
        }
    }

    /// For a terminator, the keyword it closes.
    pub fn opening(self) -> Option<Keyword> {
        match self {
            Keyword::EndIf => Some(Keyword::If),
            Keyword::EndFor => Some(Keyword::For),
            Keyword::EndVar => Some(Keyword::Var),
            Keyword::EndList => Some(Keyword::List),
            Keyword::EndCsv => Some(Keyword::Csv),
            Keyword::EndScript => Some(Keyword::Script),
            _ => None,
        }
    }

    /// For an opening keyword, the terminator that closes it.
    pub fn terminator(self) -> Option<Keyword> {
        match self {
            Keyword::If => Some(Keyword::EndIf),
            Keyword::For => Some(Keyword::EndFor),
            Keyword::Var => Some(Keyword::EndVar),
            Keyword::List => Some(Keyword::EndList),
            Keyword::Csv => Some(Keyword::EndCsv),
            Keyword::Script => Some(Keyword::EndScript),
            _ => None,
        }
    }

    pub fn is_terminator(self) -> bool {
        self.opening().is_some()
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Keyword {
    type Err = KeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let keyword = match s {
            "if" => Keyword::If,
            "elseif" => Keyword::ElseIf,
            "else" => Keyword::Else,
            "endif" => Keyword::EndIf,
            "for" => Keyword::For,
            "endfor" => Keyword::EndFor,
            "var" => Keyword::Var,
            "endvar" => Keyword::EndVar,
            "list" => Keyword::List,
            "endlist" => Keyword::EndList,
            "csv" => Keyword::Csv,
            "endcsv" => Keyword::EndCsv,
            "script" => Keyword::Script,
            "endscript" => Keyword::EndScript,
            "import" => Keyword::Import,
            other => return Err(KeywordError::Unrecognized(other.to_string())),
        };
        Ok(keyword)
    }
}

/// A keyword token found on a line, with its byte range in the line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordToken {
    pub token: String,
    pub start: usize,
    pub end: usize,
}

impl KeywordToken {
    pub fn keyword(&self) -> Result<Keyword, KeywordError> {
        self.token.parse()
    }
}

/// A `[name]` section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Lower-cased section name.
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// A `name = value` setting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingLine {
    /// Setting name as written.
    pub name: String,
    pub name_start: usize,
    pub name_end: usize,
    /// Value with surrounding whitespace removed.
    pub value: String,
    pub value_start: usize,
    pub value_end: usize,
}

/// The classification of a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Section(SectionHeader),
    Keyword(KeywordToken),
    Setting(SettingLine),
    Other,
}

// =============================================================================
// Recognition
// =============================================================================

fn keyword_regex() -> &'static Regex {
    static KEYWORD: OnceLock<Regex> = OnceLock::new();
    KEYWORD.get_or_init(|| {
        Regex::new(
            r"^\s*(elseif|else|endif|if|endfor|for|endvar|var|endlist|list|endcsv|csv|endscript|script|import)(?:\s|=|$)",
        )
        .expect("valid keyword regex")
    })
}

fn section_regex() -> &'static Regex {
    static SECTION: OnceLock<Regex> = OnceLock::new();
    SECTION.get_or_init(|| Regex::new(r"^\s*\[\s*([-\w]+)\s*\]").expect("valid section regex"))
}

fn setting_regex() -> &'static Regex {
    static SETTING: OnceLock<Regex> = OnceLock::new();
    SETTING.get_or_init(|| {
        Regex::new(r"^\s*([^\s=\[][^=]*?)\s*=\s*(.*?)\s*$").expect("valid setting regex")
    })
}

/// Find the leftmost keyword at or after byte `from` of the line.
///
/// Only whitespace may precede the keyword. Calling again with `from` set to
/// the previous match's `end` finds a second keyword on the same line.
pub fn recognize(line: &Line, from: usize) -> Option<KeywordToken> {
    let rest = line.normalized.get(from..)?;
    let caps = keyword_regex().captures(rest)?;
    let m = caps.get(1)?;
    Some(KeywordToken {
        token: m.as_str().to_string(),
        start: from + m.start(),
        end: from + m.end(),
    })
}

/// Recognize a `[name]` section header.
pub fn section_header(line: &Line) -> Option<SectionHeader> {
    let caps = section_regex().captures(&line.normalized)?;
    let m = caps.get(1)?;
    Some(SectionHeader {
        name: m.as_str().to_string(),
        start: m.start(),
        end: m.end(),
    })
}

/// Recognize a `name = value` setting.
pub fn setting(line: &Line) -> Option<SettingLine> {
    let caps = setting_regex().captures(&line.text)?;
    let name = caps.get(1)?;
    let value = caps.get(2)?;
    Some(SettingLine {
        name: name.as_str().to_string(),
        name_start: name.start(),
        name_end: name.end(),
        value: value.as_str().to_string(),
        value_start: value.start(),
        value_end: value.end(),
    })
}

/// Classify a line: section header, then keyword, then setting.
pub fn classify(line: &Line) -> LineKind {
    if line.is_blank() {
        return LineKind::Blank;
    }
    if let Some(header) = section_header(line) {
        return LineKind::Section(header);
    }
    if let Some(token) = recognize(line, 0) {
        return LineKind::Keyword(token);
    }
    if let Some(setting) = setting(line) {
        return LineKind::Setting(setting);
    }
    LineKind::Other
}

// =============================================================================
// Block openability
// =============================================================================

/// Decide whether an opening keyword on `lines[idx]` starts a multi-line
/// block that must be closed by its terminator.
///
/// `for`, `if` and `csv` always open. `var` and `list` open only when the
/// declaration continues on later lines. `script` opens when it has no
/// inline value, or when an `endscript` follows before any other `script`.
pub fn opens_block(keyword: Keyword, lines: &[Line], idx: usize) -> bool {
    let Some(line) = lines.get(idx) else {
        return false;
    };
    match keyword {
        Keyword::For | Keyword::If | Keyword::Csv => true,
        Keyword::Var => declaration_continues(inline_value(line)),
        Keyword::List => {
            declaration_continues(inline_value(line)) || list_continues_below(lines, idx)
        }
        Keyword::Script => {
            if inline_value(line).is_empty() {
                true
            } else {
                endscript_follows(lines, idx)
            }
        }
        Keyword::ElseIf
        | Keyword::Else
        | Keyword::EndIf
        | Keyword::EndFor
        | Keyword::EndVar
        | Keyword::EndList
        | Keyword::EndCsv
        | Keyword::EndScript
        | Keyword::Import => false,
    }
}

/// The text after the first `=` of a declaration line, trimmed.
pub fn inline_value(line: &Line) -> &str {
    match line.text.find('=') {
        Some(eq) => line.text[eq + 1..].trim(),
        None => "",
    }
}

fn declaration_continues(value: &str) -> bool {
    value.ends_with(',') || has_unclosed_bracket(value)
}

fn list_continues_below(lines: &[Line], idx: usize) -> bool {
    match lines.iter().skip(idx + 1).find(|l| !l.is_blank()) {
        Some(next) => {
            next.text.trim_start().starts_with(',') || next.normalized.contains("endlist")
        }
        None => false,
    }
}

fn endscript_follows(lines: &[Line], idx: usize) -> bool {
    for line in lines.iter().skip(idx + 1) {
        match recognize(line, 0).and_then(|t| t.keyword().ok()) {
            Some(Keyword::EndScript) => return true,
            Some(Keyword::Script) => return false,
            _ => {}
        }
    }
    false
}

/// True if `s` opens more `[`/`{` brackets than it closes, ignoring quoted text.
pub fn has_unclosed_bracket(s: &str) -> bool {
    let mut in_double = false;
    let mut in_single = false;
    let mut escape = false;
    let mut depth: i32 = 0;

    for c in s.chars() {
        if escape {
            escape = false;
            continue;
        }
        if c == '\\' && (in_double || in_single) {
            escape = true;
            continue;
        }
        if c == '"' && !in_single {
            in_double = !in_double;
        } else if c == '\'' && !in_double {
            in_single = !in_single;
        } else if !in_double && !in_single {
            match c {
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                _ => {}
            }
        }
    }
    depth > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn first(text: &str) -> LineKind {
        classify(&scan(text)[0])
    }

    #[test]
    fn test_keyword_parse_roundtrip_names() {
        for name in ["if", "elseif", "endscript", "import"] {
            let kw: Keyword = name.parse().unwrap();
            assert_eq!(kw.as_str(), name);
        }
        assert!("while".parse::<Keyword>().is_err());
    }

    #[test]
    fn test_classify_section() {
        match first("  [ Widget ]") {
            LineKind::Section(h) => {
                assert_eq!(h.name, "widget");
                assert_eq!((h.start, h.end), (4, 10));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_keyword() {
        match first("  FOR server in servers") {
            LineKind::Keyword(t) => {
                assert_eq!(t.keyword(), Ok(Keyword::For));
                assert_eq!((t.start, t.end), (2, 5));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keyword_requires_boundary() {
        assert!(matches!(first("listing = 1"), LineKind::Setting(_)));
        assert!(matches!(first("iframe = x"), LineKind::Setting(_)));
        assert!(matches!(first("script=1"), LineKind::Keyword(_)));
    }

    #[test]
    fn test_classify_setting() {
        match first("  entity-expression = a = b ") {
            LineKind::Setting(s) => {
                assert_eq!(s.name, "entity-expression");
                assert_eq!(s.value, "a = b");
                assert_eq!(s.name_start, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(first("  Russia, 65, 63"), LineKind::Other);
        assert_eq!(first("   "), LineKind::Blank);
    }

    #[test]
    fn test_second_keyword_on_line() {
        let lines = scan("endscript endif");
        let first = recognize(&lines[0], 0).unwrap();
        assert_eq!(first.token, "endscript");
        let second = recognize(&lines[0], first.end).unwrap();
        assert_eq!(second.token, "endif");
        assert_eq!(second.start, 10);
    }

    #[test]
    fn test_var_openability() {
        let lines = scan("var a = [\n1\n]\nendvar\nvar b = 5\nvar c = 1,\n2\nendvar");
        assert!(opens_block(Keyword::Var, &lines, 0));
        assert!(!opens_block(Keyword::Var, &lines, 4));
        assert!(opens_block(Keyword::Var, &lines, 5));
        let closed = scan("var d = [1, 2]");
        assert!(!opens_block(Keyword::Var, &closed, 0));
        let bare = scan("var e\nvar f =\n[series]");
        assert!(!opens_block(Keyword::Var, &bare, 0));
        assert!(!opens_block(Keyword::Var, &bare, 1));
    }

    #[test]
    fn test_list_openability() {
        let lines = scan("list a = x, y\n, z\nendlist\nlist b = x, y\nvar c = 1");
        assert!(opens_block(Keyword::List, &lines, 0));
        assert!(!opens_block(Keyword::List, &lines, 3));
        let ended = scan("list a = x, y\n\nendlist");
        assert!(opens_block(Keyword::List, &ended, 0));
    }

    #[test]
    fn test_script_openability() {
        let lines = scan("script\nx()\nendscript");
        assert!(opens_block(Keyword::Script, &lines, 0));
        let one_liner = scan("script = x()\nscript\ny()\nendscript");
        assert!(!opens_block(Keyword::Script, &one_liner, 0));
        assert!(opens_block(Keyword::Script, &one_liner, 1));
        let spanning = scan("script = x()\ny()\nendscript");
        assert!(opens_block(Keyword::Script, &spanning, 0));
    }

    #[test]
    fn test_unclosed_bracket() {
        assert!(has_unclosed_bracket("[1, {"));
        assert!(!has_unclosed_bracket("[1, 2]"));
        assert!(!has_unclosed_bracket("'['"));
    }
}
