//! Declared-name registry for `list`, `var`, `csv` and active `for` variables.
//!
//! A name lives in at most one bucket. Loop variables form a stack: one entry
//! per open `for`, removed at the matching `endfor`.

use tracing::trace;

/// The kind of declaration that introduced a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    List,
    Var,
    Csv,
    ForVariable,
}

/// Tracks declared names for one validation run.
#[derive(Debug, Clone, Default)]
pub struct ScopeTracker {
    list_names: Vec<String>,
    var_names: Vec<String>,
    csv_names: Vec<String>,
    /// `None` marks a loop whose variable clashed with an existing name.
    for_variables: Vec<Option<String>>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bucket currently holding `name`, if any.
    pub fn owner(&self, name: &str) -> Option<Bucket> {
        if self.list_names.iter().any(|n| n == name) {
            Some(Bucket::List)
        } else if self.var_names.iter().any(|n| n == name) {
            Some(Bucket::Var)
        } else if self.csv_names.iter().any(|n| n == name) {
            Some(Bucket::Csv)
        } else if self.for_variables.iter().flatten().any(|n| n == name) {
            Some(Bucket::ForVariable)
        } else {
            None
        }
    }

    /// Register a `list`, `var` or `csv` name.
    ///
    /// Returns `false` and leaves the original owner in place when the name
    /// is already declared in any bucket.
    pub fn declare(&mut self, bucket: Bucket, name: &str) -> bool {
        if self.owner(name).is_some() {
            return false;
        }
        trace!(?bucket, name, "declare");
        let names = match bucket {
            Bucket::List => &mut self.list_names,
            Bucket::Var => &mut self.var_names,
            Bucket::Csv => &mut self.csv_names,
            Bucket::ForVariable => {
                self.for_variables.push(Some(name.to_string()));
                return true;
            }
        };
        names.push(name.to_string());
        true
    }

    /// Enter a `for` loop binding `variable`.
    ///
    /// Always pushes a loop entry so that `exit_loop` stays balanced; returns
    /// `false` when the variable name is already taken.
    pub fn enter_loop(&mut self, variable: &str) -> bool {
        if self.owner(variable).is_some() {
            self.for_variables.push(None);
            return false;
        }
        self.declare(Bucket::ForVariable, variable)
    }

    /// Leave the innermost `for` loop.
    pub fn exit_loop(&mut self) {
        self.for_variables.pop();
    }

    pub fn in_loop(&self) -> bool {
        !self.for_variables.is_empty()
    }

    /// True if `name` is a `list`, `var` or `csv` name (a valid loop target).
    pub fn is_collection(&self, name: &str) -> bool {
        matches!(
            self.owner(name),
            Some(Bucket::List | Bucket::Var | Bucket::Csv)
        )
    }

    /// True if `name` resolves in any bucket.
    pub fn resolves(&self, name: &str) -> bool {
        self.owner(name).is_some()
    }

    /// `list`, `var` and `csv` names, in that order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.list_names
            .iter()
            .chain(&self.var_names)
            .chain(&self.csv_names)
            .map(String::as_str)
    }

    /// Every name in effect, loop variables last.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.collection_names()
            .chain(self.for_variables.iter().flatten().map(String::as_str))
    }
}

/// A bare identifier inside an `@{...}` expression, with its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

const LITERALS: &[&str] = &["true", "false", "null", "undefined", "typeof", "new", "in"];

/// Collect the free identifiers referenced by `@{...}` expressions in `text`.
///
/// Property accesses (`.name`), function calls (`name(`), numbers, quoted
/// strings and JavaScript literals are skipped.
pub fn expression_identifiers(text: &str) -> Vec<Identifier> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while let Some(offset) = text[i..].find("@{") {
        let open = i + offset + 2;
        let close = matching_brace(bytes, open).unwrap_or(bytes.len());
        scan_expression(text, open, close, &mut found);
        i = (close + 1).min(bytes.len());
        if i >= bytes.len() {
            break;
        }
    }
    found
}

/// Byte index of the `}` closing an expression that starts at `from`.
fn matching_brace(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(i),
            b'}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn scan_expression(text: &str, start: usize, end: usize, found: &mut Vec<Identifier>) {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < end {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            i += 1;
            while i < end && bytes[i] != b {
                i += 1;
            }
            i += 1;
        } else if b.is_ascii_digit() {
            while i < end && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
        } else if b.is_ascii_alphabetic() || b == b'_' || b == b'$' {
            let token_start = i;
            while i < end && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$')
            {
                i += 1;
            }
            let name = &text[token_start..i];
            let after_dot = token_start > start && bytes[token_start - 1] == b'.';
            let is_call = text[i..end].trim_start().starts_with('(');
            if !after_dot && !is_call && !LITERALS.contains(&name) {
                found.push(Identifier {
                    name: name.to_string(),
                    start: token_start,
                    end: i,
                });
            }
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(text: &str) -> Vec<String> {
        expression_identifiers(text)
            .into_iter()
            .map(|id| id.name)
            .collect()
    }

    #[test]
    fn test_declare_once_across_buckets() {
        let mut scope = ScopeTracker::new();
        assert!(scope.declare(Bucket::List, "servers"));
        assert!(!scope.declare(Bucket::Var, "servers"));
        assert_eq!(scope.owner("servers"), Some(Bucket::List));
    }

    #[test]
    fn test_loop_variables_stack() {
        let mut scope = ScopeTracker::new();
        scope.declare(Bucket::List, "servers");
        assert!(scope.enter_loop("server"));
        assert!(scope.resolves("server"));
        assert!(!scope.is_collection("server"));
        assert!(!scope.enter_loop("server"));
        scope.exit_loop();
        assert!(scope.resolves("server"));
        scope.exit_loop();
        assert!(!scope.resolves("server"));
        assert!(!scope.in_loop());
    }

    #[test]
    fn test_collection_names_order() {
        let mut scope = ScopeTracker::new();
        scope.declare(Bucket::Csv, "c");
        scope.declare(Bucket::List, "l");
        scope.declare(Bucket::Var, "v");
        scope.enter_loop("f");
        assert_eq!(scope.collection_names().collect::<Vec<_>>(), vec!["l", "v", "c"]);
        assert_eq!(scope.all_names().last(), Some("f"));
    }

    #[test]
    fn test_expression_identifiers() {
        assert_eq!(names("entity = @{server}"), vec!["server"]);
        assert_eq!(names("@{country.name} @{x + y}"), vec!["country", "x", "y"]);
        assert_eq!(names("@{keepAfterLast(server, '-')}"), vec!["server"]);
        assert_eq!(names("@{'literal' + 10 + true}"), Vec::<String>::new());
        assert_eq!(names("no expressions here"), Vec::<String>::new());
    }

    #[test]
    fn test_identifier_ranges() {
        let ids = expression_identifiers("label = @{srv}");
        assert_eq!((ids[0].start, ids[0].end), (10, 13));
    }

    #[test]
    fn test_unterminated_expression() {
        assert_eq!(names("@{server"), vec!["server"]);
    }
}
