//! Column counting for inline `csv` blocks.

use crate::keyword::inline_value;
use crate::scanner::Line;
use regex::Regex;
use std::sync::OnceLock;

fn field_regex() -> &'static Regex {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    FIELD.get_or_init(|| {
        Regex::new(r#"'[^']*'|"[^"]*"|[^,\s]+"#).expect("valid csv field regex")
    })
}

/// Count the fields of a csv row.
///
/// A quoted string is one field even when it contains commas or spaces;
/// unquoted tokens are separated by commas and whitespace.
pub fn count_columns(row: &str) -> usize {
    field_regex().find_iter(row).count()
}

/// State of an open `csv` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvBlock {
    /// Expected column count, once the header row has been seen.
    pub columns: Option<usize>,
}

impl CsvBlock {
    /// Start a block at its `csv` declaration line.
    ///
    /// The header is the inline value after `=`; without one, the first
    /// non-blank row of the body becomes the header.
    pub fn open(declaration: &Line) -> Self {
        let value = inline_value(declaration);
        let columns = if value.is_empty() {
            None
        } else {
            Some(count_columns(value))
        };
        CsvBlock { columns }
    }

    /// Check one body row, returning the mismatch message if any.
    pub fn check_row(&mut self, row: &Line) -> Option<String> {
        if row.is_blank() {
            return None;
        }
        let found = count_columns(&row.text);
        match self.columns {
            None => {
                self.columns = Some(found);
                None
            }
            Some(expected) if expected != found => Some(format!(
                "Expected {} columns, but found {}",
                expected, found
            )),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    #[test]
    fn test_count_columns() {
        assert_eq!(count_columns("name, value1, value2"), 3);
        assert_eq!(count_columns("  USA, 63, 63, 63"), 4);
        assert_eq!(count_columns("'New York, NY', 8"), 2);
        assert_eq!(count_columns("a b\tc"), 3);
        assert_eq!(count_columns(""), 0);
    }

    #[test]
    fn test_inline_header() {
        let lines = scan("csv countries = name, value1, value2\n  Russia, 65, 63\n  USA, 63, 63, 63");
        let mut block = CsvBlock::open(&lines[0]);
        assert_eq!(block.columns, Some(3));
        assert_eq!(block.check_row(&lines[1]), None);
        assert_eq!(
            block.check_row(&lines[2]),
            Some("Expected 3 columns, but found 4".to_string())
        );
    }

    #[test]
    fn test_header_on_next_row() {
        let lines = scan("csv countries\n\n  name, value\n  Russia, 65\n  USA");
        let mut block = CsvBlock::open(&lines[0]);
        assert_eq!(block.columns, None);
        assert_eq!(block.check_row(&lines[1]), None);
        assert_eq!(block.check_row(&lines[2]), None);
        assert_eq!(block.check_row(&lines[3]), None);
        assert_eq!(
            block.check_row(&lines[4]),
            Some("Expected 2 columns, but found 1".to_string())
        );
    }
}
