//! `axcfg.toml` handling.
//!
//! ```toml
//! [format]
//! tab-size = 2
//! insert-spaces = true
//!
//! [catalog]
//! path = "settings.yaml"
//! ```
//!
//! Every key is optional. Command-line flags take precedence over the file.

use crate::error::{CliError, Result};
use libaxcfg::FormattingOptions;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, TableLike};
use tracing::debug;

/// Configuration file looked up in the working directory.
pub const DEFAULT_FILE: &str = "axcfg.toml";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub tab_size: Option<u32>,
    pub insert_spaces: Option<bool>,
    pub catalog: Option<PathBuf>,
}

impl Config {
    /// Parse configuration text.
    pub fn parse(input: &str) -> Result<Self> {
        let doc: DocumentMut = input
            .parse::<DocumentMut>()
            .map_err(|e| CliError::Config(format!("TOML parse error: {}", e)))?;

        let mut config = Config::default();
        if let Some(format) = table(&doc, "format")? {
            if let Some(item) = format.get("tab-size") {
                let n = item
                    .as_integer()
                    .ok_or_else(|| CliError::Config("format.tab-size must be an integer".into()))?;
                let n = u32::try_from(n)
                    .map_err(|_| CliError::Config(format!("format.tab-size out of range: {}", n)))?;
                config.tab_size = Some(n);
            }
            if let Some(item) = format.get("insert-spaces") {
                let b = item.as_bool().ok_or_else(|| {
                    CliError::Config("format.insert-spaces must be a boolean".into())
                })?;
                config.insert_spaces = Some(b);
            }
        }
        if let Some(catalog) = table(&doc, "catalog")? {
            if let Some(item) = catalog.get("path") {
                let path = item
                    .as_str()
                    .ok_or_else(|| CliError::Config("catalog.path must be a string".into()))?;
                config.catalog = Some(PathBuf::from(path));
            }
        }
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| CliError::io(path.display().to_string(), e))?;
        debug!(path = %path.display(), "loaded configuration");
        Self::parse(&text)
    }

    /// Load `explicit` if given, else `axcfg.toml` when it exists, else defaults.
    pub fn discover(explicit: Option<&str>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(Path::new(path)),
            None => {
                let default = Path::new(DEFAULT_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Formatting options with command-line overrides applied.
    pub fn formatting_options(&self, tab_size: Option<u32>, use_tabs: bool) -> FormattingOptions {
        let defaults = FormattingOptions::default();
        FormattingOptions {
            tab_size: tab_size.or(self.tab_size).unwrap_or(defaults.tab_size),
            insert_spaces: if use_tabs {
                false
            } else {
                self.insert_spaces.unwrap_or(defaults.insert_spaces)
            },
        }
    }
}

fn table<'d>(doc: &'d DocumentMut, key: &str) -> Result<Option<&'d dyn TableLike>> {
    match doc.get(key) {
        None => Ok(None),
        Some(Item::Table(t)) => Ok(Some(t as &dyn TableLike)),
        Some(item) => item
            .as_table_like()
            .map(Some)
            .ok_or_else(|| CliError::Config(format!("[{}] must be a table", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            "[format]\ntab-size = 4\ninsert-spaces = false\n[catalog]\npath = \"s.yaml\"\n",
        )
        .unwrap();
        assert_eq!(config.tab_size, Some(4));
        assert_eq!(config.insert_spaces, Some(false));
        assert_eq!(config.catalog, Some(PathBuf::from("s.yaml")));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Config::parse("[format]\ntab-size = \"two\"\n"),
            Err(CliError::Config(_))
        ));
        assert!(matches!(
            Config::parse("[format]\ntab-size = -1\n"),
            Err(CliError::Config(_))
        ));
        assert!(matches!(Config::parse("format = 1"), Err(CliError::Config(_))));
        assert!(matches!(Config::parse("[format"), Err(CliError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let config = Config {
            tab_size: Some(4),
            insert_spaces: Some(true),
            catalog: None,
        };
        assert_eq!(
            config.formatting_options(None, false),
            FormattingOptions {
                tab_size: 4,
                insert_spaces: true
            }
        );
        assert_eq!(
            config.formatting_options(Some(8), true),
            FormattingOptions {
                tab_size: 8,
                insert_spaces: false
            }
        );
        assert_eq!(
            Config::default().formatting_options(None, false),
            FormattingOptions::default()
        );
    }
}
