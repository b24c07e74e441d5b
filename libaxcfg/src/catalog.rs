//! Settings schema and static section vocabulary.
//!
//! A [`SettingsCatalog`] maps normalized setting names to their schema. It is
//! built once from descriptor data and never mutated afterwards, so a single
//! catalog can be shared by any number of validation runs. The built-in
//! catalog is parsed lazily from `data/settings.json`.
//!
//! The section tables (vocabulary, parents, required settings) are fixed by
//! the language and live here as plain functions over `&'static` data.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

const BUILTIN_DESCRIPTORS: &str = include_str!("../data/settings.json");

/// The declared type of a setting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    String,
    Number,
    Integer,
    Boolean,
    Enum,
    Interval,
    Date,
}

impl SettingType {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Number => "number",
            SettingType::Integer => "integer",
            SettingType::Boolean => "boolean",
            SettingType::Enum => "enum",
            SettingType::Interval => "interval",
            SettingType::Date => "date",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        let t = match name.to_ascii_lowercase().as_str() {
            "string" => SettingType::String,
            "number" => SettingType::Number,
            "integer" => SettingType::Integer,
            "boolean" => SettingType::Boolean,
            "enum" => SettingType::Enum,
            "interval" => SettingType::Interval,
            "date" => SettingType::Date,
            _ => return None,
        };
        Some(t)
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting descriptor as supplied by external schema data.
///
/// Every field is optional here; incomplete descriptors are dropped when the
/// catalog is built.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDescriptor {
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub setting_type: Option<String>,
    pub example: Option<serde_json::Value>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub excludes: Option<Vec<String>>,
    pub multi_line: Option<bool>,
}

/// The schema of one setting.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    /// Normalized lookup name.
    pub name: String,
    pub display_name: String,
    pub setting_type: SettingType,
    pub enum_values: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Normalized names of mutually exclusive settings.
    pub excludes: Vec<String>,
    /// Repetition checks do not apply to multi-line settings.
    pub multi_line: bool,
}

/// Read-only mapping from normalized setting name to schema.
#[derive(Debug, Clone, Default)]
pub struct SettingsCatalog {
    settings: HashMap<String, Setting>,
    display_names: Vec<String>,
}

impl SettingsCatalog {
    /// Build a catalog from descriptors, dropping incomplete ones.
    pub fn from_descriptors(descriptors: Vec<SettingDescriptor>) -> Result<Self> {
        let mut catalog = SettingsCatalog::default();
        for descriptor in descriptors {
            let (Some(display_name), Some(type_name), Some(_)) = (
                descriptor.display_name,
                descriptor.setting_type,
                descriptor.example,
            ) else {
                debug!("dropping incomplete setting descriptor");
                continue;
            };
            let setting_type = SettingType::parse(&type_name)
                .ok_or_else(|| Error::UnknownType(type_name.clone(), display_name.clone()))?;
            let name = normalize_name(&display_name);
            let setting = Setting {
                name: name.clone(),
                display_name: display_name.clone(),
                setting_type,
                enum_values: descriptor.enum_values.unwrap_or_default(),
                min_value: descriptor.min_value,
                max_value: descriptor.max_value,
                excludes: descriptor
                    .excludes
                    .unwrap_or_default()
                    .iter()
                    .map(|s| normalize_name(s))
                    .collect(),
                multi_line: descriptor.multi_line.unwrap_or(false),
            };
            if catalog.settings.insert(name, setting).is_none() {
                catalog.display_names.push(display_name);
            }
        }
        debug!(settings = catalog.settings.len(), "settings catalog built");
        Ok(catalog)
    }

    /// Build a catalog from a JSON array of descriptors.
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptors: Vec<SettingDescriptor> = serde_json::from_str(json)?;
        Self::from_descriptors(descriptors)
    }

    /// The catalog compiled into the library.
    pub fn builtin() -> &'static SettingsCatalog {
        static BUILTIN: OnceLock<SettingsCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            SettingsCatalog::from_json(BUILTIN_DESCRIPTORS).unwrap_or_else(|e| {
                debug!("built-in settings catalog is invalid: {}", e);
                SettingsCatalog::default()
            })
        })
    }

    /// Look up a setting by any spelling of its name.
    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.get(&normalize_name(name))
    }

    /// Display names in catalog order, for suggestions.
    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.display_names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

/// Normalize a setting name: ASCII lower-case, keeping only `[a-z0-9]`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// =============================================================================
// Section tables
// =============================================================================

/// Every section name the language knows.
pub const SECTIONS: &[&str] = &[
    "configuration",
    "group",
    "widget",
    "series",
    "column",
    "node",
    "link",
    "tags",
    "tag",
    "keys",
    "properties",
    "property",
    "dropdown",
    "option",
    "threshold",
    "placeholders",
    "other",
];

pub fn is_known_section(name: &str) -> bool {
    SECTIONS.contains(&name)
}

/// Sections that may directly enclose `name`.
pub fn parent_sections(name: &str) -> &'static [&'static str] {
    match name {
        "group" => &["configuration"],
        "widget" => &["group", "configuration"],
        "series" => &["widget", "column"],
        "column" | "node" | "link" | "dropdown" | "threshold" | "property" | "keys"
        | "placeholders" | "other" => &["widget"],
        "tags" | "tag" => &["series", "widget"],
        "option" => &["dropdown"],
        "properties" => &["property"],
        _ => &[],
    }
}

/// Pairs of sections the formatter places at the same indentation even
/// when one may enclose the other.
pub fn same_level(a: &str, b: &str) -> bool {
    const PAIRS: &[(&str, &str)] = &[
        ("group", "configuration"),
        ("node", "link"),
        ("series", "link"),
    ];
    PAIRS
        .iter()
        .any(|&(x, y)| (a == x && b == y) || (a == y && b == x))
}

/// Sections whose setting names are user-defined.
pub fn is_free_form(section: &str) -> bool {
    matches!(section, "tags" | "keys" | "properties" | "placeholders")
}

/// Groups of alternative settings; each group needs at least one member set.
pub fn required_groups(section: &str) -> &'static [&'static [&'static str]] {
    match section {
        "series" => &[
            &["entity", "entities", "entity-expression", "entity-group", "value"],
            &["metric", "table", "attribute", "value"],
        ],
        "widget" => &[&["type"]],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Entity-Expression"), "entityexpression");
        assert_eq!(normalize_name("entity expression"), "entityexpression");
        assert_eq!(normalize_name("series_limit"), "serieslimit");
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = SettingsCatalog::builtin();
        assert!(!catalog.is_empty());
        let metric = catalog.get("METRIC").unwrap();
        assert_eq!(metric.display_name, "metric");
        assert_eq!(metric.excludes, vec!["table".to_string()]);
        assert_eq!(catalog.get("height_units").unwrap().setting_type, SettingType::Integer);
        assert!(catalog.get("script").unwrap().multi_line);
    }

    #[test]
    fn test_incomplete_descriptors_dropped() {
        let catalog = SettingsCatalog::from_json(
            r#"[
                {"displayName": "a", "type": "string", "example": "x"},
                {"displayName": "b", "type": "string"},
                {"type": "number", "example": 1}
            ]"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("a").is_some());
        assert!(catalog.get("b").is_none());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = SettingsCatalog::from_json(
            r#"[{"displayName": "a", "type": "color", "example": "red"}]"#,
        );
        assert!(matches!(result, Err(Error::UnknownType(_, _))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SettingsCatalog::from_json("not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_section_tables() {
        assert!(is_known_section("series"));
        assert!(!is_known_section("serie"));
        assert_eq!(parent_sections("series"), &["widget", "column"]);
        assert!(parent_sections("configuration").is_empty());
        assert!(same_level("configuration", "group"));
        assert!(same_level("link", "series"));
        assert!(!same_level("widget", "series"));
        assert_eq!(required_groups("series").len(), 2);
    }
}
