//! Setting value checks against the schema type.

use crate::catalog::{Setting, SettingType};
use regex::Regex;
use std::sync::OnceLock;

const BOOLEAN_VALUES: &[&str] = &[
    "false", "no", "null", "none", "0", "off", "true", "yes", "on", "1",
];

fn integer_regex() -> &'static Regex {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    INTEGER.get_or_init(|| Regex::new(r"^[-+]?\d+$").expect("valid integer regex"))
}

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"^[-+]?(\.\d+|\d+(\.\d+)?)$").expect("valid number regex"))
}

/// True if `value` is a template the engine cannot evaluate statically.
pub fn is_templated(value: &str) -> bool {
    value.contains("@{") || value.contains("${")
}

/// Check a literal value against its setting's schema.
///
/// Returns the diagnostic message on mismatch. Interval and date values are
/// always accepted, as are string values.
pub fn check_value(setting: &Setting, value: &str) -> Option<String> {
    let name = &setting.display_name;
    match setting.setting_type {
        SettingType::Integer => {
            if !integer_regex().is_match(value) {
                return Some(type_message(setting));
            }
            check_bounds(setting, value)
        }
        SettingType::Number => {
            if !number_regex().is_match(value) {
                return Some(type_message(setting));
            }
            check_bounds(setting, value)
        }
        SettingType::Boolean => {
            let lower = value.to_lowercase();
            if BOOLEAN_VALUES.contains(&lower.as_str()) {
                None
            } else {
                Some(type_message(setting))
            }
        }
        SettingType::Enum => {
            let matches = setting
                .enum_values
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(value));
            if matches || setting.enum_values.is_empty() {
                None
            } else {
                Some(format!(
                    "{} must be one of:\n * {}",
                    name,
                    setting.enum_values.join("\n * ")
                ))
            }
        }
        SettingType::String | SettingType::Interval | SettingType::Date => None,
    }
}

fn type_message(setting: &Setting) -> String {
    format!("{} type is {}", setting.display_name, setting.setting_type)
}

fn check_bounds(setting: &Setting, value: &str) -> Option<String> {
    let number: f64 = value.parse().ok()?;
    if let Some(min) = setting.min_value {
        if number < min {
            return Some(format!(
                "{} should be greater or equal than {}",
                setting.display_name, min
            ));
        }
    }
    if let Some(max) = setting.max_value {
        if number > max {
            return Some(format!(
                "{} should be less or equal than {}",
                setting.display_name, max
            ));
        }
    }
    None
}
