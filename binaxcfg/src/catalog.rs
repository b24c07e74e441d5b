//! Loading setting descriptors from YAML or JSON files.

use crate::error::{CliError, Result};
use libaxcfg::{SettingDescriptor, SettingsCatalog};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load a catalog from `path`. `.yaml` and `.yml` files are read as YAML,
/// anything else as JSON.
pub fn load(path: &Path) -> Result<SettingsCatalog> {
    let text = fs::read_to_string(path).map_err(|e| CliError::io(path.display().to_string(), e))?;
    let catalog = parse(&text, is_yaml(path))?;
    debug!(path = %path.display(), settings = catalog.len(), "loaded settings catalog");
    Ok(catalog)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

fn parse(text: &str, yaml: bool) -> Result<SettingsCatalog> {
    let descriptors: Vec<SettingDescriptor> = if yaml {
        serde_yaml::from_str(text)?
    } else {
        serde_json::from_str(text)?
    };
    Ok(SettingsCatalog::from_descriptors(descriptors)?)
}
