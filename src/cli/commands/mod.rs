//! Subcommand implementations.

pub mod config;
pub mod plan;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::models::WorkItem;

/// Read a work item from a JSON or YAML file; `.json` selects JSON.
pub fn load_work_item(path: &Path) -> Result<WorkItem> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read work item from {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let item = if is_json {
        serde_json::from_str(&raw).context("Invalid work item JSON")?
    } else {
        serde_yaml::from_str(&raw).context("Invalid work item YAML")?
    };
    Ok(item)
}
