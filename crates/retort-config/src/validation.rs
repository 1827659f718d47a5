// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty folder entries and known plugin kind names.

use std::str::FromStr;

use retort_core::{PluginKind, RetortError};

use crate::model::RetortConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or all collected validation
/// errors (does not fail fast).
pub fn validate_config(config: &RetortConfig) -> Result<(), Vec<RetortError>> {
    let mut errors = Vec::new();

    for folder in &config.plugins.folders {
        if folder.trim().is_empty() {
            errors.push(RetortError::Config(
                "plugins.folders entries must not be empty".to_string(),
            ));
        }
    }

    for (kind, path) in &config.plugins.natives_files {
        if PluginKind::from_str(kind).is_err() {
            errors.push(RetortError::Config(format!(
                "plugins.natives_files: unknown plugin kind `{kind}`"
            )));
        }
        if path.trim().is_empty() {
            errors.push(RetortError::Config(format!(
                "plugins.natives_files.{kind} must not be empty"
            )));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
