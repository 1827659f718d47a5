// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Retort data-integration engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{PluginsConfig, RetortConfig};

use retort_core::RetortError;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid [`RetortConfig`] or the list of configuration
/// errors found.
pub fn load_and_validate() -> Result<RetortConfig, Vec<RetortError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![RetortError::Config(err.to_string())]),
    }
}

/// Load configuration from inline TOML content and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<RetortConfig, Vec<RetortError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![RetortError::Config(err.to_string())]),
    }
}
