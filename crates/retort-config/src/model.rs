// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Retort engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Retort configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetortConfig {
    /// Plugin discovery settings.
    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// Plugin discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Plugin root folders scanned at startup.
    #[serde(default = "default_plugin_folders")]
    pub folders: Vec<String>,

    /// Whether `lib/` subdirectories of plugin folders are scanned too.
    #[serde(default)]
    pub include_lib_folders: bool,

    /// External natives-descriptor file per plugin kind, keyed by kind name
    /// (e.g. `Step`). Used when a kind ships no embedded descriptor.
    #[serde(default)]
    pub natives_files: HashMap<String, String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            folders: default_plugin_folders(),
            include_lib_folders: false,
            natives_files: HashMap::new(),
        }
    }
}

fn default_plugin_folders() -> Vec<String> {
    vec!["plugins".to_string()]
}
