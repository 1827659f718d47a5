// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./retort.toml` > `~/.config/retort/retort.toml`
//! > `/etc/retort/retort.toml`, with environment variable overrides via the
//! `RETORT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RetortConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/retort/retort.toml` (system-wide)
/// 3. `~/.config/retort/retort.toml` (user XDG config)
/// 4. `./retort.toml` (local directory)
/// 5. `RETORT_*` environment variables
pub fn load_config() -> Result<RetortConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RetortConfig::default()))
        .merge(Toml::file("/etc/retort/retort.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("retort/retort.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("retort.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from inline TOML content only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RetortConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RetortConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RetortConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RetortConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping. `RETORT_PLUGINS_INCLUDE_LIB_FOLDERS` must map to
/// `plugins.include_lib_folders`, not `plugins.include.lib.folders`.
fn env_provider() -> Env {
    Env::prefixed("RETORT_").map(|key| {
        let mapped = key.as_str().replacen("plugins_", "plugins.", 1);
        mapped.into()
    })
}
