// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Retort plugin subsystem.

use thiserror::Error;

use crate::types::{Capability, PluginKind};

/// The primary error type used across the plugin registry, folder scanner,
/// and library loader.
#[derive(Debug, Error)]
pub enum RetortError {
    /// A plugin folder could not be listed. The message carries the
    /// offending path verbatim, `null` when the path was never resolved.
    #[error("Unable to list jar files in plugin folder '{path}'")]
    PluginFolder { path: String },

    /// A descriptor resource could not be parsed or registered. The registry
    /// is left unchanged when this is raised.
    #[error("plugin registration failed: {message}")]
    Registration {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested plugin id is not present in the catalog for its kind.
    #[error("plugin not found: {kind}/{id}")]
    PluginNotFound { kind: PluginKind, id: String },

    /// A descriptor was found but neither its class map nor any supplemental
    /// factory can produce the requested capability.
    #[error("no {capability} implementation mapped for plugin {kind}/{id}")]
    NoClassMapped {
        kind: PluginKind,
        id: String,
        capability: Capability,
    },

    /// A plugin library could not be opened.
    #[error("unable to load plugin library '{path}'")]
    LibraryLoad {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A constructor symbol was not exported by any library of the loader
    /// or the enclosing process.
    #[error("symbol '{symbol}' not found in loader '{loader}'")]
    SymbolNotFound { symbol: String, loader: String },

    /// Configuration errors (invalid TOML, unknown kind names, bad paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RetortError {
    /// Shorthand for a [`RetortError::Registration`] with a plain message.
    pub fn registration(message: impl Into<String>) -> Self {
        RetortError::Registration {
            message: message.into(),
            source: None,
        }
    }
}
