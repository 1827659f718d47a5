// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin folder scanning.
//!
//! A [`PluginFolder`] walks one plugin root directory and enumerates the
//! candidate archives inside it. The walk is a pure filesystem read: archive
//! files at the top level are collected directly, subdirectories are scanned
//! exactly one level deep, `lib/` directories are skipped unless requested,
//! and a directory containing the ignore marker is skipped entirely.

use std::path::{Path, PathBuf};

use retort_core::RetortError;
use tracing::{debug, warn};

/// File extension of plugin archives.
pub const ARCHIVE_EXTENSION: &str = "jar";

/// Marker file suppressing the scan of the directory it resides in.
pub const IGNORE_MARKER: &str = ".kettle-ignore";

/// One plugin root directory to scan for archives.
#[derive(Debug, Clone)]
pub struct PluginFolder {
    root: Option<PathBuf>,
    include_lib: bool,
}

impl PluginFolder {
    /// Creates a folder over `root`. `include_lib` controls whether `lib/`
    /// subdirectories are scanned too.
    pub fn new(root: impl Into<PathBuf>, include_lib: bool) -> Self {
        Self {
            root: Some(root.into()),
            include_lib,
        }
    }

    /// A folder whose location could not be resolved (unset config value).
    /// Scanning it always fails with the folder-access error.
    pub fn unresolved() -> Self {
        Self {
            root: None,
            include_lib: false,
        }
    }

    /// The folder's root path, if resolved.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Enumerates the plugin archives in this folder.
    ///
    /// Top-level `*.jar` files are included directly. A directory named
    /// `lib` is skipped unless `include_lib` was set. A directory whose own
    /// name ends in the archive extension is not an archive; it is scanned
    /// like any other subdirectory. A directory containing the ignore
    /// marker is skipped without recursion. All other directories are
    /// scanned exactly one level deep.
    ///
    /// An unreadable child directory is logged and skipped; an unreadable
    /// or unresolved root fails with [`RetortError::PluginFolder`] and no
    /// partial results.
    pub fn find_archives(&self) -> Result<Vec<PathBuf>, RetortError> {
        let Some(root) = &self.root else {
            return Err(self.access_error());
        };

        let entries = std::fs::read_dir(root).map_err(|_| self.access_error())?;

        let mut archives = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();

            if path.is_file() {
                if is_archive(&path) {
                    archives.push(path);
                }
                continue;
            }
            if !path.is_dir() {
                continue;
            }

            if !self.include_lib && path.file_name().is_some_and(|name| name == "lib") {
                continue;
            }
            if path.join(IGNORE_MARKER).exists() {
                debug!(directory = %path.display(), "skipping ignored plugin directory");
                continue;
            }

            let children = match std::fs::read_dir(&path) {
                Ok(children) => children,
                Err(err) => {
                    warn!(directory = %path.display(), error = %err, "unable to scan plugin subdirectory");
                    continue;
                }
            };
            for child in children.flatten() {
                let child_path = child.path();
                if child_path.is_file() && is_archive(&child_path) {
                    archives.push(child_path);
                }
            }
        }

        archives.sort();
        Ok(archives)
    }

    fn access_error(&self) -> RetortError {
        RetortError::PluginFolder {
            path: self
                .root
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "null".to_string()),
        }
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
}
