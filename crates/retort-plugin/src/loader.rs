// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Isolated library loading.
//!
//! A [`LibraryLoader`] is the code-loading unit owned by one plugin or
//! shared by a classloader group. It opens its library set lazily with
//! `libloading` and keeps the handles alive for as long as the loader
//! itself is referenced, so instances created from it stay valid. Symbol
//! lookups walk the library set in order and fall back to symbols already
//! linked into the host process.
//!
//! Loader sharing and invalidation are owned by the registry: the registry
//! hands out `Arc` handles and drops them when group membership changes,
//! which unloads the libraries once the last consumer lets go.

use std::any::Any;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use libloading::Library;
use retort_core::{PluginInstance, RetortError};
use tracing::debug;

/// Shared handle to a loader. Two descriptors in the same classloader group
/// observe the identical handle while both stay registered.
pub type LoaderHandle = std::sync::Arc<LibraryLoader>;

/// Entry-point signature every plugin library exports per implementation:
/// a `retort_create_*` constructor returning a boxed instance via
/// `Box::into_raw`.
pub type RawConstructor = unsafe extern "C" fn() -> *mut (dyn Any + Send + Sync);

/// A code-loading unit over an ordered set of library paths.
pub struct LibraryLoader {
    label: String,
    paths: Vec<PathBuf>,
    libraries: Mutex<Option<Vec<Library>>>,
}

impl std::fmt::Debug for LibraryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryLoader")
            .field("label", &self.label)
            .field("paths", &self.paths)
            .finish()
    }
}

impl LibraryLoader {
    /// Creates a loader over `paths`. Libraries are not opened until the
    /// first symbol lookup.
    pub fn new(label: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            label: label.into(),
            paths,
            libraries: Mutex::new(None),
        }
    }

    /// The loader's display label (plugin name or group name).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The ordered library paths this loader resolves symbols from.
    pub fn library_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Instantiates the implementation behind `symbol`.
    ///
    /// Walks the loader's libraries in order; the first one exporting the
    /// symbol wins. Falls back to the host process image, mirroring
    /// parent-delegation lookup.
    pub fn instantiate(&self, symbol: &str) -> Result<PluginInstance, RetortError> {
        let constructor = self.constructor(symbol)?;
        // SAFETY: the constructor was resolved from a library this loader
        // keeps alive (or from the process image) and follows the
        // `Box::into_raw` entry-point convention.
        let raw = unsafe { constructor() };
        if raw.is_null() {
            return Err(RetortError::Internal(format!(
                "constructor '{symbol}' in loader '{}' returned null",
                self.label
            )));
        }
        Ok(unsafe { Box::from_raw(raw) })
    }

    fn constructor(&self, symbol: &str) -> Result<RawConstructor, RetortError> {
        let own = self.with_libraries(|libraries| {
            for library in libraries {
                // SAFETY: the symbol is only used as a RawConstructor, the
                // ABI every plugin entry point is required to export.
                if let Ok(found) = unsafe { library.get::<RawConstructor>(symbol.as_bytes()) } {
                    return Some(*found);
                }
            }
            None
        })?;

        own.or_else(|| host_constructor(symbol))
            .ok_or_else(|| RetortError::SymbolNotFound {
                symbol: symbol.to_string(),
                loader: self.label.clone(),
            })
    }

    /// Opens the library set on first use and runs `f` over it.
    fn with_libraries<T>(&self, f: impl FnOnce(&[Library]) -> T) -> Result<T, RetortError> {
        let mut guard = self
            .libraries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if guard.is_none() {
            let mut opened = Vec::with_capacity(self.paths.len());
            for path in &self.paths {
                // SAFETY: loading a shared library runs its initializers; the
                // plugin is trusted once it is placed into a plugin folder.
                let library = unsafe { Library::new(path) }.map_err(|err| {
                    RetortError::LibraryLoad {
                        path: path.display().to_string(),
                        source: Box::new(err),
                    }
                })?;
                opened.push(library);
            }
            debug!(loader = %self.label, libraries = opened.len(), "opened plugin library set");
            *guard = Some(opened);
        }

        Ok(f(guard.as_deref().unwrap_or_default()))
    }
}

/// Looks a constructor up in the host process image.
#[cfg(unix)]
fn host_constructor(symbol: &str) -> Option<RawConstructor> {
    let this = libloading::os::unix::Library::this();
    // SAFETY: same ABI contract as plugin-exported constructors.
    let found = unsafe { this.get::<RawConstructor>(symbol.as_bytes()) }.ok()?;
    Some(*found)
}

#[cfg(not(unix))]
fn host_constructor(_symbol: &str) -> Option<RawConstructor> {
    None
}
