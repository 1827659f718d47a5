// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin discovery, merge, and isolated loading for the Retort engine.
//!
//! The subsystem walks plugin folders for archives, parses descriptor
//! documents through per-kind handlers, and maintains the central
//! [`registry::PluginRegistry`]: kind -> id -> descriptor, classloader
//! groups with shared library loaders, fragment merge bookkeeping, and
//! supplemental instance factories.

pub mod descriptor;
pub mod folder;
pub mod kinds;
pub mod loader;
pub mod manifest;
pub mod natives;
pub mod registry;

pub use descriptor::PluginDescriptor;
pub use folder::{ARCHIVE_EXTENSION, IGNORE_MARKER, PluginFolder};
pub use kinds::{PluginKindHandler, TomlKindHandler, builtin_handlers};
pub use loader::{LibraryLoader, LoaderHandle, RawConstructor};
pub use manifest::parse_descriptors;
pub use natives::load_native_descriptors;
pub use registry::{INFORMATION_COLUMNS, InstanceFactory, PluginRegistry, ScanSummary};
