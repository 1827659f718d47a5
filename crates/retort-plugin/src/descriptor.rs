// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The normalized in-memory representation of one discovered extension.
//!
//! A [`PluginDescriptor`] is produced by the folder scanner or the natives
//! loader and ingested by the registry. Fragment descriptors
//! (`fragment = true`) are never instantiated on their own; they exist only
//! to be merged into a matching base descriptor.

use std::collections::HashMap;
use std::path::PathBuf;

use retort_core::{Capability, PluginKind};

/// Normalized record of one discovered or registered extension.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDescriptor {
    /// Plugin ids. Never empty; the first entry is the primary id. A plugin
    /// may carry aliases for ids it replaced in earlier releases.
    pub ids: Vec<String>,
    /// The capability family this plugin belongs to.
    pub kind: PluginKind,
    /// The capability a `load_main` call instantiates.
    pub main_capability: Capability,
    /// Display name, unique enough to sort catalogs by.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Catalog category (e.g. "Input", "Transform", "Output").
    pub category: String,
    /// Path to the plugin's icon, relative to its source folder.
    pub image_file: Option<String>,
    /// Fragments augment a base descriptor instead of being instantiable.
    pub fragment: bool,
    /// Loader-sharing group. Absent means a private loader.
    pub class_loader_group: Option<String>,
    /// Capability -> exported constructor symbol name.
    pub class_map: HashMap<Capability, String>,
    /// Ordered library paths; order is load precedence, duplicates allowed.
    pub libraries: Vec<PathBuf>,
    /// Online documentation URL.
    pub documentation_url: Option<String>,
    /// Support cases URL.
    pub cases_url: Option<String>,
    /// Community forum URL.
    pub forum_url: Option<String>,
    /// Minimum engine version this plugin supports.
    pub min_engine_version: Option<String>,
    /// Folder the descriptor was discovered in; relative library paths
    /// resolve against it.
    pub source_folder: Option<PathBuf>,
}

impl PluginDescriptor {
    /// Creates a minimal descriptor with the given identity. Remaining
    /// fields start empty and are filled by the caller.
    pub fn new(kind: PluginKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ids: vec![id.into()],
            kind,
            main_capability: Capability::Meta,
            name: name.into(),
            description: String::new(),
            category: String::new(),
            image_file: None,
            fragment: false,
            class_loader_group: None,
            class_map: HashMap::new(),
            libraries: Vec::new(),
            documentation_url: None,
            cases_url: None,
            forum_url: None,
            min_engine_version: None,
            source_folder: None,
        }
    }

    /// The primary id.
    pub fn primary_id(&self) -> &str {
        self.ids.first().map(String::as_str).unwrap_or("")
    }

    /// True if any of this plugin's ids equals `id`.
    pub fn matches(&self, id: &str) -> bool {
        self.ids.iter().any(|candidate| candidate == id)
    }

    /// True if this descriptor shares at least one id with `other`.
    pub fn shares_id_with(&self, other: &PluginDescriptor) -> bool {
        other.ids.iter().any(|id| self.matches(id))
    }

    /// Merges a fragment into this descriptor.
    ///
    /// Additive for the class map (existing entries are kept) and the
    /// library list (appended, not deduplicated). The image file and the
    /// documentation, cases, and forum URLs are taken from the fragment only
    /// when the fragment carries a value. The description is never touched.
    /// The fragment itself is read-only here.
    pub fn merge(&mut self, fragment: Option<&PluginDescriptor>) {
        let Some(fragment) = fragment else {
            return;
        };

        for (capability, symbol) in &fragment.class_map {
            self.class_map
                .entry(*capability)
                .or_insert_with(|| symbol.clone());
        }

        self.libraries.extend(fragment.libraries.iter().cloned());

        if fragment.image_file.is_some() {
            self.image_file = fragment.image_file.clone();
        }
        if fragment.documentation_url.is_some() {
            self.documentation_url = fragment.documentation_url.clone();
        }
        if fragment.cases_url.is_some() {
            self.cases_url = fragment.cases_url.clone();
        }
        if fragment.forum_url.is_some() {
            self.forum_url = fragment.forum_url.clone();
        }
    }

    /// Library paths with relative entries resolved against the source
    /// folder.
    pub fn resolved_libraries(&self) -> Vec<PathBuf> {
        self.libraries
            .iter()
            .map(|lib| match (&self.source_folder, lib.is_relative()) {
                (Some(folder), true) => folder.join(lib),
                _ => lib.clone(),
            })
            .collect()
    }
}
