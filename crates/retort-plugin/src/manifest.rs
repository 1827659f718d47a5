// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default TOML descriptor grammar.
//!
//! A descriptor document holds one or more `[[plugin]]` tables, each
//! describing a single extension. This is the grammar used by the built-in
//! kind handlers for both natives documents and archive sidecar manifests;
//! a kind is free to install a handler that parses something else entirely.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use retort_core::{Capability, PluginKind, RetortError};
use serde::Deserialize;

use crate::descriptor::PluginDescriptor;

/// Top-level structure of a descriptor document.
#[derive(Debug, Deserialize)]
struct DescriptorFile {
    #[serde(default)]
    plugin: Vec<PluginSection>,
}

/// One `[[plugin]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSection {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    ids: Vec<String>,
    kind: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    fragment: bool,
    #[serde(default)]
    class_loader_group: Option<String>,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    libraries: Vec<String>,
    #[serde(default)]
    documentation_url: Option<String>,
    #[serde(default)]
    cases_url: Option<String>,
    #[serde(default)]
    forum_url: Option<String>,
    #[serde(default)]
    min_engine_version: Option<String>,
    #[serde(default)]
    classes: HashMap<String, String>,
}

/// Parse a descriptor document into zero or more descriptors.
///
/// Validates that every plugin has a non-empty id and name, a known kind
/// and capability tags, and a well-formed `min_engine_version` when one is
/// declared.
pub fn parse_descriptors(content: &str) -> Result<Vec<PluginDescriptor>, RetortError> {
    let file: DescriptorFile =
        toml::from_str(content).map_err(|err| RetortError::Registration {
            message: format!("invalid descriptor document: {err}"),
            source: Some(Box::new(err)),
        })?;

    file.plugin.into_iter().map(section_to_descriptor).collect()
}

fn section_to_descriptor(section: PluginSection) -> Result<PluginDescriptor, RetortError> {
    let mut ids: Vec<String> = section.id.into_iter().chain(section.ids).collect();
    ids.retain(|id| !id.trim().is_empty());
    if ids.is_empty() {
        return Err(RetortError::registration(
            "descriptor: at least one non-empty id is required",
        ));
    }

    if section.name.trim().is_empty() {
        return Err(RetortError::registration(format!(
            "descriptor '{}': name must not be empty",
            ids[0]
        )));
    }

    let kind = PluginKind::from_str(&section.kind).map_err(|_| {
        RetortError::registration(format!(
            "descriptor '{}': unknown kind '{}'",
            ids[0], section.kind
        ))
    })?;

    let main_capability = match &section.main {
        Some(tag) => Capability::from_str(tag).map_err(|_| {
            RetortError::registration(format!(
                "descriptor '{}': unknown capability '{tag}'",
                ids[0]
            ))
        })?,
        None => Capability::Meta,
    };

    let mut class_map = HashMap::new();
    for (tag, symbol) in section.classes {
        let capability = Capability::from_str(&tag).map_err(|_| {
            RetortError::registration(format!(
                "descriptor '{}': unknown capability '{tag}'",
                ids[0]
            ))
        })?;
        class_map.insert(capability, symbol);
    }

    if let Some(version) = &section.min_engine_version {
        semver::Version::parse(version).map_err(|err| RetortError::Registration {
            message: format!("descriptor '{}': invalid min_engine_version: {err}", ids[0]),
            source: Some(Box::new(err)),
        })?;
    }

    Ok(PluginDescriptor {
        ids,
        kind,
        main_capability,
        name: section.name,
        description: section.description,
        category: section.category,
        image_file: section.image,
        fragment: section.fragment,
        class_loader_group: section.class_loader_group,
        class_map,
        libraries: section.libraries.into_iter().map(PathBuf::from).collect(),
        documentation_url: section.documentation_url,
        cases_url: section.cases_url,
        forum_url: section.forum_url,
        min_engine_version: section.min_engine_version,
        source_folder: None,
    })
}
