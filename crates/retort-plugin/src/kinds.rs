// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-kind descriptor handling.
//!
//! Each plugin kind installs a [`PluginKindHandler`] in the registry: a
//! strategy object supplying the kind tag, an optional embedded natives
//! document, and the descriptor parser. The shipped kinds all use the TOML
//! grammar from [`crate::manifest`]; third-party kinds may parse anything.

use std::io::Read;
use std::sync::Arc;

use retort_core::{PluginKind, RetortError};

use crate::descriptor::PluginDescriptor;
use crate::manifest;

/// Strategy object for one plugin kind.
pub trait PluginKindHandler: Send + Sync {
    /// The kind this handler serves.
    fn kind(&self) -> PluginKind;

    /// Natives descriptor document compiled into the host, if the kind
    /// ships built-in plugins.
    fn embedded_natives(&self) -> Option<&'static str> {
        None
    }

    /// Parses one descriptor stream into zero or more descriptors.
    fn parse_descriptors(
        &self,
        input: &mut dyn Read,
    ) -> Result<Vec<PluginDescriptor>, RetortError>;
}

/// Handler for kinds whose descriptors use the default TOML grammar.
pub struct TomlKindHandler {
    kind: PluginKind,
    natives: Option<&'static str>,
}

impl TomlKindHandler {
    /// Creates a handler for `kind` with no built-in plugins.
    pub fn new(kind: PluginKind) -> Self {
        Self { kind, natives: None }
    }

    /// Creates a handler for `kind` with an embedded natives document.
    pub fn with_natives(kind: PluginKind, natives: &'static str) -> Self {
        Self {
            kind,
            natives: Some(natives),
        }
    }
}

impl PluginKindHandler for TomlKindHandler {
    fn kind(&self) -> PluginKind {
        self.kind
    }

    fn embedded_natives(&self) -> Option<&'static str> {
        self.natives
    }

    fn parse_descriptors(
        &self,
        input: &mut dyn Read,
    ) -> Result<Vec<PluginDescriptor>, RetortError> {
        let mut content = String::new();
        input.read_to_string(&mut content).map_err(|err| {
            RetortError::Registration {
                message: format!("unable to read {} descriptor stream", self.kind),
                source: Some(Box::new(err)),
            }
        })?;

        let descriptors = manifest::parse_descriptors(&content)?;
        for descriptor in &descriptors {
            if descriptor.kind != self.kind {
                return Err(RetortError::registration(format!(
                    "descriptor '{}' declares kind {} in a {} document",
                    descriptor.primary_id(),
                    descriptor.kind,
                    self.kind
                )));
            }
        }
        Ok(descriptors)
    }
}

/// Natives shipped with the engine, per kind.
const NATIVE_STEPS: &str = r#"
[[plugin]]
id = "row-generator"
kind = "Step"
name = "Row Generator"
description = "Generates rows with constant field values"
category = "Input"

[[plugin]]
id = "filter-rows"
kind = "Step"
name = "Filter Rows"
description = "Routes rows by a boolean condition"
category = "Flow"

[[plugin]]
id = "select-values"
kind = "Step"
name = "Select Values"
description = "Selects, renames, and retypes fields"
category = "Transform"
"#;

const NATIVE_JOB_ENTRIES: &str = r#"
[[plugin]]
id = "start"
kind = "JobEntry"
name = "Start"
description = "Entry point of every job"
category = "General"

[[plugin]]
id = "success"
kind = "JobEntry"
name = "Success"
description = "Marks the job as successful"
category = "General"
"#;

const NATIVE_DATABASES: &str = r#"
[[plugin]]
id = "sqlite"
kind = "Database"
name = "SQLite"
description = "Embedded SQLite database dialect"
category = "Embedded"
main = "Dialect"

[[plugin]]
id = "postgresql"
kind = "Database"
name = "PostgreSQL"
description = "PostgreSQL database dialect"
category = "Server"
main = "Dialect"
"#;

const NATIVE_LOGGING: &str = r#"
[[plugin]]
id = "console-log"
kind = "Logging"
name = "Console"
description = "Writes log lines to standard error"
category = "Core"
main = "LogWriter"
"#;

/// Handlers for the kinds shipped with the engine.
///
/// Native descriptors carry no class map; their implementations live in the
/// host binary and are attached as supplemental factories by the engine at
/// startup.
pub fn builtin_handlers() -> Vec<Arc<dyn PluginKindHandler>> {
    vec![
        Arc::new(TomlKindHandler::with_natives(PluginKind::Step, NATIVE_STEPS)),
        Arc::new(TomlKindHandler::new(PluginKind::StepFragment)),
        Arc::new(TomlKindHandler::with_natives(
            PluginKind::JobEntry,
            NATIVE_JOB_ENTRIES,
        )),
        Arc::new(TomlKindHandler::with_natives(
            PluginKind::Database,
            NATIVE_DATABASES,
        )),
        Arc::new(TomlKindHandler::new(PluginKind::Partitioner)),
        Arc::new(TomlKindHandler::with_natives(
            PluginKind::Logging,
            NATIVE_LOGGING,
        )),
    ]
}
