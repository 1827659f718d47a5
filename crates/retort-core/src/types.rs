// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Retort plugin subsystem.

use std::any::Any;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifies the capability family a plugin belongs to.
///
/// Each kind has its own catalog bucket in the registry and its own
/// descriptor parser. Fragment kinds (`StepFragment`) exist only to be
/// merged into a base kind and are never independently instantiable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum PluginKind {
    Step,
    StepFragment,
    JobEntry,
    Database,
    Partitioner,
    Logging,
}

/// Identifies an abstract interface a plugin implementation can satisfy.
///
/// The descriptor's class map binds each capability to the constructor
/// symbol exported by one of the plugin's libraries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Capability {
    /// Design-time metadata: settings, field layout, validation.
    Meta,
    /// The row-processing implementation executed by the engine.
    Runtime,
    /// Editor dialog for the plugin's settings.
    Dialog,
    /// Database dialect: SQL generation and driver quirks.
    Dialect,
    /// Log writer implementation.
    LogWriter,
}

/// An instantiated plugin implementation, downcast by the caller to the
/// concrete capability trait object it requested.
pub type PluginInstance = Box<dyn Any + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn plugin_kind_round_trips_through_strings() {
        let kinds = [
            PluginKind::Step,
            PluginKind::StepFragment,
            PluginKind::JobEntry,
            PluginKind::Database,
            PluginKind::Partitioner,
            PluginKind::Logging,
        ];
        for kind in kinds {
            let parsed = PluginKind::from_str(&kind.to_string()).expect("should parse back");
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn capability_round_trips_through_strings() {
        let caps = [
            Capability::Meta,
            Capability::Runtime,
            Capability::Dialog,
            Capability::Dialect,
            Capability::LogWriter,
        ];
        for cap in caps {
            let parsed = Capability::from_str(&cap.to_string()).expect("should parse back");
            assert_eq!(cap, parsed);
        }
    }

    #[test]
    fn plugin_kind_serializes_as_variant_name() {
        let json = serde_json::to_string(&PluginKind::JobEntry).expect("should serialize");
        assert_eq!(json, "\"JobEntry\"");
        let parsed: PluginKind = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, PluginKind::JobEntry);
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        assert!(PluginKind::from_str("Widget").is_err());
    }
}
