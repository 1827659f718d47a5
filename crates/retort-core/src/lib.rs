// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Retort data-integration engine.
//!
//! This crate provides the error type and the common enums shared by the
//! plugin subsystem and its consumers. The engine itself (transformations,
//! steps, repositories) lives outside this workspace and talks to the
//! registry exclusively through these types.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RetortError;
pub use types::{Capability, PluginInstance, PluginKind};
