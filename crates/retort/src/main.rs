// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retort - a data-integration engine.
//!
//! This binary is the composition root: it owns the plugin registry,
//! registers the built-in kinds, and runs discovery over the configured
//! plugin folders. The `plugins` subcommands expose the registry's
//! introspection surface.

use std::str::FromStr;

use clap::{Parser, Subcommand};
use retort_config::RetortConfig;
use retort_core::{PluginKind, RetortError};
use retort_plugin::{INFORMATION_COLUMNS, PluginFolder, PluginRegistry, builtin_handlers};

/// Retort - a data-integration engine.
#[derive(Parser, Debug)]
#[command(name = "retort", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and manage discovered plugins.
    Plugins {
        #[command(subcommand)]
        command: PluginsCommand,
    },
}

/// Plugin registry introspection.
#[derive(Subcommand, Debug)]
enum PluginsCommand {
    /// List the registered plugins of one kind.
    List {
        /// Plugin kind (Step, JobEntry, Database, Partitioner, Logging).
        kind: String,
    },
    /// Scan one folder and report what registered.
    Scan {
        /// Folder to scan for plugin archives.
        folder: String,
        /// Also scan `lib/` subdirectories.
        #[arg(long)]
        include_lib: bool,
    },
}

/// Builds the engine's registry: built-in kinds, fragment tracking, natives,
/// and folder discovery.
fn build_registry(config: &RetortConfig) -> Result<PluginRegistry, RetortError> {
    let registry = PluginRegistry::new();
    for handler in builtin_handlers() {
        registry.register_kind(handler);
    }
    registry.track_fragment_kind(PluginKind::StepFragment, PluginKind::Step);
    registry.init(config)?;
    Ok(registry)
}

fn run(cli: Cli, config: &RetortConfig) -> Result<(), RetortError> {
    match cli.command {
        Some(Commands::Plugins { command }) => match command {
            PluginsCommand::List { kind } => {
                let kind = PluginKind::from_str(&kind)
                    .map_err(|_| RetortError::Config(format!("unknown plugin kind `{kind}`")))?;
                let registry = build_registry(config)?;

                println!("{}", INFORMATION_COLUMNS.join(" | "));
                for row in registry.plugin_information(kind) {
                    println!("{}", row.join(" | "));
                }
                Ok(())
            }
            PluginsCommand::Scan { folder, include_lib } => {
                let registry = build_registry(config)?;
                let summary =
                    registry.register_from_folder(&PluginFolder::new(&folder, include_lib))?;
                println!(
                    "{}: {} archives, {} plugins registered, {} failed",
                    folder, summary.found, summary.registered, summary.failed
                );
                Ok(())
            }
        },
        None => {
            println!("retort: use --help for available commands");
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match retort_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            for error in &errors {
                eprintln!("retort: {error}");
            }
            std::process::exit(1);
        }
    };

    if let Err(error) = run(cli, &config) {
        eprintln!("retort: {error}");
        std::process::exit(1);
    }
}
