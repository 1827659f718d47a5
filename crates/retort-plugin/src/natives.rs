// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Natives descriptor loading.
//!
//! Native plugins are built into the host process instead of being
//! discovered by folder scanning. Their descriptor document is resolved
//! first from the kind handler's embedded document, then from an external
//! file configured outside this subsystem. Whichever stream is opened is
//! owned by a narrow scope and released on every exit path -- success,
//! parse error, or early return -- before the call finishes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use retort_core::RetortError;
use tracing::debug;

use crate::descriptor::PluginDescriptor;
use crate::kinds::PluginKindHandler;

/// Resolves and parses the natives descriptor document for one kind.
///
/// The embedded document wins when the handler ships one; otherwise
/// `external_file` is opened and parsed. Fails with
/// [`RetortError::Registration`] when neither source can be opened, or when
/// the opened stream does not parse.
pub fn load_native_descriptors(
    handler: &dyn PluginKindHandler,
    external_file: Option<&Path>,
) -> Result<Vec<PluginDescriptor>, RetortError> {
    if let Some(embedded) = handler.embedded_natives() {
        debug!(kind = %handler.kind(), "parsing embedded natives descriptor");
        return parse_descriptor_stream(handler, embedded.as_bytes());
    }

    let Some(path) = external_file else {
        return Err(RetortError::registration(format!(
            "no natives descriptor resource for kind {}",
            handler.kind()
        )));
    };

    let file = File::open(path).map_err(|err| RetortError::Registration {
        message: format!(
            "unable to open natives descriptor file '{}'",
            path.display()
        ),
        source: Some(Box::new(err)),
    })?;
    debug!(kind = %handler.kind(), file = %path.display(), "parsing natives descriptor file");
    parse_descriptor_stream(handler, BufReader::new(file))
}

/// Runs the handler's parser over an owned stream.
///
/// The stream is released before the result is returned, whether parsing
/// succeeded or failed.
pub fn parse_descriptor_stream<R: Read>(
    handler: &dyn PluginKindHandler,
    mut stream: R,
) -> Result<Vec<PluginDescriptor>, RetortError> {
    let result = handler.parse_descriptors(&mut stream);
    drop(stream);
    result
}
