// SPDX-FileCopyrightText: 2026 Retort Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The central plugin catalog.
//!
//! [`PluginRegistry`] maps plugin kind -> id -> descriptor, owns every
//! loader and classloader-group membership, tracks fragment-to-base kind
//! relationships, and exposes lookup, instantiation, and introspection. It
//! is an explicit value owned by the composition root; there is no hidden
//! global instance.
//!
//! All state lives behind one `RwLock`, so mutations (`register`, `remove`,
//! `add_class_factory`, loader invalidation) are serialized and reads
//! observe a consistent snapshot -- a read can never interleave with an
//! in-progress fragment merge pass.

use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use retort_config::RetortConfig;
use retort_core::{Capability, PluginInstance, PluginKind, RetortError};
use tracing::{debug, info, warn};

use crate::descriptor::PluginDescriptor;
use crate::folder::PluginFolder;
use crate::kinds::PluginKindHandler;
use crate::loader::{LibraryLoader, LoaderHandle};
use crate::manifest;
use crate::natives;

/// Zero-argument factory attached to a supplemental entry.
pub type InstanceFactory = Arc<dyn Fn() -> PluginInstance + Send + Sync>;

/// Column names of the plugin information table, in row order.
pub const INFORMATION_COLUMNS: [&str; 8] = [
    "Type",
    "ID",
    "Name",
    "Description",
    "Libraries",
    "Image file",
    "Class map",
    "Category",
];

/// Outcome of scanning one plugin folder. Failures are per-archive and
/// never abort the scan of sibling archives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Archives found in the folder.
    pub found: usize,
    /// Descriptors registered from those archives.
    pub registered: usize,
    /// Archives that failed to parse or register.
    pub failed: usize,
}

/// One classloader group: member ids plus the shared loader, rebuilt
/// whenever membership changes.
#[derive(Default)]
struct GroupState {
    members: Vec<String>,
    loader: Option<LoaderHandle>,
}

/// Factories attached to one supplemental id.
#[derive(Default)]
struct SupplementalEntry {
    factories: HashMap<Capability, InstanceFactory>,
}

#[derive(Default)]
struct RegistryState {
    handlers: HashMap<PluginKind, Arc<dyn PluginKindHandler>>,
    catalog: HashMap<PluginKind, Vec<PluginDescriptor>>,
    categories: HashMap<PluginKind, Vec<String>>,
    groups: HashMap<(PluginKind, String), GroupState>,
    private_loaders: HashMap<(PluginKind, String), LoaderHandle>,
    supplementals: HashMap<(PluginKind, String), SupplementalEntry>,
    fragment_kinds: HashMap<PluginKind, PluginKind>,
}

impl RegistryState {
    fn find_descriptor(&self, kind: PluginKind, id: &str) -> Option<&PluginDescriptor> {
        self.catalog
            .get(&kind)?
            .iter()
            .find(|plugin| !plugin.fragment && plugin.matches(id))
    }

    /// Every registered fragment whose tracked base kind is `base_kind` and
    /// which shares an id with `ids`.
    fn matching_fragments(&self, base_kind: PluginKind, ids: &[String]) -> Vec<&PluginDescriptor> {
        self.fragment_kinds
            .iter()
            .filter(|(_, base)| **base == base_kind)
            .filter_map(|(fragment_kind, _)| self.catalog.get(fragment_kind))
            .flat_map(|bucket| bucket.iter())
            .filter(|candidate| {
                candidate.fragment && ids.iter().any(|id| candidate.matches(id))
            })
            .collect()
    }
}

/// The process-wide plugin catalog.
pub struct PluginRegistry {
    state: RwLock<RegistryState>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs the handler for one plugin kind and creates its catalog
    /// bucket.
    pub fn register_kind(&self, handler: Arc<dyn PluginKindHandler>) {
        let kind = handler.kind();
        let mut state = self.write();
        state.catalog.entry(kind).or_default();
        state.categories.entry(kind).or_default();
        state.handlers.insert(kind, handler);
        debug!(kind = %kind, "plugin kind registered");
    }

    /// Establishes the relationship between a fragment kind and the base
    /// kind its fragments augment. Survives catalog removals.
    pub fn track_fragment_kind(&self, fragment_kind: PluginKind, base_kind: PluginKind) {
        let mut state = self.write();
        state.fragment_kinds.insert(fragment_kind, base_kind);
        debug!(fragment = %fragment_kind, base = %base_kind, "fragment kind tracked");
    }

    /// Registers one descriptor.
    ///
    /// Fragments are stored under their own kind and merged into every
    /// currently-registered base sharing an id (merge runs on the base
    /// only). Non-fragments replace any prior entry sharing an id, update
    /// group membership, and always run one fragment merge pass -- so the
    /// registration order of a base and its fragments is irrelevant.
    pub fn register(
        &self,
        kind: PluginKind,
        descriptor: PluginDescriptor,
    ) -> Result<(), RetortError> {
        if descriptor.ids.is_empty() || descriptor.ids.iter().any(|id| id.trim().is_empty()) {
            return Err(RetortError::registration(format!(
                "not a valid id specified in plugin '{}'",
                descriptor.name
            )));
        }

        let mut state = self.write();
        if descriptor.fragment {
            Self::register_fragment(&mut state, kind, descriptor);
        } else {
            Self::register_plugin(&mut state, kind, descriptor);
        }
        Ok(())
    }

    fn register_fragment(state: &mut RegistryState, kind: PluginKind, fragment: PluginDescriptor) {
        if let Some(base_kind) = state.fragment_kinds.get(&kind).copied() {
            if let Some(bucket) = state.catalog.get_mut(&base_kind) {
                for base in bucket
                    .iter_mut()
                    .filter(|base| base.shares_id_with(&fragment))
                {
                    debug!(base = %base.primary_id(), fragment = %fragment.primary_id(), "fragment merge pass");
                    base.merge(Some(&fragment));
                }
            }
        }

        Self::insert_descriptor(state, kind, fragment);
    }

    fn register_plugin(state: &mut RegistryState, kind: PluginKind, mut descriptor: PluginDescriptor) {
        // Merge every already-registered fragment before the descriptor
        // goes live; with no fragment present this is still a full merge
        // pass.
        let fragments: Vec<PluginDescriptor> = state
            .matching_fragments(kind, &descriptor.ids)
            .into_iter()
            .cloned()
            .collect();
        debug!(plugin = %descriptor.primary_id(), kind = %kind, "fragment merge pass");
        if fragments.is_empty() {
            descriptor.merge(None);
        } else {
            for fragment in &fragments {
                descriptor.merge(Some(fragment));
            }
        }

        match &descriptor.class_loader_group {
            Some(group) => {
                let key = (kind, group.clone());
                let group_state = state.groups.entry(key).or_default();
                let primary = descriptor.primary_id().to_string();
                if !group_state.members.contains(&primary) {
                    group_state.members.push(primary);
                }
                group_state.loader = None;
            }
            None => {
                state
                    .private_loaders
                    .remove(&(kind, descriptor.primary_id().to_string()));
            }
        }

        if !descriptor.category.is_empty() {
            let categories = state.categories.entry(kind).or_default();
            if !categories.contains(&descriptor.category) {
                categories.push(descriptor.category.clone());
                categories.sort();
            }
        }

        Self::insert_descriptor(state, kind, descriptor);
    }

    /// Inserts or replaces by id match and keeps the bucket name-sorted.
    fn insert_descriptor(state: &mut RegistryState, kind: PluginKind, descriptor: PluginDescriptor) {
        let bucket = state.catalog.entry(kind).or_default();
        let existing = bucket
            .iter()
            .position(|candidate| candidate.shares_id_with(&descriptor));
        match existing {
            Some(index) => {
                bucket[index] = descriptor;
            }
            None => bucket.push(descriptor),
        }
        bucket.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        info!(kind = %kind, plugins = bucket.len(), "plugin registered");
    }

    /// Removes the entry matching `id`, updating group membership so the
    /// next loader resolve sees only the survivors. Fragment kind tracking
    /// is left intact for future registrations.
    pub fn remove(&self, kind: PluginKind, id: &str) {
        let mut state = self.write();
        let Some(bucket) = state.catalog.get_mut(&kind) else {
            return;
        };
        let Some(position) = bucket.iter().position(|plugin| plugin.matches(id)) else {
            return;
        };
        let removed = bucket.remove(position);
        let primary = removed.primary_id().to_string();

        if let Some(group) = &removed.class_loader_group {
            let key = (kind, group.clone());
            if let Some(group_state) = state.groups.get_mut(&key) {
                group_state.members.retain(|member| member != &primary);
                group_state.loader = None;
                if group_state.members.is_empty() {
                    state.groups.remove(&key);
                }
            }
        }
        state.private_loaders.remove(&(kind, primary.clone()));

        info!(kind = %kind, plugin = %primary, "plugin removed");
    }

    /// All live (non-fragment) descriptors for a kind, as a snapshot.
    pub fn get_plugins(&self, kind: PluginKind) -> Vec<PluginDescriptor> {
        self.read()
            .catalog
            .get(&kind)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|plugin| !plugin.fragment)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The live descriptor matching `id`, if any.
    pub fn get_plugin(&self, kind: PluginKind, id: &str) -> Option<PluginDescriptor> {
        self.read().find_descriptor(kind, id).cloned()
    }

    /// The live descriptor with the given display name, if any.
    pub fn find_plugin_with_name(&self, kind: PluginKind, name: &str) -> Option<PluginDescriptor> {
        self.read()
            .catalog
            .get(&kind)?
            .iter()
            .find(|plugin| !plugin.fragment && plugin.name == name)
            .cloned()
    }

    /// Categories seen for a kind, sorted.
    pub fn get_categories(&self, kind: PluginKind) -> Vec<String> {
        self.read()
            .categories
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Instantiates the implementation of `capability` for the plugin
    /// matching `id`.
    ///
    /// Resolution order: the descriptor's class map through its loader,
    /// then the supplemental factories of any of the descriptor's ids.
    /// A descriptor without either fails with
    /// [`RetortError::NoClassMapped`]; a missing descriptor with no
    /// supplemental slot fails with [`RetortError::PluginNotFound`].
    pub fn load_instance(
        &self,
        kind: PluginKind,
        id: &str,
        capability: Capability,
    ) -> Result<PluginInstance, RetortError> {
        let mut state = self.write();
        let descriptor = state.find_descriptor(kind, id).cloned();

        match descriptor {
            Some(descriptor) => {
                if let Some(symbol) = descriptor.class_map.get(&capability).cloned() {
                    let loader = Self::loader_for_locked(&mut state, &descriptor)?;
                    drop(state);
                    return loader.instantiate(&symbol);
                }

                let factory = descriptor.ids.iter().find_map(|plugin_id| {
                    state
                        .supplementals
                        .get(&(kind, plugin_id.clone()))
                        .and_then(|entry| entry.factories.get(&capability))
                        .cloned()
                });
                match factory {
                    Some(factory) => {
                        drop(state);
                        Ok(factory())
                    }
                    None => Err(RetortError::NoClassMapped {
                        kind,
                        id: id.to_string(),
                        capability,
                    }),
                }
            }
            None => {
                let factory = state
                    .supplementals
                    .get(&(kind, id.to_string()))
                    .and_then(|entry| entry.factories.get(&capability))
                    .cloned();
                match factory {
                    Some(factory) => {
                        drop(state);
                        Ok(factory())
                    }
                    None => Err(RetortError::PluginNotFound {
                        kind,
                        id: id.to_string(),
                    }),
                }
            }
        }
    }

    /// [`load_instance`](Self::load_instance) plus the downcast to the
    /// concrete type the caller expects.
    pub fn load<T: Any>(
        &self,
        kind: PluginKind,
        id: &str,
        capability: Capability,
    ) -> Result<Box<T>, RetortError> {
        self.load_instance(kind, id, capability)?
            .downcast::<T>()
            .map_err(|_| {
                RetortError::Internal(format!(
                    "instance for {kind}/{id} is not the requested type"
                ))
            })
    }

    /// Instantiates the plugin's main capability.
    pub fn load_main(&self, kind: PluginKind, id: &str) -> Result<PluginInstance, RetortError> {
        let main_capability = self
            .get_plugin(kind, id)
            .map(|plugin| plugin.main_capability)
            .ok_or_else(|| RetortError::PluginNotFound {
                kind,
                id: id.to_string(),
            })?;
        self.load_instance(kind, id, main_capability)
    }

    /// Attaches a supplemental factory to `id`, creating the id's slot on
    /// first use. Further factories under the same id share the slot; the
    /// catalog's entry count for the id never grows.
    pub fn add_class_factory<T, F>(
        &self,
        kind: PluginKind,
        capability: Capability,
        id: &str,
        factory: F,
    ) where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: InstanceFactory = Arc::new(move || Box::new(factory()) as PluginInstance);
        let mut state = self.write();
        state
            .supplementals
            .entry((kind, id.to_string()))
            .or_default()
            .factories
            .insert(capability, factory);
        debug!(kind = %kind, plugin = %id, capability = %capability, "supplemental factory attached");
    }

    /// The loader for a descriptor, honoring classloader groups.
    ///
    /// Grouped descriptors share one handle per group, rebuilt from the
    /// union of the current members' libraries whenever membership changed
    /// since the last resolve. Group-less descriptors get a private handle,
    /// invalidated only by their own re-registration or removal.
    pub fn loader_for(&self, descriptor: &PluginDescriptor) -> Result<LoaderHandle, RetortError> {
        let mut state = self.write();
        Self::loader_for_locked(&mut state, descriptor)
    }

    fn loader_for_locked(
        state: &mut RegistryState,
        descriptor: &PluginDescriptor,
    ) -> Result<LoaderHandle, RetortError> {
        let kind = descriptor.kind;

        let Some(group) = &descriptor.class_loader_group else {
            let key = (kind, descriptor.primary_id().to_string());
            if let Some(handle) = state.private_loaders.get(&key) {
                return Ok(handle.clone());
            }
            let handle = Arc::new(LibraryLoader::new(
                descriptor.name.clone(),
                descriptor.resolved_libraries(),
            ));
            state.private_loaders.insert(key, handle.clone());
            return Ok(handle);
        };

        let key = (kind, group.clone());
        if !state.groups.contains_key(&key) {
            return Err(RetortError::PluginNotFound {
                kind,
                id: descriptor.primary_id().to_string(),
            });
        }

        let cached = state.groups.get(&key).and_then(|g| g.loader.clone());
        if let Some(handle) = cached {
            return Ok(handle);
        }

        let members = state
            .groups
            .get(&key)
            .map(|g| g.members.clone())
            .unwrap_or_default();
        let mut paths = Vec::new();
        for member in &members {
            if let Some(plugin) = state.find_descriptor(kind, member) {
                paths.extend(plugin.resolved_libraries());
            }
        }
        let handle: LoaderHandle = Arc::new(LibraryLoader::new(group.clone(), paths));
        if let Some(group_state) = state.groups.get_mut(&key) {
            group_state.loader = Some(handle.clone());
        }
        debug!(kind = %kind, group = %group, members = members.len(), "classloader group loader built");
        Ok(handle)
    }

    /// Read-only tabular projection: one row of eight string cells per live
    /// descriptor. Column names are [`INFORMATION_COLUMNS`].
    pub fn plugin_information(&self, kind: PluginKind) -> Vec<[String; 8]> {
        self.get_plugins(kind)
            .iter()
            .map(|plugin| {
                let libraries = plugin
                    .libraries
                    .iter()
                    .map(|lib| lib.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut class_map = plugin
                    .class_map
                    .iter()
                    .map(|(capability, symbol)| format!("{capability}={symbol}"))
                    .collect::<Vec<_>>();
                class_map.sort();
                [
                    plugin.kind.to_string(),
                    plugin.primary_id().to_string(),
                    plugin.name.clone(),
                    plugin.description.clone(),
                    libraries,
                    plugin.image_file.clone().unwrap_or_default(),
                    class_map.join(", "),
                    plugin.category.clone(),
                ]
            })
            .collect()
    }

    /// Loads and registers the natives descriptors for one kind.
    ///
    /// The descriptor document comes from the kind handler's embedded
    /// document, falling back to the file configured under
    /// `plugins.natives_files`. On a parse failure the registry is left
    /// unchanged.
    pub fn register_natives(
        &self,
        kind: PluginKind,
        config: &RetortConfig,
    ) -> Result<(), RetortError> {
        let handler = self.read().handlers.get(&kind).cloned().ok_or_else(|| {
            RetortError::registration(format!("no handler registered for kind {kind}"))
        })?;

        let external = config
            .plugins
            .natives_files
            .get(&kind.to_string())
            .map(PathBuf::from);
        let descriptors = natives::load_native_descriptors(handler.as_ref(), external.as_deref())?;

        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(kind, descriptor)?;
        }
        info!(kind = %kind, plugins = count, "native plugins registered");
        Ok(())
    }

    /// Scans one plugin folder and registers every descriptor found.
    ///
    /// Each archive may carry a sidecar manifest (`<archive-stem>.toml`)
    /// declaring its plugins; archives without one are plain libraries and
    /// are skipped. A failing archive is logged and counted, never aborting
    /// its siblings.
    pub fn register_from_folder(
        &self,
        folder: &PluginFolder,
    ) -> Result<ScanSummary, RetortError> {
        let archives = folder.find_archives()?;

        let mut summary = ScanSummary::default();
        for archive in archives {
            summary.found += 1;
            match self.register_archive(&archive) {
                Ok(count) => summary.registered += count,
                Err(err) => {
                    warn!(archive = %archive.display(), error = %err, "skipping plugin archive");
                    summary.failed += 1;
                }
            }
        }

        info!(
            folder = %folder.root().map(|p| p.display().to_string()).unwrap_or_default(),
            found = summary.found,
            registered = summary.registered,
            failed = summary.failed,
            "plugin folder scanned"
        );
        Ok(summary)
    }

    fn register_archive(&self, archive: &std::path::Path) -> Result<usize, RetortError> {
        let sidecar = archive.with_extension("toml");
        if !sidecar.is_file() {
            debug!(archive = %archive.display(), "archive has no descriptor manifest");
            return Ok(0);
        }

        let content = std::fs::read_to_string(&sidecar).map_err(|err| {
            RetortError::Registration {
                message: format!("unable to read manifest '{}'", sidecar.display()),
                source: Some(Box::new(err)),
            }
        })?;

        let descriptors = manifest::parse_descriptors(&content)?;
        let archive_name = PathBuf::from(archive.file_name().unwrap_or_default());
        let source_folder = archive.parent().map(PathBuf::from);

        let mut count = 0;
        for mut descriptor in descriptors {
            if !self.read().handlers.contains_key(&descriptor.kind) {
                return Err(RetortError::registration(format!(
                    "no handler registered for kind {} declared by '{}'",
                    descriptor.kind, sidecar.display()
                )));
            }
            if !descriptor.libraries.contains(&archive_name) {
                descriptor.libraries.insert(0, archive_name.clone());
            }
            descriptor.source_folder = source_folder.clone();
            self.register(descriptor.kind, descriptor)?;
            count += 1;
        }
        Ok(count)
    }

    /// Registers natives and scans every configured folder.
    ///
    /// Kinds without any natives source are skipped; a folder that cannot
    /// be listed is logged and skipped so the remaining folders still load.
    pub fn init(&self, config: &RetortConfig) -> Result<(), RetortError> {
        let kinds: Vec<(PluginKind, bool)> = self
            .read()
            .handlers
            .values()
            .map(|handler| (handler.kind(), handler.embedded_natives().is_some()))
            .collect();

        for (kind, has_embedded) in kinds {
            if has_embedded || config.plugins.natives_files.contains_key(&kind.to_string()) {
                self.register_natives(kind, config)?;
            }
        }

        for folder_path in &config.plugins.folders {
            let folder = PluginFolder::new(folder_path, config.plugins.include_lib_folders);
            if let Err(err) = self.register_from_folder(&folder) {
                warn!(folder = %folder_path, error = %err, "plugin folder skipped");
            }
        }
        Ok(())
    }

    /// Clears all registry state. A reset registry is indistinguishable
    /// from a freshly constructed one.
    pub fn reset(&self) {
        let mut state = self.write();
        *state = RegistryState::default();
        info!("plugin registry reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tracing_test::traced_test;

    use crate::kinds::{TomlKindHandler, builtin_handlers};

    /// A host-side implementation handed out by supplemental factories.
    struct RowGeneratorMeta {
        rows: usize,
    }

    fn registry_with_step_kinds() -> PluginRegistry {
        let registry = PluginRegistry::new();
        registry.register_kind(Arc::new(TomlKindHandler::new(PluginKind::Step)));
        registry.register_kind(Arc::new(TomlKindHandler::new(PluginKind::StepFragment)));
        registry.track_fragment_kind(PluginKind::StepFragment, PluginKind::Step);
        registry
    }

    fn step(id: &str, name: &str) -> PluginDescriptor {
        let mut plugin = PluginDescriptor::new(PluginKind::Step, id, name);
        plugin.libraries.push(PathBuf::from(format!("{id}.jar")));
        plugin
    }

    fn fragment_for(id: &str) -> PluginDescriptor {
        let mut frag =
            PluginDescriptor::new(PluginKind::StepFragment, id, format!("{id} fragment"));
        frag.fragment = true;
        frag.libraries.push(PathBuf::from(format!("{id}-i18n.jar")));
        frag
    }

    #[test]
    fn register_and_get_plugins_roundtrip() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();

        let plugins = registry.get_plugins(PluginKind::Step);
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].primary_id(), "csv-input");

        let found = registry.get_plugin(PluginKind::Step, "csv-input").unwrap();
        assert_eq!(found.name, "CSV Input");
    }

    #[test]
    fn register_rejects_blank_ids() {
        let registry = registry_with_step_kinds();
        let mut plugin = step("x", "X");
        plugin.ids = vec!["  ".to_string()];
        let err = registry.register(PluginKind::Step, plugin).unwrap_err();
        assert!(err.to_string().contains("not a valid id"));
    }

    #[test]
    fn register_replaces_entry_sharing_an_id() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input v2"))
            .unwrap();

        let plugins = registry.get_plugins(PluginKind::Step);
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name, "CSV Input v2");
    }

    #[test]
    fn plugins_are_sorted_by_name_case_insensitively() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("zeta", "zeta output"))
            .unwrap();
        registry
            .register(PluginKind::Step, step("alpha", "Alpha Input"))
            .unwrap();
        registry
            .register(PluginKind::Step, step("mid", "midpoint"))
            .unwrap();

        let names: Vec<String> = registry
            .get_plugins(PluginKind::Step)
            .iter()
            .map(|plugin| plugin.name.clone())
            .collect();
        assert_eq!(names, vec!["Alpha Input", "midpoint", "zeta output"]);
    }

    #[test]
    fn fragments_are_never_listed() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::StepFragment, fragment_for("csv-input"))
            .unwrap();

        assert!(registry.get_plugins(PluginKind::StepFragment).is_empty());
        assert!(registry.get_plugins(PluginKind::Step).is_empty());
    }

    #[test]
    fn fragment_registered_after_base_is_merged_into_it() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();

        let mut frag = fragment_for("csv-input");
        frag.image_file = Some("csv.svg".to_string());
        registry.register(PluginKind::StepFragment, frag).unwrap();

        let merged = registry.get_plugin(PluginKind::Step, "csv-input").unwrap();
        assert_eq!(merged.libraries.len(), 2);
        assert!(merged.libraries.contains(&PathBuf::from("csv-input-i18n.jar")));
        assert_eq!(merged.image_file.as_deref(), Some("csv.svg"));
    }

    #[test]
    fn fragment_registered_before_base_is_merged_on_base_registration() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::StepFragment, fragment_for("csv-input"))
            .unwrap();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();

        let merged = registry.get_plugin(PluginKind::Step, "csv-input").unwrap();
        assert_eq!(merged.libraries.len(), 2);
        assert!(merged.libraries.contains(&PathBuf::from("csv-input-i18n.jar")));
    }

    #[test]
    fn reregistering_the_base_runs_the_merge_pass_again() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();
        registry
            .register(PluginKind::StepFragment, fragment_for("csv-input"))
            .unwrap();

        // A fresh registration replaces the entry and merges once more.
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();

        let merged = registry.get_plugin(PluginKind::Step, "csv-input").unwrap();
        assert_eq!(merged.libraries.len(), 2);
    }

    #[test]
    fn merge_never_touches_the_fragment_descriptor() {
        let registry = registry_with_step_kinds();
        let frag = fragment_for("csv-input");
        let frag_libraries = frag.libraries.clone();
        registry.register(PluginKind::StepFragment, frag).unwrap();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();

        let stored: Vec<PluginDescriptor> = registry
            .read()
            .catalog
            .get(&PluginKind::StepFragment)
            .cloned()
            .unwrap_or_default();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].libraries, frag_libraries);
    }

    #[test]
    #[traced_test]
    fn merge_pass_runs_even_with_no_fragment_registered() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();
        assert!(logs_contain("fragment merge pass"));
    }

    #[test]
    fn remove_deletes_the_entry_but_keeps_fragment_tracking() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::StepFragment, fragment_for("csv-input"))
            .unwrap();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();

        registry.remove(PluginKind::Step, "csv-input");
        assert!(registry.get_plugins(PluginKind::Step).is_empty());

        // Tracking survives: a later registration merges again.
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();
        let merged = registry.get_plugin(PluginKind::Step, "csv-input").unwrap();
        assert_eq!(merged.libraries.len(), 2);
    }

    #[test]
    fn group_members_share_one_loader_until_membership_changes() {
        let registry = registry_with_step_kinds();
        let mut first = step("csv-input", "CSV Input");
        first.class_loader_group = Some("text-plugins".to_string());
        let mut second = step("text-output", "Text Output");
        second.class_loader_group = Some("text-plugins".to_string());
        registry.register(PluginKind::Step, first.clone()).unwrap();
        registry.register(PluginKind::Step, second.clone()).unwrap();

        let handle_a = registry.loader_for(&first).unwrap();
        let handle_b = registry.loader_for(&second).unwrap();
        assert!(Arc::ptr_eq(&handle_a, &handle_b));
        assert_eq!(handle_a.library_paths().len(), 2);

        registry.remove(PluginKind::Step, "csv-input");

        let rebuilt = registry.loader_for(&second).unwrap();
        assert!(!Arc::ptr_eq(&handle_a, &rebuilt));
        assert_eq!(rebuilt.library_paths(), &[PathBuf::from("text-output.jar")]);
    }

    #[test]
    fn adding_a_group_member_invalidates_the_shared_loader() {
        let registry = registry_with_step_kinds();
        let mut first = step("csv-input", "CSV Input");
        first.class_loader_group = Some("text-plugins".to_string());
        registry.register(PluginKind::Step, first.clone()).unwrap();

        let before = registry.loader_for(&first).unwrap();
        assert_eq!(before.library_paths().len(), 1);

        let mut second = step("text-output", "Text Output");
        second.class_loader_group = Some("text-plugins".to_string());
        registry.register(PluginKind::Step, second).unwrap();

        let after = registry.loader_for(&first).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.library_paths().len(), 2);
    }

    #[test]
    fn private_loader_is_rebuilt_only_on_reregistration() {
        let registry = registry_with_step_kinds();
        let plugin = step("csv-input", "CSV Input");
        registry.register(PluginKind::Step, plugin.clone()).unwrap();

        let first = registry.loader_for(&plugin).unwrap();
        let second = registry.loader_for(&plugin).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        registry.register(PluginKind::Step, plugin.clone()).unwrap();
        let rebuilt = registry.loader_for(&plugin).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }

    #[test]
    fn loader_for_an_unregistered_grouped_descriptor_fails() {
        let registry = registry_with_step_kinds();
        let mut plugin = step("csv-input", "CSV Input");
        plugin.class_loader_group = Some("text-plugins".to_string());

        let err = registry.loader_for(&plugin).unwrap_err();
        assert!(matches!(err, RetortError::PluginNotFound { .. }));
    }

    #[test]
    fn load_instance_without_mapping_or_factory_is_no_class_mapped() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();

        let err = registry
            .load_instance(PluginKind::Step, "csv-input", Capability::Runtime)
            .unwrap_err();
        assert!(matches!(err, RetortError::NoClassMapped { .. }));
    }

    #[test]
    fn load_instance_for_an_unknown_id_is_plugin_not_found() {
        let registry = registry_with_step_kinds();
        let err = registry
            .load_instance(PluginKind::Step, "ghost", Capability::Meta)
            .unwrap_err();
        assert!(matches!(err, RetortError::PluginNotFound { .. }));
    }

    #[test]
    fn class_factory_creates_one_slot_and_serves_instances() {
        let registry = registry_with_step_kinds();
        registry.add_class_factory(
            PluginKind::Step,
            Capability::Meta,
            "row-generator",
            || RowGeneratorMeta { rows: 10 },
        );
        registry.add_class_factory(
            PluginKind::Step,
            Capability::Runtime,
            "row-generator",
            || RowGeneratorMeta { rows: 0 },
        );

        // Factories do not create catalog entries.
        assert!(registry.get_plugins(PluginKind::Step).is_empty());

        let meta: Box<RowGeneratorMeta> = registry
            .load(PluginKind::Step, "row-generator", Capability::Meta)
            .unwrap();
        assert_eq!(meta.rows, 10);

        let runtime: Box<RowGeneratorMeta> = registry
            .load(PluginKind::Step, "row-generator", Capability::Runtime)
            .unwrap();
        assert_eq!(runtime.rows, 0);
    }

    #[test]
    fn factories_back_registered_descriptors_without_class_maps() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("row-generator", "Row Generator"))
            .unwrap();
        registry.add_class_factory(
            PluginKind::Step,
            Capability::Meta,
            "row-generator",
            || RowGeneratorMeta { rows: 5 },
        );

        let meta: Box<RowGeneratorMeta> = registry
            .load(PluginKind::Step, "row-generator", Capability::Meta)
            .unwrap();
        assert_eq!(meta.rows, 5);
    }

    #[test]
    fn load_main_uses_the_descriptor_main_capability() {
        let registry = registry_with_step_kinds();
        let mut plugin = step("row-generator", "Row Generator");
        plugin.main_capability = Capability::Runtime;
        registry.register(PluginKind::Step, plugin).unwrap();
        registry.add_class_factory(
            PluginKind::Step,
            Capability::Runtime,
            "row-generator",
            || RowGeneratorMeta { rows: 3 },
        );

        let instance = registry.load_main(PluginKind::Step, "row-generator").unwrap();
        assert_eq!(instance.downcast::<RowGeneratorMeta>().unwrap().rows, 3);
    }

    #[test]
    fn plugin_information_has_one_string_row_per_live_descriptor() {
        let registry = registry_with_step_kinds();
        let mut plugin = step("csv-input", "CSV Input");
        plugin.description = "Reads delimited text files".to_string();
        plugin.category = "Input".to_string();
        plugin.image_file = Some("csv.svg".to_string());
        plugin
            .class_map
            .insert(Capability::Meta, "retort_create_csv_input_meta".to_string());
        registry.register(PluginKind::Step, plugin).unwrap();
        registry
            .register(PluginKind::StepFragment, fragment_for("csv-input"))
            .unwrap();

        assert_eq!(INFORMATION_COLUMNS.len(), 8);

        let rows = registry.plugin_information(PluginKind::Step);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), 8);
        assert_eq!(row[0], "Step");
        assert_eq!(row[1], "csv-input");
        assert_eq!(row[2], "CSV Input");
        assert_eq!(row[3], "Reads delimited text files");
        assert!(row[4].contains("csv-input.jar"));
        assert_eq!(row[5], "csv.svg");
        assert!(row[6].contains("Meta=retort_create_csv_input_meta"));
        assert_eq!(row[7], "Input");

        // Fragment buckets project no rows.
        assert!(registry.plugin_information(PluginKind::StepFragment).is_empty());
    }

    #[test]
    fn categories_are_collected_and_sorted() {
        let registry = registry_with_step_kinds();
        let mut output = step("text-output", "Text Output");
        output.category = "Output".to_string();
        let mut input = step("csv-input", "CSV Input");
        input.category = "Input".to_string();
        registry.register(PluginKind::Step, output).unwrap();
        registry.register(PluginKind::Step, input).unwrap();

        assert_eq!(registry.get_categories(PluginKind::Step), vec!["Input", "Output"]);
    }

    #[test]
    fn register_natives_loads_the_embedded_documents() {
        let registry = PluginRegistry::new();
        for handler in builtin_handlers() {
            registry.register_kind(handler);
        }
        let config = RetortConfig::default();

        registry.register_natives(PluginKind::Step, &config).unwrap();
        let steps = registry.get_plugins(PluginKind::Step);
        assert_eq!(steps.len(), 3);
        assert!(steps.iter().any(|plugin| plugin.matches("row-generator")));
    }

    #[test]
    fn register_natives_parse_failure_leaves_the_registry_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("steps.toml");
        fs::write(&bad, "[[plugin]]\nkind = \"Step\"\nname = \"No Id\"\n").unwrap();

        let registry = registry_with_step_kinds();
        let mut config = RetortConfig::default();
        config
            .plugins
            .natives_files
            .insert("Step".to_string(), bad.display().to_string());

        let err = registry.register_natives(PluginKind::Step, &config).unwrap_err();
        assert!(matches!(err, RetortError::Registration { .. }));
        assert!(registry.get_plugins(PluginKind::Step).is_empty());
    }

    #[test]
    fn register_from_folder_registers_archives_with_manifests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("csv-input.jar"), b"archive").unwrap();
        fs::write(
            dir.path().join("csv-input.toml"),
            r#"
[[plugin]]
id = "csv-input"
kind = "Step"
name = "CSV Input"
category = "Input"
"#,
        )
        .unwrap();

        let registry = registry_with_step_kinds();
        let folder = PluginFolder::new(dir.path(), false);
        let summary = registry.register_from_folder(&folder).unwrap();
        assert_eq!(summary, ScanSummary { found: 1, registered: 1, failed: 0 });

        let plugin = registry.get_plugin(PluginKind::Step, "csv-input").unwrap();
        assert_eq!(plugin.libraries, vec![PathBuf::from("csv-input.jar")]);
        assert_eq!(plugin.source_folder.as_deref(), Some(dir.path()));
    }

    #[test]
    fn one_failing_archive_does_not_abort_its_siblings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.jar"), b"archive").unwrap();
        fs::write(
            dir.path().join("good.toml"),
            "[[plugin]]\nid = \"good\"\nkind = \"Step\"\nname = \"Good\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("bad.jar"), b"archive").unwrap();
        fs::write(dir.path().join("bad.toml"), "not a manifest at all [").unwrap();

        let registry = registry_with_step_kinds();
        let summary = registry
            .register_from_folder(&PluginFolder::new(dir.path(), false))
            .unwrap();
        assert_eq!(summary.found, 2);
        assert_eq!(summary.registered, 1);
        assert_eq!(summary.failed, 1);
        assert!(registry.get_plugin(PluginKind::Step, "good").is_some());
    }

    #[test]
    fn archives_without_manifests_are_plain_libraries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("support.jar"), b"archive").unwrap();

        let registry = registry_with_step_kinds();
        let summary = registry
            .register_from_folder(&PluginFolder::new(dir.path(), false))
            .unwrap();
        assert_eq!(summary, ScanSummary { found: 1, registered: 0, failed: 0 });
    }

    #[test]
    fn init_registers_natives_and_scans_configured_folders() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("csv-input.jar"), b"archive").unwrap();
        fs::write(
            dir.path().join("csv-input.toml"),
            "[[plugin]]\nid = \"csv-input\"\nkind = \"Step\"\nname = \"CSV Input\"\n",
        )
        .unwrap();

        let registry = PluginRegistry::new();
        for handler in builtin_handlers() {
            registry.register_kind(handler);
        }
        let mut config = RetortConfig::default();
        config.plugins.folders = vec![dir.path().display().to_string()];

        registry.init(&config).unwrap();

        // Embedded natives plus the scanned archive.
        let steps = registry.get_plugins(PluginKind::Step);
        assert_eq!(steps.len(), 4);
        assert!(!registry.get_plugins(PluginKind::Database).is_empty());
    }

    #[test]
    fn reset_clears_the_catalog_and_tracking() {
        let registry = registry_with_step_kinds();
        registry
            .register(PluginKind::Step, step("csv-input", "CSV Input"))
            .unwrap();
        registry.add_class_factory(PluginKind::Step, Capability::Meta, "row-generator", || {
            RowGeneratorMeta { rows: 1 }
        });

        registry.reset();

        assert!(registry.get_plugins(PluginKind::Step).is_empty());
        assert!(matches!(
            registry.load_instance(PluginKind::Step, "row-generator", Capability::Meta),
            Err(RetortError::PluginNotFound { .. })
        ));
    }
}
