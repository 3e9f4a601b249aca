//! The process-wide compressor registry.
//!
//! Maps 1-byte on-disk tags to codec instances. Built-in codecs are
//! seeded at well-known tags the storage format depends on; user
//! codecs get tags assigned from the custom range. The intended usage
//! is mutate-before-serving: registrations happen during engine
//! initialisation, lookups run concurrently afterwards.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::codecs::builtin_compressors;
use crate::compressor::Compressor;
use crate::env::{CodeModule, DefaultEnv, Env};
use crate::error::{CompressionError, CompressionResult};
use crate::types::{is_reserved_tag, CompressionType, FIRST_CUSTOM_TYPE, MAX_COMPRESSOR_TYPE};

/// Reserved codec name resolving to [`CompressionType::NoCompression`].
pub const NO_COMPRESSION_NAME: &str = "NoCompression";

/// Reserved codec name resolving to [`CompressionType::Disabled`].
pub const DISABLE_OPTION_NAME: &str = "DisableOption";

const SLOT_COUNT: usize = MAX_COMPRESSOR_TYPE as usize + 1;

/// Tag-indexed codec slots with parallel built-in flags.
///
/// The built-in flag tracks the slot, not the codec: seeding sets it
/// and later inserts leave it untouched, so a user override installed
/// over a seeded built-in keeps reporting as built-in.
struct SlotTable {
    compressors: Vec<Option<Arc<dyn Compressor>>>,
    builtin: Vec<bool>,
}

impl SlotTable {
    fn new() -> Self {
        Self {
            compressors: vec![None; SLOT_COUNT],
            builtin: vec![false; SLOT_COUNT],
        }
    }

    fn seed_builtins(&mut self) {
        // A codec the user pre-registered at a built-in tag wins; the
        // built-in then simply defers.
        for (tag, compressor) in builtin_compressors() {
            let slot = tag as usize;
            if self.compressors[slot].is_none() {
                self.compressors[slot] = Some(compressor);
                self.builtin[slot] = true;
            }
        }
    }

    fn type_of_name(&self, name: &str) -> u8 {
        if name == NO_COMPRESSION_NAME {
            return CompressionType::NoCompression.tag();
        }
        if name == DISABLE_OPTION_NAME {
            return CompressionType::Disabled.tag();
        }
        for (slot, compressor) in self.compressors.iter().enumerate() {
            if let Some(c) = compressor {
                if c.name() == name {
                    return slot as u8;
                }
            }
        }
        CompressionType::Disabled.tag()
    }
}

/// The registry of all available compressors, built-in and custom.
///
/// Lookups are concurrent-read-safe. Mutations (`add_compressor`,
/// plugin loading, `release_instance`) belong to the initialisation
/// phase; callers must quiesce engine activity before invoking them.
pub struct CompressorRegistry {
    // Field order is load-bearing: codec slots must drop before the
    // module handles below, because plugin codec vtables and drop glue
    // live inside the modules.
    slots: RwLock<SlotTable>,
    modules: Mutex<Vec<Box<dyn CodeModule>>>,
    env: Arc<dyn Env>,
}

static INSTANCE: Mutex<Option<Arc<CompressorRegistry>>> = Mutex::new(None);

impl CompressorRegistry {
    /// Creates a registry seeded with the built-in codecs, using the
    /// default environment.
    pub fn new() -> Self {
        Self::with_env(Arc::new(DefaultEnv))
    }

    /// Creates a registry seeded with the built-in codecs on a custom
    /// environment.
    pub fn with_env(env: Arc<dyn Env>) -> Self {
        let mut table = SlotTable::new();
        table.seed_builtins();
        let seeded = table.compressors.iter().filter(|c| c.is_some()).count();
        info!(builtins = seeded, "compressor registry initialised");
        Self {
            slots: RwLock::new(table),
            modules: Mutex::new(Vec::new()),
            env,
        }
    }

    /// Creates a registry and loads every plugin module under `dir`
    /// whose file name matches `filter`.
    pub fn with_plugins(env: Arc<dyn Env>, dir: &Path, filter: &str) -> Self {
        let registry = Self::with_env(env);
        if registry.load_supported() {
            registry.load_and_add_compressors(dir, filter);
        }
        registry
    }

    /// Returns the process-wide singleton, creating it on first call.
    pub fn new_instance() -> Arc<CompressorRegistry> {
        let mut guard = INSTANCE.lock().unwrap();
        if let Some(instance) = guard.as_ref() {
            return Arc::clone(instance);
        }
        let instance = Arc::new(CompressorRegistry::new());
        *guard = Some(Arc::clone(&instance));
        instance
    }

    /// Returns the singleton, creating it with plugin loading on first
    /// call. When the singleton already exists it is returned as-is.
    pub fn new_instance_with_plugins(
        env: Arc<dyn Env>,
        dir: &Path,
        filter: &str,
    ) -> Arc<CompressorRegistry> {
        let mut guard = INSTANCE.lock().unwrap();
        if let Some(instance) = guard.as_ref() {
            return Arc::clone(instance);
        }
        let instance = Arc::new(CompressorRegistry::with_plugins(env, dir, filter));
        *guard = Some(Arc::clone(&instance));
        instance
    }

    /// Drops the singleton reference. Callers still holding the `Arc`
    /// keep the registry alive; the next [`new_instance`] call creates
    /// a fresh one.
    ///
    /// [`new_instance`]: CompressorRegistry::new_instance
    pub fn release_instance() {
        INSTANCE.lock().unwrap().take();
    }

    /// The codec registered at `tag`, if any. O(1).
    pub fn get_compressor(&self, tag: u8) -> Option<Arc<dyn Compressor>> {
        let table = self.slots.read().unwrap();
        table.compressors.get(tag as usize).cloned().flatten()
    }

    /// The codec with the given name, if any. Linear scan over the
    /// tag space.
    pub fn get_compressor_by_name(&self, name: &str) -> Option<Arc<dyn Compressor>> {
        let table = self.slots.read().unwrap();
        table
            .compressors
            .iter()
            .flatten()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// All registered codecs matching the filter, in tag order.
    pub fn get_compressors(
        &self,
        include_builtin: bool,
        include_custom: bool,
    ) -> Vec<Arc<dyn Compressor>> {
        let table = self.slots.read().unwrap();
        let mut available = Vec::new();
        for (slot, compressor) in table.compressors.iter().enumerate() {
            if let Some(c) = compressor {
                let included = if table.builtin[slot] {
                    include_builtin
                } else {
                    include_custom
                };
                if included {
                    available.push(Arc::clone(c));
                }
            }
        }
        available
    }

    /// The tags of all registered codecs matching the filter, in tag
    /// order.
    pub fn get_compressor_types(&self, include_builtin: bool, include_custom: bool) -> Vec<u8> {
        let table = self.slots.read().unwrap();
        let mut available = Vec::new();
        for (slot, compressor) in table.compressors.iter().enumerate() {
            if compressor.is_some() {
                let included = if table.builtin[slot] {
                    include_builtin
                } else {
                    include_custom
                };
                if included {
                    available.push(slot as u8);
                }
            }
        }
        available
    }

    /// The tag of the codec with the given name, or the disabled
    /// sentinel when absent. The reserved names [`NO_COMPRESSION_NAME`]
    /// and [`DISABLE_OPTION_NAME`] resolve without a registered codec.
    pub fn get_compressor_type(&self, name: &str) -> u8 {
        let table = self.slots.read().unwrap();
        table.type_of_name(name)
    }

    /// Labels a tag for the options layer: built-in and reserved tags
    /// map to themselves, anything else to [`CompressionType::Custom`].
    ///
    /// Precondition: `tag` is not the custom sentinel itself.
    pub fn custom_type(&self, tag: u8) -> CompressionType {
        debug_assert_ne!(tag, CompressionType::Custom.tag());
        let table = self.slots.read().unwrap();
        let builtin = table
            .builtin
            .get(tag as usize)
            .copied()
            .unwrap_or(false);
        if builtin
            || tag == CompressionType::NoCompression.tag()
            || tag == CompressionType::Disabled.tag()
        {
            CompressionType::from_tag(tag).unwrap_or(CompressionType::Custom)
        } else {
            CompressionType::Custom
        }
    }

    /// Registers a codec, assigning a tag automatically.
    ///
    /// A codec whose name is already registered keeps its tag (the
    /// slot is overwritten in place). Otherwise the first free slot in
    /// the custom range is taken. Returns the assigned tag, or the
    /// disabled sentinel when the custom range is exhausted.
    pub fn add_compressor(&self, compressor: Arc<dyn Compressor>) -> u8 {
        let mut table = self.slots.write().unwrap();
        let mut tag = table.type_of_name(compressor.name());
        if tag == CompressionType::Disabled.tag() {
            for candidate in FIRST_CUSTOM_TYPE..=MAX_COMPRESSOR_TYPE {
                if is_reserved_tag(candidate) || table.compressors[candidate as usize].is_some() {
                    continue;
                }
                tag = candidate;
                break;
            }
        }

        if tag == CompressionType::Disabled.tag() {
            warn!(name = compressor.name(), "custom compressor range exhausted");
            return tag;
        }
        debug!(name = compressor.name(), tag, "registered compressor");
        table.compressors[tag as usize] = Some(compressor);
        tag
    }

    /// Registers a codec at an explicit tag, overriding whatever the
    /// slot held. Reserved tags are rejected with the disabled
    /// sentinel. A previous slot holding a codec of the same name is
    /// cleared first, keeping names unique across the registry.
    pub fn add_compressor_with_type(&self, compressor: Arc<dyn Compressor>, tag: u8) -> u8 {
        if is_reserved_tag(tag) {
            return CompressionType::Disabled.tag();
        }
        let mut table = self.slots.write().unwrap();
        let prev_tag = table.type_of_name(compressor.name());
        if prev_tag != CompressionType::Disabled.tag() && prev_tag != tag {
            table.compressors[prev_tag as usize] = None;
        }
        debug!(name = compressor.name(), tag, "registered compressor at explicit tag");
        table.compressors[tag as usize] = Some(compressor);
        tag
    }

    /// Whether the environment supports dynamic module loading.
    pub fn load_supported(&self) -> bool {
        self.env.dynamic_library_supported()
    }

    /// Opens `file` (under `dir`) as a code module and produces its
    /// codec without registering it. The module handle stays owned by
    /// the registry so the codec's code outlives the call.
    pub fn load_compressor(&self, file: &str, dir: &Path) -> CompressionResult<Arc<dyn Compressor>> {
        let module = self
            .env
            .load_library(file, dir)
            .map_err(|e| CompressionError::PluginLoad {
                module: file.to_string(),
                reason: e.to_string(),
            })?;
        let compressor = module
            .create_compressor()
            .ok_or_else(|| CompressionError::PluginLoad {
                module: file.to_string(),
                reason: "no CreateCompressor factory".to_string(),
            })?;
        self.modules.lock().unwrap().push(module);
        info!(module = file, name = compressor.name(), "loaded compressor plugin");
        Ok(Arc::from(compressor))
    }

    /// Loads every module under `dir` whose file name matches the
    /// `filter` regex, producing codecs without registering them.
    /// Per-file failures are logged and skipped.
    pub fn load_compressors(&self, dir: &Path, filter: &str) -> Vec<Arc<dyn Compressor>> {
        let mut loaded = Vec::new();
        self.for_each_matching_module(dir, filter, |registry, file| {
            match registry.load_compressor(file, dir) {
                Ok(compressor) => loaded.push(compressor),
                Err(e) => warn!(module = file, error = %e, "skipping plugin module"),
            }
        });
        loaded
    }

    /// Loads one module and registers its codec with an auto-assigned
    /// tag. Returns the tag (the disabled sentinel when the custom
    /// range is exhausted).
    pub fn load_and_add_compressor(&self, file: &str, dir: &Path) -> CompressionResult<u8> {
        let compressor = self.load_compressor(file, dir)?;
        Ok(self.add_compressor(compressor))
    }

    /// Loads and registers every matching module under `dir`. Returns
    /// the assigned tags; per-file failures are logged and skipped.
    pub fn load_and_add_compressors(&self, dir: &Path, filter: &str) -> Vec<u8> {
        let mut tags = Vec::new();
        self.for_each_matching_module(dir, filter, |registry, file| {
            match registry.load_and_add_compressor(file, dir) {
                Ok(tag) if tag != CompressionType::Disabled.tag() => tags.push(tag),
                Ok(_) => warn!(module = file, "no free custom tag for plugin"),
                Err(e) => warn!(module = file, error = %e, "skipping plugin module"),
            }
        });
        tags
    }

    fn for_each_matching_module<F>(&self, dir: &Path, filter: &str, mut f: F)
    where
        F: FnMut(&Self, &str),
    {
        if !self.load_supported() {
            return;
        }
        let pattern = match Regex::new(filter) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(filter, error = %e, "invalid plugin filter");
                return;
            }
        };
        let children = match self.env.list_children(dir) {
            Ok(children) => children,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot list plugin directory");
                return;
            }
        };
        for child in children.iter().filter(|c| pattern.is_match(c)) {
            f(self, child.as_str());
        }
    }
}

impl Default for CompressorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
