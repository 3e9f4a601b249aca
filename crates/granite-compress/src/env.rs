//! Environment capabilities consumed by the plugin loader.
//!
//! The registry never touches the filesystem or the dynamic linker
//! directly; it goes through [`Env`], so tests can substitute an
//! in-process environment and headless builds can disable loading
//! altogether.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::compressor::Compressor;

/// Name of the factory symbol a plugin module must export:
/// a no-argument function returning a freshly boxed codec.
pub const COMPRESSOR_FACTORY_SYMBOL: &[u8] = b"CreateCompressor";

/// Signature of the exported factory.
pub type CreateCompressorFn = fn() -> Box<dyn Compressor>;

/// An opened code module that may provide a codec.
///
/// The registry keeps every module handle alive for as long as any
/// codec produced from it can exist; dropping the handle unloads the
/// module.
pub trait CodeModule: Send + Sync {
    /// Identifier (file name or path) for diagnostics.
    fn name(&self) -> &str;

    /// Resolves the [`COMPRESSOR_FACTORY_SYMBOL`] factory and invokes
    /// it. `None` when the symbol is missing.
    fn create_compressor(&self) -> Option<Box<dyn Compressor>>;
}

/// The process environment's listing and loading primitives.
pub trait Env: Send + Sync + fmt::Debug {
    /// File names of the children of `dir`.
    fn list_children(&self, dir: &Path) -> io::Result<Vec<String>>;

    /// Opens `name` (resolved relative to `dir`) as a code module.
    fn load_library(&self, name: &str, dir: &Path) -> io::Result<Box<dyn CodeModule>>;

    /// Whether this environment can load code modules at all.
    fn dynamic_library_supported(&self) -> bool {
        true
    }
}

/// Environment backed by the real filesystem and dynamic linker.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEnv;

impl Env for DefaultEnv {
    fn list_children(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut children = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            children.push(entry.file_name().to_string_lossy().into_owned());
        }
        children.sort();
        Ok(children)
    }

    fn load_library(&self, name: &str, dir: &Path) -> io::Result<Box<dyn CodeModule>> {
        let path = dir.join(name);
        // Safety: loading a library runs its initialisers; the plugins
        // directory is trusted configuration, same as the binary itself.
        let library = unsafe { libloading::Library::new(&path) }
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(Box::new(SharedLibrary {
            name: name.to_string(),
            path,
            library,
        }))
    }

    fn dynamic_library_supported(&self) -> bool {
        cfg!(any(unix, windows))
    }
}

/// A module opened through the dynamic linker.
struct SharedLibrary {
    name: String,
    path: PathBuf,
    library: libloading::Library,
}

impl CodeModule for SharedLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_compressor(&self) -> Option<Box<dyn Compressor>> {
        // Safety: the factory contract fixes the symbol's signature;
        // a module exporting the symbol with another type is as broken
        // as a mislinked binary.
        let factory = unsafe {
            self.library
                .get::<CreateCompressorFn>(COMPRESSOR_FACTORY_SYMBOL)
        };
        match factory {
            Ok(factory) => Some(factory()),
            Err(e) => {
                tracing::warn!(
                    module = %self.path.display(),
                    error = %e,
                    "plugin module does not export CreateCompressor"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_children_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.so", "a.so", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let children = DefaultEnv.list_children(dir.path()).unwrap();
        assert_eq!(children, vec!["a.so", "b.so", "notes.txt"]);
    }

    #[test]
    fn test_load_library_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DefaultEnv.load_library("nope.so", dir.path()).is_err());
    }

    #[test]
    fn test_dynamic_loading_supported_on_this_platform() {
        assert!(DefaultEnv.dynamic_library_supported());
    }
}
