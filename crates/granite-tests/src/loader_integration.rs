//! Plugin loader behaviour against an in-process environment.
//!
//! A mock [`Env`] stands in for the filesystem and dynamic linker, so
//! enumeration, filtering, silent skipping and registration can be
//! exercised without building shared objects.
//!
//! [`Env`]: granite_compress::Env

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;
    use std::sync::Arc;

    use granite_compress::{
        CacheAllocation, CodeModule, CompressionInfo, CompressionResult, Compressor,
        CompressorRegistry, Env, MemoryAllocator, UncompressionInfo, FIRST_CUSTOM_TYPE,
    };

    /// Pass-through codec with a per-module name, standing in for a
    /// plugin's export.
    struct PluginCodec {
        name: &'static str,
    }

    impl Compressor for PluginCodec {
        fn name(&self) -> &'static str {
            self.name
        }

        fn compress(
            &self,
            _info: &CompressionInfo<'_>,
            _format_version: u32,
            input: &[u8],
            output: &mut Vec<u8>,
        ) -> CompressionResult<()> {
            output.extend_from_slice(input);
            Ok(())
        }

        fn uncompress(
            &self,
            _info: &UncompressionInfo<'_>,
            _format_version: u32,
            input: &[u8],
            allocator: Option<&dyn MemoryAllocator>,
        ) -> CompressionResult<CacheAllocation> {
            CacheAllocation::copy_from_slice(input, allocator)
        }
    }

    struct StaticModule {
        name: String,
        exports_factory: bool,
    }

    impl CodeModule for StaticModule {
        fn name(&self) -> &str {
            &self.name
        }

        fn create_compressor(&self) -> Option<Box<dyn Compressor>> {
            if !self.exports_factory {
                return None;
            }
            let codec_name = Box::leak(format!("Plugin[{}]", self.name).into_boxed_str());
            Some(Box::new(PluginCodec { name: codec_name }))
        }
    }

    /// Environment serving a fixed directory listing. Files containing
    /// "broken" open but export no factory; files containing "unreadable"
    /// fail to open.
    #[derive(Debug)]
    struct StaticEnv {
        children: Vec<&'static str>,
        loading_supported: bool,
    }

    impl Env for StaticEnv {
        fn list_children(&self, _dir: &Path) -> io::Result<Vec<String>> {
            Ok(self.children.iter().map(|c| c.to_string()).collect())
        }

        fn load_library(&self, name: &str, _dir: &Path) -> io::Result<Box<dyn CodeModule>> {
            if name.contains("unreadable") {
                return Err(io::Error::new(io::ErrorKind::NotFound, "cannot open"));
            }
            Ok(Box::new(StaticModule {
                name: name.to_string(),
                exports_factory: !name.contains("broken"),
            }))
        }

        fn dynamic_library_supported(&self) -> bool {
            self.loading_supported
        }
    }

    fn plugin_env() -> Arc<StaticEnv> {
        Arc::new(StaticEnv {
            children: vec![
                "libgranite_alpha.so",
                "libgranite_broken.so",
                "libgranite_unreadable.so",
                "libother_codec.so",
                "README.md",
                "libgranite_beta.so",
            ],
            loading_supported: true,
        })
    }

    #[test]
    fn test_load_and_add_with_filter_skips_failures() {
        let registry = CompressorRegistry::with_plugins(
            plugin_env(),
            Path::new("/plugins"),
            r"^libgranite_.*\.so$",
        );
        // alpha and beta load; broken and unreadable are skipped, the
        // rest never match the filter.
        let custom = registry.get_compressors(false, true);
        assert_eq!(custom.len(), 2);
        assert_eq!(
            registry.get_compressor(FIRST_CUSTOM_TYPE).unwrap().name(),
            "Plugin[libgranite_alpha.so]"
        );
        assert_eq!(
            registry.get_compressor(FIRST_CUSTOM_TYPE + 1).unwrap().name(),
            "Plugin[libgranite_beta.so]"
        );
    }

    #[test]
    fn test_load_compressors_without_registering() {
        let registry = CompressorRegistry::with_env(plugin_env());
        let loaded = registry.load_compressors(Path::new("/plugins"), r"^libgranite_.*\.so$");
        assert_eq!(loaded.len(), 2);
        // Nothing registered: loading and adding are separate steps.
        assert!(registry.get_compressors(false, true).is_empty());
    }

    #[test]
    fn test_load_single_file_entry_points() {
        let registry = CompressorRegistry::with_env(plugin_env());
        let tag = registry
            .load_and_add_compressor("libgranite_alpha.so", Path::new("/plugins"))
            .unwrap();
        assert_eq!(tag, FIRST_CUSTOM_TYPE);

        assert!(registry
            .load_and_add_compressor("libgranite_unreadable.so", Path::new("/plugins"))
            .is_err());
        assert!(registry
            .load_and_add_compressor("libgranite_broken.so", Path::new("/plugins"))
            .is_err());
    }

    #[test]
    fn test_loading_unsupported_environment() {
        let env = Arc::new(StaticEnv {
            children: vec!["libgranite_alpha.so"],
            loading_supported: false,
        });
        let registry =
            CompressorRegistry::with_plugins(env, Path::new("/plugins"), r".*\.so$");
        assert!(!registry.load_supported());
        assert!(registry.get_compressors(false, true).is_empty());
    }

    #[test]
    fn test_invalid_filter_loads_nothing() {
        let registry = CompressorRegistry::with_env(plugin_env());
        let loaded = registry.load_compressors(Path::new("/plugins"), r"(unclosed");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_plugin_codec_usable_after_registration() {
        let registry = Arc::new(CompressorRegistry::with_plugins(
            plugin_env(),
            Path::new("/plugins"),
            r"^libgranite_alpha\.so$",
        ));
        let tag = FIRST_CUSTOM_TYPE;
        let codec = registry.get_compressor(tag).unwrap();

        let opts = granite_compress::CompressionOptions::default();
        let cctx = granite_compress::CompressionContext::new(&registry, tag);
        let info = CompressionInfo::new(
            &opts,
            &cctx,
            granite_compress::CompressionDict::empty(),
            tag,
            0,
        );
        let mut out = Vec::new();
        codec.compress(&info, 2, b"payload", &mut out).unwrap();

        let uctx = granite_compress::UncompressionContext::new(&registry, tag);
        let uinfo = UncompressionInfo::new(
            &uctx,
            granite_compress::UncompressionDict::empty(),
            tag,
        );
        let decoded = codec.uncompress(&uinfo, 2, &out, None).unwrap();
        assert_eq!(decoded.as_slice(), b"payload");
    }
}
