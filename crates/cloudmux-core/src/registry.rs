//! Driver registry and loaders
//!
//! The registry maps `(provider, driver name)` to a driver instance. A driver
//! is loaded at most once per process and every later lookup returns the
//! same instance.

use crate::error::{CoreError, Result};
use crate::info::CloudDriverInfo;
use cloudmux_driver::CloudDriver;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverKey {
    pub provider: String,
    pub driver: String,
}

impl DriverKey {
    pub fn new(provider: &str, driver: &str) -> Self {
        Self {
            provider: provider.trim().to_uppercase(),
            driver: driver.trim().to_string(),
        }
    }
}

impl fmt::Display for DriverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.driver)
    }
}

/// Turns a registered driver record into a driver instance
pub trait DriverLoader: Send + Sync {
    fn load(&self, info: &CloudDriverInfo) -> Result<Arc<dyn CloudDriver>>;
}

pub type DriverFactory = Arc<dyn Fn() -> Arc<dyn CloudDriver> + Send + Sync>;

/// Drivers compiled into the binary, keyed by library file name
#[derive(Default)]
pub struct StaticDriverLoader {
    factories: HashMap<String, DriverFactory>,
    fallback: Option<Arc<dyn DriverLoader>>,
    loads: AtomicUsize,
}

impl StaticDriverLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_driver<F>(mut self, lib_file_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn CloudDriver> + Send + Sync + 'static,
    {
        self.factories.insert(lib_file_name.into(), Arc::new(factory));
        self
    }

    /// Loader for library names without a built-in factory
    pub fn with_fallback(mut self, fallback: Arc<dyn DriverLoader>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Number of built-in drivers instantiated so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl DriverLoader for StaticDriverLoader {
    fn load(&self, info: &CloudDriverInfo) -> Result<Arc<dyn CloudDriver>> {
        if let Some(factory) = self.factories.get(&info.driver_lib_file_name) {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Instantiated built-in driver {}", info.driver_lib_file_name);
            return Ok(factory());
        }
        match &self.fallback {
            Some(fallback) => fallback.load(info),
            None => Err(CoreError::DriverLoad {
                library: info.driver_lib_file_name.clone(),
                reason: "no built-in driver with this name".to_string(),
            }),
        }
    }
}

#[cfg(feature = "dylib")]
pub use dylib::DylibDriverLoader;

#[cfg(feature = "dylib")]
mod dylib {
    use super::*;
    use cloudmux_driver::{DRIVER_ABI_SYMBOL, DRIVER_ABI_VERSION, DRIVER_ENTRY_SYMBOL, DriverEntryFn};
    use libloading::{Library, Symbol};
    use std::path::{Path, PathBuf};

    /// Loads drivers from shared libraries in one directory.
    ///
    /// Libraries stay mapped for the life of the process.
    #[derive(Debug, Clone)]
    pub struct DylibDriverLoader {
        lib_dir: PathBuf,
    }

    impl DylibDriverLoader {
        pub fn new(lib_dir: impl AsRef<Path>) -> Self {
            Self {
                lib_dir: lib_dir.as_ref().to_path_buf(),
            }
        }

        pub fn lib_dir(&self) -> &Path {
            &self.lib_dir
        }
    }

    impl DriverLoader for DylibDriverLoader {
        fn load(&self, info: &CloudDriverInfo) -> Result<Arc<dyn CloudDriver>> {
            let path = self.lib_dir.join(&info.driver_lib_file_name);
            let fail = |reason: String| CoreError::DriverLoad {
                library: path.display().to_string(),
                reason,
            };

            if !path.is_file() {
                return Err(fail("library file not found".to_string()));
            }

            // SAFETY: loading runs the library's initializers; driver
            // libraries are trusted by whoever registered them.
            let library = unsafe { Library::new(&path) }.map_err(|e| fail(e.to_string()))?;
            let library: &'static Library = Box::leak(Box::new(library));

            // SAFETY: the symbol is declared by `declare_driver!` as a `u32` static
            let version = unsafe {
                let abi: Symbol<*const u32> = library
                    .get(DRIVER_ABI_SYMBOL)
                    .map_err(|e| fail(format!("not a cloudmux driver: {}", e)))?;
                **abi
            };
            if version != DRIVER_ABI_VERSION {
                return Err(fail(format!(
                    "driver ABI version {} does not match host version {}",
                    version, DRIVER_ABI_VERSION
                )));
            }

            // SAFETY: ABI version matched, so the entry has the expected signature
            let entry: DriverEntryFn = unsafe {
                let symbol: Symbol<DriverEntryFn> = library
                    .get(DRIVER_ENTRY_SYMBOL)
                    .map_err(|e| fail(e.to_string()))?;
                *symbol
            };

            tracing::info!("Loaded driver library {}", path.display());
            Ok(Arc::from(entry()))
        }
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-wide driver table
pub struct DriverRegistry {
    loader: Arc<dyn DriverLoader>,
    catalog: Mutex<HashMap<DriverKey, CloudDriverInfo>>,
    loaded: Mutex<HashMap<DriverKey, Arc<dyn CloudDriver>>>,
}

impl DriverRegistry {
    pub fn new(loader: Arc<dyn DriverLoader>) -> Self {
        Self {
            loader,
            catalog: Mutex::new(HashMap::new()),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Makes a driver record resolvable. Re-registering a key with another
    /// library evicts the previously loaded instance.
    pub fn register(&self, info: CloudDriverInfo) {
        let key = DriverKey::new(&info.provider_name, &info.driver_name);
        let previous = guard(&self.catalog).insert(key.clone(), info.clone());
        if previous.is_some_and(|p| p.driver_lib_file_name != info.driver_lib_file_name) {
            guard(&self.loaded).remove(&key);
        }
        tracing::debug!("Registered driver {}", key);
    }

    pub fn unregister(&self, provider: &str, driver: &str) {
        let key = DriverKey::new(provider, driver);
        guard(&self.catalog).remove(&key);
        guard(&self.loaded).remove(&key);
    }

    /// Replaces the catalog with `infos`; loaded instances that are still
    /// registered with the same library are kept.
    pub fn rebuild(&self, infos: impl IntoIterator<Item = CloudDriverInfo>) {
        let catalog: HashMap<DriverKey, CloudDriverInfo> = infos
            .into_iter()
            .map(|info| (DriverKey::new(&info.provider_name, &info.driver_name), info))
            .collect();

        let mut current = guard(&self.catalog);
        guard(&self.loaded).retain(|key, _| {
            current.get(key).map(|c| &c.driver_lib_file_name)
                == catalog.get(key).map(|c| &c.driver_lib_file_name)
        });
        tracing::debug!("Driver catalog rebuilt with {} entries", catalog.len());
        *current = catalog;
    }

    /// Driver instance for `(provider, driver)`, loading it on first use
    pub fn resolve(&self, provider: &str, driver: &str) -> Result<Arc<dyn CloudDriver>> {
        let key = DriverKey::new(provider, driver);

        let info = guard(&self.catalog).get(&key).cloned().ok_or_else(|| {
            CoreError::DriverNotFound {
                provider: key.provider.clone(),
                driver: key.driver.clone(),
            }
        })?;

        // Held across the load so concurrent callers share one instance
        let mut loaded = guard(&self.loaded);
        if let Some(existing) = loaded.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let instance = self.loader.load(&info)?;
        tracing::info!(
            "Loaded driver {} (version {})",
            key,
            instance.driver_version()
        );
        loaded.insert(key, Arc::clone(&instance));
        Ok(instance)
    }

    pub fn registered(&self) -> Vec<DriverKey> {
        let mut keys: Vec<DriverKey> = guard(&self.catalog).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Keys with a live driver instance
    pub fn loaded(&self) -> Vec<DriverKey> {
        let mut keys: Vec<DriverKey> = guard(&self.loaded).keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudmux_driver_mock::MockDriver;

    const MOCK_LIB: &str = "cloudmux-driver-mock";

    fn registry() -> (Arc<StaticDriverLoader>, DriverRegistry) {
        let loader = Arc::new(
            StaticDriverLoader::new()
                .with_driver(MOCK_LIB, || Arc::new(MockDriver::new()) as Arc<dyn CloudDriver>),
        );
        let registry = DriverRegistry::new(loader.clone());
        (loader, registry)
    }

    #[test]
    fn test_resolve_returns_same_instance() {
        let (loader, registry) = registry();
        registry.register(CloudDriverInfo::new("mock-driver", "mock", MOCK_LIB));

        let first = registry.resolve("MOCK", "mock-driver").unwrap();
        let second = registry.resolve("mock", " mock-driver ").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.load_count(), 1);
        assert_eq!(registry.loaded(), vec![DriverKey::new("MOCK", "mock-driver")]);
    }

    #[test]
    fn test_unregistered_driver_not_found() {
        let (loader, registry) = registry();

        let err = registry.resolve("AWS", "aws-driver01").err().unwrap();
        assert!(matches!(err, CoreError::DriverNotFound { ref provider, .. } if provider == "AWS"));
        assert!(registry.loaded().is_empty());
        assert!(registry.registered().is_empty());
        assert_eq!(loader.load_count(), 0);
    }

    #[test]
    fn test_unknown_library_is_load_error() {
        let (_, registry) = registry();
        registry.register(CloudDriverInfo::new("aws-driver01", "AWS", "aws-driver-v1.0.so"));

        let err = registry.resolve("AWS", "aws-driver01").err().unwrap();
        assert!(matches!(err, CoreError::DriverLoad { .. }));
        assert!(registry.loaded().is_empty());
    }

    #[test]
    fn test_concurrent_resolve_loads_once() {
        let (loader, registry) = registry();
        registry.register(CloudDriverInfo::new("mock-driver", "MOCK", MOCK_LIB));
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve("MOCK", "mock-driver").unwrap())
            })
            .collect();
        let drivers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(drivers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn test_rebuild_drops_removed_drivers() {
        let (_, registry) = registry();
        registry.register(CloudDriverInfo::new("mock-driver", "MOCK", MOCK_LIB));
        registry.resolve("MOCK", "mock-driver").unwrap();

        registry.rebuild(vec![CloudDriverInfo::new("other", "MOCK", MOCK_LIB)]);
        assert!(registry.loaded().is_empty());
        assert!(matches!(
            registry.resolve("MOCK", "mock-driver"),
            Err(CoreError::DriverNotFound { .. })
        ));
        assert!(registry.resolve("MOCK", "other").is_ok());
    }

    #[cfg(feature = "dylib")]
    #[test]
    fn test_dylib_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DylibDriverLoader::new(dir.path());
        let err = loader
            .load(&CloudDriverInfo::new("aws-driver01", "AWS", "aws-driver-v1.0.so"))
            .err()
            .unwrap();
        match err {
            CoreError::DriverLoad { library, reason } => {
                assert!(library.ends_with("aws-driver-v1.0.so"));
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_static_loader_falls_back() {
        struct Refuse;
        impl DriverLoader for Refuse {
            fn load(&self, info: &CloudDriverInfo) -> Result<Arc<dyn CloudDriver>> {
                Err(CoreError::DriverLoad {
                    library: info.driver_lib_file_name.clone(),
                    reason: "refused".into(),
                })
            }
        }

        let loader = StaticDriverLoader::new().with_fallback(Arc::new(Refuse));
        let err = loader
            .load(&CloudDriverInfo::new("x", "X", "x.so"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("refused"));
    }
}
