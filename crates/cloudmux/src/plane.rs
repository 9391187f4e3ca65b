//! Control plane wiring for one CLI invocation

use cloudmux_config::{Settings, StoreBackend};
use cloudmux_core::{
    ControlPlane, DriverLoader, DylibDriverLoader, FileKvStore, KvStore, MemoryKvStore,
    StaticDriverLoader,
};
use cloudmux_driver::CloudDriver;
use cloudmux_driver_mock::MockDriver;
use std::sync::Arc;

/// Library name the built-in mock driver is registered under
pub const MOCK_DRIVER_LIB: &str = "cloudmux-driver-mock";

/// Built-in drivers first, then shared libraries from the driver directory
fn driver_loader(settings: &Settings) -> anyhow::Result<Arc<dyn DriverLoader>> {
    let lib_dir = settings.driver_lib_dir()?;
    tracing::debug!("Driver library directory: {}", lib_dir.display());

    let loader = StaticDriverLoader::new()
        .with_driver(MOCK_DRIVER_LIB, || {
            Arc::new(MockDriver::new()) as Arc<dyn CloudDriver>
        })
        .with_fallback(Arc::new(DylibDriverLoader::new(lib_dir)));
    Ok(Arc::new(loader))
}

pub async fn open(settings: &Settings) -> anyhow::Result<ControlPlane> {
    let store: Arc<dyn KvStore> = match settings.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the memory store; nothing is kept after this command");
            Arc::new(MemoryKvStore::new())
        }
        StoreBackend::File => {
            let dir = settings.data_dir()?;
            tracing::debug!("Store directory: {}", dir.display());
            Arc::new(FileKvStore::open(&dir).await?)
        }
    };

    Ok(ControlPlane::open(store, driver_loader(settings)?).await?)
}
