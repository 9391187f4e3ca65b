//! cloudmux control plane core
//!
//! Loads cloud drivers, keeps the NameId/SystemId mapping of every managed
//! resource and serializes conflicting operations on the same resource.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              transports (cmux, ...)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  ControlPlane                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  resource managers      reconciliation   │   │
//! │  │  (create/get/list/...)  (Mapped/Only*)   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐   │
//! │  │ InfoManager│ │ IidManager │ │LockManager │   │
//! │  └─────┬──────┘ └─────┬──────┘ └────────────┘   │
//! │        └──────┬───────┘                          │
//! │          ┌────▼────┐        ┌────────────────┐   │
//! │          │ KvStore │        │ DriverRegistry │   │
//! │          └─────────┘        └───────┬────────┘   │
//! └─────────────────────────────────────┼────────────┘
//!                                       │ DriverLoader
//!                           ┌───────────▼───────────┐
//!                           │ static / shared lib   │
//!                           └───────────────────────┘
//! ```

pub mod calllog;
pub mod connection;
pub mod error;
pub mod iid;
pub mod info;
pub mod lock;
pub mod reconcile;
pub mod registry;
pub mod resource;
pub mod store;

// Re-exports
pub use connection::Connection;
pub use error::{CoreError, ErrorCategory, Result};
pub use iid::{IidManager, IidRecord, OwnerRef};
pub use info::{CloudDriverInfo, ConnectionConfig, CredentialRecord, InfoManager, RegionRecord};
pub use lock::{ConnectionGuard, LockGuard, LockKey, LockManager};
pub use reconcile::{
    AllResourceList, DESTROY_ORDER, DeleteResult, DestroyedInfo, KindDestroyed, RemainedError,
    partition,
};
#[cfg(feature = "dylib")]
pub use registry::DylibDriverLoader;
pub use registry::{DriverFactory, DriverKey, DriverLoader, DriverRegistry, StaticDriverLoader};
pub use resource::CREATE_EXCLUSIONS;
pub use resource::vm::VmAction;
pub use store::{FileKvStore, KvStore, MemoryKvStore};

use std::sync::Arc;

/// Entry point for every control plane operation
pub struct ControlPlane {
    pub(crate) info: InfoManager,
    pub(crate) iids: IidManager,
    pub(crate) locks: LockManager,
    pub(crate) registry: DriverRegistry,
}

impl ControlPlane {
    /// Opens the control plane over `store` and registers every stored
    /// driver with the registry
    pub async fn open(store: Arc<dyn KvStore>, loader: Arc<dyn DriverLoader>) -> Result<Self> {
        let info = InfoManager::new(store.clone());
        let registry = DriverRegistry::new(loader);
        let drivers = info.list_drivers().await?;
        tracing::debug!("Loaded {} driver records", drivers.len());
        registry.rebuild(drivers);

        Ok(Self {
            info,
            iids: IidManager::new(store),
            locks: LockManager::new(),
            registry,
        })
    }

    pub fn info(&self) -> &InfoManager {
        &self.info
    }

    pub fn iids(&self) -> &IidManager {
        &self.iids
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Stores the driver record and makes it resolvable
    pub async fn register_driver(&self, info: CloudDriverInfo) -> Result<CloudDriverInfo> {
        let info = self.info.register_driver(info).await?;
        self.registry.register(info.clone());
        Ok(info)
    }

    pub async fn unregister_driver(&self, name: &str) -> Result<()> {
        let info = self.info.get_driver(name).await?;
        self.info.unregister_driver(name).await?;
        self.registry
            .unregister(&info.provider_name, &info.driver_name);
        Ok(())
    }

    /// Deletes a connection config that no mapping refers to.
    ///
    /// Waits for in-flight mutations on the connection and blocks new ones
    /// while it checks, so a create cannot commit after the config is gone.
    pub async fn delete_connection_config(&self, name: &str) -> Result<()> {
        let name = name.trim();
        let _gate = self.locks.acquire_connection(name).await;
        let mapped = self.iids.count_for_connection(name).await?;
        if mapped > 0 {
            return Err(CoreError::Dependency(format!(
                "connection {} still maps {} resources",
                name, mapped
            )));
        }
        self.info.remove_connection_config(name).await
    }
}
