//! cloudmux driver contracts
//!
//! This crate defines everything a cloud driver has to implement to be
//! plugged into the cloudmux control plane, and the identity types shared by
//! the core and every driver.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 cloudmux-core                    │
//! │   (registry, locks, mapping, reconciliation)     │
//! └─────────────────┬───────────────────────────────┘
//!                   │ Arc<dyn CloudDriver>
//! ┌─────────────────▼───────────────────────────────┐
//! │                cloudmux-driver                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait CloudDriver / CloudConnection      │   │
//! │  │  DriverCapabilityInfo                     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │   Handlers   │  │  Validation  │            │
//! │  │ (VM,VPC,...) │  │   Walker     │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  mock driver  │ │ plugin .so /  │
//! │   (rlib)      │ │ .dylib / .dll │
//! └───────────────┘ └───────────────┘
//! ```

pub mod capability;
pub mod driver;
pub mod error;
pub mod iid;
pub mod resources;
pub mod validate;

// Re-exports
pub use capability::{DriverCapabilityInfo, HandlerKind};
pub use driver::{
    CloudConnection, CloudDriver, ConnectionInfo, CredentialInfo, DRIVER_ABI_VERSION,
    DRIVER_ABI_SYMBOL, DRIVER_ENTRY_SYMBOL, DriverEntryFn, RegionInfo,
};
pub use error::{DriverError, Result};
pub use iid::{HasIid, Iid, KeyValue, ResourceKind, key_value_get};
pub use validate::{Validate, ValidationError, Walker, check_keys, validate_required};
