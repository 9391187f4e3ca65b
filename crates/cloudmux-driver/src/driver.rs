//! Driver and connection contract
//!
//! A driver is whatever set of handler factories it successfully returns.
//! Callers look at [`CloudDriver::capability`] instead of inspecting types.

use crate::capability::{DriverCapabilityInfo, HandlerKind};
use crate::error::{DriverError, Result};
use crate::iid::{KeyValue, key_value_get};
use crate::resources::{
    AnyCallHandler, ClusterHandler, DiskHandler, ImageHandler, KeyPairHandler, MyImageHandler,
    NlbHandler, PriceInfoHandler, RegionZoneHandler, SecurityHandler, TagHandler, VmHandler,
    VmSpecHandler, VpcHandler,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bumped whenever the plugin entry signature or these traits change
pub const DRIVER_ABI_VERSION: u32 = 1;

/// Symbol holding the plugin's `u32` ABI version
pub const DRIVER_ABI_SYMBOL: &[u8] = b"CLOUDMUX_DRIVER_ABI\0";

/// Symbol of the plugin's [`DriverEntryFn`]
pub const DRIVER_ENTRY_SYMBOL: &[u8] = b"cloudmux_driver_entry\0";

/// Entry point exported by a driver library.
///
/// Rust ABI: plugins must be built with the same compiler and the same
/// `cloudmux-driver` version as the host.
pub type DriverEntryFn = fn() -> Box<dyn CloudDriver>;

/// Exports the plugin entry symbols for a driver library
///
/// ```ignore
/// cloudmux_driver::declare_driver!(MockDriver::new());
/// ```
#[macro_export]
macro_rules! declare_driver {
    ($ctor:expr) => {
        #[unsafe(no_mangle)]
        pub static CLOUDMUX_DRIVER_ABI: u32 = $crate::DRIVER_ABI_VERSION;

        #[unsafe(no_mangle)]
        pub fn cloudmux_driver_entry() -> ::std::boxed::Box<dyn $crate::CloudDriver> {
            ::std::boxed::Box::new($ctor)
        }
    };
}

/// Opaque credential key/value bag
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialInfo {
    #[serde(rename = "KeyValueInfoList")]
    pub key_value_list: Vec<KeyValue>,
}

impl CredentialInfo {
    pub fn new(key_value_list: Vec<KeyValue>) -> Self {
        Self { key_value_list }
    }

    /// Case-insensitive lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        key_value_get(&self.key_value_list, key)
    }
}

impl fmt::Debug for CredentialInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.key_value_list.iter().map(|kv| kv.key.as_str()).collect();
        f.debug_struct("CredentialInfo")
            .field("keys", &keys)
            .finish_non_exhaustive()
    }
}

/// Region and zone a connection is bound to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionInfo {
    pub region: String,
    #[serde(default)]
    pub zone: String,
    /// Zone override for zone-addressed resources
    #[serde(default)]
    pub target_zone: Option<String>,
}

impl RegionInfo {
    pub fn new(region: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            zone: zone.into(),
            target_zone: None,
        }
    }

    /// Zone to use for zone-addressed resources
    pub fn effective_zone(&self) -> &str {
        self.target_zone.as_deref().unwrap_or(&self.zone)
    }
}

/// Everything a driver needs to open a connection
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    pub credential: CredentialInfo,
    pub region: RegionInfo,
}

/// A cloud provider driver
#[async_trait]
pub trait CloudDriver: Send + Sync {
    fn driver_version(&self) -> &str;

    /// Must not touch the network
    fn capability(&self) -> DriverCapabilityInfo;

    /// Credential keys that [`connect`](Self::connect) cannot work without
    fn required_credential_keys(&self) -> &'static [&'static str];

    async fn connect(&self, info: ConnectionInfo) -> Result<Box<dyn CloudConnection>>;
}

fn unsupported<T>(kind: HandlerKind) -> Result<T> {
    Err(DriverError::unsupported(kind))
}

/// A connection bound to one credential and region.
///
/// Factories a driver does not override fail with
/// [`DriverError::Unsupported`].
pub trait CloudConnection: Send + Sync {
    fn create_image_handler(&self) -> Result<Box<dyn ImageHandler>> {
        unsupported(HandlerKind::Image)
    }

    fn create_vpc_handler(&self) -> Result<Box<dyn VpcHandler>> {
        unsupported(HandlerKind::Vpc)
    }

    fn create_security_handler(&self) -> Result<Box<dyn SecurityHandler>> {
        unsupported(HandlerKind::Security)
    }

    fn create_key_pair_handler(&self) -> Result<Box<dyn KeyPairHandler>> {
        unsupported(HandlerKind::KeyPair)
    }

    fn create_vm_handler(&self) -> Result<Box<dyn VmHandler>> {
        unsupported(HandlerKind::Vm)
    }

    fn create_vm_spec_handler(&self) -> Result<Box<dyn VmSpecHandler>> {
        unsupported(HandlerKind::VmSpec)
    }

    fn create_disk_handler(&self) -> Result<Box<dyn DiskHandler>> {
        unsupported(HandlerKind::Disk)
    }

    fn create_my_image_handler(&self) -> Result<Box<dyn MyImageHandler>> {
        unsupported(HandlerKind::MyImage)
    }

    fn create_nlb_handler(&self) -> Result<Box<dyn NlbHandler>> {
        unsupported(HandlerKind::Nlb)
    }

    fn create_cluster_handler(&self) -> Result<Box<dyn ClusterHandler>> {
        unsupported(HandlerKind::Cluster)
    }

    fn create_region_zone_handler(&self) -> Result<Box<dyn RegionZoneHandler>> {
        unsupported(HandlerKind::RegionZone)
    }

    fn create_price_info_handler(&self) -> Result<Box<dyn PriceInfoHandler>> {
        unsupported(HandlerKind::PriceInfo)
    }

    fn create_any_call_handler(&self) -> Result<Box<dyn AnyCallHandler>> {
        unsupported(HandlerKind::AnyCall)
    }

    fn create_tag_handler(&self) -> Result<Box<dyn TagHandler>> {
        unsupported(HandlerKind::Tag)
    }

    fn is_connected(&self) -> bool;

    /// Must be idempotent
    fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct BareConnection {
        open: AtomicBool,
    }

    impl CloudConnection for BareConnection {
        fn is_connected(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }

        fn close(&self) -> Result<()> {
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_default_factories_are_unsupported() {
        let conn = BareConnection {
            open: AtomicBool::new(true),
        };
        assert!(matches!(
            conn.create_vm_handler(),
            Err(DriverError::Unsupported(msg)) if msg == "VMHandler"
        ));
        assert!(conn.create_nlb_handler().is_err());
        assert!(matches!(
            conn.create_tag_handler(),
            Err(DriverError::Unsupported(msg)) if msg == "TagHandler"
        ));
        assert!(conn.is_connected());
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_credential_debug_hides_values() {
        let cred = CredentialInfo::new(vec![
            KeyValue::new("ClientId", "AKIA123"),
            KeyValue::new("ClientSecret", "s3cr3t"),
        ]);
        let debug = format!("{:?}", cred);
        assert!(debug.contains("ClientSecret"));
        assert!(!debug.contains("s3cr3t"));
        assert_eq!(cred.get("clientid"), Some("AKIA123"));
    }

    #[test]
    fn test_effective_zone() {
        let mut region = RegionInfo::new("us-east-2", "us-east-2a");
        assert_eq!(region.effective_zone(), "us-east-2a");
        region.target_zone = Some("us-east-2c".into());
        assert_eq!(region.effective_zone(), "us-east-2c");
    }
}
