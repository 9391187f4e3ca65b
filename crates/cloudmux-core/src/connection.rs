//! Opening driver connections from connection configs

use crate::ControlPlane;
use crate::error::{CoreError, Result};
use cloudmux_driver::resources::{
    AnyCallHandler, ClusterHandler, DiskHandler, ImageHandler, KeyPairHandler, MyImageHandler,
    NlbHandler, PriceInfoHandler, RegionZoneHandler, SecurityHandler, TagHandler, VmHandler,
    VmSpecHandler, VpcHandler,
};
use cloudmux_driver::{
    CloudConnection, ConnectionInfo, CredentialInfo, DriverCapabilityInfo, DriverError,
    HandlerKind, Iid, RegionInfo, check_keys, key_value_get,
};
use std::sync::atomic::{AtomicBool, Ordering};

const REGION_KEY: &str = "Region";
const ZONE_KEY: &str = "Zone";

/// Live connection for one connection config.
///
/// Closed when dropped.
pub struct Connection {
    name: String,
    provider: String,
    capability: DriverCapabilityInfo,
    region: RegionInfo,
    inner: Box<dyn CloudConnection>,
    closed: AtomicBool,
}

macro_rules! handler_accessors {
    ($($(#[$doc:meta])* $name:ident => $factory:ident, $kind:expr, $handler:ty;)+) => {
        $(
            $(#[$doc])*
            pub fn $name(&self) -> Result<Box<$handler>> {
                self.check($kind)?;
                self.inner
                    .$factory()
                    .map_err(|e| self.handler_error($kind, e))
            }
        )+
    };
}

impl Connection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn capability(&self) -> &DriverCapabilityInfo {
        &self.capability
    }

    pub fn region(&self) -> &RegionInfo {
        &self.region
    }

    /// Zone the connection's zone-addressed resources land in
    pub fn zone(&self) -> &str {
        self.region.effective_zone()
    }

    pub fn supports(&self, kind: HandlerKind) -> bool {
        self.capability.supports(kind)
    }

    fn check(&self, kind: HandlerKind) -> Result<()> {
        if self.supports(kind) {
            Ok(())
        } else {
            Err(CoreError::UnsupportedOperation(format!(
                "{} driver for {} does not provide {}",
                self.provider, self.name, kind
            )))
        }
    }

    fn handler_error(&self, kind: HandlerKind, err: DriverError) -> CoreError {
        CoreError::from_driver(kind, &Iid::by_name(self.name.as_str()), err)
    }

    handler_accessors! {
        image_handler => create_image_handler, HandlerKind::Image, dyn ImageHandler;
        vpc_handler => create_vpc_handler, HandlerKind::Vpc, dyn VpcHandler;
        security_handler => create_security_handler, HandlerKind::Security, dyn SecurityHandler;
        key_pair_handler => create_key_pair_handler, HandlerKind::KeyPair, dyn KeyPairHandler;
        vm_handler => create_vm_handler, HandlerKind::Vm, dyn VmHandler;
        vm_spec_handler => create_vm_spec_handler, HandlerKind::VmSpec, dyn VmSpecHandler;
        disk_handler => create_disk_handler, HandlerKind::Disk, dyn DiskHandler;
        my_image_handler => create_my_image_handler, HandlerKind::MyImage, dyn MyImageHandler;
        nlb_handler => create_nlb_handler, HandlerKind::Nlb, dyn NlbHandler;
        cluster_handler => create_cluster_handler, HandlerKind::Cluster, dyn ClusterHandler;
        region_zone_handler => create_region_zone_handler, HandlerKind::RegionZone, dyn RegionZoneHandler;
        price_info_handler => create_price_info_handler, HandlerKind::PriceInfo, dyn PriceInfoHandler;
        any_call_handler => create_any_call_handler, HandlerKind::AnyCall, dyn AnyCallHandler;
        tag_handler => create_tag_handler, HandlerKind::Tag, dyn TagHandler;
    }

    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.inner.is_connected()
    }

    /// Closes the driver connection. Only the first call reaches the driver.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner
            .close()
            .map_err(|e| CoreError::from_driver("connection", &Iid::by_name(self.name.as_str()), e))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if *self.closed.get_mut() {
            return;
        }
        if let Err(e) = self.inner.close() {
            tracing::warn!("Failed to close connection {}: {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl ControlPlane {
    /// Opens a connection for the named connection config
    pub async fn connect(&self, config_name: &str) -> Result<Connection> {
        self.connect_zone(config_name, None).await
    }

    /// Like [`connect`](Self::connect), targeting `zone` for zone-addressed
    /// resources instead of the region's default zone
    pub async fn connect_zone(&self, config_name: &str, zone: Option<&str>) -> Result<Connection> {
        let missing = |what: &str, name: &str| {
            CoreError::Configuration(format!("{} {} is not registered", what, name))
        };

        let config = self
            .info
            .get_connection_config(config_name)
            .await
            .map_err(|_| missing("connection config", config_name))?;
        let credential = self
            .info
            .get_credential(&config.credential_name)
            .await
            .map_err(|_| missing("credential", &config.credential_name))?;
        let region = self
            .info
            .get_region(&config.region_name)
            .await
            .map_err(|_| missing("region", &config.region_name))?;

        let driver = self
            .registry
            .resolve(&config.provider_name, &config.driver_name)?;

        check_keys(
            "CredentialInfo",
            &credential.key_value_info_list,
            driver.required_credential_keys(),
        )
        .map_err(|e| {
            CoreError::Configuration(format!("credential {}: {}", credential.credential_name, e))
        })?;
        check_keys("RegionInfo", &region.key_value_info_list, &[REGION_KEY])
            .map_err(|e| CoreError::Configuration(format!("region {}: {}", region.region_name, e)))?;

        let region_info = RegionInfo {
            region: key_value_get(&region.key_value_info_list, REGION_KEY)
                .unwrap_or_default()
                .trim()
                .to_string(),
            zone: key_value_get(&region.key_value_info_list, ZONE_KEY)
                .unwrap_or_default()
                .trim()
                .to_string(),
            target_zone: zone.map(str::trim).filter(|z| !z.is_empty()).map(String::from),
        };

        let inner = driver
            .connect(ConnectionInfo {
                credential: CredentialInfo::new(credential.key_value_info_list),
                region: region_info.clone(),
            })
            .await
            .map_err(|e| match e {
                DriverError::InvalidArgument(msg) => {
                    CoreError::Configuration(format!("{}: {}", config.config_name, msg))
                }
                other => CoreError::from_driver("connection", &Iid::by_name(config_name), other),
            })?;

        tracing::debug!(
            connection = %config.config_name,
            provider = %config.provider_name,
            region = %region_info.region,
            zone = %region_info.effective_zone(),
            "Connected"
        );

        Ok(Connection {
            name: config.config_name,
            provider: config.provider_name,
            capability: driver.capability(),
            region: region_info,
            inner,
            closed: AtomicBool::new(false),
        })
    }
}
