//! Mock driver and connection

use crate::cloud::MockCloud;
use crate::handlers::Ctx;
use crate::handlers::catalog::{
    MockAnyCallHandler, MockImageHandler, MockPriceInfoHandler, MockRegionZoneHandler,
    MockVmSpecHandler,
};
use crate::handlers::cluster::MockClusterHandler;
use crate::handlers::disk::MockDiskHandler;
use crate::handlers::keypair::MockKeyPairHandler;
use crate::handlers::myimage::MockMyImageHandler;
use crate::handlers::nlb::MockNlbHandler;
use crate::handlers::security::MockSecurityHandler;
use crate::handlers::tag::MockTagHandler;
use crate::handlers::vm::MockVmHandler;
use crate::handlers::vpc::MockVpcHandler;
use async_trait::async_trait;
use cloudmux_driver::resources::{
    AnyCallHandler, ClusterHandler, DiskHandler, ImageHandler, KeyPairHandler, MyImageHandler,
    NlbHandler, PriceInfoHandler, RegionZoneHandler, SecurityHandler, TagHandler, VmHandler,
    VmSpecHandler, VpcHandler,
};
use cloudmux_driver::{
    CloudConnection, CloudDriver, ConnectionInfo, DriverCapabilityInfo, DriverError, HandlerKind,
    ResourceKind, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Credential key selecting the in-memory cloud
pub const MOCK_NAME_KEY: &str = "MockName";

/// Driver backed by [`MockCloud`]
#[derive(Debug, Clone)]
pub struct MockDriver {
    capability: DriverCapabilityInfo,
}

impl MockDriver {
    /// Every handler enabled
    pub fn new() -> Self {
        let mut capability = DriverCapabilityInfo::all();
        capability.tag_support_resource_type = ResourceKind::TRACKED_ROOTS.to_vec();
        Self { capability }
    }

    pub fn with_capability(capability: DriverCapabilityInfo) -> Self {
        Self { capability }
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudDriver for MockDriver {
    fn driver_version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn capability(&self) -> DriverCapabilityInfo {
        self.capability.clone()
    }

    fn required_credential_keys(&self) -> &'static [&'static str] {
        &[MOCK_NAME_KEY]
    }

    async fn connect(&self, info: ConnectionInfo) -> Result<Box<dyn CloudConnection>> {
        let name = info
            .credential
            .get(MOCK_NAME_KEY)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DriverError::InvalidArgument(format!("{} is required", MOCK_NAME_KEY)))?;

        tracing::debug!(mock = name, region = %info.region.region, "mock connection opened");
        Ok(Box::new(MockConnection {
            ctx: Ctx {
                cloud: MockCloud::named(name),
                region: info.region,
            },
            capability: self.capability.clone(),
            connected: AtomicBool::new(true),
        }))
    }
}

/// Connection to one [`MockCloud`]
pub struct MockConnection {
    ctx: Ctx,
    capability: DriverCapabilityInfo,
    connected: AtomicBool,
}

impl MockConnection {
    /// Handler context, if this connection may hand out `kind`
    fn ctx(&self, kind: HandlerKind) -> Result<Ctx> {
        if !self.is_connected() {
            return Err(DriverError::Disconnected);
        }
        if !self.capability.supports(kind) {
            return Err(DriverError::unsupported(kind));
        }
        Ok(self.ctx.clone())
    }
}

impl CloudConnection for MockConnection {
    fn create_image_handler(&self) -> Result<Box<dyn ImageHandler>> {
        let ctx = self.ctx(HandlerKind::Image)?;
        Ok(Box::new(MockImageHandler { ctx }))
    }

    fn create_vpc_handler(&self) -> Result<Box<dyn VpcHandler>> {
        let ctx = self.ctx(HandlerKind::Vpc)?;
        Ok(Box::new(MockVpcHandler { ctx }))
    }

    fn create_security_handler(&self) -> Result<Box<dyn SecurityHandler>> {
        let ctx = self.ctx(HandlerKind::Security)?;
        Ok(Box::new(MockSecurityHandler { ctx }))
    }

    fn create_key_pair_handler(&self) -> Result<Box<dyn KeyPairHandler>> {
        let ctx = self.ctx(HandlerKind::KeyPair)?;
        Ok(Box::new(MockKeyPairHandler { ctx }))
    }

    fn create_vm_handler(&self) -> Result<Box<dyn VmHandler>> {
        let ctx = self.ctx(HandlerKind::Vm)?;
        Ok(Box::new(MockVmHandler { ctx }))
    }

    fn create_vm_spec_handler(&self) -> Result<Box<dyn VmSpecHandler>> {
        let ctx = self.ctx(HandlerKind::VmSpec)?;
        Ok(Box::new(MockVmSpecHandler { ctx }))
    }

    fn create_disk_handler(&self) -> Result<Box<dyn DiskHandler>> {
        let ctx = self.ctx(HandlerKind::Disk)?;
        Ok(Box::new(MockDiskHandler { ctx }))
    }

    fn create_my_image_handler(&self) -> Result<Box<dyn MyImageHandler>> {
        let ctx = self.ctx(HandlerKind::MyImage)?;
        Ok(Box::new(MockMyImageHandler { ctx }))
    }

    fn create_nlb_handler(&self) -> Result<Box<dyn NlbHandler>> {
        let ctx = self.ctx(HandlerKind::Nlb)?;
        Ok(Box::new(MockNlbHandler { ctx }))
    }

    fn create_cluster_handler(&self) -> Result<Box<dyn ClusterHandler>> {
        let ctx = self.ctx(HandlerKind::Cluster)?;
        Ok(Box::new(MockClusterHandler { ctx }))
    }

    fn create_region_zone_handler(&self) -> Result<Box<dyn RegionZoneHandler>> {
        let ctx = self.ctx(HandlerKind::RegionZone)?;
        Ok(Box::new(MockRegionZoneHandler { ctx }))
    }

    fn create_price_info_handler(&self) -> Result<Box<dyn PriceInfoHandler>> {
        let ctx = self.ctx(HandlerKind::PriceInfo)?;
        Ok(Box::new(MockPriceInfoHandler { ctx }))
    }

    fn create_any_call_handler(&self) -> Result<Box<dyn AnyCallHandler>> {
        let ctx = self.ctx(HandlerKind::AnyCall)?;
        Ok(Box::new(MockAnyCallHandler { ctx }))
    }

    fn create_tag_handler(&self) -> Result<Box<dyn TagHandler>> {
        let ctx = self.ctx(HandlerKind::Tag)?;
        Ok(Box::new(MockTagHandler { ctx }))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        self.ctx.cloud.record_close();
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::debug!(mock = self.ctx.cloud.name(), "mock connection closed");
        }
        Ok(())
    }
}
