//! Resource handler contracts
//!
//! One contract per resource kind. Handlers that manage creatable resources
//! extend [`ResourceHandler`]; catalog-style handlers (VM specs, regions,
//! prices) stand alone.

pub mod anycall;
pub mod cluster;
pub mod disk;
pub mod image;
pub mod keypair;
pub mod myimage;
pub mod nlb;
pub mod priceinfo;
pub mod regionzone;
pub mod security;
pub mod tag;
pub mod vm;
pub mod vmspec;
pub mod vpc;

use crate::error::Result;
use crate::iid::Iid;
use async_trait::async_trait;

pub use anycall::{AnyCallHandler, AnyCallInfo};
pub use cluster::{
    AccessInfo, ClusterHandler, ClusterInfo, ClusterReqInfo, ClusterStatus, NetworkInfo,
    NodeGroupInfo, NodeGroupStatus,
};
pub use disk::{DiskHandler, DiskInfo, DiskReqInfo, DiskStatus};
pub use image::{ImageHandler, ImageInfo, ImageStatus};
pub use keypair::{KeyPairHandler, KeyPairInfo, KeyPairReqInfo};
pub use myimage::{MyImageHandler, MyImageInfo, MyImageReqInfo, MyImageStatus};
pub use nlb::{
    HealthCheckerInfo, HealthInfo, ListenerInfo, NlbHandler, NlbInfo, NlbReqInfo, VmGroupInfo,
};
pub use priceinfo::PriceInfoHandler;
pub use regionzone::{RegionZoneHandler, RegionZoneInfo, ZoneInfo, ZoneStatus};
pub use security::{SecurityHandler, SecurityInfo, SecurityReqInfo, SecurityRuleInfo};
pub use tag::{TagHandler, TagInfo, tag_matches};
pub use vm::{ImageType, VmHandler, VmInfo, VmReqInfo, VmStatus, VmStatusInfo};
pub use vmspec::{GpuInfo, VCpuInfo, VmSpecHandler, VmSpecInfo};
pub use vpc::{SubnetInfo, VpcHandler, VpcInfo, VpcReqInfo};

/// Operations every handler of a creatable resource exposes
///
/// `create` receives the request with `SystemId` empty and returns the
/// record with the provider-assigned `SystemId` filled in. `get` on an
/// unknown IID fails with [`DriverError::NotFound`](crate::DriverError::NotFound).
#[async_trait]
pub trait ResourceHandler<Req, Info>: Send + Sync
where
    Req: Send + 'static,
    Info: Send + 'static,
{
    async fn create(&self, req: Req) -> Result<Info>;

    async fn list(&self) -> Result<Vec<Info>>;

    async fn get(&self, iid: &Iid) -> Result<Info>;

    /// Identifiers only; cheaper than [`list`](Self::list)
    async fn list_iid(&self) -> Result<Vec<Iid>>;

    async fn delete(&self, iid: &Iid) -> Result<bool>;
}
