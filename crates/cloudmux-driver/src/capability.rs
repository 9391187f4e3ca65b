//! Driver capability flags

use crate::iid::ResourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handler families a driver may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerKind {
    Image,
    Vpc,
    Security,
    KeyPair,
    Vm,
    VmSpec,
    Disk,
    MyImage,
    Nlb,
    Cluster,
    RegionZone,
    PriceInfo,
    AnyCall,
    Tag,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 14] = [
        HandlerKind::Image,
        HandlerKind::Vpc,
        HandlerKind::Security,
        HandlerKind::KeyPair,
        HandlerKind::Vm,
        HandlerKind::VmSpec,
        HandlerKind::Disk,
        HandlerKind::MyImage,
        HandlerKind::Nlb,
        HandlerKind::Cluster,
        HandlerKind::RegionZone,
        HandlerKind::PriceInfo,
        HandlerKind::AnyCall,
        HandlerKind::Tag,
    ];

    /// Handler that manages resources of `kind`
    pub fn for_resource(kind: ResourceKind) -> HandlerKind {
        match kind {
            ResourceKind::Image => HandlerKind::Image,
            ResourceKind::Vpc | ResourceKind::Subnet => HandlerKind::Vpc,
            ResourceKind::SecurityGroup => HandlerKind::Security,
            ResourceKind::KeyPair => HandlerKind::KeyPair,
            ResourceKind::Vm => HandlerKind::Vm,
            ResourceKind::Nlb => HandlerKind::Nlb,
            ResourceKind::Disk => HandlerKind::Disk,
            ResourceKind::MyImage => HandlerKind::MyImage,
            ResourceKind::Cluster | ResourceKind::NodeGroup => HandlerKind::Cluster,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerKind::Image => "ImageHandler",
            HandlerKind::Vpc => "VPCHandler",
            HandlerKind::Security => "SecurityHandler",
            HandlerKind::KeyPair => "KeyPairHandler",
            HandlerKind::Vm => "VMHandler",
            HandlerKind::VmSpec => "VMSpecHandler",
            HandlerKind::Disk => "DiskHandler",
            HandlerKind::MyImage => "MyImageHandler",
            HandlerKind::Nlb => "NLBHandler",
            HandlerKind::Cluster => "ClusterHandler",
            HandlerKind::RegionZone => "RegionZoneHandler",
            HandlerKind::PriceInfo => "PriceInfoHandler",
            HandlerKind::AnyCall => "AnyCallHandler",
            HandlerKind::Tag => "TagHandler",
        };
        f.write_str(name)
    }
}

/// What a driver supports, published without network access
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverCapabilityInfo {
    pub image_handler: bool,
    #[serde(rename = "VPCHandler")]
    pub vpc_handler: bool,
    pub security_handler: bool,
    pub key_pair_handler: bool,
    #[serde(rename = "VMHandler")]
    pub vm_handler: bool,
    #[serde(rename = "VMSpecHandler")]
    pub vm_spec_handler: bool,
    pub disk_handler: bool,
    pub my_image_handler: bool,
    #[serde(rename = "NLBHandler")]
    pub nlb_handler: bool,
    pub cluster_handler: bool,
    pub region_zone_handler: bool,
    pub price_info_handler: bool,
    pub any_call_handler: bool,
    pub tag_handler: bool,

    /// Only one VPC may exist per connection
    #[serde(rename = "SINGLE_VPC")]
    pub single_vpc: bool,

    /// Resources such as disks are addressed per zone
    pub zone_based_control: bool,

    /// VPCs carry their own CIDR block
    #[serde(rename = "VPC_CIDR")]
    pub vpc_cidr: bool,

    /// Resource kinds that accept tags
    pub tag_support_resource_type: Vec<ResourceKind>,
}

impl DriverCapabilityInfo {
    /// Every handler enabled, no special features
    pub fn all() -> Self {
        let mut info = Self::none();
        for kind in HandlerKind::ALL {
            info.set(kind, true);
        }
        info.vpc_cidr = true;
        info
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: HandlerKind, enabled: bool) -> Self {
        self.set(kind, enabled);
        self
    }

    fn flag_mut(&mut self, kind: HandlerKind) -> &mut bool {
        match kind {
            HandlerKind::Image => &mut self.image_handler,
            HandlerKind::Vpc => &mut self.vpc_handler,
            HandlerKind::Security => &mut self.security_handler,
            HandlerKind::KeyPair => &mut self.key_pair_handler,
            HandlerKind::Vm => &mut self.vm_handler,
            HandlerKind::VmSpec => &mut self.vm_spec_handler,
            HandlerKind::Disk => &mut self.disk_handler,
            HandlerKind::MyImage => &mut self.my_image_handler,
            HandlerKind::Nlb => &mut self.nlb_handler,
            HandlerKind::Cluster => &mut self.cluster_handler,
            HandlerKind::RegionZone => &mut self.region_zone_handler,
            HandlerKind::PriceInfo => &mut self.price_info_handler,
            HandlerKind::AnyCall => &mut self.any_call_handler,
            HandlerKind::Tag => &mut self.tag_handler,
        }
    }

    pub fn set(&mut self, kind: HandlerKind, enabled: bool) {
        *self.flag_mut(kind) = enabled;
    }

    pub fn supports(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::Image => self.image_handler,
            HandlerKind::Vpc => self.vpc_handler,
            HandlerKind::Security => self.security_handler,
            HandlerKind::KeyPair => self.key_pair_handler,
            HandlerKind::Vm => self.vm_handler,
            HandlerKind::VmSpec => self.vm_spec_handler,
            HandlerKind::Disk => self.disk_handler,
            HandlerKind::MyImage => self.my_image_handler,
            HandlerKind::Nlb => self.nlb_handler,
            HandlerKind::Cluster => self.cluster_handler,
            HandlerKind::RegionZone => self.region_zone_handler,
            HandlerKind::PriceInfo => self.price_info_handler,
            HandlerKind::AnyCall => self.any_call_handler,
            HandlerKind::Tag => self.tag_handler,
        }
    }

    pub fn supports_tags_on(&self, kind: ResourceKind) -> bool {
        self.tag_handler && self.tag_support_resource_type.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_and_none() {
        let all = DriverCapabilityInfo::all();
        let none = DriverCapabilityInfo::none();
        for kind in HandlerKind::ALL {
            assert!(all.supports(kind), "{} should be enabled", kind);
            assert!(!none.supports(kind), "{} should be disabled", kind);
        }
        assert!(!all.single_vpc);
    }

    #[test]
    fn test_with_toggles_one_flag() {
        let cap = DriverCapabilityInfo::all().with(HandlerKind::Nlb, false);
        assert!(!cap.supports(HandlerKind::Nlb));
        assert!(cap.supports(HandlerKind::Vm));
    }

    #[test]
    fn test_serialized_field_names() {
        let mut cap = DriverCapabilityInfo::none().with(HandlerKind::Vpc, true);
        cap.single_vpc = true;
        let json = serde_json::to_value(&cap).unwrap();
        assert_eq!(json["VPCHandler"], true);
        assert_eq!(json["SINGLE_VPC"], true);
        assert_eq!(json["ZoneBasedControl"], false);
    }

    #[test]
    fn test_tag_support() {
        let mut cap = DriverCapabilityInfo::all();
        cap.tag_support_resource_type = vec![ResourceKind::Vm];
        assert!(cap.supports_tags_on(ResourceKind::Vm));
        assert!(!cap.supports_tags_on(ResourceKind::Disk));
    }
}
