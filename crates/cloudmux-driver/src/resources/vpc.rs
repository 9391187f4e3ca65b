//! VPC and subnet contract

use super::ResourceHandler;
use crate::error::Result;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use crate::validate::{Validate, Walker};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "IPv4_CIDR")]
    pub ipv4_cidr: String,
    pub subnet_info_list: Vec<SubnetInfo>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for VpcReqInfo {
    const TYPE_NAME: &'static str = "VPCReqInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.string("IPv4_CIDR", &mut self.ipv4_cidr);
        w.list("SubnetInfoList", &mut self.subnet_info_list);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "IPv4_CIDR")]
    pub ipv4_cidr: String,
    pub subnet_info_list: Vec<SubnetInfo>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubnetInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    /// Empty means the connection's default zone
    #[serde(default)]
    pub zone: String,
    #[serde(rename = "IPv4_CIDR")]
    pub ipv4_cidr: String,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl Validate for SubnetInfo {
    const TYPE_NAME: &'static str = "SubnetInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.string("IPv4_CIDR", &mut self.ipv4_cidr);
        w.list("TagList", &mut self.tag_list);
    }
}

impl_has_iid!(VpcReqInfo, VpcInfo, SubnetInfo);

#[async_trait]
pub trait VpcHandler: ResourceHandler<VpcReqInfo, VpcInfo> {
    async fn add_subnet(&self, vpc: &Iid, subnet: SubnetInfo) -> Result<VpcInfo>;

    async fn remove_subnet(&self, vpc: &Iid, subnet: &Iid) -> Result<bool>;
}
