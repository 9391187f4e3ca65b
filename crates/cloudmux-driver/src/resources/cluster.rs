//! Managed Kubernetes cluster contract

use super::ResourceHandler;
use crate::error::Result;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use crate::validate::{Validate, Walker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkInfo {
    #[serde(rename = "VpcIID")]
    pub vpc_iid: Iid,
    #[serde(rename = "SubnetIIDs")]
    pub subnet_iids: Vec<Iid>,
    #[serde(rename = "SecurityGroupIIDs", default)]
    pub security_group_iids: Vec<Iid>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl Validate for NetworkInfo {
    const TYPE_NAME: &'static str = "NetworkInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("VpcIID", &mut self.vpc_iid);
        w.list("SubnetIIDs", &mut self.subnet_iids);
        w.list("SecurityGroupIIDs", &mut self.security_group_iids);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeGroupStatus {
    #[default]
    Creating,
    Active,
    Inactive,
    Updating,
    Deleting,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeGroupInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "ImageIID", default)]
    pub image_iid: Iid,
    #[serde(rename = "VMSpecName")]
    pub vm_spec_name: String,
    #[serde(default)]
    pub root_disk_type: String,
    #[serde(default)]
    pub root_disk_size: String,
    #[serde(rename = "KeyPairIID")]
    pub key_pair_iid: Iid,
    pub on_auto_scaling: bool,
    pub desired_node_size: i32,
    pub min_node_size: i32,
    pub max_node_size: i32,
    #[serde(default)]
    pub status: NodeGroupStatus,
    #[serde(default)]
    pub nodes: Vec<Iid>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl Validate for NodeGroupInfo {
    const TYPE_NAME: &'static str = "NodeGroupInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.string("VMSpecName", &mut self.vm_spec_name);
        w.nested("KeyPairIID", &mut self.key_pair_iid);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterStatus {
    #[default]
    Creating,
    Active,
    Inactive,
    Updating,
    Deleting,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessInfo {
    pub endpoint: String,
    pub kubeconfig: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    /// Empty lets the provider pick its default version
    #[serde(default)]
    pub version: String,
    pub network: NetworkInfo,
    #[serde(default)]
    pub node_group_list: Vec<NodeGroupInfo>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for ClusterReqInfo {
    const TYPE_NAME: &'static str = "ClusterInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.nested("Network", &mut self.network);
        w.list("NodeGroupList", &mut self.node_group_list);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    pub version: String,
    pub network: NetworkInfo,
    pub node_group_list: Vec<NodeGroupInfo>,
    #[serde(default)]
    pub access_info: AccessInfo,
    pub status: ClusterStatus,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(ClusterReqInfo, ClusterInfo, NodeGroupInfo);

#[async_trait]
pub trait ClusterHandler: ResourceHandler<ClusterReqInfo, ClusterInfo> {
    async fn add_node_group(&self, cluster: &Iid, group: NodeGroupInfo) -> Result<NodeGroupInfo>;

    async fn set_node_group_auto_scaling(
        &self,
        cluster: &Iid,
        group: &Iid,
        on: bool,
    ) -> Result<bool>;

    async fn change_node_group_scaling(
        &self,
        cluster: &Iid,
        group: &Iid,
        desired: i32,
        min: i32,
        max: i32,
    ) -> Result<NodeGroupInfo>;

    async fn remove_node_group(&self, cluster: &Iid, group: &Iid) -> Result<bool>;

    async fn upgrade(&self, cluster: &Iid, version: &str) -> Result<ClusterInfo>;
}
