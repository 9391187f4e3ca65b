//! Virtual machine contract

use super::ResourceHandler;
use crate::error::Result;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use crate::validate::{Validate, Walker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageType {
    #[default]
    PublicImage,
    MyImage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(default)]
    pub image_type: ImageType,
    #[serde(rename = "ImageIID")]
    pub image_iid: Iid,
    #[serde(rename = "VpcIID")]
    pub vpc_iid: Iid,
    #[serde(rename = "SubnetIID")]
    pub subnet_iid: Iid,
    #[serde(rename = "SecurityGroupIIDs")]
    pub security_group_iids: Vec<Iid>,
    #[serde(rename = "VMSpecName")]
    pub vm_spec_name: String,
    #[serde(rename = "KeyPairIID", default)]
    pub key_pair_iid: Option<Iid>,
    /// "default" lets the provider choose
    #[serde(default)]
    pub root_disk_type: Option<String>,
    #[serde(default)]
    pub root_disk_size: Option<String>,
    #[serde(rename = "DataDiskIIDs", default)]
    pub data_disk_iids: Vec<Iid>,
    #[serde(rename = "VMUserId", default)]
    pub vm_user_id: Option<String>,
    #[serde(rename = "VMUserPasswd", default)]
    pub vm_user_passwd: Option<String>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for VmReqInfo {
    const TYPE_NAME: &'static str = "VMReqInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.nested("ImageIID", &mut self.image_iid);
        w.nested("VpcIID", &mut self.vpc_iid);
        w.nested("SubnetIID", &mut self.subnet_iid);
        w.list("SecurityGroupIIDs", &mut self.security_group_iids);
        w.string("VMSpecName", &mut self.vm_spec_name);
        w.optional("KeyPairIID", &mut self.key_pair_iid);
        w.optional_string(&mut self.root_disk_type);
        w.optional_string(&mut self.root_disk_size);
        w.list("DataDiskIIDs", &mut self.data_disk_iids);
        w.optional_string(&mut self.vm_user_id);
        w.optional_string(&mut self.vm_user_passwd);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub zone: String,
    #[serde(rename = "ImageIId")]
    pub image_iid: Iid,
    #[serde(rename = "VMSpecName")]
    pub vm_spec_name: String,
    #[serde(rename = "VpcIID")]
    pub vpc_iid: Iid,
    #[serde(rename = "SubnetIID")]
    pub subnet_iid: Iid,
    #[serde(rename = "SecurityGroupIIds")]
    pub security_group_iids: Vec<Iid>,
    #[serde(rename = "KeyPairIId", default)]
    pub key_pair_iid: Option<Iid>,
    #[serde(default)]
    pub root_disk_type: String,
    #[serde(default)]
    pub root_disk_size: String,
    #[serde(rename = "DataDiskIIDs", default)]
    pub data_disk_iids: Vec<Iid>,
    #[serde(rename = "VMUserId", default)]
    pub vm_user_id: String,
    #[serde(rename = "PublicIP", default)]
    pub public_ip: String,
    #[serde(rename = "PrivateIP", default)]
    pub private_ip: String,
    #[serde(rename = "SSHAccessPoint", default)]
    pub ssh_access_point: String,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(VmReqInfo, VmInfo);

/// VM lifecycle state.
///
/// State-changing calls return one of the transitional states; callers poll
/// [`VmHandler::get_status`] until a terminal state shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VmStatus {
    Creating,
    Running,
    Suspending,
    Suspended,
    Resuming,
    Rebooting,
    Terminating,
    Terminated,
    NotExist,
    Failed,
}

impl VmStatus {
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            VmStatus::Creating
                | VmStatus::Suspending
                | VmStatus::Resuming
                | VmStatus::Rebooting
                | VmStatus::Terminating
        )
    }
}

impl fmt::Display for VmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmStatusInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "VmStatus")]
    pub vm_status: VmStatus,
}

/// VM operations. Starting a VM is [`ResourceHandler::create`]; the common
/// `delete` terminates and reports whether the request was accepted.
#[async_trait]
pub trait VmHandler: ResourceHandler<VmReqInfo, VmInfo> {
    async fn suspend(&self, vm: &Iid) -> Result<VmStatus>;

    async fn resume(&self, vm: &Iid) -> Result<VmStatus>;

    async fn reboot(&self, vm: &Iid) -> Result<VmStatus>;

    async fn terminate(&self, vm: &Iid) -> Result<VmStatus>;

    async fn get_status(&self, vm: &Iid) -> Result<VmStatus>;

    async fn list_status(&self) -> Result<Vec<VmStatusInfo>>;
}
