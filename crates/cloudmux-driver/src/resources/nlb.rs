//! Network load balancer contract

use super::ResourceHandler;
use crate::error::Result;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use crate::validate::{Validate, Walker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListenerInfo {
    pub protocol: String,
    #[serde(rename = "IP", default)]
    pub ip: String,
    pub port: String,
    #[serde(rename = "DNSName", default)]
    pub dns_name: String,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl Validate for ListenerInfo {
    const TYPE_NAME: &'static str = "ListenerInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("Protocol", &mut self.protocol);
        w.string("Port", &mut self.port);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmGroupInfo {
    pub protocol: String,
    pub port: String,
    #[serde(rename = "VMs", default)]
    pub vms: Vec<Iid>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl Validate for VmGroupInfo {
    const TYPE_NAME: &'static str = "VMGroupInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("Protocol", &mut self.protocol);
        w.string("Port", &mut self.port);
        w.list("VMs", &mut self.vms);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheckerInfo {
    pub protocol: String,
    pub port: String,
    /// Seconds; -1 means provider default
    pub interval: i32,
    pub timeout: i32,
    pub threshold: i32,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl Validate for HealthCheckerInfo {
    const TYPE_NAME: &'static str = "HealthCheckerInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("Protocol", &mut self.protocol);
        w.string("Port", &mut self.port);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NlbReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "VpcIID")]
    pub vpc_iid: Iid,
    /// PUBLIC or INTERNAL
    #[serde(rename = "Type")]
    pub nlb_type: String,
    /// REGION or GLOBAL
    pub scope: String,
    pub listener: ListenerInfo,
    #[serde(rename = "VMGroup")]
    pub vm_group: VmGroupInfo,
    pub health_checker: HealthCheckerInfo,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for NlbReqInfo {
    const TYPE_NAME: &'static str = "NLBInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.nested("VpcIID", &mut self.vpc_iid);
        w.string("Type", &mut self.nlb_type);
        w.string("Scope", &mut self.scope);
        w.nested("Listener", &mut self.listener);
        w.nested("VMGroup", &mut self.vm_group);
        w.nested("HealthChecker", &mut self.health_checker);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NlbInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "VpcIID")]
    pub vpc_iid: Iid,
    #[serde(rename = "Type")]
    pub nlb_type: String,
    pub scope: String,
    pub listener: ListenerInfo,
    #[serde(rename = "VMGroup")]
    pub vm_group: VmGroupInfo,
    pub health_checker: HealthCheckerInfo,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(NlbReqInfo, NlbInfo);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthInfo {
    #[serde(rename = "AllVMs")]
    pub all_vms: Vec<Iid>,
    #[serde(rename = "HealthyVMs")]
    pub healthy_vms: Vec<Iid>,
    #[serde(rename = "UnHealthyVMs")]
    pub unhealthy_vms: Vec<Iid>,
}

#[async_trait]
pub trait NlbHandler: ResourceHandler<NlbReqInfo, NlbInfo> {
    async fn add_vms(&self, nlb: &Iid, vms: Vec<Iid>) -> Result<VmGroupInfo>;

    async fn remove_vms(&self, nlb: &Iid, vms: Vec<Iid>) -> Result<bool>;

    async fn change_listener(&self, nlb: &Iid, listener: ListenerInfo) -> Result<ListenerInfo>;

    async fn change_vm_group(&self, nlb: &Iid, group: VmGroupInfo) -> Result<VmGroupInfo>;

    async fn change_health_checker(
        &self,
        nlb: &Iid,
        checker: HealthCheckerInfo,
    ) -> Result<HealthCheckerInfo>;

    async fn get_vm_group_health(&self, nlb: &Iid) -> Result<HealthInfo>;
}
