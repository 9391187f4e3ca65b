//! Block storage contract

use super::ResourceHandler;
use crate::error::Result;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use crate::validate::{Validate, Walker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    /// Empty means the connection's zone
    #[serde(default)]
    pub zone: String,
    /// "default" lets the provider choose
    #[serde(default)]
    pub disk_type: Option<String>,
    #[serde(default)]
    pub disk_size: Option<String>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for DiskReqInfo {
    const TYPE_NAME: &'static str = "DiskInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.optional_string(&mut self.disk_type);
        w.optional_string(&mut self.disk_size);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskStatus {
    #[default]
    Creating,
    Available,
    Attaching,
    Attached,
    Detaching,
    Deleting,
    Error,
}

impl fmt::Display for DiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(default)]
    pub zone: String,
    pub disk_type: String,
    pub disk_size: String,
    pub status: DiskStatus,
    /// Empty when not attached
    #[serde(rename = "OwnerVM", default)]
    pub owner_vm: Iid,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(DiskReqInfo, DiskInfo);

/// Disk operations; state changes return the transitional status
#[async_trait]
pub trait DiskHandler: ResourceHandler<DiskReqInfo, DiskInfo> {
    async fn change_size(&self, disk: &Iid, size: &str) -> Result<DiskStatus>;

    async fn attach(&self, disk: &Iid, vm: &Iid) -> Result<DiskStatus>;

    async fn detach(&self, disk: &Iid, vm: &Iid) -> Result<DiskStatus>;
}
