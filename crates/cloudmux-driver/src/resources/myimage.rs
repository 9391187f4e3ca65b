//! Machine image snapshot contract

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
pub struct MyImageReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "SourceVM")]
    pub source_vm: Iid,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for MyImageReqInfo {
    const TYPE_NAME: &'static str = "MyImageInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.nested("SourceVM", &mut self.source_vm);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MyImageStatus {
    #[default]
    Available,
    Unavailable,
    Deleting,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MyImageInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "SourceVM")]
    pub source_vm: Iid,
    pub status: MyImageStatus,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(MyImageReqInfo, MyImageInfo);

/// Creating a MyImage snapshots the source VM
#[async_trait]
pub trait MyImageHandler: ResourceHandler<MyImageReqInfo, MyImageInfo> {
    async fn is_windows_image(&self, image: &Iid) -> Result<bool>;
}
