//! Public image catalog contract

use crate::error::Result;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageStatus {
    #[default]
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "GuestOS")]
    pub guest_os: String,
    pub status: ImageStatus,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(ImageInfo);

/// Provider-owned images; never created or mapped by the control plane
#[async_trait]
pub trait ImageHandler: Send + Sync {
    async fn list(&self) -> Result<Vec<ImageInfo>>;

    async fn get(&self, image: &Iid) -> Result<ImageInfo>;

    async fn is_windows_image(&self, image: &Iid) -> Result<bool>;
}
