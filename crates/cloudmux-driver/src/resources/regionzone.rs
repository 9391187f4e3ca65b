//! Region and zone catalog contract

use crate::error::Result;
use crate::iid::KeyValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneStatus {
    #[default]
    Available,
    Unavailable,
    StatusNotSupported,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoneInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub status: ZoneStatus,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionZoneInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub zone_list: Vec<ZoneInfo>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

#[async_trait]
pub trait RegionZoneHandler: Send + Sync {
    async fn list_region_zone(&self) -> Result<Vec<RegionZoneInfo>>;

    async fn get_region_zone(&self, region: &str) -> Result<RegionZoneInfo>;

    async fn list_org_region(&self) -> Result<String>;

    async fn list_org_zone(&self) -> Result<String>;
}
