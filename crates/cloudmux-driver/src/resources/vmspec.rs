//! VM spec catalog contract

use crate::error::Result;
use crate::iid::KeyValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VCpuInfo {
    pub count: String,
    /// GHz
    #[serde(default)]
    pub clock: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GpuInfo {
    pub count: String,
    pub mfr: String,
    pub model: String,
    /// MiB
    pub mem: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmSpecInfo {
    pub region: String,
    pub name: String,
    pub vcpu: VCpuInfo,
    /// MiB
    pub mem: String,
    #[serde(default)]
    pub gpu: Vec<GpuInfo>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

#[async_trait]
pub trait VmSpecHandler: Send + Sync {
    async fn list(&self) -> Result<Vec<VmSpecInfo>>;

    async fn get(&self, name: &str) -> Result<VmSpecInfo>;

    /// Provider's own listing, as the provider returned it
    async fn list_org(&self) -> Result<String>;

    async fn get_org(&self, name: &str) -> Result<String>;
}
