//! Provider-specific function calls

use crate::error::Result;
use crate::iid::KeyValue;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnyCallInfo {
    /// Function id understood by the driver
    #[serde(rename = "FID")]
    pub fid: String,
    #[serde(rename = "IKeyValueList", default)]
    pub input: Vec<KeyValue>,
    #[serde(rename = "OKeyValueList", default)]
    pub output: Vec<KeyValue>,
}

#[async_trait]
pub trait AnyCallHandler: Send + Sync {
    async fn any_call(&self, call: AnyCallInfo) -> Result<AnyCallInfo>;
}
