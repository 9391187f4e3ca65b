//! Key pair contract

use super::ResourceHandler;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use crate::validate::{Validate, Walker};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPairReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for KeyPairReqInfo {
    const TYPE_NAME: &'static str = "KeyPairReqInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPairInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    pub fingerprint: String,
    pub public_key: String,
    /// Only populated in the response to create
    #[serde(default)]
    pub private_key: String,
    #[serde(rename = "VMUserID", default)]
    pub vm_user_id: String,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(KeyPairReqInfo, KeyPairInfo);

/// Key pairs have no operations beyond the common set
pub trait KeyPairHandler: ResourceHandler<KeyPairReqInfo, KeyPairInfo> {}

impl<T> KeyPairHandler for T where T: ResourceHandler<KeyPairReqInfo, KeyPairInfo> {}
