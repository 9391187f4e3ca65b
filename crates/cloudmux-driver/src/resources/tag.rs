//! Tags on provider resources
//!
//! Tags live on the provider side only. Which kinds accept them is declared
//! in [`DriverCapabilityInfo::tag_support_resource_type`](crate::DriverCapabilityInfo).

use crate::error::Result;
use crate::iid::{Iid, KeyValue, ResourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Tags found on one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagInfo {
    pub res_type: ResourceKind,
    #[serde(rename = "ResIId")]
    pub res_iid: Iid,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

#[async_trait]
pub trait TagHandler: Send + Sync {
    /// Sets `tag`, replacing any tag with the same key
    async fn add_tag(&self, kind: ResourceKind, iid: &Iid, tag: KeyValue) -> Result<KeyValue>;

    async fn list_tag(&self, kind: ResourceKind, iid: &Iid) -> Result<Vec<KeyValue>>;

    /// Fails with `NotFound` when the resource has no tag `key`
    async fn get_tag(&self, kind: ResourceKind, iid: &Iid, key: &str) -> Result<KeyValue>;

    async fn remove_tag(&self, kind: ResourceKind, iid: &Iid, key: &str) -> Result<bool>;

    /// Resources of `kind` with a tag whose key or value equals `keyword`.
    /// An empty keyword or `*` matches every tag.
    async fn find_tag(&self, kind: ResourceKind, keyword: &str) -> Result<Vec<TagInfo>>;
}

/// Whether `tag` matches a [`TagHandler::find_tag`] keyword
pub fn tag_matches(tag: &KeyValue, keyword: &str) -> bool {
    let keyword = keyword.trim();
    keyword.is_empty() || keyword == "*" || tag.key == keyword || tag.value == keyword
}
