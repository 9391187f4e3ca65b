//! Handler implementations over [`MockCloud`](crate::MockCloud)

pub mod catalog;
pub mod cluster;
pub mod disk;
pub mod keypair;
pub mod myimage;
pub mod nlb;
pub mod security;
pub mod tag;
pub mod vm;
pub mod vpc;

use crate::cloud::MockCloud;
use cloudmux_driver::{Iid, KeyValue, RegionInfo};
use std::sync::Arc;

/// Shared by every handler created from one connection
#[derive(Debug, Clone)]
pub(crate) struct Ctx {
    pub cloud: Arc<MockCloud>,
    pub region: RegionInfo,
}

impl Ctx {
    pub fn location(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new("Region", &self.region.region),
            KeyValue::new("Zone", self.region.effective_zone()),
        ]
    }
}

/// Matches by SystemId when present, otherwise by NameId
pub(crate) fn same_resource(a: &Iid, b: &Iid) -> bool {
    if !a.system_id.is_empty() && !b.system_id.is_empty() {
        a.system_id == b.system_id
    } else {
        !a.name_id.is_empty() && a.name_id == b.name_id
    }
}
