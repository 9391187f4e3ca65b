//! Reconciliation between the local mapping and the provider
//!
//! ```text
//!   local mapping (NameId → SystemId)       provider list_iid()
//!             │                                     │
//!             └────────────── partition ────────────┘
//!                               │
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!       Mapped             OnlySpider             OnlyCSP
//!   (in both)        (mapped, gone at CSP)   (at CSP, unmapped)
//! ```
//!
//! Listing is read-only and takes no lock, so it may miss a mutation that is
//! one provider round trip old. Deleting goes through the normal per-kind
//! delete (Mapped / OnlySpider) or straight to the driver by SystemId
//! (OnlyCSP).

use crate::ControlPlane;
use crate::error::{CoreError, Result};
use crate::lock::LockKey;
use crate::resource::{call, delete_unmanaged, get_unmanaged, list_iid, unmanaged};
use cloudmux_driver::resources::VmStatus;
use cloudmux_driver::{Iid, ResourceKind, ValidationError};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Deletion order used by [`ControlPlane::destroy`]; kinds within a group
/// are deleted concurrently
pub const DESTROY_ORDER: [&[ResourceKind]; 5] = [
    &[ResourceKind::Cluster, ResourceKind::MyImage, ResourceKind::Nlb],
    &[ResourceKind::Vm],
    &[ResourceKind::Disk],
    &[ResourceKind::KeyPair, ResourceKind::SecurityGroup],
    &[ResourceKind::Vpc],
];

/// Three-way split of one resource kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllResourceList {
    #[serde(rename = "MappedList")]
    pub mapped: Vec<Iid>,
    #[serde(rename = "OnlySpiderList")]
    pub only_spider: Vec<Iid>,
    #[serde(rename = "OnlyCSPList")]
    pub only_csp: Vec<Iid>,
}

impl AllResourceList {
    pub fn is_empty(&self) -> bool {
        self.mapped.is_empty() && self.only_spider.is_empty() && self.only_csp.is_empty()
    }
}

/// Splits local mappings and provider identifiers.
///
/// Mapped and OnlySpider keep the local order; OnlyCSP keeps the provider
/// order, carries an empty NameId and lists each SystemId once.
pub fn partition(local: &[Iid], provider: &[Iid]) -> AllResourceList {
    let provider_ids: HashSet<&str> = provider.iter().map(|i| i.system_id.as_str()).collect();
    let local_ids: HashSet<&str> = local.iter().map(|i| i.system_id.as_str()).collect();

    let (mapped, only_spider): (Vec<Iid>, Vec<Iid>) = local
        .iter()
        .cloned()
        .partition(|iid| provider_ids.contains(iid.system_id.as_str()));

    let mut seen = HashSet::new();
    let only_csp = provider
        .iter()
        .filter(|iid| !local_ids.contains(iid.system_id.as_str()))
        .filter(|iid| seen.insert(iid.system_id.as_str()))
        .map(|iid| Iid::new("", iid.system_id.as_str()))
        .collect();

    AllResourceList {
        mapped,
        only_spider,
        only_csp,
    }
}

/// Outcome of a delete issued through the management API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    #[serde(rename = "Result")]
    pub result: bool,
    /// Transitional status of a terminated VM
    #[serde(rename = "VMStatus", default, skip_serializing_if = "Option::is_none")]
    pub vm_status: Option<VmStatus>,
}

impl DeleteResult {
    fn deleted(result: bool) -> Self {
        Self {
            result,
            vm_status: None,
        }
    }

    fn terminated(status: VmStatus) -> Self {
        Self {
            result: true,
            vm_status: Some(status),
        }
    }
}

/// One resource [`ControlPlane::destroy`] could not delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemainedError {
    pub name: String,
    pub error: String,
}

/// Per-kind part of [`DestroyedInfo`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KindDestroyed {
    #[serde(rename = "ResourceType")]
    pub kind: ResourceKind,
    #[serde(rename = "IsAllDeleted")]
    pub all_deleted: bool,
    #[serde(rename = "DeletedList")]
    pub deleted: Vec<String>,
    #[serde(rename = "RemainedErrList")]
    pub remained_errors: Vec<RemainedError>,
}

/// Report of a connection-wide destroy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyedInfo {
    #[serde(rename = "IsAllDestroyed")]
    pub all_destroyed: bool,
    #[serde(rename = "DestroyedList")]
    pub per_kind: Vec<KindDestroyed>,
}

impl DestroyedInfo {
    pub fn get(&self, kind: ResourceKind) -> Option<&KindDestroyed> {
        self.per_kind.iter().find(|k| k.kind == kind)
    }
}

fn check_tracked(kind: ResourceKind) -> Result<()> {
    if ResourceKind::TRACKED_ROOTS.contains(&kind) {
        Ok(())
    } else {
        Err(CoreError::UnsupportedOperation(format!(
            "{} is not a managed resource kind",
            kind
        )))
    }
}

/// Driver IID for a SystemId given by the caller
fn csp_iid(system_id: &str) -> Result<Iid> {
    let iid = unmanaged(system_id);
    if iid.system_id.is_empty() {
        return Err(ValidationError {
            missing: vec!["IID:SystemId".to_string()],
        }
        .into());
    }
    Ok(iid)
}

impl ControlPlane {
    /// Mapped, OnlySpider and OnlyCSP resources of `kind`
    pub async fn all_resource_list(&self, connection: &str, kind: ResourceKind) -> Result<AllResourceList> {
        check_tracked(kind)?;
        let conn = self.connect(connection).await?;

        let local: Vec<Iid> = self
            .iids
            .list(conn.name(), kind)
            .await?
            .into_iter()
            .map(|r| r.iid)
            .collect();
        let provider = list_iid(&conn, kind).await?;

        let list = partition(&local, &provider);
        tracing::debug!(
            "{} on {}: {} mapped, {} only local, {} only at provider",
            kind,
            conn.name(),
            list.mapped.len(),
            list.only_spider.len(),
            list.only_csp.len()
        );
        Ok(list)
    }

    /// Mapped names of `kind` on the connection
    pub async fn list_resource_names(&self, connection: &str, kind: ResourceKind) -> Result<Vec<String>> {
        check_tracked(kind)?;
        self.info.get_connection_config(connection).await?;
        self.iids.list_names(connection.trim(), kind).await
    }

    /// Deletes a mapped resource by NameId through its normal delete
    pub async fn delete_resource(
        &self,
        connection: &str,
        kind: ResourceKind,
        name: &str,
        force: bool,
    ) -> Result<DeleteResult> {
        let result = match kind {
            ResourceKind::Vpc => self.delete_vpc(connection, name, force).await?,
            ResourceKind::SecurityGroup => {
                self.delete_security_group(connection, name, force)
                    .await?
            }
            ResourceKind::KeyPair => self.delete_key_pair(connection, name, force).await?,
            ResourceKind::Vm => {
                let status = self.terminate_vm(connection, name, force).await?;
                return Ok(DeleteResult::terminated(status));
            }
            ResourceKind::Nlb => self.delete_nlb(connection, name, force).await?,
            ResourceKind::Disk => self.delete_disk(connection, name, force).await?,
            ResourceKind::MyImage => self.delete_my_image(connection, name, force).await?,
            ResourceKind::Cluster => self.delete_cluster(connection, name, force).await?,
            other => {
                return Err(CoreError::UnsupportedOperation(format!(
                    "{} is not a managed resource kind",
                    other
                )));
            }
        };
        Ok(DeleteResult::deleted(result))
    }

    /// Provider record of a resource addressed by SystemId, as JSON.
    ///
    /// Works for OnlyCSP entries; a mapped resource comes back with its
    /// NameId.
    pub async fn get_csp_resource_info(
        &self,
        connection: &str,
        kind: ResourceKind,
        system_id: &str,
    ) -> Result<serde_json::Value> {
        check_tracked(kind)?;
        let iid = csp_iid(system_id)?;

        let conn = self.connect(connection).await?;
        let mut info = get_unmanaged(&conn, kind, &iid).await?;
        if let Some(record) = self
            .iids
            .find_by_system_id(conn.name(), kind, &iid.system_id)
            .await?
        {
            if let Some(found) = info.get_mut("IId").and_then(|v| v.as_object_mut()) {
                found.insert("NameId".to_string(), record.iid.name_id.into());
            }
        }
        Ok(info)
    }

    /// Deletes a provider resource that has no mapping, by SystemId
    pub async fn delete_csp_resource(
        &self,
        connection: &str,
        kind: ResourceKind,
        system_id: &str,
    ) -> Result<DeleteResult> {
        check_tracked(kind)?;
        let iid = csp_iid(system_id)?;

        let conn = self.connect(connection).await?;
        // Not ordered against a create whose provider call returned this
        // SystemId but has not committed yet; the mapping check below sees
        // whatever was committed when the lock was taken.
        let _guard = self
            .locks
            .acquire(LockKey::system_id(conn.name(), kind, &iid.system_id))
            .await;
        if let Some(record) = self
            .iids
            .find_by_system_id(conn.name(), kind, &iid.system_id)
            .await?
        {
            return Err(CoreError::Conflict(format!(
                "{} {} is mapped as {}; delete it by name",
                kind, iid.system_id, record.iid.name_id
            )));
        }

        let result = if kind == ResourceKind::Vm {
            let handler = conn.vm_handler()?;
            let status = call(
                &conn,
                kind.as_str(),
                "terminate",
                &iid,
                handler.terminate(&iid),
            )
            .await?;
            DeleteResult::terminated(status)
        } else {
            DeleteResult::deleted(delete_unmanaged(&conn, kind, &iid).await?)
        };
        tracing::info!("Deleted unmapped {} {} on {}", kind, iid.system_id, conn.name());
        Ok(result)
    }

    /// Deletes every mapped resource of the connection, dependents first.
    ///
    /// Failures do not stop the run; they are reported per resource and
    /// nothing is retried.
    pub async fn destroy(&self, connection: &str) -> Result<DestroyedInfo> {
        let conn = self.connect(connection).await?;
        let connection = conn.name().to_string();
        drop(conn);

        let mut per_kind = Vec::new();
        for group in DESTROY_ORDER {
            let results = join_all(group.iter().map(|kind| self.destroy_kind(&connection, *kind))).await;
            for result in results {
                per_kind.push(result?);
            }
        }

        let all_destroyed = per_kind.iter().all(|k| k.all_deleted);
        if all_destroyed {
            tracing::info!("Destroyed every resource on {}", connection);
        } else {
            tracing::warn!("Destroy of {} left resources behind", connection);
        }
        Ok(DestroyedInfo {
            all_destroyed,
            per_kind,
        })
    }

    async fn destroy_kind(&self, connection: &str, kind: ResourceKind) -> Result<KindDestroyed> {
        let names = self.iids.list_names(connection, kind).await?;
        let outcomes = join_all(names.iter().map(|name| self.destroy_one(connection, kind, name))).await;

        let mut deleted = Vec::new();
        let mut remained_errors = Vec::new();
        for (name, outcome) in names.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => deleted.push(name),
                Err(e) => {
                    tracing::warn!("Destroy of {} {} on {} failed: {}", kind, name, connection, e);
                    remained_errors.push(RemainedError {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(KindDestroyed {
            kind,
            all_deleted: remained_errors.is_empty(),
            deleted,
            remained_errors,
        })
    }

    async fn destroy_one(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<()> {
        let nested = match kind {
            ResourceKind::Vpc => Some(ResourceKind::Subnet),
            ResourceKind::Cluster => Some(ResourceKind::NodeGroup),
            _ => None,
        };
        if let Some(child_kind) = nested {
            let children = self.iids.list_by_owner(connection, kind, name).await?;
            for child in children.iter().filter(|c| c.kind == child_kind) {
                let removed = match kind {
                    ResourceKind::Vpc => {
                        self.remove_subnet(connection, name, &child.iid.name_id, false)
                            .await?
                    }
                    _ => {
                        self.remove_node_group(connection, name, &child.iid.name_id, false)
                            .await?
                    }
                };
                if !removed {
                    return Err(CoreError::Dependency(format!(
                        "{} {} of {} {} was not removed",
                        child_kind, child.iid.name_id, kind, name
                    )));
                }
            }
        }

        let result = self.delete_resource(connection, kind, name, false).await?;
        if result.result {
            Ok(())
        } else {
            Err(CoreError::Dependency(format!(
                "provider refused to delete {} {}",
                kind, name
            )))
        }
    }
}
