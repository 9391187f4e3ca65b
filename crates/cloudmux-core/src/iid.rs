//! NameId to SystemId mapping
//!
//! One record per managed resource, stored under
//! `/iid/{connection}/{KIND}/{name}`. A NameId is unique per connection and
//! kind, and a SystemId may be mapped to at most one NameId.

use crate::error::{CoreError, Result};
use crate::store::{KvStore, escape, get_json, list_json, put_json};
use chrono::{DateTime, Utc};
use cloudmux_driver::{Iid, ResourceKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Parent of a nested resource (a subnet's VPC, a node group's cluster)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: ResourceKind,
    pub name: String,
}

impl OwnerRef {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Persisted mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IidRecord {
    pub connection: String,
    pub kind: ResourceKind,
    pub iid: Iid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IidRecord {
    pub fn new(connection: impl Into<String>, kind: ResourceKind, iid: Iid) -> Self {
        Self {
            connection: connection.into(),
            kind,
            iid,
            owner: None,
            zone: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_zone(mut self, zone: Option<String>) -> Self {
        self.zone = zone.filter(|z| !z.is_empty());
        self
    }
}

fn connection_prefix(connection: &str) -> String {
    format!("/iid/{}/", escape(connection))
}

fn kind_prefix(connection: &str, kind: ResourceKind) -> String {
    format!("{}{}/", connection_prefix(connection), kind)
}

fn record_key(connection: &str, kind: ResourceKind, name: &str) -> String {
    format!("{}{}", kind_prefix(connection, kind), escape(name))
}

/// Mapping store
pub struct IidManager {
    store: Arc<dyn KvStore>,
    // Serializes check-then-write on inserts
    write: Mutex<()>,
}

impl IidManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write: Mutex::new(()),
        }
    }

    /// Stores a new mapping.
    ///
    /// Fails with `Conflict` when the NameId is taken or the SystemId is
    /// already mapped under another name.
    pub async fn insert(&self, record: IidRecord) -> Result<IidRecord> {
        let _write = self.write.lock().await;

        let key = record_key(&record.connection, record.kind, &record.iid.name_id);
        if self.store.get(&key).await?.is_some() {
            return Err(CoreError::Conflict(format!(
                "{} {} already exists in {}",
                record.kind, record.iid.name_id, record.connection
            )));
        }
        if let Some(existing) = self
            .find_by_system_id(&record.connection, record.kind, &record.iid.system_id)
            .await?
        {
            return Err(CoreError::Conflict(format!(
                "{} {} is already mapped to {}",
                record.kind, record.iid.system_id, existing.iid.name_id
            )));
        }

        put_json(self.store.as_ref(), &key, &record).await?;
        tracing::debug!(
            connection = %record.connection,
            kind = %record.kind,
            "Mapped {}",
            record.iid
        );
        Ok(record)
    }

    pub async fn get(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<Option<IidRecord>> {
        get_json(self.store.as_ref(), &record_key(connection, kind, name)).await
    }

    pub async fn exists(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<bool> {
        Ok(self.get(connection, kind, name).await?.is_some())
    }

    /// Like [`get`](Self::get), but an unknown name is `NotFound`
    pub async fn require(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<IidRecord> {
        self.get(connection, kind, name)
            .await?
            .ok_or_else(|| CoreError::not_found(kind, name))
    }

    pub async fn list(&self, connection: &str, kind: ResourceKind) -> Result<Vec<IidRecord>> {
        list_json(self.store.as_ref(), &kind_prefix(connection, kind)).await
    }

    pub async fn list_names(&self, connection: &str, kind: ResourceKind) -> Result<Vec<String>> {
        Ok(self
            .list(connection, kind)
            .await?
            .into_iter()
            .map(|r| r.iid.name_id)
            .collect())
    }

    /// Every mapping of a connection, all kinds
    pub async fn list_connection(&self, connection: &str) -> Result<Vec<IidRecord>> {
        list_json(self.store.as_ref(), &connection_prefix(connection)).await
    }

    pub async fn count_for_connection(&self, connection: &str) -> Result<usize> {
        Ok(self.store.list(&connection_prefix(connection)).await?.len())
    }

    /// Records whose owner is the given resource
    pub async fn list_by_owner(
        &self,
        connection: &str,
        owner_kind: ResourceKind,
        owner_name: &str,
    ) -> Result<Vec<IidRecord>> {
        let owner = OwnerRef::new(owner_kind, owner_name);
        Ok(self
            .list_connection(connection)
            .await?
            .into_iter()
            .filter(|r| r.owner.as_ref() == Some(&owner))
            .collect())
    }

    pub async fn find_by_system_id(
        &self,
        connection: &str,
        kind: ResourceKind,
        system_id: &str,
    ) -> Result<Option<IidRecord>> {
        if system_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list(connection, kind)
            .await?
            .into_iter()
            .find(|r| r.iid.system_id == system_id))
    }

    /// Returns whether a mapping was removed
    pub async fn remove(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<bool> {
        let _write = self.write.lock().await;
        let removed = self
            .store
            .delete(&record_key(connection, kind, name))
            .await?;
        if removed {
            tracing::debug!(connection, kind = %kind, "Unmapped {}", name);
        }
        Ok(removed)
    }
}
