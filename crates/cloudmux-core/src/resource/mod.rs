//! Resource managers
//!
//! Each tracked kind gets the same create / get / list / delete flow on top of
//! its driver handler:
//!
//! 1. validate the request (the provider assigns SystemIds, so `IID:SystemId`
//!    is never required)
//! 2. connect and take the `(connection, kind, name)` lock
//! 3. reject names that are already mapped, before any provider call
//! 4. call the driver with `{name, ""}`
//! 5. store `{name, system_id}` only after the provider succeeded, deleting
//!    the provider resource again if the mapping cannot be stored
//!
//! Kind-specific operations live in the submodules.

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

use crate::ControlPlane;
use crate::calllog::{self, Call};
use crate::connection::Connection;
use crate::error::{CoreError, Result};
use crate::iid::{IidRecord, OwnerRef};
use crate::lock::{LockGuard, LockKey};
use cloudmux_driver::resources::ResourceHandler;
use cloudmux_driver::{
    DriverError, HasIid, Iid, ResourceKind, Validate, ValidationError, validate_required,
};
use std::collections::HashMap;
use std::future::Future;

/// Exclusions applied to every create request
pub const CREATE_EXCLUSIONS: &[&str] = &["IID:SystemId"];

pub(crate) fn validate_create<T: Validate>(req: &mut T) -> Result<()> {
    validate_required(req, CREATE_EXCLUSIONS)?;
    Ok(())
}

/// Validates every element, reporting each missing field once
pub(crate) fn validate_each<T: Validate>(items: &mut [T], exclusions: &[&str]) -> Result<()> {
    let mut missing: Vec<String> = Vec::new();
    for item in items.iter_mut() {
        if let Err(e) = validate_required(item, exclusions) {
            for field in e.missing {
                if !missing.contains(&field) {
                    missing.push(field);
                }
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing }.into())
    }
}

/// Runs one timed driver call and wraps its error with `kind` and `iid`
pub(crate) async fn call<T, F>(
    conn: &Connection,
    kind: &str,
    op: &'static str,
    iid: &Iid,
    fut: F,
) -> Result<T>
where
    F: Future<Output = cloudmux_driver::Result<T>>,
{
    let resource = if iid.name_id.is_empty() {
        iid.system_id.as_str()
    } else {
        iid.name_id.as_str()
    };
    calllog::timed(Call::new(conn.name(), kind, op, resource), fut)
        .await
        .map_err(|e| CoreError::from_driver(kind, iid, e))
}

/// Calls `create` with the SystemId slot cleared
pub(crate) async fn call_create<H, Req, Info>(
    conn: &Connection,
    kind: ResourceKind,
    handler: &H,
    mut req: Req,
) -> Result<Info>
where
    H: ResourceHandler<Req, Info> + ?Sized,
    Req: HasIid + Send + 'static,
    Info: HasIid + Send + 'static,
{
    req.iid_mut().system_id.clear();
    let requested = req.iid().clone();

    let info = call(conn, kind.as_str(), "create", &requested, handler.create(req)).await?;
    if info.iid().system_id.is_empty() {
        return Err(CoreError::Provider {
            kind: kind.to_string(),
            iid: requested,
            source: DriverError::provider("driver returned an empty SystemId"),
        });
    }
    Ok(info)
}

/// Deletes a freshly created provider resource after a failed commit
pub(crate) async fn rollback<H, Req, Info>(conn: &Connection, kind: ResourceKind, handler: &H, iid: &Iid)
where
    H: ResourceHandler<Req, Info> + ?Sized,
    Req: Send + 'static,
    Info: Send + 'static,
{
    tracing::warn!("Rolling back {} {} on {}", kind, iid, conn.name());
    if let Err(e) = call(conn, kind.as_str(), "delete", iid, handler.delete(iid)).await {
        tracing::error!(
            "Rollback of {} {} on {} failed, provider resource is left unmanaged: {}",
            kind,
            iid,
            conn.name(),
            e
        );
    }
}

/// Fetches the provider record for a mapping, carrying the user's NameId
pub(crate) async fn fetch<H, Req, Info>(
    conn: &Connection,
    kind: ResourceKind,
    handler: &H,
    record: &IidRecord,
) -> Result<Info>
where
    H: ResourceHandler<Req, Info> + ?Sized,
    Req: Send + 'static,
    Info: HasIid + Send + 'static,
{
    let mut info = call(conn, kind.as_str(), "get", &record.iid, handler.get(&record.iid)).await?;
    info.iid_mut().name_id = record.iid.name_id.clone();
    Ok(info)
}

/// Fills the NameId of every IID the provider returned that is mapped
pub(crate) fn name_refs(refs: &mut [Iid], records: &[IidRecord]) {
    for iid in refs.iter_mut() {
        if let Some(record) = records.iter().find(|r| r.iid.system_id == iid.system_id) {
            iid.name_id = record.iid.name_id.clone();
        }
    }
}

/// Driver IID of a resource the caller only knows by SystemId
pub(crate) fn unmanaged(system_id: &str) -> Iid {
    Iid::by_system_id(system_id.trim())
}

impl ControlPlane {
    pub(crate) async fn lock(&self, conn: &str, kind: ResourceKind, name: &str) -> LockGuard {
        self.locks.acquire(LockKey::new(conn, kind, name)).await
    }

    /// Takes the create lock and rejects names that are already mapped.
    ///
    /// The connection config is checked again under the lock: it may have
    /// been deleted while this call waited.
    pub(crate) async fn begin_create(
        &self,
        conn: &Connection,
        kind: ResourceKind,
        name: &str,
    ) -> Result<LockGuard> {
        let guard = self.lock(conn.name(), kind, name).await;
        if self.info.get_connection_config(conn.name()).await.is_err() {
            return Err(CoreError::Configuration(format!(
                "connection config {} is not registered",
                conn.name()
            )));
        }
        if self.iids.exists(conn.name(), kind, name).await? {
            return Err(CoreError::Conflict(format!(
                "{} {} already exists in {}",
                kind,
                name,
                conn.name()
            )));
        }
        Ok(guard)
    }

    /// Creates the provider resource and commits its mapping
    pub(crate) async fn provision<H, Req, Info>(
        &self,
        conn: &Connection,
        kind: ResourceKind,
        handler: &H,
        req: Req,
        owner: Option<OwnerRef>,
        zone: Option<String>,
    ) -> Result<Info>
    where
        H: ResourceHandler<Req, Info> + ?Sized,
        Req: HasIid + Send + 'static,
        Info: HasIid + Send + 'static,
    {
        let name = req.iid().name_id.clone();
        let mut info = call_create(conn, kind, handler, req).await?;

        let mut record = IidRecord::new(
            conn.name(),
            kind,
            Iid::new(name.clone(), info.iid().system_id.clone()),
        )
        .with_zone(zone);
        if let Some(owner) = owner {
            record = record.with_owner(owner);
        }

        if let Err(e) = self.iids.insert(record).await {
            rollback(conn, kind, handler, info.iid()).await;
            return Err(e);
        }

        info.iid_mut().name_id = name;
        tracing::info!("Created {} {} on {}", kind, info.iid(), conn.name());
        Ok(info)
    }

    /// Provider records of every mapped resource of `kind`. Mapped resources
    /// the provider no longer lists are left out.
    pub(crate) async fn list_mapped<H, Req, Info>(
        &self,
        conn: &Connection,
        kind: ResourceKind,
        handler: &H,
    ) -> Result<Vec<Info>>
    where
        H: ResourceHandler<Req, Info> + ?Sized,
        Req: Send + 'static,
        Info: HasIid + Send + 'static,
    {
        let records = self.iids.list(conn.name(), kind).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let listed = call(conn, kind.as_str(), "list", &Iid::default(), handler.list()).await?;
        let mut by_system_id: HashMap<String, Info> = listed
            .into_iter()
            .map(|info| (info.iid().system_id.clone(), info))
            .collect();

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let mut info = by_system_id.remove(&record.iid.system_id)?;
                info.iid_mut().name_id = record.iid.name_id;
                Some(info)
            })
            .collect())
    }

    /// Deletes the provider resource and its mapping.
    ///
    /// Without `force`, a driver error is returned and the mapping kept. With
    /// `force`, the mapping is removed whatever the driver answered.
    pub(crate) async fn remove<H, Req, Info>(
        &self,
        conn: &Connection,
        kind: ResourceKind,
        handler: &H,
        record: &IidRecord,
        force: bool,
    ) -> Result<bool>
    where
        H: ResourceHandler<Req, Info> + ?Sized,
        Req: Send + 'static,
        Info: Send + 'static,
    {
        let deleted = match call(conn, kind.as_str(), "delete", &record.iid, handler.delete(&record.iid)).await {
            Ok(deleted) => deleted,
            Err(e) if force => {
                tracing::warn!("Force deleting {} {}, provider error ignored: {}", kind, record.iid, e);
                false
            }
            Err(e) => return Err(e),
        };

        if !deleted && !force {
            return Ok(false);
        }
        self.iids
            .remove(conn.name(), kind, &record.iid.name_id)
            .await?;
        tracing::info!("Deleted {} {} on {}", kind, record.iid, conn.name());
        Ok(true)
    }

    /// Replaces the NameId-only reference with its mapped IID
    pub(crate) async fn resolve_ref(&self, conn: &str, kind: ResourceKind, iid: &mut Iid) -> Result<()> {
        let record = self
            .iids
            .get(conn, kind, &iid.name_id)
            .await?
            .ok_or_else(|| CoreError::not_found(kind, iid.name_id.as_str()))?;
        *iid = record.iid;
        Ok(())
    }

    pub(crate) async fn resolve_refs(&self, conn: &str, kind: ResourceKind, iids: &mut [Iid]) -> Result<()> {
        for iid in iids.iter_mut() {
            self.resolve_ref(conn, kind, iid).await?;
        }
        Ok(())
    }

    /// Puts the mapped NameId on a reference returned by the provider
    pub(crate) async fn name_ref(&self, conn: &str, kind: ResourceKind, iid: &mut Iid) -> Result<()> {
        if let Some(record) = self.iids.find_by_system_id(conn, kind, &iid.system_id).await? {
            iid.name_id = record.iid.name_id;
        }
        Ok(())
    }

    pub(crate) async fn name_refs(&self, conn: &str, kind: ResourceKind, iids: &mut [Iid]) -> Result<()> {
        let records = self.iids.list(conn, kind).await?;
        name_refs(iids, &records);
        Ok(())
    }

    /// Mapping of `name`, or `NotFound`
    pub(crate) async fn record(&self, conn: &str, kind: ResourceKind, name: &str) -> Result<IidRecord> {
        self.iids.require(conn, kind, name.trim()).await
    }

    /// Adopts an existing provider resource under `name`.
    ///
    /// The driver must know `system_id`; nothing is created.
    pub async fn register(
        &self,
        connection: &str,
        kind: ResourceKind,
        name: &str,
        system_id: &str,
    ) -> Result<Iid> {
        let mut iid = Iid::new(name, system_id);
        validate_required(&mut iid, &[])?;
        if !ResourceKind::TRACKED_ROOTS.contains(&kind) {
            return Err(CoreError::UnsupportedOperation(format!(
                "{} resources cannot be registered directly",
                kind
            )));
        }

        let conn = self.connect(connection).await?;
        let _guard = self.begin_create(&conn, kind, &iid.name_id).await?;

        let found = get_iid(&conn, kind, &unmanaged(&iid.system_id)).await?;
        let record = IidRecord::new(
            conn.name(),
            kind,
            Iid::new(iid.name_id.clone(), found.system_id),
        );
        let record = self.iids.insert(record).await?;
        tracing::info!("Registered {} {} on {}", kind, record.iid, conn.name());
        Ok(record.iid)
    }

    /// Drops the mapping of `name`; the provider resource is untouched
    pub async fn unregister(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<bool> {
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, kind, name).await;
        self.record(connection, kind, name).await?;

        let children = self.iids.list_by_owner(connection, kind, name).await?;
        for child in children.iter().filter(|c| c.kind.parent() == Some(kind)) {
            self.iids
                .remove(connection, child.kind, &child.iid.name_id)
                .await?;
        }
        let removed = self.iids.remove(connection, kind, name).await?;
        tracing::info!("Unregistered {} {} on {}", kind, name, connection);
        Ok(removed)
    }
}

/// Runs `$body` with the handler for a tracked root kind bound to `$h`
macro_rules! with_handler {
    ($conn:expr, $kind:expr, $h:ident => $body:expr) => {
        match $kind {
            ::cloudmux_driver::ResourceKind::Vpc => {
                let $h = $conn.vpc_handler()?;
                $body
            }
            ::cloudmux_driver::ResourceKind::SecurityGroup => {
                let $h = $conn.security_handler()?;
                $body
            }
            ::cloudmux_driver::ResourceKind::KeyPair => {
                let $h = $conn.key_pair_handler()?;
                $body
            }
            ::cloudmux_driver::ResourceKind::Vm => {
                let $h = $conn.vm_handler()?;
                $body
            }
            ::cloudmux_driver::ResourceKind::Nlb => {
                let $h = $conn.nlb_handler()?;
                $body
            }
            ::cloudmux_driver::ResourceKind::Disk => {
                let $h = $conn.disk_handler()?;
                $body
            }
            ::cloudmux_driver::ResourceKind::MyImage => {
                let $h = $conn.my_image_handler()?;
                $body
            }
            ::cloudmux_driver::ResourceKind::Cluster => {
                let $h = $conn.cluster_handler()?;
                $body
            }
            other => {
                return Err($crate::error::CoreError::UnsupportedOperation(format!(
                    "{} is not a managed resource kind",
                    other
                )));
            }
        }
    };
}

pub(crate) use with_handler;

/// Provider IIDs of every resource of `kind`
pub(crate) async fn list_iid(conn: &Connection, kind: ResourceKind) -> Result<Vec<Iid>> {
    let default = Iid::default();
    Ok(with_handler!(conn, kind, h => {
        call(conn, kind.as_str(), "list_iid", &default, h.list_iid()).await?
    }))
}

/// The provider's IID for `iid`, failing when it does not exist
pub(crate) async fn get_iid(conn: &Connection, kind: ResourceKind, iid: &Iid) -> Result<Iid> {
    Ok(with_handler!(conn, kind, h => {
        call(conn, kind.as_str(), "get", iid, h.get(iid)).await?.iid().clone()
    }))
}

/// Provider record of `iid` as JSON
pub(crate) async fn get_unmanaged(conn: &Connection, kind: ResourceKind, iid: &Iid) -> Result<serde_json::Value> {
    Ok(with_handler!(conn, kind, h => {
        serde_json::to_value(call(conn, kind.as_str(), "get", iid, h.get(iid)).await?)?
    }))
}

/// Deletes a provider resource that has no mapping
pub(crate) async fn delete_unmanaged(conn: &Connection, kind: ResourceKind, iid: &Iid) -> Result<bool> {
    Ok(with_handler!(conn, kind, h => {
        call(conn, kind.as_str(), "delete", iid, h.delete(iid)).await?
    }))
}
