//! Block storage
//!
//! Drivers with `ZoneBasedControl` address disks per zone, so every disk
//! call after create goes through a connection bound to the disk's zone.

use super::{call, fetch, validate_create};
use crate::ControlPlane;
use crate::connection::Connection;
use crate::error::Result;
use crate::iid::IidRecord;
use cloudmux_driver::resources::{DiskInfo, DiskReqInfo, DiskStatus};
use cloudmux_driver::{Iid, ResourceKind, ValidationError};

const KIND: ResourceKind = ResourceKind::Disk;

impl ControlPlane {
    /// Connection for a disk living in `zone`
    async fn disk_connection(&self, connection: &str, zone: Option<&str>) -> Result<Connection> {
        let conn = self.connect(connection).await?;
        match zone {
            Some(zone) if conn.capability().zone_based_control && zone != conn.zone() => {
                self.connect_zone(connection, Some(zone)).await
            }
            _ => Ok(conn),
        }
    }

    async fn disk_record(&self, connection: &str, name: &str) -> Result<(Connection, IidRecord)> {
        let record = self.record(connection, KIND, name).await?;
        let conn = self
            .disk_connection(connection, record.zone.as_deref())
            .await?;
        Ok((conn, record))
    }

    async fn name_disk_refs(&self, conn: &str, info: &mut DiskInfo) -> Result<()> {
        self.name_ref(conn, ResourceKind::Vm, &mut info.owner_vm)
            .await
    }

    pub async fn create_disk(&self, connection: &str, mut req: DiskReqInfo) -> Result<DiskInfo> {
        validate_create(&mut req)?;
        let zone = req.zone.trim().to_string();
        req.zone = zone.clone();

        let conn = self
            .disk_connection(connection, Some(zone.as_str()).filter(|z| !z.is_empty()))
            .await?;
        let handler = conn.disk_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;
        let zone = if zone.is_empty() {
            conn.zone().to_string()
        } else {
            zone
        };

        let mut info: DiskInfo = self
            .provision(&conn, KIND, &*handler, req, None, Some(zone))
            .await?;
        self.name_disk_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn get_disk(&self, connection: &str, name: &str) -> Result<DiskInfo> {
        let (conn, record) = self.disk_record(connection, name).await?;
        let handler = conn.disk_handler()?;

        let mut info: DiskInfo = fetch(&conn, KIND, &*handler, &record).await?;
        self.name_disk_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn list_disks(&self, connection: &str) -> Result<Vec<DiskInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.disk_handler()?;

        let mut disks: Vec<DiskInfo> = self.list_mapped(&conn, KIND, &*handler).await?;
        for disk in disks.iter_mut() {
            self.name_disk_refs(conn.name(), disk).await?;
        }
        Ok(disks)
    }

    pub async fn delete_disk(&self, connection: &str, name: &str, force: bool) -> Result<bool> {
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, record) = self.disk_record(connection, name).await?;
        let handler = conn.disk_handler()?;
        self.remove(&conn, KIND, &*handler, &record, force).await
    }

    pub async fn change_disk_size(&self, connection: &str, name: &str, size: &str) -> Result<DiskStatus> {
        let connection = connection.trim();
        let size = size.trim();
        if size.is_empty() {
            return Err(ValidationError {
                missing: vec!["DiskInfo:DiskSize".to_string()],
            }
            .into());
        }
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, record) = self.disk_record(connection, name).await?;
        let handler = conn.disk_handler()?;
        call(
            &conn,
            KIND.as_str(),
            "change_size",
            &record.iid,
            handler.change_size(&record.iid, size),
        )
        .await
    }

    async fn disk_and_vm(&self, connection: &str, disk: &str, vm: &str) -> Result<(Connection, IidRecord, Iid)> {
        let (conn, record) = self.disk_record(connection, disk).await?;
        let vm = self.record(connection, ResourceKind::Vm, vm).await?;
        Ok((conn, record, vm.iid))
    }

    pub async fn attach_disk(&self, connection: &str, disk: &str, vm: &str) -> Result<DiskStatus> {
        let connection = connection.trim();
        let disk = disk.trim();
        let _guard = self.lock(connection, KIND, disk).await;

        let (conn, record, vm) = self.disk_and_vm(connection, disk, vm).await?;
        let handler = conn.disk_handler()?;
        let status = call(
            &conn,
            KIND.as_str(),
            "attach",
            &record.iid,
            handler.attach(&record.iid, &vm),
        )
        .await?;
        tracing::info!("Attaching DISK {} to VM {}: {}", record.iid, vm, status);
        Ok(status)
    }

    pub async fn detach_disk(&self, connection: &str, disk: &str, vm: &str) -> Result<DiskStatus> {
        let connection = connection.trim();
        let disk = disk.trim();
        let _guard = self.lock(connection, KIND, disk).await;

        let (conn, record, vm) = self.disk_and_vm(connection, disk, vm).await?;
        let handler = conn.disk_handler()?;
        let status = call(
            &conn,
            KIND.as_str(),
            "detach",
            &record.iid,
            handler.detach(&record.iid, &vm),
        )
        .await?;
        tracing::info!("Detaching DISK {} from VM {}: {}", record.iid, vm, status);
        Ok(status)
    }
}
