//! VPC and subnet management
//!
//! Subnets are mapped as `SUBNET` records owned by their VPC.

use super::{call, call_create, fetch, rollback, validate_create};
use crate::ControlPlane;
use crate::connection::Connection;
use crate::error::{CoreError, Result};
use crate::iid::{IidRecord, OwnerRef};
use cloudmux_driver::resources::{SubnetInfo, VpcInfo, VpcReqInfo};
use cloudmux_driver::{Iid, ResourceKind};
use std::collections::HashSet;

const KIND: ResourceKind = ResourceKind::Vpc;

impl ControlPlane {
    pub async fn create_vpc(&self, connection: &str, mut req: VpcReqInfo) -> Result<VpcInfo> {
        validate_create(&mut req)?;
        let conn = self.connect(connection).await?;
        let handler = conn.vpc_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;

        if conn.capability().single_vpc && !self.iids.list(conn.name(), KIND).await?.is_empty() {
            return Err(CoreError::Conflict(format!(
                "{} supports a single VPC and one is already managed",
                conn.name()
            )));
        }

        let mut seen = HashSet::new();
        for subnet in req.subnet_info_list.iter_mut() {
            if !seen.insert(subnet.iid.name_id.clone())
                || self
                    .iids
                    .exists(conn.name(), ResourceKind::Subnet, &subnet.iid.name_id)
                    .await?
            {
                return Err(CoreError::Conflict(format!(
                    "SUBNET {} already exists in {}",
                    subnet.iid.name_id,
                    conn.name()
                )));
            }
            subnet.iid.system_id.clear();
        }

        let mut info = call_create(&conn, KIND, &*handler, req).await?;
        if let Err(e) = self.commit_vpc(&conn, &name, &mut info).await {
            rollback(&conn, KIND, &*handler, &info.iid).await;
            return Err(e);
        }

        tracing::info!("Created VPC {} on {}", info.iid, conn.name());
        Ok(info)
    }

    /// Stores the VPC mapping and one mapping per subnet; all or nothing
    async fn commit_vpc(&self, conn: &Connection, name: &str, info: &mut VpcInfo) -> Result<()> {
        self.iids
            .insert(IidRecord::new(
                conn.name(),
                KIND,
                Iid::new(name, info.iid.system_id.as_str()),
            ))
            .await?;
        info.iid.name_id = name.to_string();

        let mut committed: Vec<String> = Vec::new();
        for subnet in &info.subnet_info_list {
            let record = IidRecord::new(conn.name(), ResourceKind::Subnet, subnet.iid.clone())
                .with_owner(OwnerRef::new(KIND, name))
                .with_zone(Some(subnet.zone.clone()));
            if let Err(e) = self.iids.insert(record).await {
                for done in &committed {
                    self.iids
                        .remove(conn.name(), ResourceKind::Subnet, done)
                        .await?;
                }
                self.iids.remove(conn.name(), KIND, name).await?;
                return Err(e);
            }
            committed.push(subnet.iid.name_id.clone());
        }
        Ok(())
    }

    /// Subnet mappings owned by `vpc`
    async fn subnet_records(&self, conn: &str, vpc: &str) -> Result<Vec<IidRecord>> {
        Ok(self
            .iids
            .list(conn, ResourceKind::Subnet)
            .await?
            .into_iter()
            .filter(|r| r.owner.as_ref().is_some_and(|o| o.kind == KIND && o.name == vpc))
            .collect())
    }

    async fn name_subnets(&self, conn: &str, info: &mut VpcInfo) -> Result<()> {
        let records = self.subnet_records(conn, &info.iid.name_id).await?;
        for subnet in info.subnet_info_list.iter_mut() {
            if let Some(record) = records.iter().find(|r| r.iid.system_id == subnet.iid.system_id) {
                subnet.iid.name_id = record.iid.name_id.clone();
            }
        }
        Ok(())
    }

    pub async fn get_vpc(&self, connection: &str, name: &str) -> Result<VpcInfo> {
        let conn = self.connect(connection).await?;
        let handler = conn.vpc_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        let mut info: VpcInfo = fetch(&conn, KIND, &*handler, &record).await?;
        self.name_subnets(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn list_vpcs(&self, connection: &str) -> Result<Vec<VpcInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.vpc_handler()?;

        let mut vpcs: Vec<VpcInfo> = self.list_mapped(&conn, KIND, &*handler).await?;
        for vpc in vpcs.iter_mut() {
            self.name_subnets(conn.name(), vpc).await?;
        }
        Ok(vpcs)
    }

    /// Deletes a VPC. Mapped subnets and other resources owned by the VPC
    /// block the delete unless `force` is set; a forced delete also drops
    /// the subnet mappings.
    pub async fn delete_vpc(&self, connection: &str, name: &str, force: bool) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let handler = conn.vpc_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;

        let dependents = self.iids.list_by_owner(conn.name(), KIND, name).await?;
        if !dependents.is_empty() && !force {
            let names: Vec<String> = dependents
                .iter()
                .map(|d| format!("{} {}", d.kind, d.iid.name_id))
                .collect();
            return Err(CoreError::Dependency(format!(
                "VPC {} still has {}",
                name,
                names.join(", ")
            )));
        }

        let deleted = self.remove(&conn, KIND, &*handler, &record, force).await?;
        if deleted {
            for subnet in dependents.iter().filter(|d| d.kind == ResourceKind::Subnet) {
                self.iids
                    .remove(conn.name(), ResourceKind::Subnet, &subnet.iid.name_id)
                    .await?;
            }
        }
        Ok(deleted)
    }

    pub async fn add_subnet(&self, connection: &str, vpc: &str, mut subnet: SubnetInfo) -> Result<VpcInfo> {
        validate_create(&mut subnet)?;
        let conn = self.connect(connection).await?;
        let handler = conn.vpc_handler()?;
        let vpc = vpc.trim();

        let _guard = self.lock(conn.name(), KIND, vpc).await;
        let record = self.record(conn.name(), KIND, vpc).await?;
        let subnet_name = subnet.iid.name_id.clone();
        if self
            .iids
            .exists(conn.name(), ResourceKind::Subnet, &subnet_name)
            .await?
        {
            return Err(CoreError::Conflict(format!(
                "SUBNET {} already exists in {}",
                subnet_name,
                conn.name()
            )));
        }
        subnet.iid.system_id.clear();

        let requested = subnet.iid.clone();
        let mut info = call(
            &conn,
            ResourceKind::Subnet.as_str(),
            "add_subnet",
            &requested,
            handler.add_subnet(&record.iid, subnet),
        )
        .await?;
        info.iid.name_id = record.iid.name_id.clone();

        let added = info
            .subnet_info_list
            .iter()
            .find(|s| s.iid.name_id == subnet_name)
            .cloned()
            .ok_or_else(|| CoreError::Provider {
                kind: ResourceKind::Subnet.to_string(),
                iid: Iid::by_name(subnet_name.as_str()),
                source: cloudmux_driver::DriverError::provider("subnet missing from VPC after add"),
            })?;

        let mapping = IidRecord::new(conn.name(), ResourceKind::Subnet, added.iid.clone())
            .with_owner(OwnerRef::new(KIND, vpc))
            .with_zone(Some(added.zone.clone()));
        if let Err(e) = self.iids.insert(mapping).await {
            tracing::warn!("Rolling back SUBNET {} on {}", added.iid, conn.name());
            if let Err(undo) = handler.remove_subnet(&record.iid, &added.iid).await {
                tracing::error!("Rollback of SUBNET {} failed: {}", added.iid, undo);
            }
            return Err(e);
        }

        self.name_subnets(conn.name(), &mut info).await?;
        tracing::info!("Added SUBNET {} to VPC {}", added.iid, vpc);
        Ok(info)
    }

    pub async fn remove_subnet(&self, connection: &str, vpc: &str, subnet: &str, force: bool) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let vpc = vpc.trim();

        let _guard = self.lock(conn.name(), KIND, vpc).await;
        let vpc_record = self.record(conn.name(), KIND, vpc).await?;
        let subnet_record = self.record(conn.name(), ResourceKind::Subnet, subnet).await?;
        if subnet_record.owner != Some(OwnerRef::new(KIND, vpc)) {
            return Err(CoreError::not_found(ResourceKind::Subnet, subnet.trim()));
        }

        self.remove_subnet_locked(&conn, &vpc_record, &subnet_record, force)
            .await
    }

    /// Caller holds the VPC lock
    pub(crate) async fn remove_subnet_locked(
        &self,
        conn: &Connection,
        vpc: &IidRecord,
        subnet: &IidRecord,
        force: bool,
    ) -> Result<bool> {
        let handler = conn.vpc_handler()?;
        let removed = match call(
            conn,
            ResourceKind::Subnet.as_str(),
            "remove_subnet",
            &subnet.iid,
            handler.remove_subnet(&vpc.iid, &subnet.iid),
        )
        .await
        {
            Ok(removed) => removed,
            Err(e) if force => {
                tracing::warn!("Force removing SUBNET {}, provider error ignored: {}", subnet.iid, e);
                false
            }
            Err(e) => return Err(e),
        };
        if !removed && !force {
            return Ok(false);
        }

        self.iids
            .remove(conn.name(), ResourceKind::Subnet, &subnet.iid.name_id)
            .await?;
        tracing::info!("Removed SUBNET {} from VPC {}", subnet.iid, vpc.iid.name_id);
        Ok(true)
    }
}
