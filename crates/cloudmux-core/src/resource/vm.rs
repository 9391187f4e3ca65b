//! Virtual machines
//!
//! State changes answer with the transitional status the provider reported;
//! callers poll [`ControlPlane::get_vm_status`] for the terminal state.

use super::{call, fetch, validate_create};
use crate::ControlPlane;
use crate::connection::Connection;
use crate::error::{CoreError, Result};
use cloudmux_driver::resources::{ImageType, VmInfo, VmReqInfo, VmStatus, VmStatusInfo};
use cloudmux_driver::{Iid, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const KIND: ResourceKind = ResourceKind::Vm;

/// Lifecycle actions on a running or suspended VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmAction {
    Suspend,
    Resume,
    Reboot,
}

impl fmt::Display for VmAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VmAction::Suspend => "suspend",
            VmAction::Resume => "resume",
            VmAction::Reboot => "reboot",
        };
        f.write_str(s)
    }
}

impl FromStr for VmAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suspend" => Ok(VmAction::Suspend),
            "resume" => Ok(VmAction::Resume),
            "reboot" => Ok(VmAction::Reboot),
            other => Err(format!("unknown VM action: {}", other)),
        }
    }
}

impl ControlPlane {
    /// Resolves every reference of a VM request to its mapped IID
    async fn resolve_vm_refs(&self, conn: &str, req: &mut VmReqInfo) -> Result<()> {
        match req.image_type {
            ImageType::MyImage => {
                self.resolve_ref(conn, ResourceKind::MyImage, &mut req.image_iid)
                    .await?
            }
            // Public images are not mapped; the name is the provider id
            ImageType::PublicImage => {
                req.image_iid = Iid::new(req.image_iid.name_id.as_str(), req.image_iid.name_id.as_str())
            }
        }

        let vpc_name = req.vpc_iid.name_id.clone();
        self.resolve_ref(conn, ResourceKind::Vpc, &mut req.vpc_iid)
            .await?;

        let subnet = self
            .record(conn, ResourceKind::Subnet, &req.subnet_iid.name_id)
            .await?;
        if subnet.owner.as_ref().map(|o| o.name.as_str()) != Some(vpc_name.as_str()) {
            return Err(CoreError::Configuration(format!(
                "SUBNET {} does not belong to VPC {}",
                req.subnet_iid.name_id, vpc_name
            )));
        }
        req.subnet_iid = subnet.iid;

        self.resolve_refs(conn, ResourceKind::SecurityGroup, &mut req.security_group_iids)
            .await?;
        if let Some(key) = req.key_pair_iid.as_mut() {
            self.resolve_ref(conn, ResourceKind::KeyPair, key).await?;
        }
        self.resolve_refs(conn, ResourceKind::Disk, &mut req.data_disk_iids)
            .await
    }

    /// Puts mapped names on the references of a provider VM record
    async fn name_vm_refs(&self, conn: &str, info: &mut VmInfo) -> Result<()> {
        self.name_ref(conn, ResourceKind::Vpc, &mut info.vpc_iid)
            .await?;
        self.name_ref(conn, ResourceKind::Subnet, &mut info.subnet_iid)
            .await?;
        self.name_refs(conn, ResourceKind::SecurityGroup, &mut info.security_group_iids)
            .await?;
        if let Some(key) = info.key_pair_iid.as_mut() {
            self.name_ref(conn, ResourceKind::KeyPair, key).await?;
        }
        self.name_refs(conn, ResourceKind::Disk, &mut info.data_disk_iids)
            .await?;
        self.name_ref(conn, ResourceKind::MyImage, &mut info.image_iid)
            .await
    }

    /// Creates and starts a VM
    pub async fn start_vm(&self, connection: &str, mut req: VmReqInfo) -> Result<VmInfo> {
        validate_create(&mut req)?;
        let conn = self.connect(connection).await?;
        let handler = conn.vm_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;
        self.resolve_vm_refs(conn.name(), &mut req).await?;

        let zone = Some(conn.zone().to_string());
        let mut info: VmInfo = self
            .provision(&conn, KIND, &*handler, req, None, zone)
            .await?;
        self.name_vm_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn get_vm(&self, connection: &str, name: &str) -> Result<VmInfo> {
        let conn = self.connect(connection).await?;
        let handler = conn.vm_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        let mut info: VmInfo = fetch(&conn, KIND, &*handler, &record).await?;
        self.name_vm_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn list_vms(&self, connection: &str) -> Result<Vec<VmInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.vm_handler()?;

        let mut vms: Vec<VmInfo> = self.list_mapped(&conn, KIND, &*handler).await?;
        for vm in vms.iter_mut() {
            self.name_vm_refs(conn.name(), vm).await?;
        }
        Ok(vms)
    }

    /// Terminates a VM and drops its mapping.
    ///
    /// With `force`, the mapping is dropped even when the provider call
    /// fails; the answer is then [`VmStatus::NotExist`].
    pub async fn terminate_vm(&self, connection: &str, name: &str, force: bool) -> Result<VmStatus> {
        let conn = self.connect(connection).await?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        self.terminate_vm_locked(&conn, name, force).await
    }

    pub(crate) async fn terminate_vm_locked(&self, conn: &Connection, name: &str, force: bool) -> Result<VmStatus> {
        let handler = conn.vm_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        let status = match call(
            conn,
            KIND.as_str(),
            "terminate",
            &record.iid,
            handler.terminate(&record.iid),
        )
        .await
        {
            Ok(status) => status,
            Err(e) if force => {
                tracing::warn!("Force terminating VM {}, provider error ignored: {}", record.iid, e);
                VmStatus::NotExist
            }
            Err(e) => return Err(e),
        };

        self.iids.remove(conn.name(), KIND, name).await?;
        tracing::info!("Terminated VM {} on {} ({})", record.iid, conn.name(), status);
        Ok(status)
    }

    pub async fn control_vm(&self, connection: &str, name: &str, action: VmAction) -> Result<VmStatus> {
        let conn = self.connect(connection).await?;
        let handler = conn.vm_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;
        let iid = &record.iid;

        let status = match action {
            VmAction::Suspend => call(&conn, KIND.as_str(), "suspend", iid, handler.suspend(iid)).await?,
            VmAction::Resume => call(&conn, KIND.as_str(), "resume", iid, handler.resume(iid)).await?,
            VmAction::Reboot => call(&conn, KIND.as_str(), "reboot", iid, handler.reboot(iid)).await?,
        };
        tracing::info!("VM {} {} requested: {}", iid, action, status);
        Ok(status)
    }

    pub async fn get_vm_status(&self, connection: &str, name: &str) -> Result<VmStatus> {
        let conn = self.connect(connection).await?;
        let handler = conn.vm_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        call(
            &conn,
            KIND.as_str(),
            "get_status",
            &record.iid,
            handler.get_status(&record.iid),
        )
        .await
    }

    /// Status of every mapped VM the provider still reports
    pub async fn list_vm_status(&self, connection: &str) -> Result<Vec<VmStatusInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.vm_handler()?;
        let records = self.iids.list(conn.name(), KIND).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let statuses = call(
            &conn,
            KIND.as_str(),
            "list_status",
            &Iid::default(),
            handler.list_status(),
        )
        .await?;

        Ok(records
            .into_iter()
            .filter_map(|record| {
                statuses
                    .iter()
                    .find(|s| s.iid.system_id == record.iid.system_id)
                    .map(|s| VmStatusInfo {
                        iid: record.iid,
                        vm_status: s.vm_status,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_action_parse() {
        assert_eq!("Suspend".parse::<VmAction>().unwrap(), VmAction::Suspend);
        assert_eq!(" reboot ".parse::<VmAction>().unwrap(), VmAction::Reboot);
        assert!("start".parse::<VmAction>().is_err());
        assert_eq!(VmAction::Resume.to_string(), "resume");
    }
}
