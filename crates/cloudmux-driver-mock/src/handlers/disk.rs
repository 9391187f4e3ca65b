use super::Ctx;
use async_trait::async_trait;
use chrono::Utc;
use cloudmux_driver::resources::{DiskHandler, DiskInfo, DiskReqInfo, DiskStatus, ResourceHandler};
use cloudmux_driver::{DriverError, Iid, Result};

const DEFAULT_DISK_TYPE: &str = "standard";
const DEFAULT_DISK_SIZE: &str = "100";

pub struct MockDiskHandler {
    pub(crate) ctx: Ctx,
}

fn parse_size(size: &str) -> Result<u64> {
    size.trim()
        .parse::<u64>()
        .map_err(|_| DriverError::InvalidArgument(format!("invalid disk size: {}", size)))
}

fn or_default(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("default") => v,
        _ => default.to_string(),
    }
}

#[async_trait]
impl ResourceHandler<DiskReqInfo, DiskInfo> for MockDiskHandler {
    async fn create(&self, req: DiskReqInfo) -> Result<DiskInfo> {
        self.ctx.cloud.enter("disk.create").await?;

        let disk_size = or_default(req.disk_size, DEFAULT_DISK_SIZE);
        parse_size(&disk_size)?;
        let zone = if req.zone.is_empty() {
            self.ctx.region.effective_zone().to_string()
        } else {
            req.zone
        };

        let mut state = self.ctx.cloud.state();
        if state.disks.name_taken(&req.iid.name_id) {
            return Err(DriverError::AlreadyExists(req.iid.name_id));
        }
        let info = DiskInfo {
            iid: Iid::new(req.iid.name_id, self.ctx.cloud.next_id("vol")),
            zone,
            disk_type: or_default(req.disk_type, DEFAULT_DISK_TYPE),
            disk_size,
            status: DiskStatus::Available,
            owner_vm: Iid::default(),
            created_time: Some(Utc::now()),
            tag_list: req.tag_list,
            key_value_list: self.ctx.location(),
        };
        state.disks.insert(info.clone());
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<DiskInfo>> {
        self.ctx.cloud.enter("disk.list").await?;
        Ok(self.ctx.cloud.state().disks.list())
    }

    async fn get(&self, iid: &Iid) -> Result<DiskInfo> {
        self.ctx.cloud.enter("disk.get").await?;
        self.ctx.cloud.state().disks.get(iid)
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        self.ctx.cloud.enter("disk.list_iid").await?;
        Ok(self.ctx.cloud.state().disks.list_iid())
    }

    async fn delete(&self, iid: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("disk.delete").await?;

        let mut state = self.ctx.cloud.state();
        let disk = state.disks.get(iid)?;
        if disk.status == DiskStatus::Attached {
            return Err(DriverError::provider(format!(
                "disk {} is attached to {}",
                disk.iid.name_id, disk.owner_vm.name_id
            )));
        }
        state.disks.remove(iid)?;
        Ok(true)
    }
}

#[async_trait]
impl DiskHandler for MockDiskHandler {
    async fn change_size(&self, disk: &Iid, size: &str) -> Result<DiskStatus> {
        self.ctx.cloud.enter("disk.change_size").await?;

        let requested = parse_size(size)?;
        let mut state = self.ctx.cloud.state();
        let info = state.disks.get_mut(disk)?;
        if requested <= parse_size(&info.disk_size)? {
            return Err(DriverError::InvalidArgument(format!(
                "disk {} can only grow (current {}, requested {})",
                info.iid.name_id, info.disk_size, requested
            )));
        }
        info.disk_size = requested.to_string();
        Ok(info.status)
    }

    async fn attach(&self, disk: &Iid, vm: &Iid) -> Result<DiskStatus> {
        self.ctx.cloud.enter("disk.attach").await?;

        let mut state = self.ctx.cloud.state();
        let vm_info = state.vms.get(vm)?;
        let info = state.disks.get_mut(disk)?;
        if info.status != DiskStatus::Available {
            return Err(DriverError::InvalidArgument(format!(
                "disk {} is {}",
                info.iid.name_id, info.status
            )));
        }
        info.status = DiskStatus::Attached;
        info.owner_vm = vm_info.iid.clone();
        let disk_iid = info.iid.clone();
        if let Ok(vm_info) = state.vms.get_mut(vm) {
            vm_info.data_disk_iids.push(disk_iid);
        }
        Ok(DiskStatus::Attaching)
    }

    async fn detach(&self, disk: &Iid, vm: &Iid) -> Result<DiskStatus> {
        self.ctx.cloud.enter("disk.detach").await?;

        let mut state = self.ctx.cloud.state();
        let vm_info = state.vms.get(vm)?;
        let info = state.disks.get_mut(disk)?;
        if info.status != DiskStatus::Attached || info.owner_vm.system_id != vm_info.iid.system_id
        {
            return Err(DriverError::InvalidArgument(format!(
                "disk {} is not attached to {}",
                info.iid.name_id, vm_info.iid.name_id
            )));
        }
        info.status = DiskStatus::Available;
        info.owner_vm = Iid::default();
        let disk_system_id = info.iid.system_id.clone();
        if let Ok(vm_info) = state.vms.get_mut(vm) {
            vm_info
                .data_disk_iids
                .retain(|d| d.system_id != disk_system_id);
        }
        Ok(DiskStatus::Detaching)
    }
}
