use super::{Ctx, catalog};
use crate::cloud::CloudState;
use async_trait::async_trait;
use chrono::Utc;
use cloudmux_driver::resources::{
    DiskStatus, ImageType, ResourceHandler, VmHandler, VmInfo, VmReqInfo, VmStatus, VmStatusInfo,
};
use cloudmux_driver::{DriverError, Iid, Result};

pub struct MockVmHandler {
    pub(crate) ctx: Ctx,
}

impl MockVmHandler {
    fn check_image(state: &CloudState, image_type: ImageType, image: &Iid) -> Result<Iid> {
        match image_type {
            ImageType::PublicImage => catalog::public_images()
                .into_iter()
                .find(|i| i.iid.name_id == image.name_id || i.iid.system_id == image.system_id)
                .map(|i| i.iid)
                .ok_or_else(|| DriverError::not_found(format!("IMAGE {}", image))),
            ImageType::MyImage => state.my_images.get(image).map(|i| i.iid),
        }
    }

    fn status_of(state: &CloudState, vm: &Iid) -> Result<(Iid, VmStatus)> {
        let info = state.vms.get(vm)?;
        let status = state
            .vm_status
            .get(&info.iid.system_id)
            .copied()
            .unwrap_or(VmStatus::Failed);
        Ok((info.iid, status))
    }

    /// Moves `vm` from `from` to `to`, answering with `transitional`
    fn transition(
        &self,
        vm: &Iid,
        from: VmStatus,
        to: VmStatus,
        transitional: VmStatus,
    ) -> Result<VmStatus> {
        let mut state = self.ctx.cloud.state();
        let (iid, current) = Self::status_of(&state, vm)?;
        if current != from {
            return Err(DriverError::InvalidArgument(format!(
                "VM {} is {}, expected {}",
                iid.name_id, current, from
            )));
        }
        state.vm_status.insert(iid.system_id, to);
        Ok(transitional)
    }
}

#[async_trait]
impl ResourceHandler<VmReqInfo, VmInfo> for MockVmHandler {
    async fn create(&self, req: VmReqInfo) -> Result<VmInfo> {
        self.ctx.cloud.enter("vm.create").await?;

        let mut state = self.ctx.cloud.state();
        if state.vms.name_taken(&req.iid.name_id) {
            return Err(DriverError::AlreadyExists(req.iid.name_id));
        }

        let image_iid = Self::check_image(&state, req.image_type, &req.image_iid)?;
        let vpc = state.vpcs.get(&req.vpc_iid)?;
        let subnet = vpc
            .subnet_info_list
            .iter()
            .find(|s| super::same_resource(&s.iid, &req.subnet_iid))
            .cloned()
            .ok_or_else(|| DriverError::not_found(format!("SUBNET {}", req.subnet_iid)))?;
        let mut security_groups = Vec::with_capacity(req.security_group_iids.len());
        for sg in &req.security_group_iids {
            security_groups.push(state.security_groups.get(sg)?.iid);
        }
        let key_pair = match &req.key_pair_iid {
            Some(key) => Some(state.key_pairs.get(key)?.iid),
            None => None,
        };
        if !catalog::vm_specs(&self.ctx.region.region)
            .iter()
            .any(|s| s.name == req.vm_spec_name)
        {
            return Err(DriverError::not_found(format!("VMSpec {}", req.vm_spec_name)));
        }

        for disk_iid in &req.data_disk_iids {
            let disk = state.disks.get(disk_iid)?;
            if disk.status != DiskStatus::Available {
                return Err(DriverError::InvalidArgument(format!(
                    "disk {} is {}",
                    disk.iid.name_id, disk.status
                )));
            }
        }

        let system_id = self.ctx.cloud.next_id("i");
        let mut data_disks = Vec::with_capacity(req.data_disk_iids.len());
        for disk_iid in &req.data_disk_iids {
            let disk = state.disks.get_mut(disk_iid)?;
            disk.status = DiskStatus::Attached;
            disk.owner_vm = Iid::new(req.iid.name_id.clone(), system_id.clone());
            data_disks.push(disk.iid.clone());
        }

        let octet = state.vms.len() + 10;
        let info = VmInfo {
            iid: Iid::new(req.iid.name_id, system_id.clone()),
            start_time: Some(Utc::now()),
            zone: subnet.zone.clone(),
            image_iid,
            vm_spec_name: req.vm_spec_name,
            vpc_iid: vpc.iid,
            subnet_iid: subnet.iid,
            security_group_iids: security_groups,
            key_pair_iid: key_pair,
            root_disk_type: req.root_disk_type.unwrap_or_else(|| "default".into()),
            root_disk_size: req.root_disk_size.unwrap_or_else(|| "default".into()),
            data_disk_iids: data_disks,
            vm_user_id: req.vm_user_id.unwrap_or_else(|| "cb-user".into()),
            public_ip: format!("203.0.113.{}", octet % 250),
            private_ip: format!("10.0.1.{}", octet % 250),
            ssh_access_point: format!("203.0.113.{}:22", octet % 250),
            tag_list: req.tag_list,
            key_value_list: self.ctx.location(),
        };
        state.vm_status.insert(system_id, VmStatus::Running);
        state.vms.insert(info.clone());
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<VmInfo>> {
        self.ctx.cloud.enter("vm.list").await?;
        Ok(self.ctx.cloud.state().vms.list())
    }

    async fn get(&self, iid: &Iid) -> Result<VmInfo> {
        self.ctx.cloud.enter("vm.get").await?;
        self.ctx.cloud.state().vms.get(iid)
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        self.ctx.cloud.enter("vm.list_iid").await?;
        Ok(self.ctx.cloud.state().vms.list_iid())
    }

    async fn delete(&self, iid: &Iid) -> Result<bool> {
        self.terminate(iid).await.map(|_| true)
    }
}

#[async_trait]
impl VmHandler for MockVmHandler {
    async fn suspend(&self, vm: &Iid) -> Result<VmStatus> {
        self.ctx.cloud.enter("vm.suspend").await?;
        self.transition(vm, VmStatus::Running, VmStatus::Suspended, VmStatus::Suspending)
    }

    async fn resume(&self, vm: &Iid) -> Result<VmStatus> {
        self.ctx.cloud.enter("vm.resume").await?;
        self.transition(vm, VmStatus::Suspended, VmStatus::Running, VmStatus::Resuming)
    }

    async fn reboot(&self, vm: &Iid) -> Result<VmStatus> {
        self.ctx.cloud.enter("vm.reboot").await?;
        self.transition(vm, VmStatus::Running, VmStatus::Running, VmStatus::Rebooting)
    }

    async fn terminate(&self, vm: &Iid) -> Result<VmStatus> {
        self.ctx.cloud.enter("vm.terminate").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.vms.remove(vm)?;
        state.vm_status.remove(&info.iid.system_id);
        for disk_iid in &info.data_disk_iids {
            if let Ok(disk) = state.disks.get_mut(disk_iid) {
                disk.status = DiskStatus::Available;
                disk.owner_vm = Iid::default();
            }
        }
        Ok(VmStatus::Terminating)
    }

    async fn get_status(&self, vm: &Iid) -> Result<VmStatus> {
        self.ctx.cloud.enter("vm.get_status").await?;
        let state = self.ctx.cloud.state();
        Self::status_of(&state, vm).map(|(_, status)| status)
    }

    async fn list_status(&self) -> Result<Vec<VmStatusInfo>> {
        self.ctx.cloud.enter("vm.list_status").await?;
        let state = self.ctx.cloud.state();
        Ok(state
            .vms
            .list_iid()
            .into_iter()
            .map(|iid| {
                let vm_status = state
                    .vm_status
                    .get(&iid.system_id)
                    .copied()
                    .unwrap_or(VmStatus::Failed);
                VmStatusInfo { iid, vm_status }
            })
            .collect())
    }
}
