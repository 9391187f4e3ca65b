use super::{Ctx, same_resource};
use crate::cloud::CloudState;
use async_trait::async_trait;
use chrono::Utc;
use cloudmux_driver::resources::{
    HealthCheckerInfo, HealthInfo, ListenerInfo, NlbHandler, NlbInfo, NlbReqInfo,
    ResourceHandler, VmGroupInfo,
};
use cloudmux_driver::{DriverError, Iid, Result};

pub struct MockNlbHandler {
    pub(crate) ctx: Ctx,
}

fn resolve_vms(state: &CloudState, vms: &[Iid]) -> Result<Vec<Iid>> {
    vms.iter().map(|vm| state.vms.get(vm).map(|v| v.iid)).collect()
}

#[async_trait]
impl ResourceHandler<NlbReqInfo, NlbInfo> for MockNlbHandler {
    async fn create(&self, req: NlbReqInfo) -> Result<NlbInfo> {
        self.ctx.cloud.enter("nlb.create").await?;

        let mut state = self.ctx.cloud.state();
        if state.nlbs.name_taken(&req.iid.name_id) {
            return Err(DriverError::AlreadyExists(req.iid.name_id));
        }
        let vpc = state.vpcs.get(&req.vpc_iid)?;
        let mut vm_group = req.vm_group;
        vm_group.vms = resolve_vms(&state, &vm_group.vms)?;

        let system_id = self.ctx.cloud.next_id("nlb");
        let mut listener = req.listener;
        listener.dns_name = format!("{}.{}.elb.mock", system_id, self.ctx.region.region);
        listener.ip = format!("198.51.100.{}", state.nlbs.len() + 10);

        let info = NlbInfo {
            iid: Iid::new(req.iid.name_id, system_id),
            vpc_iid: vpc.iid,
            nlb_type: req.nlb_type,
            scope: req.scope,
            listener,
            vm_group,
            health_checker: req.health_checker,
            created_time: Some(Utc::now()),
            tag_list: req.tag_list,
            key_value_list: self.ctx.location(),
        };
        state.nlbs.insert(info.clone());
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<NlbInfo>> {
        self.ctx.cloud.enter("nlb.list").await?;
        Ok(self.ctx.cloud.state().nlbs.list())
    }

    async fn get(&self, iid: &Iid) -> Result<NlbInfo> {
        self.ctx.cloud.enter("nlb.get").await?;
        self.ctx.cloud.state().nlbs.get(iid)
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        self.ctx.cloud.enter("nlb.list_iid").await?;
        Ok(self.ctx.cloud.state().nlbs.list_iid())
    }

    async fn delete(&self, iid: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("nlb.delete").await?;
        self.ctx.cloud.state().nlbs.remove(iid)?;
        Ok(true)
    }
}

#[async_trait]
impl NlbHandler for MockNlbHandler {
    async fn add_vms(&self, nlb: &Iid, vms: Vec<Iid>) -> Result<VmGroupInfo> {
        self.ctx.cloud.enter("nlb.add_vms").await?;

        let mut state = self.ctx.cloud.state();
        let resolved = resolve_vms(&state, &vms)?;
        let info = state.nlbs.get_mut(nlb)?;
        for vm in resolved {
            if !info.vm_group.vms.iter().any(|v| same_resource(v, &vm)) {
                info.vm_group.vms.push(vm);
            }
        }
        Ok(info.vm_group.clone())
    }

    async fn remove_vms(&self, nlb: &Iid, vms: Vec<Iid>) -> Result<bool> {
        self.ctx.cloud.enter("nlb.remove_vms").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.nlbs.get_mut(nlb)?;
        for vm in &vms {
            let before = info.vm_group.vms.len();
            info.vm_group.vms.retain(|v| !same_resource(v, vm));
            if info.vm_group.vms.len() == before {
                return Err(DriverError::not_found(format!("VM {} in NLB group", vm)));
            }
        }
        Ok(true)
    }

    async fn change_listener(&self, nlb: &Iid, listener: ListenerInfo) -> Result<ListenerInfo> {
        self.ctx.cloud.enter("nlb.change_listener").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.nlbs.get_mut(nlb)?;
        info.listener.protocol = listener.protocol;
        info.listener.port = listener.port;
        Ok(info.listener.clone())
    }

    async fn change_vm_group(&self, nlb: &Iid, group: VmGroupInfo) -> Result<VmGroupInfo> {
        self.ctx.cloud.enter("nlb.change_vm_group").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.nlbs.get_mut(nlb)?;
        info.vm_group.protocol = group.protocol;
        info.vm_group.port = group.port;
        Ok(info.vm_group.clone())
    }

    async fn change_health_checker(
        &self,
        nlb: &Iid,
        checker: HealthCheckerInfo,
    ) -> Result<HealthCheckerInfo> {
        self.ctx.cloud.enter("nlb.change_health_checker").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.nlbs.get_mut(nlb)?;
        info.health_checker = checker;
        Ok(info.health_checker.clone())
    }

    async fn get_vm_group_health(&self, nlb: &Iid) -> Result<HealthInfo> {
        self.ctx.cloud.enter("nlb.get_vm_group_health").await?;

        let state = self.ctx.cloud.state();
        let info = state.nlbs.get(nlb)?;
        let (healthy, unhealthy): (Vec<Iid>, Vec<Iid>) = info
            .vm_group
            .vms
            .iter()
            .cloned()
            .partition(|vm| state.vms.get(vm).is_ok());
        Ok(HealthInfo {
            all_vms: info.vm_group.vms,
            healthy_vms: healthy,
            unhealthy_vms: unhealthy,
        })
    }
}
