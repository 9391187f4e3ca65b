use super::{Ctx, same_resource};
use async_trait::async_trait;
use cloudmux_driver::resources::{ResourceHandler, SubnetInfo, VpcHandler, VpcInfo, VpcReqInfo};
use cloudmux_driver::{DriverError, Iid, Result};

pub struct MockVpcHandler {
    pub(crate) ctx: Ctx,
}

impl MockVpcHandler {
    fn new_subnet(&self, subnet: SubnetInfo) -> SubnetInfo {
        let zone = if subnet.zone.is_empty() {
            self.ctx.region.zone.clone()
        } else {
            subnet.zone
        };
        SubnetInfo {
            iid: Iid::new(subnet.iid.name_id, self.ctx.cloud.next_id("subnet")),
            zone,
            ipv4_cidr: subnet.ipv4_cidr,
            tag_list: subnet.tag_list,
            key_value_list: subnet.key_value_list,
        }
    }
}

#[async_trait]
impl ResourceHandler<VpcReqInfo, VpcInfo> for MockVpcHandler {
    async fn create(&self, req: VpcReqInfo) -> Result<VpcInfo> {
        self.ctx.cloud.enter("vpc.create").await?;

        let subnets = req
            .subnet_info_list
            .into_iter()
            .map(|s| self.new_subnet(s))
            .collect();

        let mut state = self.ctx.cloud.state();
        if state.vpcs.name_taken(&req.iid.name_id) {
            return Err(DriverError::AlreadyExists(req.iid.name_id));
        }
        let info = VpcInfo {
            iid: Iid::new(req.iid.name_id, self.ctx.cloud.next_id("vpc")),
            ipv4_cidr: req.ipv4_cidr,
            subnet_info_list: subnets,
            tag_list: req.tag_list,
            key_value_list: self.ctx.location(),
        };
        state.vpcs.insert(info.clone());
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<VpcInfo>> {
        self.ctx.cloud.enter("vpc.list").await?;
        Ok(self.ctx.cloud.state().vpcs.list())
    }

    async fn get(&self, iid: &Iid) -> Result<VpcInfo> {
        self.ctx.cloud.enter("vpc.get").await?;
        self.ctx.cloud.state().vpcs.get(iid)
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        self.ctx.cloud.enter("vpc.list_iid").await?;
        Ok(self.ctx.cloud.state().vpcs.list_iid())
    }

    async fn delete(&self, iid: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("vpc.delete").await?;
        self.ctx.cloud.state().vpcs.remove(iid)?;
        Ok(true)
    }
}

#[async_trait]
impl VpcHandler for MockVpcHandler {
    async fn add_subnet(&self, vpc: &Iid, subnet: SubnetInfo) -> Result<VpcInfo> {
        self.ctx.cloud.enter("vpc.add_subnet").await?;

        let subnet = self.new_subnet(subnet);
        let mut state = self.ctx.cloud.state();
        let info = state.vpcs.get_mut(vpc)?;
        if info
            .subnet_info_list
            .iter()
            .any(|s| s.iid.name_id == subnet.iid.name_id)
        {
            return Err(DriverError::AlreadyExists(subnet.iid.name_id));
        }
        info.subnet_info_list.push(subnet);
        Ok(info.clone())
    }

    async fn remove_subnet(&self, vpc: &Iid, subnet: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("vpc.remove_subnet").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.vpcs.get_mut(vpc)?;
        let before = info.subnet_info_list.len();
        info.subnet_info_list
            .retain(|s| !same_resource(&s.iid, subnet));
        if info.subnet_info_list.len() == before {
            return Err(DriverError::not_found(format!("SUBNET {}", subnet)));
        }
        Ok(true)
    }
}
