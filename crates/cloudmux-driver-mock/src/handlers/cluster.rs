use super::{Ctx, same_resource};
use async_trait::async_trait;
use chrono::Utc;
use cloudmux_driver::resources::{
    AccessInfo, ClusterHandler, ClusterInfo, ClusterReqInfo, ClusterStatus, NodeGroupInfo,
    NodeGroupStatus, ResourceHandler,
};
use cloudmux_driver::{DriverError, Iid, Result};

const DEFAULT_VERSION: &str = "1.30";

pub struct MockClusterHandler {
    pub(crate) ctx: Ctx,
}

fn check_scaling(desired: i32, min: i32, max: i32) -> Result<()> {
    if min < 0 || min > desired || desired > max {
        return Err(DriverError::InvalidArgument(format!(
            "node group scaling must satisfy 0 <= min <= desired <= max (got {}/{}/{})",
            min, desired, max
        )));
    }
    Ok(())
}

impl MockClusterHandler {
    fn new_node_group(&self, group: NodeGroupInfo) -> Result<NodeGroupInfo> {
        check_scaling(group.desired_node_size, group.min_node_size, group.max_node_size)?;
        let system_id = self.ctx.cloud.next_id("ng");
        let nodes = (0..group.desired_node_size)
            .map(|i| {
                let name = format!("{}-node-{}", group.iid.name_id, i);
                Iid::new(name, format!("{}-n{}", system_id, i))
            })
            .collect();
        Ok(NodeGroupInfo {
            iid: Iid::new(group.iid.name_id, system_id),
            status: NodeGroupStatus::Active,
            nodes,
            ..group
        })
    }
}

#[async_trait]
impl ResourceHandler<ClusterReqInfo, ClusterInfo> for MockClusterHandler {
    async fn create(&self, req: ClusterReqInfo) -> Result<ClusterInfo> {
        self.ctx.cloud.enter("cluster.create").await?;

        let node_groups = req
            .node_group_list
            .into_iter()
            .map(|g| self.new_node_group(g))
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.ctx.cloud.state();
        if state.clusters.name_taken(&req.iid.name_id) {
            return Err(DriverError::AlreadyExists(req.iid.name_id));
        }
        let vpc = state.vpcs.get(&req.network.vpc_iid)?;
        let mut network = req.network;
        network.vpc_iid = vpc.iid.clone();
        for subnet in network.subnet_iids.iter_mut() {
            let found = vpc
                .subnet_info_list
                .iter()
                .find(|s| same_resource(&s.iid, subnet))
                .ok_or_else(|| DriverError::not_found(format!("SUBNET {}", subnet)))?;
            *subnet = found.iid.clone();
        }

        let system_id = self.ctx.cloud.next_id("cls");
        let version = if req.version.is_empty() {
            DEFAULT_VERSION.to_string()
        } else {
            req.version
        };
        let info = ClusterInfo {
            access_info: AccessInfo {
                endpoint: format!("https://{}.k8s.mock", system_id),
                kubeconfig: format!("apiVersion: v1\nkind: Config\nclusters:\n- name: {}\n", system_id),
            },
            iid: Iid::new(req.iid.name_id, system_id),
            version,
            network,
            node_group_list: node_groups,
            status: ClusterStatus::Active,
            created_time: Some(Utc::now()),
            tag_list: req.tag_list,
            key_value_list: self.ctx.location(),
        };
        state.clusters.insert(info.clone());
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<ClusterInfo>> {
        self.ctx.cloud.enter("cluster.list").await?;
        Ok(self.ctx.cloud.state().clusters.list())
    }

    async fn get(&self, iid: &Iid) -> Result<ClusterInfo> {
        self.ctx.cloud.enter("cluster.get").await?;
        self.ctx.cloud.state().clusters.get(iid)
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        self.ctx.cloud.enter("cluster.list_iid").await?;
        Ok(self.ctx.cloud.state().clusters.list_iid())
    }

    async fn delete(&self, iid: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("cluster.delete").await?;
        self.ctx.cloud.state().clusters.remove(iid)?;
        Ok(true)
    }
}

#[async_trait]
impl ClusterHandler for MockClusterHandler {
    async fn add_node_group(&self, cluster: &Iid, group: NodeGroupInfo) -> Result<NodeGroupInfo> {
        self.ctx.cloud.enter("cluster.add_node_group").await?;

        let group = self.new_node_group(group)?;
        let mut state = self.ctx.cloud.state();
        let info = state.clusters.get_mut(cluster)?;
        if info
            .node_group_list
            .iter()
            .any(|g| g.iid.name_id == group.iid.name_id)
        {
            return Err(DriverError::AlreadyExists(group.iid.name_id));
        }
        info.node_group_list.push(group.clone());
        Ok(group)
    }

    async fn set_node_group_auto_scaling(
        &self,
        cluster: &Iid,
        group: &Iid,
        on: bool,
    ) -> Result<bool> {
        self.ctx.cloud.enter("cluster.set_node_group_auto_scaling").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.clusters.get_mut(cluster)?;
        let ng = info
            .node_group_list
            .iter_mut()
            .find(|g| same_resource(&g.iid, group))
            .ok_or_else(|| DriverError::not_found(format!("NODEGROUP {}", group)))?;
        ng.on_auto_scaling = on;
        Ok(true)
    }

    async fn change_node_group_scaling(
        &self,
        cluster: &Iid,
        group: &Iid,
        desired: i32,
        min: i32,
        max: i32,
    ) -> Result<NodeGroupInfo> {
        self.ctx.cloud.enter("cluster.change_node_group_scaling").await?;
        check_scaling(desired, min, max)?;

        let mut state = self.ctx.cloud.state();
        let info = state.clusters.get_mut(cluster)?;
        let ng = info
            .node_group_list
            .iter_mut()
            .find(|g| same_resource(&g.iid, group))
            .ok_or_else(|| DriverError::not_found(format!("NODEGROUP {}", group)))?;
        ng.desired_node_size = desired;
        ng.min_node_size = min;
        ng.max_node_size = max;
        Ok(ng.clone())
    }

    async fn remove_node_group(&self, cluster: &Iid, group: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("cluster.remove_node_group").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.clusters.get_mut(cluster)?;
        let before = info.node_group_list.len();
        info.node_group_list.retain(|g| !same_resource(&g.iid, group));
        if info.node_group_list.len() == before {
            return Err(DriverError::not_found(format!("NODEGROUP {}", group)));
        }
        Ok(true)
    }

    async fn upgrade(&self, cluster: &Iid, version: &str) -> Result<ClusterInfo> {
        self.ctx.cloud.enter("cluster.upgrade").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.clusters.get_mut(cluster)?;
        if version.is_empty() {
            return Err(DriverError::InvalidArgument("empty cluster version".into()));
        }
        info.version = version.to_string();
        Ok(info.clone())
    }
}
