//! Managed Kubernetes clusters
//!
//! Node groups are mapped as `NODEGROUP` records owned by their cluster.
//! Node group calls take the cluster lock.

use super::{call, call_create, fetch, rollback, validate_create};
use crate::ControlPlane;
use crate::connection::Connection;
use crate::error::{CoreError, Result};
use crate::iid::{IidRecord, OwnerRef};
use cloudmux_driver::resources::{ClusterInfo, ClusterReqInfo, NetworkInfo, NodeGroupInfo};
use cloudmux_driver::{Iid, ResourceKind, ValidationError};
use std::collections::HashSet;

const KIND: ResourceKind = ResourceKind::Cluster;
const NODE_GROUP: ResourceKind = ResourceKind::NodeGroup;

impl ControlPlane {
    async fn resolve_network_refs(&self, conn: &str, network: &mut NetworkInfo) -> Result<()> {
        let vpc_name = network.vpc_iid.name_id.clone();
        self.resolve_ref(conn, ResourceKind::Vpc, &mut network.vpc_iid)
            .await?;

        let owner = OwnerRef::new(ResourceKind::Vpc, vpc_name.as_str());
        for subnet in network.subnet_iids.iter_mut() {
            let record = self
                .record(conn, ResourceKind::Subnet, &subnet.name_id)
                .await?;
            if record.owner.as_ref() != Some(&owner) {
                return Err(CoreError::Configuration(format!(
                    "SUBNET {} does not belong to VPC {}",
                    subnet.name_id, vpc_name
                )));
            }
            *subnet = record.iid;
        }

        self.resolve_refs(conn, ResourceKind::SecurityGroup, &mut network.security_group_iids)
            .await
    }

    /// Rejects node group names already used on the connection and resolves
    /// the group's key pair
    async fn prepare_node_group(&self, conn: &str, group: &mut NodeGroupInfo) -> Result<()> {
        if self.iids.exists(conn, NODE_GROUP, &group.iid.name_id).await? {
            return Err(CoreError::Conflict(format!(
                "NODEGROUP {} already exists in {}",
                group.iid.name_id, conn
            )));
        }
        group.iid.system_id.clear();
        self.resolve_ref(conn, ResourceKind::KeyPair, &mut group.key_pair_iid)
            .await?;
        if !group.image_iid.name_id.is_empty() {
            group.image_iid = Iid::new(group.image_iid.name_id.as_str(), group.image_iid.name_id.as_str());
        }
        Ok(())
    }

    /// Node group mappings owned by `cluster`
    async fn node_group_records(&self, conn: &str, cluster: &str) -> Result<Vec<IidRecord>> {
        Ok(self
            .iids
            .list_by_owner(conn, KIND, cluster)
            .await?
            .into_iter()
            .filter(|r| r.kind == NODE_GROUP)
            .collect())
    }

    async fn node_group_record(&self, conn: &str, cluster: &str, group: &str) -> Result<IidRecord> {
        let record = self.record(conn, NODE_GROUP, group).await?;
        if record.owner != Some(OwnerRef::new(KIND, cluster)) {
            return Err(CoreError::not_found(NODE_GROUP, group.trim()));
        }
        Ok(record)
    }

    async fn name_node_group(&self, conn: &str, group: &mut NodeGroupInfo) -> Result<()> {
        self.name_ref(conn, NODE_GROUP, &mut group.iid).await?;
        self.name_ref(conn, ResourceKind::KeyPair, &mut group.key_pair_iid)
            .await
    }

    async fn name_cluster_refs(&self, conn: &str, info: &mut ClusterInfo) -> Result<()> {
        let network = &mut info.network;
        self.name_ref(conn, ResourceKind::Vpc, &mut network.vpc_iid)
            .await?;
        self.name_refs(conn, ResourceKind::Subnet, &mut network.subnet_iids)
            .await?;
        self.name_refs(conn, ResourceKind::SecurityGroup, &mut network.security_group_iids)
            .await?;
        for group in info.node_group_list.iter_mut() {
            self.name_node_group(conn, group).await?;
        }
        Ok(())
    }

    pub async fn create_cluster(&self, connection: &str, mut req: ClusterReqInfo) -> Result<ClusterInfo> {
        validate_create(&mut req)?;
        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;
        self.resolve_network_refs(conn.name(), &mut req.network)
            .await?;

        let mut seen = HashSet::new();
        for group in req.node_group_list.iter_mut() {
            if !seen.insert(group.iid.name_id.clone()) {
                return Err(CoreError::Conflict(format!(
                    "NODEGROUP {} is requested twice",
                    group.iid.name_id
                )));
            }
            self.prepare_node_group(conn.name(), group).await?;
        }

        let mut info = call_create(&conn, KIND, &*handler, req).await?;
        if let Err(e) = self.commit_cluster(&conn, &name, &info).await {
            rollback(&conn, KIND, &*handler, &info.iid).await;
            return Err(e);
        }

        info.iid.name_id = name;
        self.name_cluster_refs(conn.name(), &mut info).await?;
        tracing::info!("Created CLUSTER {} on {}", info.iid, conn.name());
        Ok(info)
    }

    /// Stores the cluster mapping and one mapping per node group; all or nothing
    async fn commit_cluster(&self, conn: &Connection, name: &str, info: &ClusterInfo) -> Result<()> {
        self.iids
            .insert(IidRecord::new(
                conn.name(),
                KIND,
                Iid::new(name, info.iid.system_id.as_str()),
            ))
            .await?;

        let mut committed: Vec<&str> = Vec::new();
        for group in &info.node_group_list {
            let record = IidRecord::new(conn.name(), NODE_GROUP, group.iid.clone())
                .with_owner(OwnerRef::new(KIND, name));
            if let Err(e) = self.iids.insert(record).await {
                for done in &committed {
                    self.iids.remove(conn.name(), NODE_GROUP, done).await?;
                }
                self.iids.remove(conn.name(), KIND, name).await?;
                return Err(e);
            }
            committed.push(group.iid.name_id.as_str());
        }
        Ok(())
    }

    pub async fn get_cluster(&self, connection: &str, name: &str) -> Result<ClusterInfo> {
        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        let mut info: ClusterInfo = fetch(&conn, KIND, &*handler, &record).await?;
        self.name_cluster_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn list_clusters(&self, connection: &str) -> Result<Vec<ClusterInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;

        let mut clusters: Vec<ClusterInfo> = self.list_mapped(&conn, KIND, &*handler).await?;
        for cluster in clusters.iter_mut() {
            self.name_cluster_refs(conn.name(), cluster).await?;
        }
        Ok(clusters)
    }

    /// Deletes a cluster. Mapped node groups block the delete unless `force`
    /// is set; a forced delete also drops their mappings.
    pub async fn delete_cluster(&self, connection: &str, name: &str, force: bool) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;

        let groups = self.node_group_records(conn.name(), name).await?;
        if !groups.is_empty() && !force {
            let names: Vec<&str> = groups.iter().map(|g| g.iid.name_id.as_str()).collect();
            return Err(CoreError::Dependency(format!(
                "CLUSTER {} still has NODEGROUP {}",
                name,
                names.join(", ")
            )));
        }

        let deleted = self.remove(&conn, KIND, &*handler, &record, force).await?;
        if deleted {
            for group in &groups {
                self.iids
                    .remove(conn.name(), NODE_GROUP, &group.iid.name_id)
                    .await?;
            }
        }
        Ok(deleted)
    }

    pub async fn add_node_group(
        &self,
        connection: &str,
        cluster: &str,
        mut group: NodeGroupInfo,
    ) -> Result<NodeGroupInfo> {
        validate_create(&mut group)?;
        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;
        let cluster = cluster.trim();

        let _guard = self.lock(conn.name(), KIND, cluster).await;
        let record = self.record(conn.name(), KIND, cluster).await?;
        self.prepare_node_group(conn.name(), &mut group).await?;
        let requested = group.iid.clone();

        let mut added = call(
            &conn,
            NODE_GROUP.as_str(),
            "add_node_group",
            &requested,
            handler.add_node_group(&record.iid, group),
        )
        .await?;

        let mapping = IidRecord::new(
            conn.name(),
            NODE_GROUP,
            Iid::new(requested.name_id.as_str(), added.iid.system_id.as_str()),
        )
        .with_owner(OwnerRef::new(KIND, cluster));
        if let Err(e) = self.iids.insert(mapping).await {
            tracing::warn!("Rolling back NODEGROUP {} on {}", added.iid, conn.name());
            if let Err(undo) = handler.remove_node_group(&record.iid, &added.iid).await {
                tracing::error!("Rollback of NODEGROUP {} failed: {}", added.iid, undo);
            }
            return Err(e);
        }

        self.name_node_group(conn.name(), &mut added).await?;
        tracing::info!("Added NODEGROUP {} to CLUSTER {}", added.iid, cluster);
        Ok(added)
    }

    pub async fn remove_node_group(
        &self,
        connection: &str,
        cluster: &str,
        group: &str,
        force: bool,
    ) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let cluster = cluster.trim();

        let _guard = self.lock(conn.name(), KIND, cluster).await;
        let cluster_record = self.record(conn.name(), KIND, cluster).await?;
        let group_record = self.node_group_record(conn.name(), cluster, group).await?;

        self.remove_node_group_locked(&conn, &cluster_record, &group_record, force)
            .await
    }

    /// Caller holds the cluster lock
    pub(crate) async fn remove_node_group_locked(
        &self,
        conn: &Connection,
        cluster: &IidRecord,
        group: &IidRecord,
        force: bool,
    ) -> Result<bool> {
        let handler = conn.cluster_handler()?;
        let removed = match call(
            conn,
            NODE_GROUP.as_str(),
            "remove_node_group",
            &group.iid,
            handler.remove_node_group(&cluster.iid, &group.iid),
        )
        .await
        {
            Ok(removed) => removed,
            Err(e) if force => {
                tracing::warn!("Force removing NODEGROUP {}, provider error ignored: {}", group.iid, e);
                false
            }
            Err(e) => return Err(e),
        };
        if !removed && !force {
            return Ok(false);
        }

        self.iids
            .remove(conn.name(), NODE_GROUP, &group.iid.name_id)
            .await?;
        tracing::info!("Removed NODEGROUP {} from CLUSTER {}", group.iid, cluster.iid.name_id);
        Ok(true)
    }

    pub async fn set_node_group_auto_scaling(
        &self,
        connection: &str,
        cluster: &str,
        group: &str,
        on: bool,
    ) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;
        let cluster = cluster.trim();

        let _guard = self.lock(conn.name(), KIND, cluster).await;
        let cluster_record = self.record(conn.name(), KIND, cluster).await?;
        let group_record = self.node_group_record(conn.name(), cluster, group).await?;

        call(
            &conn,
            NODE_GROUP.as_str(),
            "set_node_group_auto_scaling",
            &group_record.iid,
            handler.set_node_group_auto_scaling(&cluster_record.iid, &group_record.iid, on),
        )
        .await
    }

    pub async fn change_node_group_scaling(
        &self,
        connection: &str,
        cluster: &str,
        group: &str,
        desired: i32,
        min: i32,
        max: i32,
    ) -> Result<NodeGroupInfo> {
        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;
        let cluster = cluster.trim();

        let _guard = self.lock(conn.name(), KIND, cluster).await;
        let cluster_record = self.record(conn.name(), KIND, cluster).await?;
        let group_record = self.node_group_record(conn.name(), cluster, group).await?;

        let mut info = call(
            &conn,
            NODE_GROUP.as_str(),
            "change_node_group_scaling",
            &group_record.iid,
            handler.change_node_group_scaling(
                &cluster_record.iid,
                &group_record.iid,
                desired,
                min,
                max,
            ),
        )
        .await?;
        self.name_node_group(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn upgrade_cluster(&self, connection: &str, name: &str, version: &str) -> Result<ClusterInfo> {
        let version = version.trim();
        if version.is_empty() {
            return Err(ValidationError {
                missing: vec!["ClusterInfo:Version".to_string()],
            }
            .into());
        }

        let conn = self.connect(connection).await?;
        let handler = conn.cluster_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;

        let mut info = call(
            &conn,
            KIND.as_str(),
            "upgrade",
            &record.iid,
            handler.upgrade(&record.iid, version),
        )
        .await?;
        info.iid.name_id = record.iid.name_id;
        self.name_cluster_refs(conn.name(), &mut info).await?;
        tracing::info!("Upgraded CLUSTER {} to {}", info.iid, info.version);
        Ok(info)
    }
}
