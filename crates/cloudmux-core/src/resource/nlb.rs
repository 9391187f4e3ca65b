//! Network load balancers

use super::{CREATE_EXCLUSIONS, call, fetch, validate_create, validate_each};
use crate::ControlPlane;
use crate::connection::Connection;
use crate::error::Result;
use crate::iid::{IidRecord, OwnerRef};
use cloudmux_driver::resources::{
    HealthCheckerInfo, HealthInfo, ListenerInfo, NlbHandler, NlbInfo, NlbReqInfo, VmGroupInfo,
};
use cloudmux_driver::{Iid, ResourceKind, validate_required};

const KIND: ResourceKind = ResourceKind::Nlb;

impl ControlPlane {
    async fn name_nlb_refs(&self, conn: &str, info: &mut NlbInfo) -> Result<()> {
        self.name_ref(conn, ResourceKind::Vpc, &mut info.vpc_iid)
            .await?;
        self.name_refs(conn, ResourceKind::Vm, &mut info.vm_group.vms)
            .await
    }

    /// Connection, handler and mapping of an NLB, for calls made under its lock
    async fn nlb_target(
        &self,
        connection: &str,
        name: &str,
    ) -> Result<(Connection, Box<dyn NlbHandler>, IidRecord)> {
        let conn = self.connect(connection).await?;
        let handler = conn.nlb_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;
        Ok((conn, handler, record))
    }

    pub async fn create_nlb(&self, connection: &str, mut req: NlbReqInfo) -> Result<NlbInfo> {
        validate_create(&mut req)?;
        let conn = self.connect(connection).await?;
        let handler = conn.nlb_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;
        self.resolve_ref(conn.name(), ResourceKind::Vpc, &mut req.vpc_iid)
            .await?;
        self.resolve_refs(conn.name(), ResourceKind::Vm, &mut req.vm_group.vms)
            .await?;
        let owner = OwnerRef::new(ResourceKind::Vpc, req.vpc_iid.name_id.clone());

        let mut info: NlbInfo = self
            .provision(&conn, KIND, &*handler, req, Some(owner), None)
            .await?;
        self.name_nlb_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn get_nlb(&self, connection: &str, name: &str) -> Result<NlbInfo> {
        let (conn, handler, record) = self.nlb_target(connection, name).await?;

        let mut info: NlbInfo = fetch(&conn, KIND, &*handler, &record).await?;
        self.name_nlb_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn list_nlbs(&self, connection: &str) -> Result<Vec<NlbInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.nlb_handler()?;

        let mut nlbs: Vec<NlbInfo> = self.list_mapped(&conn, KIND, &*handler).await?;
        for nlb in nlbs.iter_mut() {
            self.name_nlb_refs(conn.name(), nlb).await?;
        }
        Ok(nlbs)
    }

    pub async fn delete_nlb(&self, connection: &str, name: &str, force: bool) -> Result<bool> {
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, handler, record) = self.nlb_target(connection, name).await?;
        self.remove(&conn, KIND, &*handler, &record, force).await
    }

    /// Adds mapped VMs to the NLB's backend group
    pub async fn add_nlb_vms(&self, connection: &str, name: &str, mut vms: Vec<Iid>) -> Result<VmGroupInfo> {
        validate_each(&mut vms, CREATE_EXCLUSIONS)?;
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, handler, record) = self.nlb_target(connection, name).await?;
        self.resolve_refs(conn.name(), ResourceKind::Vm, &mut vms)
            .await?;

        let mut group = call(
            &conn,
            KIND.as_str(),
            "add_vms",
            &record.iid,
            handler.add_vms(&record.iid, vms),
        )
        .await?;
        self.name_refs(conn.name(), ResourceKind::Vm, &mut group.vms)
            .await?;
        Ok(group)
    }

    pub async fn remove_nlb_vms(&self, connection: &str, name: &str, mut vms: Vec<Iid>) -> Result<bool> {
        validate_each(&mut vms, CREATE_EXCLUSIONS)?;
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, handler, record) = self.nlb_target(connection, name).await?;
        self.resolve_refs(conn.name(), ResourceKind::Vm, &mut vms)
            .await?;

        call(
            &conn,
            KIND.as_str(),
            "remove_vms",
            &record.iid,
            handler.remove_vms(&record.iid, vms),
        )
        .await
    }

    pub async fn change_listener(
        &self,
        connection: &str,
        name: &str,
        mut listener: ListenerInfo,
    ) -> Result<ListenerInfo> {
        validate_required(&mut listener, &[])?;
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, handler, record) = self.nlb_target(connection, name).await?;
        call(
            &conn,
            KIND.as_str(),
            "change_listener",
            &record.iid,
            handler.change_listener(&record.iid, listener),
        )
        .await
    }

    /// Changes the backend protocol and port; members stay as they are
    pub async fn change_vm_group(
        &self,
        connection: &str,
        name: &str,
        mut group: VmGroupInfo,
    ) -> Result<VmGroupInfo> {
        validate_required(&mut group, &["VMGroupInfo:VMs"])?;
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, handler, record) = self.nlb_target(connection, name).await?;
        let mut group = call(
            &conn,
            KIND.as_str(),
            "change_vm_group",
            &record.iid,
            handler.change_vm_group(&record.iid, group),
        )
        .await?;
        self.name_refs(conn.name(), ResourceKind::Vm, &mut group.vms)
            .await?;
        Ok(group)
    }

    pub async fn change_health_checker(
        &self,
        connection: &str,
        name: &str,
        mut checker: HealthCheckerInfo,
    ) -> Result<HealthCheckerInfo> {
        validate_required(&mut checker, &[])?;
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, KIND, name).await;

        let (conn, handler, record) = self.nlb_target(connection, name).await?;
        call(
            &conn,
            KIND.as_str(),
            "change_health_checker",
            &record.iid,
            handler.change_health_checker(&record.iid, checker),
        )
        .await
    }

    pub async fn get_vm_group_health(&self, connection: &str, name: &str) -> Result<HealthInfo> {
        let (conn, handler, record) = self.nlb_target(connection, name).await?;

        let mut health = call(
            &conn,
            KIND.as_str(),
            "get_vm_group_health",
            &record.iid,
            handler.get_vm_group_health(&record.iid),
        )
        .await?;
        for list in [&mut health.all_vms, &mut health.healthy_vms, &mut health.unhealthy_vms] {
            self.name_refs(conn.name(), ResourceKind::Vm, list).await?;
        }
        Ok(health)
    }
}
