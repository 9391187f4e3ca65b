//! Security groups

use super::{call, fetch, validate_create, validate_each};
use crate::ControlPlane;
use crate::error::Result;
use crate::iid::OwnerRef;
use cloudmux_driver::resources::{SecurityInfo, SecurityReqInfo, SecurityRuleInfo};
use cloudmux_driver::ResourceKind;

const KIND: ResourceKind = ResourceKind::SecurityGroup;

impl ControlPlane {
    async fn name_security_refs(&self, conn: &str, info: &mut SecurityInfo) -> Result<()> {
        self.name_ref(conn, ResourceKind::Vpc, &mut info.vpc_iid)
            .await
    }

    pub async fn create_security_group(
        &self,
        connection: &str,
        mut req: SecurityReqInfo,
    ) -> Result<SecurityInfo> {
        validate_create(&mut req)?;
        let conn = self.connect(connection).await?;
        let handler = conn.security_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;
        self.resolve_ref(conn.name(), ResourceKind::Vpc, &mut req.vpc_iid)
            .await?;
        let owner = OwnerRef::new(ResourceKind::Vpc, req.vpc_iid.name_id.clone());

        let mut info: SecurityInfo = self
            .provision(&conn, KIND, &*handler, req, Some(owner), None)
            .await?;
        self.name_security_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn get_security_group(&self, connection: &str, name: &str) -> Result<SecurityInfo> {
        let conn = self.connect(connection).await?;
        let handler = conn.security_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        let mut info: SecurityInfo = fetch(&conn, KIND, &*handler, &record).await?;
        self.name_security_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn list_security_groups(&self, connection: &str) -> Result<Vec<SecurityInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.security_handler()?;

        let mut groups: Vec<SecurityInfo> = self.list_mapped(&conn, KIND, &*handler).await?;
        for group in groups.iter_mut() {
            self.name_security_refs(conn.name(), group).await?;
        }
        Ok(groups)
    }

    pub async fn delete_security_group(&self, connection: &str, name: &str, force: bool) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let handler = conn.security_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;
        self.remove(&conn, KIND, &*handler, &record, force).await
    }

    pub async fn add_rules(
        &self,
        connection: &str,
        name: &str,
        mut rules: Vec<SecurityRuleInfo>,
    ) -> Result<SecurityInfo> {
        validate_each(&mut rules, &[])?;
        let conn = self.connect(connection).await?;
        let handler = conn.security_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;

        let mut info = call(
            &conn,
            KIND.as_str(),
            "add_rules",
            &record.iid,
            handler.add_rules(&record.iid, rules),
        )
        .await?;
        info.iid.name_id = record.iid.name_id;
        self.name_security_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn remove_rules(
        &self,
        connection: &str,
        name: &str,
        mut rules: Vec<SecurityRuleInfo>,
    ) -> Result<bool> {
        validate_each(&mut rules, &[])?;
        let conn = self.connect(connection).await?;
        let handler = conn.security_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;

        call(
            &conn,
            KIND.as_str(),
            "remove_rules",
            &record.iid,
            handler.remove_rules(&record.iid, rules),
        )
        .await
    }
}
