use super::Ctx;
use async_trait::async_trait;
use cloudmux_driver::resources::{
    ResourceHandler, SecurityHandler, SecurityInfo, SecurityReqInfo, SecurityRuleInfo,
};
use cloudmux_driver::{DriverError, Iid, Result};

pub struct MockSecurityHandler {
    pub(crate) ctx: Ctx,
}

#[async_trait]
impl ResourceHandler<SecurityReqInfo, SecurityInfo> for MockSecurityHandler {
    async fn create(&self, req: SecurityReqInfo) -> Result<SecurityInfo> {
        self.ctx.cloud.enter("sg.create").await?;

        let mut state = self.ctx.cloud.state();
        let vpc = state.vpcs.get(&req.vpc_iid)?;
        if state.security_groups.name_taken(&req.iid.name_id) {
            return Err(DriverError::AlreadyExists(req.iid.name_id));
        }

        let mut rules: Vec<SecurityRuleInfo> = Vec::new();
        for rule in req.security_rules {
            if !rules.iter().any(|r| r.same_rule(&rule)) {
                rules.push(rule);
            }
        }

        let info = SecurityInfo {
            iid: Iid::new(req.iid.name_id, self.ctx.cloud.next_id("sg")),
            vpc_iid: vpc.iid,
            security_rules: rules,
            tag_list: req.tag_list,
            key_value_list: self.ctx.location(),
        };
        state.security_groups.insert(info.clone());
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<SecurityInfo>> {
        self.ctx.cloud.enter("sg.list").await?;
        Ok(self.ctx.cloud.state().security_groups.list())
    }

    async fn get(&self, iid: &Iid) -> Result<SecurityInfo> {
        self.ctx.cloud.enter("sg.get").await?;
        self.ctx.cloud.state().security_groups.get(iid)
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        self.ctx.cloud.enter("sg.list_iid").await?;
        Ok(self.ctx.cloud.state().security_groups.list_iid())
    }

    async fn delete(&self, iid: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("sg.delete").await?;
        self.ctx.cloud.state().security_groups.remove(iid)?;
        Ok(true)
    }
}

#[async_trait]
impl SecurityHandler for MockSecurityHandler {
    async fn add_rules(&self, sg: &Iid, rules: Vec<SecurityRuleInfo>) -> Result<SecurityInfo> {
        self.ctx.cloud.enter("sg.add_rules").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.security_groups.get_mut(sg)?;
        for rule in rules {
            if info.security_rules.iter().any(|r| r.same_rule(&rule)) {
                return Err(DriverError::AlreadyExists(format!(
                    "rule {} {} {}-{} {}",
                    rule.direction, rule.ip_protocol, rule.from_port, rule.to_port, rule.cidr
                )));
            }
            info.security_rules.push(rule);
        }
        Ok(info.clone())
    }

    async fn remove_rules(&self, sg: &Iid, rules: Vec<SecurityRuleInfo>) -> Result<bool> {
        self.ctx.cloud.enter("sg.remove_rules").await?;

        let mut state = self.ctx.cloud.state();
        let info = state.security_groups.get_mut(sg)?;
        for rule in &rules {
            let before = info.security_rules.len();
            info.security_rules.retain(|r| !r.same_rule(rule));
            if info.security_rules.len() == before {
                return Err(DriverError::not_found(format!(
                    "rule {} {} {}-{}",
                    rule.direction, rule.ip_protocol, rule.from_port, rule.to_port
                )));
            }
        }
        Ok(true)
    }
}
