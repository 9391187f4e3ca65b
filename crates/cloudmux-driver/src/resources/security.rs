//! Security group contract

use super::ResourceHandler;
use crate::error::Result;
use crate::iid::{Iid, KeyValue};
use crate::impl_has_iid;
use crate::validate::{Validate, Walker};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityRuleInfo {
    /// "inbound" or "outbound"
    pub direction: String,
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    pub from_port: String,
    pub to_port: String,
    #[serde(rename = "CIDR")]
    pub cidr: String,
}

impl SecurityRuleInfo {
    pub fn inbound(protocol: &str, from: &str, to: &str, cidr: &str) -> Self {
        Self {
            direction: "inbound".into(),
            ip_protocol: protocol.into(),
            from_port: from.into(),
            to_port: to.into(),
            cidr: cidr.into(),
        }
    }

    /// Rules compare equal regardless of the letter case providers return
    pub fn same_rule(&self, other: &Self) -> bool {
        self.direction.eq_ignore_ascii_case(&other.direction)
            && self.ip_protocol.eq_ignore_ascii_case(&other.ip_protocol)
            && self.from_port == other.from_port
            && self.to_port == other.to_port
            && self.cidr == other.cidr
    }
}

impl Validate for SecurityRuleInfo {
    const TYPE_NAME: &'static str = "SecurityRuleInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("Direction", &mut self.direction);
        w.string("IPProtocol", &mut self.ip_protocol);
        w.string("FromPort", &mut self.from_port);
        w.string("ToPort", &mut self.to_port);
        w.string("CIDR", &mut self.cidr);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityReqInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "VpcIID")]
    pub vpc_iid: Iid,
    pub security_rules: Vec<SecurityRuleInfo>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
}

impl Validate for SecurityReqInfo {
    const TYPE_NAME: &'static str = "SecurityReqInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.nested("IId", &mut self.iid);
        w.nested("VpcIID", &mut self.vpc_iid);
        w.list("SecurityRules", &mut self.security_rules);
        w.list("TagList", &mut self.tag_list);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityInfo {
    #[serde(rename = "IId")]
    pub iid: Iid,
    #[serde(rename = "VpcIID")]
    pub vpc_iid: Iid,
    pub security_rules: Vec<SecurityRuleInfo>,
    #[serde(default)]
    pub tag_list: Vec<KeyValue>,
    #[serde(default)]
    pub key_value_list: Vec<KeyValue>,
}

impl_has_iid!(SecurityReqInfo, SecurityInfo);

#[async_trait]
pub trait SecurityHandler: ResourceHandler<SecurityReqInfo, SecurityInfo> {
    async fn add_rules(&self, sg: &Iid, rules: Vec<SecurityRuleInfo>) -> Result<SecurityInfo>;

    async fn remove_rules(&self, sg: &Iid, rules: Vec<SecurityRuleInfo>) -> Result<bool>;
}
