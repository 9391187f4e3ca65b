//! Resource identity
//!
//! Every managed resource is addressed by an [`Iid`]: the caller-chosen
//! `NameId` and the identifier the provider assigned (`SystemId`).

use crate::validate::{Validate, Walker};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Indirect identifier of a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Iid {
    /// Control-plane name, unique per connection and kind
    #[serde(rename = "NameId")]
    pub name_id: String,

    /// Provider-native identifier
    #[serde(rename = "SystemId")]
    pub system_id: String,
}

impl Iid {
    pub fn new(name_id: impl Into<String>, system_id: impl Into<String>) -> Self {
        Self {
            name_id: name_id.into(),
            system_id: system_id.into(),
        }
    }

    /// IID handed to a driver on create: the provider has not assigned an id yet
    pub fn by_name(name_id: impl Into<String>) -> Self {
        Self::new(name_id, "")
    }

    /// IID for a provider resource that has no control-plane name.
    ///
    /// Drivers resolve by `system_id`; the name slot carries the same value so
    /// that drivers which only look at `name_id` still find the resource.
    pub fn by_system_id(system_id: impl Into<String>) -> Self {
        let system_id = system_id.into();
        Self::new(system_id.clone(), system_id)
    }

    pub fn is_empty(&self) -> bool {
        self.name_id.is_empty() && self.system_id.is_empty()
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.name_id, self.system_id)
    }
}

impl Validate for Iid {
    const TYPE_NAME: &'static str = "IID";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("NameId", &mut self.name_id);
        w.string("SystemId", &mut self.system_id);
    }
}

/// Provider-specific extra attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Validate for KeyValue {
    const TYPE_NAME: &'static str = "KeyValue";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("Key", &mut self.key);
        w.string("Value", &mut self.value);
    }
}

/// Case-insensitive lookup in a key/value list
pub fn key_value_get<'a>(list: &'a [KeyValue], key: &str) -> Option<&'a str> {
    list.iter()
        .find(|kv| kv.key.eq_ignore_ascii_case(key))
        .map(|kv| kv.value.as_str())
}

/// Kinds of resources the control plane knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "VPC")]
    Vpc,
    #[serde(rename = "SUBNET")]
    Subnet,
    #[serde(rename = "SG")]
    SecurityGroup,
    #[serde(rename = "KEY")]
    KeyPair,
    #[serde(rename = "VM")]
    Vm,
    #[serde(rename = "NLB")]
    Nlb,
    #[serde(rename = "DISK")]
    Disk,
    #[serde(rename = "MYIMAGE")]
    MyImage,
    #[serde(rename = "CLUSTER")]
    Cluster,
    #[serde(rename = "NODEGROUP")]
    NodeGroup,
}

impl ResourceKind {
    /// Kinds accepted by the management listing and by connection-wide destroy
    pub const TRACKED_ROOTS: [ResourceKind; 8] = [
        ResourceKind::Vpc,
        ResourceKind::SecurityGroup,
        ResourceKind::KeyPair,
        ResourceKind::Vm,
        ResourceKind::Nlb,
        ResourceKind::Disk,
        ResourceKind::MyImage,
        ResourceKind::Cluster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "IMAGE",
            ResourceKind::Vpc => "VPC",
            ResourceKind::Subnet => "SUBNET",
            ResourceKind::SecurityGroup => "SG",
            ResourceKind::KeyPair => "KEY",
            ResourceKind::Vm => "VM",
            ResourceKind::Nlb => "NLB",
            ResourceKind::Disk => "DISK",
            ResourceKind::MyImage => "MYIMAGE",
            ResourceKind::Cluster => "CLUSTER",
            ResourceKind::NodeGroup => "NODEGROUP",
        }
    }

    /// Whether the control plane keeps a NameId/SystemId mapping for this kind
    pub fn is_tracked(&self) -> bool {
        !matches!(self, ResourceKind::Image)
    }

    /// Kinds that only exist inside a parent resource
    pub fn parent(&self) -> Option<ResourceKind> {
        match self {
            ResourceKind::Subnet => Some(ResourceKind::Vpc),
            ResourceKind::NodeGroup => Some(ResourceKind::Cluster),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(ResourceKind::Image),
            "VPC" => Ok(ResourceKind::Vpc),
            "SUBNET" => Ok(ResourceKind::Subnet),
            "SG" | "SECURITYGROUP" => Ok(ResourceKind::SecurityGroup),
            "KEY" | "KEYPAIR" => Ok(ResourceKind::KeyPair),
            "VM" => Ok(ResourceKind::Vm),
            "NLB" => Ok(ResourceKind::Nlb),
            "DISK" => Ok(ResourceKind::Disk),
            "MYIMAGE" => Ok(ResourceKind::MyImage),
            "CLUSTER" => Ok(ResourceKind::Cluster),
            "NODEGROUP" => Ok(ResourceKind::NodeGroup),
            other => Err(format!("unknown resource kind: {}", other)),
        }
    }
}

/// Records and requests that carry an [`Iid`]
pub trait HasIid {
    fn iid(&self) -> &Iid;
    fn iid_mut(&mut self) -> &mut Iid;
}

/// Implements [`HasIid`] for types with an `iid` field
#[macro_export]
macro_rules! impl_has_iid {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::iid::HasIid for $ty {
                fn iid(&self) -> &$crate::iid::Iid {
                    &self.iid
                }
                fn iid_mut(&mut self) -> &mut $crate::iid::Iid {
                    &mut self.iid
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iid_serde_names() {
        let iid = Iid::new("vpc-01", "vpc-0abc");
        let json = serde_json::to_value(&iid).unwrap();
        assert_eq!(json["NameId"], "vpc-01");
        assert_eq!(json["SystemId"], "vpc-0abc");
    }

    #[test]
    fn test_by_system_id_fills_both_slots() {
        let iid = Iid::by_system_id("i-123");
        assert_eq!(iid.name_id, "i-123");
        assert_eq!(iid.system_id, "i-123");
        assert!(Iid::by_name("x").system_id.is_empty());
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("vpc".parse::<ResourceKind>().unwrap(), ResourceKind::Vpc);
        assert_eq!(" SG ".parse::<ResourceKind>().unwrap(), ResourceKind::SecurityGroup);
        assert_eq!("keypair".parse::<ResourceKind>().unwrap(), ResourceKind::KeyPair);
        assert!("bucket".parse::<ResourceKind>().is_err());

        for kind in ResourceKind::TRACKED_ROOTS {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
            assert!(kind.is_tracked());
        }
        assert!(!ResourceKind::Image.is_tracked());
        assert_eq!(ResourceKind::Subnet.parent(), Some(ResourceKind::Vpc));
    }

    #[test]
    fn test_key_value_get_ignores_case() {
        let list = vec![KeyValue::new("Region", "us-east-2")];
        assert_eq!(key_value_get(&list, "region"), Some("us-east-2"));
        assert_eq!(key_value_get(&list, "zone"), None);
    }
}
