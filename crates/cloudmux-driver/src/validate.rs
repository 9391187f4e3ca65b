//! Required-field validation for inbound requests
//!
//! Request types describe their fields to a [`Walker`] by implementing
//! [`Validate`]. [`validate_required`] walks the whole payload, trims every
//! string in place and collects all empty required fields as
//! `TypeName:FieldName`.

use crate::iid::{KeyValue, key_value_get};
use thiserror::Error;

/// A request payload whose required fields can be checked
pub trait Validate {
    /// Name used to qualify field names in reports and exclusions
    const TYPE_NAME: &'static str;

    fn walk(&mut self, w: &mut Walker<'_>);
}

/// Aggregate of every missing required field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("required fields are empty: {}", .missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<String>,
}

impl ValidationError {
    pub fn contains(&self, qualified: &str) -> bool {
        self.missing.iter().any(|m| m == qualified)
    }
}

/// Field visitor handed to [`Validate::walk`]
pub struct Walker<'a> {
    exclusions: &'a [&'a str],
    scope: Vec<&'static str>,
    missing: Vec<String>,
}

impl<'a> Walker<'a> {
    fn new(exclusions: &'a [&'a str]) -> Self {
        Self {
            exclusions,
            scope: Vec::new(),
            missing: Vec::new(),
        }
    }

    fn qualified(&self, field: &str) -> String {
        format!("{}:{}", self.scope.last().copied().unwrap_or_default(), field)
    }

    fn excluded(&self, qualified: &str) -> bool {
        self.exclusions.iter().any(|e| e.trim() == qualified)
    }

    fn report(&mut self, qualified: String) {
        if !self.missing.contains(&qualified) {
            self.missing.push(qualified);
        }
    }

    fn enter<T: Validate>(&mut self, value: &mut T) {
        self.scope.push(T::TYPE_NAME);
        value.walk(self);
        self.scope.pop();
    }

    /// Required string: trimmed in place, reported when empty
    pub fn string(&mut self, field: &str, value: &mut String) {
        trim_in_place(value);
        let qualified = self.qualified(field);
        if value.is_empty() && !self.excluded(&qualified) {
            self.report(qualified);
        }
    }

    /// Optional string: trimmed, never reported
    pub fn optional_string(&mut self, value: &mut Option<String>) {
        if let Some(v) = value {
            trim_in_place(v);
        }
    }

    /// Required list of strings; reported once if any element is blank
    pub fn strings(&mut self, field: &str, values: &mut [String]) {
        let mut blank = false;
        for v in values.iter_mut() {
            trim_in_place(v);
            blank |= v.is_empty();
        }
        let qualified = self.qualified(field);
        if blank && !self.excluded(&qualified) {
            self.report(qualified);
        }
    }

    /// Embedded composite field
    pub fn nested<T: Validate>(&mut self, field: &str, value: &mut T) {
        if self.excluded(&self.qualified(field)) {
            return;
        }
        self.enter(value);
    }

    /// Reference to another record. An absent reference is reported once
    /// under the parent and is not recursed into.
    pub fn optional<T: Validate>(&mut self, field: &str, value: &mut Option<T>) {
        let qualified = self.qualified(field);
        if self.excluded(&qualified) {
            return;
        }
        match value {
            Some(v) => self.enter(v),
            None => self.report(qualified),
        }
    }

    /// List of composite records; each element is walked
    pub fn list<T: Validate>(&mut self, field: &str, values: &mut [T]) {
        if self.excluded(&self.qualified(field)) {
            return;
        }
        for v in values.iter_mut() {
            self.enter(v);
        }
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Checks every required field of `value`, skipping `exclusions`
/// (`TypeName:FieldName`). Trimmed strings are left in `value`.
pub fn validate_required<T: Validate>(
    value: &mut T,
    exclusions: &[&str],
) -> std::result::Result<(), ValidationError> {
    let mut walker = Walker::new(exclusions);
    walker.enter(value);
    if walker.missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            missing: walker.missing,
        })
    }
}

/// Checks that every key in `required` is present with a non-blank value
pub fn check_keys(
    type_name: &str,
    bag: &[KeyValue],
    required: &[&str],
) -> std::result::Result<(), ValidationError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|key| {
            key_value_get(bag, key)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|key| format!("{}:{}", type_name, key))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iid::Iid;

    struct Subnet {
        iid: Iid,
        cidr: String,
    }

    impl Validate for Subnet {
        const TYPE_NAME: &'static str = "SubnetInfo";

        fn walk(&mut self, w: &mut Walker<'_>) {
            w.nested("IId", &mut self.iid);
            w.string("IPv4_CIDR", &mut self.cidr);
        }
    }

    struct Network {
        iid: Iid,
        cidr: String,
        description: Option<String>,
        subnets: Vec<Subnet>,
        owner: Option<Iid>,
    }

    impl Validate for Network {
        const TYPE_NAME: &'static str = "VPCReqInfo";

        fn walk(&mut self, w: &mut Walker<'_>) {
            w.nested("IId", &mut self.iid);
            w.string("IPv4_CIDR", &mut self.cidr);
            w.optional_string(&mut self.description);
            w.list("SubnetInfoList", &mut self.subnets);
            w.optional("OwnerIID", &mut self.owner);
        }
    }

    fn complete() -> Network {
        Network {
            iid: Iid::new("vpc-01", "vpc-0abc"),
            cidr: "10.0.0.0/16".into(),
            description: None,
            subnets: vec![Subnet {
                iid: Iid::new("subnet-01", "subnet-0abc"),
                cidr: "10.0.1.0/24".into(),
            }],
            owner: Some(Iid::new("owner", "owner-id")),
        }
    }

    #[test]
    fn test_complete_record_passes() {
        let mut req = complete();
        assert!(validate_required(&mut req, &[]).is_ok());
    }

    #[test]
    fn test_nested_blank_field_is_named() {
        let mut req = complete();
        req.subnets[0].cidr = "   ".into();

        let err = validate_required(&mut req, &[]).unwrap_err();
        assert_eq!(err.missing, vec!["SubnetInfo:IPv4_CIDR".to_string()]);
    }

    #[test]
    fn test_exclusion_removes_error() {
        let mut req = complete();
        req.subnets[0].cidr = String::new();

        assert!(validate_required(&mut req, &["SubnetInfo:IPv4_CIDR"]).is_ok());
    }

    #[test]
    fn test_reports_every_missing_field() {
        let mut req = complete();
        req.iid.system_id = String::new();
        req.cidr = String::new();
        req.subnets[0].iid.system_id = String::new();

        let err = validate_required(&mut req, &[]).unwrap_err();
        // IID:SystemId is reported once even though two IIDs are blank
        assert_eq!(
            err.missing,
            vec!["IID:SystemId".to_string(), "VPCReqInfo:IPv4_CIDR".to_string()]
        );

        let err = validate_required(&mut req, &["IID:SystemId"]).unwrap_err();
        assert_eq!(err.missing, vec!["VPCReqInfo:IPv4_CIDR".to_string()]);
    }

    #[test]
    fn test_trimmed_values_are_returned() {
        let mut req = complete();
        req.iid.name_id = "  vpc-01\t".into();
        req.description = Some(" test ".into());

        validate_required(&mut req, &[]).unwrap();
        assert_eq!(req.iid.name_id, "vpc-01");
        assert_eq!(req.description.as_deref(), Some("test"));
    }

    #[test]
    fn test_absent_reference_reported_once_at_parent() {
        let mut req = complete();
        req.owner = None;

        let err = validate_required(&mut req, &[]).unwrap_err();
        assert_eq!(err.missing, vec!["VPCReqInfo:OwnerIID".to_string()]);
        assert!(!err.contains("IID:NameId"));

        assert!(validate_required(&mut req, &["VPCReqInfo:OwnerIID"]).is_ok());
    }

    #[test]
    fn test_check_keys() {
        let bag = vec![
            KeyValue::new("ClientId", "abc"),
            KeyValue::new("ClientSecret", "  "),
        ];
        let err = check_keys("CredentialInfo", &bag, &["clientid", "ClientSecret", "TenantId"])
            .unwrap_err();
        assert_eq!(
            err.missing,
            vec![
                "CredentialInfo:ClientSecret".to_string(),
                "CredentialInfo:TenantId".to_string()
            ]
        );
        assert!(check_keys("CredentialInfo", &bag, &["ClientId"]).is_ok());
    }
}
