use cloudmux_core::{
    CloudDriverInfo, ConnectionConfig, ControlPlane, CredentialRecord, MemoryKvStore,
    RegionRecord, StaticDriverLoader,
};
use cloudmux_driver::resources::{
    ImageType, KeyPairReqInfo, SecurityReqInfo, SecurityRuleInfo, SubnetInfo, VmReqInfo,
    VpcReqInfo,
};
use cloudmux_driver::{CloudDriver, Iid, KeyValue};
use cloudmux_driver_mock::{MOCK_NAME_KEY, MockCloud, MockDriver};
use std::sync::Arc;

pub const MOCK_LIB: &str = "cloudmux-driver-mock";
pub const DRIVER: &str = "mock-driver";
pub const PROVIDER: &str = "MOCK";

/// A control plane over a memory store with one connection to a fresh
/// mock cloud named after the test
pub struct TestPlane {
    pub plane: ControlPlane,
    pub loader: Arc<StaticDriverLoader>,
    pub cloud: Arc<MockCloud>,
    pub conn: String,
}

impl TestPlane {
    pub async fn new(test_name: &str) -> Self {
        Self::with_driver(test_name, MockDriver::new()).await
    }

    pub async fn with_driver(test_name: &str, driver: MockDriver) -> Self {
        MockCloud::reset(test_name);
        let cloud = MockCloud::named(test_name);

        let loader = Arc::new(StaticDriverLoader::new().with_driver(MOCK_LIB, move || {
            Arc::new(driver.clone()) as Arc<dyn CloudDriver>
        }));
        let plane = ControlPlane::open(Arc::new(MemoryKvStore::new()), loader.clone())
            .await
            .unwrap();

        plane
            .register_driver(CloudDriverInfo::new(DRIVER, PROVIDER, MOCK_LIB))
            .await
            .unwrap();
        let conn = format!("{}-config", test_name);
        add_connection(&plane, &conn, test_name, "mock-region-1", "mock-region-1a").await;

        Self {
            plane,
            loader,
            cloud,
            conn,
        }
    }
}

/// Registers credential, region and connection config `name` against the
/// mock cloud `cloud_name`
pub async fn add_connection(plane: &ControlPlane, name: &str, cloud_name: &str, region: &str, zone: &str) {
    let info = plane.info();
    info.register_credential(CredentialRecord {
        credential_name: format!("{}-cred", name),
        provider_name: PROVIDER.into(),
        key_value_info_list: vec![KeyValue::new(MOCK_NAME_KEY, cloud_name)],
    })
    .await
    .unwrap();
    info.register_region(RegionRecord {
        region_name: format!("{}-region", name),
        provider_name: PROVIDER.into(),
        key_value_info_list: vec![KeyValue::new("Region", region), KeyValue::new("Zone", zone)],
        available_zone_list: vec![],
    })
    .await
    .unwrap();
    info.create_connection_config(ConnectionConfig {
        config_name: name.into(),
        provider_name: PROVIDER.into(),
        driver_name: DRIVER.into(),
        credential_name: format!("{}-cred", name),
        region_name: format!("{}-region", name),
    })
    .await
    .unwrap();
}

pub fn vpc_req(name: &str, subnets: &[&str]) -> VpcReqInfo {
    VpcReqInfo {
        iid: Iid::by_name(name),
        ipv4_cidr: "10.0.0.0/16".into(),
        subnet_info_list: subnets
            .iter()
            .enumerate()
            .map(|(i, s)| SubnetInfo {
                iid: Iid::by_name(*s),
                ipv4_cidr: format!("10.0.{}.0/24", i + 1),
                ..Default::default()
            })
            .collect(),
        tag_list: vec![],
    }
}

#[allow(dead_code)]
pub fn sg_req(name: &str, vpc: &str) -> SecurityReqInfo {
    SecurityReqInfo {
        iid: Iid::by_name(name),
        vpc_iid: Iid::by_name(vpc),
        security_rules: vec![SecurityRuleInfo {
            direction: "inbound".into(),
            ip_protocol: "TCP".into(),
            from_port: "22".into(),
            to_port: "22".into(),
            cidr: "0.0.0.0/0".into(),
        }],
        tag_list: vec![],
    }
}

#[allow(dead_code)]
pub fn key_req(name: &str) -> KeyPairReqInfo {
    KeyPairReqInfo {
        iid: Iid::by_name(name),
        tag_list: vec![],
    }
}

/// VM request using public image `ubuntu-22.04` and key pair `key-01`
#[allow(dead_code)]
pub fn vm_req(name: &str, vpc: &str, subnet: &str, sgs: &[&str]) -> VmReqInfo {
    VmReqInfo {
        iid: Iid::by_name(name),
        image_type: ImageType::PublicImage,
        image_iid: Iid::by_name("ubuntu-22.04"),
        vpc_iid: Iid::by_name(vpc),
        subnet_iid: Iid::by_name(subnet),
        security_group_iids: sgs.iter().map(|s| Iid::by_name(*s)).collect(),
        vm_spec_name: "mock.small".into(),
        key_pair_iid: Some(Iid::by_name("key-01")),
        ..Default::default()
    }
}
