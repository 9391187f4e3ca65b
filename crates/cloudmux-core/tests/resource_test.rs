mod common;

use async_trait::async_trait;
use cloudmux_core::{
    CloudDriverInfo, ConnectionConfig, ControlPlane, CoreError, CredentialRecord, ErrorCategory,
    KvStore, MemoryKvStore, RegionRecord, Result, StaticDriverLoader, VmAction,
};
use cloudmux_driver::resources::{
    ClusterReqInfo, DiskReqInfo, DiskStatus, NetworkInfo, NodeGroupInfo, SubnetInfo, VmStatus,
};
use cloudmux_driver::{
    CloudDriver, DriverCapabilityInfo, HandlerKind, Iid, KeyValue, ResourceKind,
};
use cloudmux_driver_mock::{MockCloud, MockDriver};
use common::*;
use futures_util::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_create_get_list_vpc() {
    let t = TestPlane::new("res-vpc-basic").await;

    let vpc = t
        .plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a", "subnet-b"]))
        .await
        .unwrap();
    assert_eq!(vpc.iid.name_id, "vpc-01");
    assert!(!vpc.iid.system_id.is_empty());

    let fetched = t.plane.get_vpc(&t.conn, "vpc-01").await.unwrap();
    assert_eq!(fetched.iid, vpc.iid);
    let subnets: Vec<&str> = fetched
        .subnet_info_list
        .iter()
        .map(|s| s.iid.name_id.as_str())
        .collect();
    assert_eq!(subnets, vec!["subnet-a", "subnet-b"]);

    let record = t
        .plane
        .iids()
        .require(&t.conn, ResourceKind::Subnet, "subnet-a")
        .await
        .unwrap();
    assert_eq!(record.zone.as_deref(), Some("mock-region-1a"));

    let all = t.plane.list_vpcs(&t.conn).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].iid.name_id, "vpc-01");
}

#[tokio::test]
async fn test_create_conflict_makes_no_provider_call() {
    let t = TestPlane::new("res-conflict").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();

    let calls = t.cloud.total_calls();
    let err = t
        .plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-z"]))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);
    assert_eq!(t.cloud.total_calls(), calls);
}

#[tokio::test]
async fn test_subnet_name_reuse_is_a_conflict() {
    let t = TestPlane::new("res-subnet-conflict").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();

    let err = t
        .plane
        .create_vpc(&t.conn, vpc_req("vpc-02", &["subnet-a"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    assert_eq!(t.cloud.count(ResourceKind::Vpc), 1);
}

#[tokio::test]
async fn test_concurrent_creates_yield_one_success() {
    let t = TestPlane::new("res-concurrent").await;
    t.cloud.set_latency(Duration::from_millis(20));

    let results = join_all((0..8).map(|_| t.plane.create_key_pair(&t.conn, key_req("key-01")))).await;

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(CoreError::Conflict(_))))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(t.cloud.call_count("key.create"), 1);
    assert!(t.plane.locks().is_empty());
}

#[tokio::test]
async fn test_validation_excludes_system_id() {
    let t = TestPlane::new("res-validation").await;

    let mut req = vpc_req("vpc-01", &["subnet-a"]);
    req.ipv4_cidr = "  ".into();
    req.subnet_info_list[0].iid.name_id = String::new();

    let err = t.plane.create_vpc(&t.conn, req).await.unwrap_err();
    match err {
        CoreError::Validation(v) => {
            assert!(v.contains("VPCReqInfo:IPv4_CIDR"));
            assert!(v.contains("IID:NameId"));
            assert!(!v.contains("IID:SystemId"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(t.cloud.total_calls(), 0);
}

#[tokio::test]
async fn test_provider_failure_leaves_no_mapping() {
    let t = TestPlane::new("res-provider-fail").await;
    t.cloud.fail_next("vpc.create");

    let err = t
        .plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Provider);
    assert!(err.is_retryable());
    assert!(!t.plane.iids().exists(&t.conn, ResourceKind::Vpc, "vpc-01").await.unwrap());
    assert!(
        !t.plane
            .iids()
            .exists(&t.conn, ResourceKind::Subnet, "subnet-a")
            .await
            .unwrap()
    );

    // The name is free again
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();
}

/// Memory store whose mapping writes can be switched off
struct FlakyStore {
    inner: MemoryKvStore,
    fail_iid_writes: AtomicBool,
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        if key.starts_with("/iid/") && self.fail_iid_writes.load(Ordering::SeqCst) {
            return Err(CoreError::Store("disk full".into()));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        self.inner.list(prefix).await
    }
}

#[tokio::test]
async fn test_failed_mapping_write_rolls_back_provider_resource() {
    let name = "res-rollback";
    MockCloud::reset(name);
    let cloud = MockCloud::named(name);

    let store = Arc::new(FlakyStore {
        inner: MemoryKvStore::new(),
        fail_iid_writes: AtomicBool::new(true),
    });
    let loader = Arc::new(
        StaticDriverLoader::new()
            .with_driver(MOCK_LIB, || Arc::new(MockDriver::new()) as Arc<dyn CloudDriver>),
    );
    let plane = ControlPlane::open(store.clone(), loader).await.unwrap();
    plane
        .register_driver(CloudDriverInfo::new(DRIVER, PROVIDER, MOCK_LIB))
        .await
        .unwrap();
    add_connection(&plane, "rollback-config", name, "mock-region-1", "mock-region-1a").await;

    let err = plane
        .create_key_pair("rollback-config", key_req("key-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Store(_)));
    assert_eq!(cloud.call_count("key.create"), 1);
    assert_eq!(cloud.call_count("key.delete"), 1);
    assert_eq!(cloud.count(ResourceKind::KeyPair), 0);

    store.fail_iid_writes.store(false, Ordering::SeqCst);
    plane
        .create_key_pair("rollback-config", key_req("key-01"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_keeps_mapping_on_provider_error_unless_forced() {
    let t = TestPlane::new("res-force-delete").await;
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();

    t.cloud.fail_next("key.delete");
    let err = t
        .plane
        .delete_key_pair(&t.conn, "key-01", false)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Provider);
    assert!(t.plane.iids().exists(&t.conn, ResourceKind::KeyPair, "key-01").await.unwrap());

    t.cloud.fail_next("key.delete");
    assert!(t.plane.delete_key_pair(&t.conn, "key-01", true).await.unwrap());
    assert!(!t.plane.iids().exists(&t.conn, ResourceKind::KeyPair, "key-01").await.unwrap());

    let err = t
        .plane
        .delete_key_pair(&t.conn, "key-01", false)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_unsupported_handler() {
    let driver = MockDriver::with_capability(DriverCapabilityInfo::all().with(HandlerKind::Nlb, false));
    let t = TestPlane::with_driver("res-unsupported", driver).await;

    let err = t.plane.list_nlbs(&t.conn).await.unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedOperation(_)));
    let err = t
        .plane
        .all_resource_list(&t.conn, ResourceKind::Nlb)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedOperation(_)));
    assert_eq!(t.cloud.total_calls(), 0);
}

#[tokio::test]
async fn test_single_vpc_driver() {
    let mut capability = DriverCapabilityInfo::all();
    capability.single_vpc = true;
    let t = TestPlane::with_driver("res-single-vpc", MockDriver::with_capability(capability)).await;

    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();
    let err = t
        .plane
        .create_vpc(&t.conn, vpc_req("vpc-02", &["subnet-b"]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    assert_eq!(t.cloud.count(ResourceKind::Vpc), 1);
}

#[tokio::test]
async fn test_vpc_delete_checks_dependents() {
    let t = TestPlane::new("res-vpc-deps").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();
    t.plane
        .create_security_group(&t.conn, sg_req("sg-01", "vpc-01"))
        .await
        .unwrap();

    let err = t.plane.delete_vpc(&t.conn, "vpc-01", false).await.unwrap_err();
    assert!(matches!(err, CoreError::Dependency(_)));

    assert!(t.plane.delete_security_group(&t.conn, "sg-01", false).await.unwrap());
    assert!(t.plane.remove_subnet(&t.conn, "vpc-01", "subnet-a", false).await.unwrap());
    assert!(t.plane.delete_vpc(&t.conn, "vpc-01", false).await.unwrap());
    assert_eq!(t.cloud.count(ResourceKind::Vpc), 0);
}

#[tokio::test]
async fn test_add_subnet() {
    let t = TestPlane::new("res-add-subnet").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();

    let vpc = t
        .plane
        .add_subnet(
            &t.conn,
            "vpc-01",
            SubnetInfo {
                iid: Iid::by_name("subnet-b"),
                ipv4_cidr: "10.0.9.0/24".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(vpc.subnet_info_list.len(), 2);
    assert!(vpc.subnet_info_list.iter().any(|s| s.iid.name_id == "subnet-b"));

    let err = t
        .plane
        .remove_subnet(&t.conn, "vpc-01", "subnet-x", false)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_vm_lifecycle() {
    let t = TestPlane::new("res-vm").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();
    t.plane
        .create_security_group(&t.conn, sg_req("sg-01", "vpc-01"))
        .await
        .unwrap();
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();

    let vm = t
        .plane
        .start_vm(&t.conn, vm_req("vm-01", "vpc-01", "subnet-a", &["sg-01"]))
        .await
        .unwrap();
    assert_eq!(vm.iid.name_id, "vm-01");
    assert_eq!(vm.vpc_iid.name_id, "vpc-01");
    assert_eq!(vm.subnet_iid.name_id, "subnet-a");
    assert_eq!(vm.security_group_iids[0].name_id, "sg-01");
    assert_eq!(vm.key_pair_iid.as_ref().map(|k| k.name_id.as_str()), Some("key-01"));

    let status = t
        .plane
        .control_vm(&t.conn, "vm-01", VmAction::Suspend)
        .await
        .unwrap();
    assert_eq!(status, VmStatus::Suspending);
    assert_eq!(
        t.plane.get_vm_status(&t.conn, "vm-01").await.unwrap(),
        VmStatus::Suspended
    );

    let statuses = t.plane.list_vm_status(&t.conn).await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].iid.name_id, "vm-01");

    let status = t.plane.terminate_vm(&t.conn, "vm-01", false).await.unwrap();
    assert_eq!(status, VmStatus::Terminating);
    assert!(!t.plane.iids().exists(&t.conn, ResourceKind::Vm, "vm-01").await.unwrap());
}

#[tokio::test]
async fn test_vm_subnet_must_belong_to_vpc() {
    let t = TestPlane::new("res-vm-subnet").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-02", &["subnet-b"]))
        .await
        .unwrap();

    let calls = t.cloud.call_count("vm.create");
    let err = t
        .plane
        .start_vm(&t.conn, vm_req("vm-01", "vpc-01", "subnet-b", &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Configuration(_)));
    assert_eq!(t.cloud.call_count("vm.create"), calls);
}

#[tokio::test]
async fn test_disk_attach_and_detach() {
    let t = TestPlane::new("res-disk").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();
    t.plane
        .start_vm(&t.conn, vm_req("vm-01", "vpc-01", "subnet-a", &[]))
        .await
        .unwrap();

    let disk = t
        .plane
        .create_disk(
            &t.conn,
            DiskReqInfo {
                iid: Iid::by_name("disk-01"),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(disk.zone, "mock-region-1a");
    let record = t
        .plane
        .iids()
        .require(&t.conn, ResourceKind::Disk, "disk-01")
        .await
        .unwrap();
    assert_eq!(record.zone.as_deref(), Some("mock-region-1a"));

    let status = t.plane.attach_disk(&t.conn, "disk-01", "vm-01").await.unwrap();
    assert_eq!(status, DiskStatus::Attaching);
    let disk = t.plane.get_disk(&t.conn, "disk-01").await.unwrap();
    assert_eq!(disk.owner_vm.name_id, "vm-01");

    // The provider refuses to delete an attached disk; the mapping stays
    assert!(t.plane.delete_disk(&t.conn, "disk-01", false).await.is_err());
    assert!(t.plane.iids().exists(&t.conn, ResourceKind::Disk, "disk-01").await.unwrap());

    t.plane.detach_disk(&t.conn, "disk-01", "vm-01").await.unwrap();
    t.plane.change_disk_size(&t.conn, "disk-01", "200").await.unwrap();
    assert!(t.plane.delete_disk(&t.conn, "disk-01", false).await.unwrap());
}

#[tokio::test]
async fn test_cluster_node_groups() {
    let t = TestPlane::new("res-cluster").await;
    t.plane
        .create_vpc(&t.conn, vpc_req("vpc-01", &["subnet-a"]))
        .await
        .unwrap();
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();

    let group = |name: &str| NodeGroupInfo {
        iid: Iid::by_name(name),
        vm_spec_name: "mock.medium".into(),
        key_pair_iid: Iid::by_name("key-01"),
        desired_node_size: 2,
        min_node_size: 1,
        max_node_size: 3,
        ..Default::default()
    };

    let cluster = t
        .plane
        .create_cluster(
            &t.conn,
            ClusterReqInfo {
                iid: Iid::by_name("cls-01"),
                version: String::new(),
                network: NetworkInfo {
                    vpc_iid: Iid::by_name("vpc-01"),
                    subnet_iids: vec![Iid::by_name("subnet-a")],
                    ..Default::default()
                },
                node_group_list: vec![group("ng-01")],
                tag_list: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(cluster.iid.name_id, "cls-01");
    assert_eq!(cluster.network.vpc_iid.name_id, "vpc-01");
    assert_eq!(cluster.node_group_list[0].iid.name_id, "ng-01");
    assert_eq!(cluster.node_group_list[0].key_pair_iid.name_id, "key-01");

    t.plane
        .add_node_group(&t.conn, "cls-01", group("ng-02"))
        .await
        .unwrap();
    let scaled = t
        .plane
        .change_node_group_scaling(&t.conn, "cls-01", "ng-02", 3, 1, 5)
        .await
        .unwrap();
    assert_eq!(scaled.desired_node_size, 3);
    assert_eq!(scaled.iid.name_id, "ng-02");

    let err = t.plane.delete_cluster(&t.conn, "cls-01", false).await.unwrap_err();
    assert!(matches!(err, CoreError::Dependency(_)));

    for ng in ["ng-01", "ng-02"] {
        assert!(t.plane.remove_node_group(&t.conn, "cls-01", ng, false).await.unwrap());
    }
    let upgraded = t.plane.upgrade_cluster(&t.conn, "cls-01", "1.31").await.unwrap();
    assert_eq!(upgraded.version, "1.31");
    assert!(t.plane.delete_cluster(&t.conn, "cls-01", false).await.unwrap());
}

#[tokio::test]
async fn test_register_rejects_duplicate_system_id() {
    let t = TestPlane::new("res-register").await;
    t.cloud.seed(ResourceKind::Vpc, "vpc-0abc", "vpc-0abc");

    let iid = t
        .plane
        .register(&t.conn, ResourceKind::Vpc, "vpc-01", "vpc-0abc")
        .await
        .unwrap();
    assert_eq!(iid, Iid::new("vpc-01", "vpc-0abc"));

    let err = t
        .plane
        .register(&t.conn, ResourceKind::Vpc, "vpc-02", "vpc-0abc")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let err = t
        .plane
        .register(&t.conn, ResourceKind::Vpc, "vpc-03", "vpc-0missing")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    assert!(t.plane.unregister(&t.conn, ResourceKind::Vpc, "vpc-01").await.unwrap());
    assert_eq!(t.cloud.count(ResourceKind::Vpc), 1);
}

#[tokio::test]
async fn test_connection_config_with_mappings_cannot_be_deleted() {
    let t = TestPlane::new("res-config-delete").await;
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();

    let err = t.plane.delete_connection_config(&t.conn).await.unwrap_err();
    assert!(matches!(err, CoreError::Dependency(_)));

    t.plane.delete_key_pair(&t.conn, "key-01", false).await.unwrap();
    t.plane.delete_connection_config(&t.conn).await.unwrap();
    let err = t.plane.connect(&t.conn).await.unwrap_err();
    assert!(matches!(err, CoreError::Configuration(_)));
}

#[tokio::test]
async fn test_connection_config_delete_waits_for_inflight_create() {
    let t = TestPlane::new("res-config-race").await;
    t.cloud.set_latency(Duration::from_millis(200));

    let create = t.plane.create_key_pair(&t.conn, key_req("key-01"));
    let delete = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        t.plane.delete_connection_config(&t.conn).await
    };
    let (created, deleted) = tokio::join!(create, delete);

    created.unwrap();
    assert!(matches!(deleted.unwrap_err(), CoreError::Dependency(_)));
    assert!(t.plane.info().get_connection_config(&t.conn).await.is_ok());
    assert_eq!(t.plane.iids().count_for_connection(&t.conn).await.unwrap(), 1);
    assert_eq!(t.cloud.count(ResourceKind::KeyPair), 1);
}

#[tokio::test]
async fn test_connect_requires_credential_and_region_keys() {
    let t = TestPlane::new("res-connect-keys").await;
    let info = t.plane.info();
    info.register_credential(CredentialRecord {
        credential_name: "nameless-cred".into(),
        provider_name: PROVIDER.into(),
        key_value_info_list: vec![KeyValue::new("Secret", "hunter2")],
    })
    .await
    .unwrap();
    info.register_region(RegionRecord {
        region_name: "zone-only".into(),
        provider_name: PROVIDER.into(),
        key_value_info_list: vec![KeyValue::new("Zone", "mock-region-1a")],
        available_zone_list: vec![],
    })
    .await
    .unwrap();
    for (config, credential, region) in [
        ("bad-cred-config", "nameless-cred".to_string(), format!("{}-region", t.conn)),
        ("bad-region-config", format!("{}-cred", t.conn), "zone-only".to_string()),
    ] {
        info.create_connection_config(ConnectionConfig {
            config_name: config.into(),
            provider_name: PROVIDER.into(),
            driver_name: DRIVER.into(),
            credential_name: credential,
            region_name: region,
        })
        .await
        .unwrap();
    }

    match t.plane.connect("bad-cred-config").await.unwrap_err() {
        CoreError::Configuration(msg) => assert!(msg.contains("CredentialInfo:MockName"), "{}", msg),
        other => panic!("expected configuration error, got {:?}", other),
    }
    match t.plane.connect("bad-region-config").await.unwrap_err() {
        CoreError::Configuration(msg) => assert!(msg.contains("RegionInfo:Region"), "{}", msg),
        other => panic!("expected configuration error, got {:?}", other),
    }

    let err = t
        .plane
        .create_key_pair("bad-cred-config", key_req("key-01"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(!err.is_retryable());
    assert_eq!(t.cloud.total_calls(), 0);
}

#[tokio::test]
async fn test_connection_close_is_idempotent() {
    let t = TestPlane::new("res-close").await;

    let conn = t.plane.connect(&t.conn).await.unwrap();
    assert!(conn.is_connected());
    conn.close().unwrap();
    conn.close().unwrap();
    assert!(!conn.is_connected());
    drop(conn);
    assert_eq!(t.cloud.close_count(), 1);

    // Dropping an open connection closes it once
    let conn = t.plane.connect(&t.conn).await.unwrap();
    drop(conn);
    assert_eq!(t.cloud.close_count(), 2);
}

#[tokio::test]
async fn test_registry_returns_one_instance() {
    let t = TestPlane::new("res-registry").await;

    let first = t.plane.registry().resolve("mock", DRIVER).unwrap();
    let second = t.plane.registry().resolve(PROVIDER, DRIVER).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(t.loader.load_count(), 1);

    let before = t.plane.registry().registered();
    let err = t.plane.registry().resolve("AWS", "aws-driver").err().unwrap();
    assert!(matches!(err, CoreError::DriverNotFound { .. }));
    assert_eq!(t.plane.registry().registered(), before);
}

#[tokio::test]
async fn test_catalog_reads() {
    let t = TestPlane::new("res-catalog").await;

    let images = t.plane.list_images(&t.conn).await.unwrap();
    assert!(images.iter().any(|i| i.iid.name_id == "ubuntu-22.04"));
    assert!(t.plane.is_windows_image(&t.conn, "windows-2022").await.unwrap());

    let spec = t.plane.get_vm_spec(&t.conn, "mock.small").await.unwrap();
    assert_eq!(spec.region, "mock-region-1");
    let err = t.plane.get_vm_spec(&t.conn, "mock.huge").await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    let zones = t.plane.get_region_zone(&t.conn, "mock-region-1").await.unwrap();
    assert_eq!(zones.zone_list.len(), 3);
}
