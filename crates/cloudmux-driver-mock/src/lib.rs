//! In-memory mock driver for cloudmux
//!
//! Implements every handler contract against an in-process fake cloud so the
//! control plane can be exercised without provider credentials.
//!
//! # Features
//!
//! - All handlers (VPC, security group, key pair, VM, disk, NLB, cluster,
//!   MyImage, tags and the read-only catalogs)
//! - Clouds are shared per `MockName` credential value
//! - Call counting, latency and one-shot failure injection for tests
//! - Built as `cdylib` too, so it can be loaded like any external driver
//!
//! # Example
//!
//! ```ignore
//! use cloudmux_driver::{CloudDriver, ConnectionInfo, CredentialInfo, KeyValue, RegionInfo};
//! use cloudmux_driver_mock::MockDriver;
//!
//! let driver = MockDriver::new();
//! let conn = driver
//!     .connect(ConnectionInfo {
//!         credential: CredentialInfo::new(vec![KeyValue::new("MockName", "dev")]),
//!         region: RegionInfo::new("mock-region-1", "mock-region-1a"),
//!     })
//!     .await?;
//! let vpcs = conn.create_vpc_handler()?.list().await?;
//! ```

pub mod cloud;
pub mod driver;
pub mod handlers;

pub use cloud::MockCloud;
pub use driver::{MOCK_NAME_KEY, MockConnection, MockDriver};

cloudmux_driver::declare_driver!(MockDriver::new());

#[cfg(test)]
mod tests {
    use super::*;
    use cloudmux_driver::resources::{
        DiskHandler, DiskReqInfo, DiskStatus, ImageType, ResourceHandler, SubnetInfo, VmHandler,
        VmReqInfo, VmStatus, VpcReqInfo,
    };
    use cloudmux_driver::{
        CloudConnection, CloudDriver, ConnectionInfo, CredentialInfo, DriverCapabilityInfo,
        DriverError, HandlerKind, Iid, KeyValue, RegionInfo, ResourceKind,
    };

    async fn connect(name: &str) -> Box<dyn CloudConnection> {
        MockCloud::reset(name);
        MockDriver::new()
            .connect(ConnectionInfo {
                credential: CredentialInfo::new(vec![KeyValue::new(MOCK_NAME_KEY, name)]),
                region: RegionInfo::new("mock-region-1", "mock-region-1a"),
            })
            .await
            .unwrap()
    }

    fn vpc_req(name: &str) -> VpcReqInfo {
        VpcReqInfo {
            iid: Iid::by_name(name),
            ipv4_cidr: "10.0.0.0/16".into(),
            subnet_info_list: vec![SubnetInfo {
                iid: Iid::by_name(format!("{}-subnet", name)),
                ipv4_cidr: "10.0.1.0/24".into(),
                ..Default::default()
            }],
            tag_list: vec![],
        }
    }

    #[tokio::test]
    async fn test_entry_symbol_builds_driver() {
        let driver = cloudmux_driver_entry();
        assert!(driver.capability().supports(HandlerKind::Vm));
        assert_eq!(CLOUDMUX_DRIVER_ABI, cloudmux_driver::DRIVER_ABI_VERSION);
    }

    #[tokio::test]
    async fn test_connect_requires_mock_name() {
        let result = MockDriver::new().connect(ConnectionInfo::default()).await;
        assert!(matches!(result, Err(DriverError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_vpc_lifecycle() {
        let conn = connect("lib-test-vpc").await;
        let handler = conn.create_vpc_handler().unwrap();

        let vpc = handler.create(vpc_req("vpc-01")).await.unwrap();
        assert_eq!(vpc.iid.name_id, "vpc-01");
        assert!(vpc.iid.system_id.starts_with("vpc-"));
        assert_eq!(vpc.subnet_info_list[0].zone, "mock-region-1a");

        let again = handler.create(vpc_req("vpc-01")).await;
        assert!(matches!(again, Err(DriverError::AlreadyExists(_))));

        let fetched = handler.get(&vpc.iid).await.unwrap();
        assert_eq!(fetched.iid, vpc.iid);
        assert_eq!(handler.list_iid().await.unwrap(), vec![vpc.iid.clone()]);

        assert!(handler.delete(&vpc.iid).await.unwrap());
        assert!(handler.get(&vpc.iid).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_vm_state_transitions() {
        let conn = connect("lib-test-vm").await;
        let vpc = conn
            .create_vpc_handler()
            .unwrap()
            .create(vpc_req("vpc-01"))
            .await
            .unwrap();

        let vms = conn.create_vm_handler().unwrap();
        let vm = vms
            .create(VmReqInfo {
                iid: Iid::by_name("vm-01"),
                image_type: ImageType::PublicImage,
                image_iid: Iid::by_name("ubuntu-22.04"),
                vpc_iid: vpc.iid.clone(),
                subnet_iid: vpc.subnet_info_list[0].iid.clone(),
                vm_spec_name: "mock.small".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(vms.get_status(&vm.iid).await.unwrap(), VmStatus::Running);
        assert_eq!(vms.suspend(&vm.iid).await.unwrap(), VmStatus::Suspending);
        assert_eq!(vms.get_status(&vm.iid).await.unwrap(), VmStatus::Suspended);
        assert!(vms.reboot(&vm.iid).await.is_err());
        assert_eq!(vms.resume(&vm.iid).await.unwrap(), VmStatus::Resuming);
        assert_eq!(vms.terminate(&vm.iid).await.unwrap(), VmStatus::Terminating);
        assert!(vms.list_status().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disk_attach_detach() {
        let conn = connect("lib-test-disk").await;
        let cloud = MockCloud::named("lib-test-disk");
        cloud.seed(ResourceKind::Vm, "vm-01", "i-001");

        let disks = conn.create_disk_handler().unwrap();
        let disk = disks
            .create(DiskReqInfo {
                iid: Iid::by_name("disk-01"),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(disk.status, DiskStatus::Available);
        assert_eq!(disk.zone, "mock-region-1a");

        let vm = Iid::new("vm-01", "i-001");
        assert_eq!(disks.attach(&disk.iid, &vm).await.unwrap(), DiskStatus::Attaching);
        assert!(disks.delete(&disk.iid).await.is_err());
        assert_eq!(disks.detach(&disk.iid, &vm).await.unwrap(), DiskStatus::Detaching);
        assert!(disks.change_size(&disk.iid, "50").await.is_err());
        disks.change_size(&disk.iid, "200").await.unwrap();
        assert!(disks.delete(&disk.iid).await.unwrap());
    }

    #[tokio::test]
    async fn test_capability_and_close() {
        let driver = MockDriver::with_capability(
            DriverCapabilityInfo::all().with(HandlerKind::Nlb, false),
        );
        let conn = driver
            .connect(ConnectionInfo {
                credential: CredentialInfo::new(vec![KeyValue::new(MOCK_NAME_KEY, "lib-test-cap")]),
                region: RegionInfo::new("mock-region-1", "mock-region-1a"),
            })
            .await
            .unwrap();

        assert!(matches!(conn.create_nlb_handler(), Err(DriverError::Unsupported(_))));
        assert!(conn.create_vm_handler().is_ok());

        conn.close().unwrap();
        conn.close().unwrap();
        assert!(!conn.is_connected());
        assert!(matches!(conn.create_vm_handler(), Err(DriverError::Disconnected)));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let conn = connect("lib-test-fail").await;
        let cloud = MockCloud::named("lib-test-fail");
        cloud.fail_next("key.create");

        let keys = conn.create_key_pair_handler().unwrap();
        let req = cloudmux_driver::resources::KeyPairReqInfo {
            iid: Iid::by_name("key-01"),
            tag_list: vec![],
        };
        assert!(matches!(keys.create(req.clone()).await, Err(DriverError::Provider(_))));
        let key = keys.create(req).await.unwrap();
        assert!(!key.private_key.is_empty());
        assert!(keys.get(&key.iid).await.unwrap().private_key.is_empty());
        assert_eq!(cloud.call_count("key.create"), 2);
    }

    #[tokio::test]
    async fn test_tags_live_on_the_resource() {
        let conn = connect("lib-test-tag").await;
        let cloud = MockCloud::named("lib-test-tag");
        cloud.seed(ResourceKind::Vm, "vm-01", "i-001");
        cloud.seed(ResourceKind::Vm, "vm-02", "i-002");
        let vm = Iid::new("vm-01", "i-001");

        let tags = conn.create_tag_handler().unwrap();
        tags.add_tag(ResourceKind::Vm, &vm, KeyValue::new("env", "dev")).await.unwrap();
        tags.add_tag(ResourceKind::Vm, &vm, KeyValue::new("env", "prod")).await.unwrap();
        tags.add_tag(ResourceKind::Vm, &Iid::new("", "i-002"), KeyValue::new("team", "prod"))
            .await
            .unwrap();

        assert_eq!(
            tags.list_tag(ResourceKind::Vm, &vm).await.unwrap(),
            vec![KeyValue::new("env", "prod")]
        );
        let vm_info = conn.create_vm_handler().unwrap().get(&vm).await.unwrap();
        assert_eq!(vm_info.tag_list, vec![KeyValue::new("env", "prod")]);

        let found = tags.find_tag(ResourceKind::Vm, "prod").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(tags.find_tag(ResourceKind::Vm, "env").await.unwrap().len(), 1);
        assert!(tags.find_tag(ResourceKind::Subnet, "*").await.is_err());

        assert!(tags.get_tag(ResourceKind::Vm, &vm, "team").await.unwrap_err().is_not_found());
        assert!(tags.remove_tag(ResourceKind::Vm, &vm, "env").await.unwrap());
        assert!(tags.remove_tag(ResourceKind::Vm, &vm, "env").await.is_err());
        assert!(tags.list_tag(ResourceKind::Vm, &Iid::by_name("vm-09")).await.is_err());
        assert_eq!(cloud.call_count("tag.add"), 3);
    }
}
