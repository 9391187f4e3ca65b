mod common;

use cloudmux_core::{CoreError, ErrorCategory, LockKey};
use cloudmux_driver::resources::KeyPairReqInfo;
use cloudmux_driver::{DriverCapabilityInfo, HandlerKind, Iid, KeyValue, ResourceKind};
use cloudmux_driver_mock::MockDriver;
use common::*;
use std::time::Duration;

#[tokio::test]
async fn test_tag_lifecycle_on_key_pair() {
    let t = TestPlane::new("tag-lifecycle").await;
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();

    let kind = ResourceKind::KeyPair;
    t.plane
        .add_tag(&t.conn, kind, "key-01", KeyValue::new("env", "dev"))
        .await
        .unwrap();
    t.plane
        .add_tag(&t.conn, kind, " key-01 ", KeyValue::new("env", "prod"))
        .await
        .unwrap();
    t.plane
        .add_tag(&t.conn, kind, "key-01", KeyValue::new("empty", ""))
        .await
        .unwrap();

    let tags = t.plane.list_tag(&t.conn, kind, "key-01").await.unwrap();
    assert_eq!(
        tags,
        vec![KeyValue::new("env", "prod"), KeyValue::new("empty", "")]
    );
    let env = t.plane.get_tag(&t.conn, kind, "key-01", "env").await.unwrap();
    assert_eq!(env.value, "prod");
    let key = t.plane.get_key_pair(&t.conn, "key-01").await.unwrap();
    assert_eq!(key.tag_list.len(), 2);

    let err = t
        .plane
        .get_tag(&t.conn, kind, "key-01", "team")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    assert!(t.plane.remove_tag(&t.conn, kind, "key-01", "env").await.unwrap());
    assert_eq!(
        t.plane.list_tag(&t.conn, kind, "key-01").await.unwrap(),
        vec![KeyValue::new("empty", "")]
    );
}

#[tokio::test]
async fn test_tag_on_unmapped_name_makes_no_provider_call() {
    let t = TestPlane::new("tag-unmapped").await;
    let calls = t.cloud.total_calls();

    let err = t
        .plane
        .add_tag(&t.conn, ResourceKind::Vm, "vm-09", KeyValue::new("env", "dev"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    let err = t
        .plane
        .add_tag(&t.conn, ResourceKind::Vm, "vm-09", KeyValue::new(" ", "dev"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    let err = t
        .plane
        .remove_tag(&t.conn, ResourceKind::Vm, "vm-09", "")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(t.cloud.total_calls(), calls);
}

#[tokio::test]
async fn test_find_tag_carries_mapped_names() {
    let t = TestPlane::new("tag-find").await;
    t.plane
        .create_key_pair(
            &t.conn,
            KeyPairReqInfo {
                iid: Iid::by_name("key-01"),
                tag_list: vec![KeyValue::new("team", "infra")],
            },
        )
        .await
        .unwrap();
    t.cloud.seed(ResourceKind::KeyPair, "provider-name", "key-0abc");
    t.plane
        .register(&t.conn, ResourceKind::KeyPair, "key-02", "key-0abc")
        .await
        .unwrap();
    t.plane
        .add_tag(&t.conn, ResourceKind::KeyPair, "key-02", KeyValue::new("owner", "infra"))
        .await
        .unwrap();

    let mut found = t
        .plane
        .find_tag(&t.conn, ResourceKind::KeyPair, "infra")
        .await
        .unwrap();
    found.sort_by(|a, b| a.res_iid.name_id.cmp(&b.res_iid.name_id));
    let names: Vec<&str> = found.iter().map(|f| f.res_iid.name_id.as_str()).collect();
    assert_eq!(names, vec!["key-01", "key-02"]);
    assert_eq!(found[1].res_iid.system_id, "key-0abc");
    assert_eq!(found[1].tag_list, vec![KeyValue::new("owner", "infra")]);

    let team = t
        .plane
        .find_tag(&t.conn, ResourceKind::KeyPair, "team")
        .await
        .unwrap();
    assert_eq!(team.len(), 1);
    assert_eq!(team[0].res_type, ResourceKind::KeyPair);
}

#[tokio::test]
async fn test_tags_need_driver_support_for_the_kind() {
    let mut capability = DriverCapabilityInfo::all();
    capability.tag_support_resource_type = vec![ResourceKind::Vm];
    let t = TestPlane::with_driver("tag-unsupported-kind", MockDriver::with_capability(capability)).await;
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();
    let calls = t.cloud.total_calls();

    let err = t
        .plane
        .add_tag(&t.conn, ResourceKind::KeyPair, "key-01", KeyValue::new("env", "dev"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedOperation(_)));
    assert!(matches!(
        t.plane.find_tag(&t.conn, ResourceKind::KeyPair, "*").await,
        Err(CoreError::UnsupportedOperation(_))
    ));
    assert_eq!(t.cloud.total_calls(), calls);

    let mut capability = DriverCapabilityInfo::all().with(HandlerKind::Tag, false);
    capability.tag_support_resource_type = ResourceKind::TRACKED_ROOTS.to_vec();
    let t = TestPlane::with_driver("tag-no-handler", MockDriver::with_capability(capability)).await;
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();
    let err = t
        .plane
        .list_tag(&t.conn, ResourceKind::KeyPair, "key-01")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnsupportedOperation);
}

#[tokio::test]
async fn test_add_tag_waits_for_resource_lock() {
    let t = TestPlane::new("tag-lock").await;
    t.plane
        .create_key_pair(&t.conn, key_req("key-01"))
        .await
        .unwrap();

    let held = t
        .plane
        .locks()
        .acquire(LockKey::new(t.conn.as_str(), ResourceKind::KeyPair, "key-01"))
        .await;
    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        t.plane.add_tag(
            &t.conn,
            ResourceKind::KeyPair,
            "key-01",
            KeyValue::new("env", "dev"),
        ),
    )
    .await;
    assert!(blocked.is_err());
    assert_eq!(t.cloud.call_count("tag.add"), 0);
    drop(held);

    t.plane
        .add_tag(&t.conn, ResourceKind::KeyPair, "key-01", KeyValue::new("env", "dev"))
        .await
        .unwrap();
    assert_eq!(t.cloud.call_count("tag.add"), 1);
}
