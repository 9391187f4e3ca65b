//! Tags on mapped resources
//!
//! Resources are addressed by NameId and resolved through the mapping.
//! Adding and removing hold the resource's lock, so a tag change cannot
//! interleave with the resource's delete.

use super::{call, name_refs};
use crate::ControlPlane;
use crate::connection::Connection;
use crate::error::{CoreError, Result};
use crate::iid::IidRecord;
use cloudmux_driver::resources::TagInfo;
use cloudmux_driver::{KeyValue, ResourceKind, ValidationError, validate_required};

const TAG: &str = "TAG";

fn check_taggable(conn: &Connection, kind: ResourceKind) -> Result<()> {
    if conn.capability().supports_tags_on(kind) {
        Ok(())
    } else {
        Err(CoreError::UnsupportedOperation(format!(
            "{} driver for {} does not support tags on {}",
            conn.provider(),
            conn.name(),
            kind
        )))
    }
}

fn require_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError {
            missing: vec!["KeyValue:Key".to_string()],
        }
        .into());
    }
    Ok(key)
}

impl ControlPlane {
    async fn tag_target(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<(Connection, IidRecord)> {
        let conn = self.connect(connection).await?;
        check_taggable(&conn, kind)?;
        let record = self.record(conn.name(), kind, name).await?;
        Ok((conn, record))
    }

    /// Sets `tag` on the resource, replacing a tag with the same key.
    /// Empty values are allowed.
    pub async fn add_tag(&self, connection: &str, kind: ResourceKind, name: &str, mut tag: KeyValue) -> Result<KeyValue> {
        validate_required(&mut tag, &["KeyValue:Value"])?;
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, kind, name).await;

        let (conn, record) = self.tag_target(connection, kind, name).await?;
        let handler = conn.tag_handler()?;
        let tag = call(
            &conn,
            TAG,
            "add",
            &record.iid,
            handler.add_tag(kind, &record.iid, tag),
        )
        .await?;
        tracing::info!("Tagged {} {} on {} with {}", kind, record.iid, conn.name(), tag.key);
        Ok(tag)
    }

    pub async fn list_tag(&self, connection: &str, kind: ResourceKind, name: &str) -> Result<Vec<KeyValue>> {
        let (conn, record) = self.tag_target(connection, kind, name).await?;
        let handler = conn.tag_handler()?;
        call(&conn, TAG, "list", &record.iid, handler.list_tag(kind, &record.iid)).await
    }

    pub async fn get_tag(&self, connection: &str, kind: ResourceKind, name: &str, key: &str) -> Result<KeyValue> {
        let key = require_key(key)?;
        let (conn, record) = self.tag_target(connection, kind, name).await?;
        let handler = conn.tag_handler()?;
        call(&conn, TAG, "get", &record.iid, handler.get_tag(kind, &record.iid, key)).await
    }

    pub async fn remove_tag(&self, connection: &str, kind: ResourceKind, name: &str, key: &str) -> Result<bool> {
        let key = require_key(key)?;
        let connection = connection.trim();
        let name = name.trim();
        let _guard = self.lock(connection, kind, name).await;

        let (conn, record) = self.tag_target(connection, kind, name).await?;
        let handler = conn.tag_handler()?;
        let removed = call(
            &conn,
            TAG,
            "remove",
            &record.iid,
            handler.remove_tag(kind, &record.iid, key),
        )
        .await?;
        tracing::info!("Removed tag {} from {} {} on {}", key, kind, record.iid, conn.name());
        Ok(removed)
    }

    /// Resources of `kind` carrying a tag whose key or value is `keyword`.
    ///
    /// Unmapped provider resources are included; mapped ones carry their
    /// NameId.
    pub async fn find_tag(&self, connection: &str, kind: ResourceKind, keyword: &str) -> Result<Vec<TagInfo>> {
        let conn = self.connect(connection).await?;
        check_taggable(&conn, kind)?;
        let handler = conn.tag_handler()?;

        let mut found = call(
            &conn,
            TAG,
            "find",
            &Default::default(),
            handler.find_tag(kind, keyword.trim()),
        )
        .await?;

        let records = self.iids.list(conn.name(), kind).await?;
        for info in found.iter_mut() {
            name_refs(std::slice::from_mut(&mut info.res_iid), &records);
        }
        Ok(found)
    }
}
