//! Driver, credential, region and connection config records

use crate::error::{CoreError, Result};
use crate::store::{KvStore, escape, get_json, list_json, put_json};
use cloudmux_driver::{KeyValue, Validate, Walker, validate_required};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const DRIVER_PREFIX: &str = "/driver/";
const CREDENTIAL_PREFIX: &str = "/credential/";
const REGION_PREFIX: &str = "/region/";
const CONNECTION_PREFIX: &str = "/connection-config/";

/// Registered driver library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CloudDriverInfo {
    pub driver_name: String,
    pub provider_name: String,
    pub driver_lib_file_name: String,
}

impl CloudDriverInfo {
    pub fn new(
        driver_name: impl Into<String>,
        provider_name: impl Into<String>,
        driver_lib_file_name: impl Into<String>,
    ) -> Self {
        Self {
            driver_name: driver_name.into(),
            provider_name: provider_name.into(),
            driver_lib_file_name: driver_lib_file_name.into(),
        }
    }
}

impl Validate for CloudDriverInfo {
    const TYPE_NAME: &'static str = "CloudDriverInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("DriverName", &mut self.driver_name);
        w.string("ProviderName", &mut self.provider_name);
        w.string("DriverLibFileName", &mut self.driver_lib_file_name);
    }
}

/// Named credential bag
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialRecord {
    pub credential_name: String,
    pub provider_name: String,
    pub key_value_info_list: Vec<KeyValue>,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self
            .key_value_info_list
            .iter()
            .map(|kv| kv.key.as_str())
            .collect();
        f.debug_struct("CredentialRecord")
            .field("credential_name", &self.credential_name)
            .field("provider_name", &self.provider_name)
            .field("keys", &keys)
            .finish()
    }
}

impl Validate for CredentialRecord {
    const TYPE_NAME: &'static str = "CredentialInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("CredentialName", &mut self.credential_name);
        w.string("ProviderName", &mut self.provider_name);
        w.list("KeyValueInfoList", &mut self.key_value_info_list);
    }
}

/// Named region descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionRecord {
    pub region_name: String,
    pub provider_name: String,
    pub key_value_info_list: Vec<KeyValue>,
    #[serde(default)]
    pub available_zone_list: Vec<String>,
}

impl Validate for RegionRecord {
    const TYPE_NAME: &'static str = "RegionInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("RegionName", &mut self.region_name);
        w.string("ProviderName", &mut self.provider_name);
        w.list("KeyValueInfoList", &mut self.key_value_info_list);
    }
}

/// Provider + driver + credential + region binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionConfig {
    pub config_name: String,
    pub provider_name: String,
    pub driver_name: String,
    pub credential_name: String,
    pub region_name: String,
}

impl Validate for ConnectionConfig {
    const TYPE_NAME: &'static str = "ConnectionConfigInfo";

    fn walk(&mut self, w: &mut Walker<'_>) {
        w.string("ConfigName", &mut self.config_name);
        w.string("ProviderName", &mut self.provider_name);
        w.string("DriverName", &mut self.driver_name);
        w.string("CredentialName", &mut self.credential_name);
        w.string("RegionName", &mut self.region_name);
    }
}

/// Typed CRUD over the info records
pub struct InfoManager {
    store: Arc<dyn KvStore>,
}

impl InfoManager {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(prefix: &str, name: &str) -> String {
        format!("{}{}", prefix, escape(name.trim()))
    }

    async fn insert_new<T: Serialize>(&self, prefix: &str, what: &str, name: &str, value: &T) -> Result<()> {
        let key = Self::key(prefix, name);
        if self.store.get(&key).await?.is_some() {
            return Err(CoreError::Conflict(format!("{} {} already exists", what, name)));
        }
        put_json(self.store.as_ref(), &key, value).await
    }

    async fn require<T: serde::de::DeserializeOwned>(&self, prefix: &str, what: &str, name: &str) -> Result<T> {
        get_json(self.store.as_ref(), &Self::key(prefix, name))
            .await?
            .ok_or_else(|| CoreError::not_found(what, name.trim()))
    }

    /// Fails with `Dependency` when a connection config still uses `name`
    async fn ensure_unreferenced(
        &self,
        what: &str,
        name: &str,
        uses: impl Fn(&ConnectionConfig) -> bool,
    ) -> Result<()> {
        let users: Vec<String> = self
            .list_connection_configs()
            .await?
            .into_iter()
            .filter(|c| uses(c))
            .map(|c| c.config_name)
            .collect();
        if users.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Dependency(format!(
                "{} {} is used by connection config(s): {}",
                what,
                name,
                users.join(", ")
            )))
        }
    }

    async fn remove(&self, prefix: &str, what: &str, name: &str) -> Result<()> {
        if self.store.delete(&Self::key(prefix, name)).await? {
            tracing::info!("Deleted {} {}", what, name);
            Ok(())
        } else {
            Err(CoreError::not_found(what, name))
        }
    }

    // ---- drivers ----

    pub async fn register_driver(&self, mut info: CloudDriverInfo) -> Result<CloudDriverInfo> {
        validate_required(&mut info, &[])?;
        info.provider_name = info.provider_name.to_uppercase();
        self.insert_new(DRIVER_PREFIX, "driver", &info.driver_name, &info)
            .await?;
        tracing::info!(
            "Registered driver {} ({}, {})",
            info.driver_name,
            info.provider_name,
            info.driver_lib_file_name
        );
        Ok(info)
    }

    pub async fn get_driver(&self, name: &str) -> Result<CloudDriverInfo> {
        self.require(DRIVER_PREFIX, "driver", name).await
    }

    pub async fn list_drivers(&self) -> Result<Vec<CloudDriverInfo>> {
        list_json(self.store.as_ref(), DRIVER_PREFIX).await
    }

    pub async fn unregister_driver(&self, name: &str) -> Result<()> {
        let name = name.trim();
        self.ensure_unreferenced("driver", name, |c| c.driver_name == name)
            .await?;
        self.remove(DRIVER_PREFIX, "driver", name).await
    }

    // ---- credentials ----

    pub async fn register_credential(&self, mut info: CredentialRecord) -> Result<CredentialRecord> {
        validate_required(&mut info, &[])?;
        info.provider_name = info.provider_name.to_uppercase();
        self.insert_new(CREDENTIAL_PREFIX, "credential", &info.credential_name, &info)
            .await?;
        tracing::info!("Registered credential {}", info.credential_name);
        Ok(info)
    }

    pub async fn get_credential(&self, name: &str) -> Result<CredentialRecord> {
        self.require(CREDENTIAL_PREFIX, "credential", name).await
    }

    pub async fn list_credentials(&self) -> Result<Vec<CredentialRecord>> {
        list_json(self.store.as_ref(), CREDENTIAL_PREFIX).await
    }

    pub async fn unregister_credential(&self, name: &str) -> Result<()> {
        let name = name.trim();
        self.ensure_unreferenced("credential", name, |c| c.credential_name == name)
            .await?;
        self.remove(CREDENTIAL_PREFIX, "credential", name).await
    }

    // ---- regions ----

    pub async fn register_region(&self, mut info: RegionRecord) -> Result<RegionRecord> {
        validate_required(&mut info, &[])?;
        info.provider_name = info.provider_name.to_uppercase();
        self.insert_new(REGION_PREFIX, "region", &info.region_name, &info)
            .await?;
        tracing::info!("Registered region {}", info.region_name);
        Ok(info)
    }

    pub async fn get_region(&self, name: &str) -> Result<RegionRecord> {
        self.require(REGION_PREFIX, "region", name).await
    }

    pub async fn list_regions(&self) -> Result<Vec<RegionRecord>> {
        list_json(self.store.as_ref(), REGION_PREFIX).await
    }

    pub async fn unregister_region(&self, name: &str) -> Result<()> {
        let name = name.trim();
        self.ensure_unreferenced("region", name, |c| c.region_name == name)
            .await?;
        self.remove(REGION_PREFIX, "region", name).await
    }

    // ---- connection configs ----

    /// Creates a config after checking that its driver, credential and region
    /// exist and belong to the same provider
    pub async fn create_connection_config(&self, mut config: ConnectionConfig) -> Result<ConnectionConfig> {
        validate_required(&mut config, &[])?;
        config.provider_name = config.provider_name.to_uppercase();

        let driver = self.get_driver(&config.driver_name).await.map_err(|_| {
            CoreError::Configuration(format!("driver {} is not registered", config.driver_name))
        })?;
        let credential = self.get_credential(&config.credential_name).await.map_err(|_| {
            CoreError::Configuration(format!(
                "credential {} is not registered",
                config.credential_name
            ))
        })?;
        let region = self.get_region(&config.region_name).await.map_err(|_| {
            CoreError::Configuration(format!("region {} is not registered", config.region_name))
        })?;

        for (what, provider) in [
            ("driver", &driver.provider_name),
            ("credential", &credential.provider_name),
            ("region", &region.provider_name),
        ] {
            if *provider != config.provider_name {
                return Err(CoreError::Configuration(format!(
                    "{} belongs to provider {}, connection config {} is for {}",
                    what, provider, config.config_name, config.provider_name
                )));
            }
        }

        self.insert_new(CONNECTION_PREFIX, "connection config", &config.config_name, &config)
            .await?;
        tracing::info!(
            "Created connection config {} ({} / {})",
            config.config_name,
            config.provider_name,
            config.region_name
        );
        Ok(config)
    }

    pub async fn get_connection_config(&self, name: &str) -> Result<ConnectionConfig> {
        self.require(CONNECTION_PREFIX, "connection config", name)
            .await
    }

    pub async fn list_connection_configs(&self) -> Result<Vec<ConnectionConfig>> {
        list_json(self.store.as_ref(), CONNECTION_PREFIX).await
    }

    /// Removes the record only; callers check for tracked resources first
    pub(crate) async fn remove_connection_config(&self, name: &str) -> Result<()> {
        self.remove(CONNECTION_PREFIX, "connection config", name.trim())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    fn manager() -> InfoManager {
        InfoManager::new(Arc::new(MemoryKvStore::new()))
    }

    async fn seed(info: &InfoManager) {
        info.register_driver(CloudDriverInfo::new("aws-driver01", "aws", "aws-driver.so"))
            .await
            .unwrap();
        info.register_credential(CredentialRecord {
            credential_name: "aws-cred".into(),
            provider_name: "AWS".into(),
            key_value_info_list: vec![KeyValue::new("ClientId", "id")],
        })
        .await
        .unwrap();
        info.register_region(RegionRecord {
            region_name: "aws-ohio".into(),
            provider_name: "AWS".into(),
            key_value_info_list: vec![KeyValue::new("Region", "us-east-2")],
            available_zone_list: vec![],
        })
        .await
        .unwrap();
    }

    fn config(name: &str) -> ConnectionConfig {
        ConnectionConfig {
            config_name: name.into(),
            provider_name: "AWS".into(),
            driver_name: "aws-driver01".into(),
            credential_name: "aws-cred".into(),
            region_name: "aws-ohio".into(),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_and_rejects_duplicates() {
        let info = manager();
        seed(&info).await;

        let driver = info.get_driver("aws-driver01").await.unwrap();
        assert_eq!(driver.provider_name, "AWS");

        let dup = info
            .register_driver(CloudDriverInfo::new(" aws-driver01 ", "AWS", "x.so"))
            .await;
        assert!(matches!(dup, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_validates_fields() {
        let info = manager();
        let err = info
            .register_driver(CloudDriverInfo::new("d", "  ", ""))
            .await
            .unwrap_err();
        match err {
            CoreError::Validation(v) => {
                assert!(v.contains("CloudDriverInfo:ProviderName"));
                assert!(v.contains("CloudDriverInfo:DriverLibFileName"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connection_config_checks_references() {
        let info = manager();
        seed(&info).await;

        let mut bad = config("aws-ohio-config");
        bad.region_name = "nowhere".into();
        assert!(matches!(
            info.create_connection_config(bad).await,
            Err(CoreError::Configuration(_))
        ));

        let mut wrong_provider = config("aws-ohio-config");
        wrong_provider.provider_name = "GCP".into();
        assert!(matches!(
            info.create_connection_config(wrong_provider).await,
            Err(CoreError::Configuration(_))
        ));

        info.create_connection_config(config("aws-ohio-config"))
            .await
            .unwrap();
        assert_eq!(info.list_connection_configs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_referenced_records_cannot_be_deleted() {
        let info = manager();
        seed(&info).await;
        info.create_connection_config(config("aws-ohio-config"))
            .await
            .unwrap();

        assert!(matches!(
            info.unregister_credential("aws-cred").await,
            Err(CoreError::Dependency(_))
        ));

        info.remove_connection_config("aws-ohio-config").await.unwrap();
        info.unregister_credential("aws-cred").await.unwrap();
        assert!(matches!(
            info.get_credential("aws-cred").await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_credential_debug_hides_values() {
        let cred = CredentialRecord {
            credential_name: "c".into(),
            provider_name: "AWS".into(),
            key_value_info_list: vec![KeyValue::new("ClientSecret", "hunter2")],
        };
        assert!(!format!("{:?}", cred).contains("hunter2"));
    }
}
