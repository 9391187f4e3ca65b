//! Key pairs

use super::{fetch, validate_create};
use crate::ControlPlane;
use crate::error::Result;
use cloudmux_driver::ResourceKind;
use cloudmux_driver::resources::{KeyPairInfo, KeyPairReqInfo};

const KIND: ResourceKind = ResourceKind::KeyPair;

impl ControlPlane {
    /// The private key is only returned here; later reads never carry it
    pub async fn create_key_pair(&self, connection: &str, mut req: KeyPairReqInfo) -> Result<KeyPairInfo> {
        validate_create(&mut req)?;
        let conn = self.connect(connection).await?;
        let handler = conn.key_pair_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;
        self.provision(&conn, KIND, &*handler, req, None, None)
            .await
    }

    pub async fn get_key_pair(&self, connection: &str, name: &str) -> Result<KeyPairInfo> {
        let conn = self.connect(connection).await?;
        let handler = conn.key_pair_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;
        fetch(&conn, KIND, &*handler, &record).await
    }

    pub async fn list_key_pairs(&self, connection: &str) -> Result<Vec<KeyPairInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.key_pair_handler()?;
        self.list_mapped(&conn, KIND, &*handler).await
    }

    pub async fn delete_key_pair(&self, connection: &str, name: &str, force: bool) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let handler = conn.key_pair_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;
        self.remove(&conn, KIND, &*handler, &record, force).await
    }
}
