//! Machine images snapshotted from VMs

use super::{call, fetch, validate_create};
use crate::ControlPlane;
use crate::error::Result;
use cloudmux_driver::ResourceKind;
use cloudmux_driver::resources::{MyImageInfo, MyImageReqInfo};

const KIND: ResourceKind = ResourceKind::MyImage;

impl ControlPlane {
    async fn name_my_image_refs(&self, conn: &str, info: &mut MyImageInfo) -> Result<()> {
        self.name_ref(conn, ResourceKind::Vm, &mut info.source_vm)
            .await
    }

    /// Snapshots a mapped VM into a new image
    pub async fn snapshot_vm(&self, connection: &str, mut req: MyImageReqInfo) -> Result<MyImageInfo> {
        validate_create(&mut req)?;
        let conn = self.connect(connection).await?;
        let handler = conn.my_image_handler()?;
        let name = req.iid.name_id.clone();

        let _guard = self.begin_create(&conn, KIND, &name).await?;
        self.resolve_ref(conn.name(), ResourceKind::Vm, &mut req.source_vm)
            .await?;

        let mut info: MyImageInfo = self
            .provision(&conn, KIND, &*handler, req, None, None)
            .await?;
        self.name_my_image_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn get_my_image(&self, connection: &str, name: &str) -> Result<MyImageInfo> {
        let conn = self.connect(connection).await?;
        let handler = conn.my_image_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        let mut info: MyImageInfo = fetch(&conn, KIND, &*handler, &record).await?;
        self.name_my_image_refs(conn.name(), &mut info).await?;
        Ok(info)
    }

    pub async fn list_my_images(&self, connection: &str) -> Result<Vec<MyImageInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.my_image_handler()?;

        let mut images: Vec<MyImageInfo> = self.list_mapped(&conn, KIND, &*handler).await?;
        for image in images.iter_mut() {
            self.name_my_image_refs(conn.name(), image).await?;
        }
        Ok(images)
    }

    pub async fn delete_my_image(&self, connection: &str, name: &str, force: bool) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let handler = conn.my_image_handler()?;
        let name = name.trim();

        let _guard = self.lock(conn.name(), KIND, name).await;
        let record = self.record(conn.name(), KIND, name).await?;
        self.remove(&conn, KIND, &*handler, &record, force).await
    }

    pub async fn is_windows_my_image(&self, connection: &str, name: &str) -> Result<bool> {
        let conn = self.connect(connection).await?;
        let handler = conn.my_image_handler()?;
        let record = self.record(conn.name(), KIND, name).await?;

        call(
            &conn,
            KIND.as_str(),
            "is_windows_image",
            &record.iid,
            handler.is_windows_image(&record.iid),
        )
        .await
    }
}
