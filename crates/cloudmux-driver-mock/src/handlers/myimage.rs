use super::Ctx;
use async_trait::async_trait;
use chrono::Utc;
use cloudmux_driver::resources::{
    MyImageHandler, MyImageInfo, MyImageReqInfo, MyImageStatus, ResourceHandler,
};
use cloudmux_driver::{DriverError, Iid, KeyValue, Result, key_value_get};

pub struct MockMyImageHandler {
    pub(crate) ctx: Ctx,
}

#[async_trait]
impl ResourceHandler<MyImageReqInfo, MyImageInfo> for MockMyImageHandler {
    async fn create(&self, req: MyImageReqInfo) -> Result<MyImageInfo> {
        self.ctx.cloud.enter("myimage.create").await?;

        let mut state = self.ctx.cloud.state();
        if state.my_images.name_taken(&req.iid.name_id) {
            return Err(DriverError::AlreadyExists(req.iid.name_id));
        }
        let vm = state.vms.get(&req.source_vm)?;
        let guest_os = if vm.image_iid.name_id.to_ascii_lowercase().contains("windows") {
            "windows"
        } else {
            "linux"
        };

        let mut key_value_list = self.ctx.location();
        key_value_list.push(KeyValue::new("GuestOS", guest_os));
        let info = MyImageInfo {
            iid: Iid::new(req.iid.name_id, self.ctx.cloud.next_id("ami")),
            source_vm: vm.iid,
            status: MyImageStatus::Available,
            created_time: Some(Utc::now()),
            tag_list: req.tag_list,
            key_value_list,
        };
        state.my_images.insert(info.clone());
        Ok(info)
    }

    async fn list(&self) -> Result<Vec<MyImageInfo>> {
        self.ctx.cloud.enter("myimage.list").await?;
        Ok(self.ctx.cloud.state().my_images.list())
    }

    async fn get(&self, iid: &Iid) -> Result<MyImageInfo> {
        self.ctx.cloud.enter("myimage.get").await?;
        self.ctx.cloud.state().my_images.get(iid)
    }

    async fn list_iid(&self) -> Result<Vec<Iid>> {
        self.ctx.cloud.enter("myimage.list_iid").await?;
        Ok(self.ctx.cloud.state().my_images.list_iid())
    }

    async fn delete(&self, iid: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("myimage.delete").await?;
        self.ctx.cloud.state().my_images.remove(iid)?;
        Ok(true)
    }
}

#[async_trait]
impl MyImageHandler for MockMyImageHandler {
    async fn is_windows_image(&self, image: &Iid) -> Result<bool> {
        self.ctx.cloud.enter("myimage.is_windows_image").await?;
        let info = self.ctx.cloud.state().my_images.get(image)?;
        Ok(key_value_get(&info.key_value_list, "GuestOS") == Some("windows"))
    }
}
