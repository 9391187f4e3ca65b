//! Read-only provider catalogs
//!
//! Public images, VM specs, regions and prices belong to the provider and
//! are never mapped. Lookups go straight to the driver by name.

use super::call;
use crate::ControlPlane;
use crate::error::Result;
use cloudmux_driver::resources::{AnyCallInfo, ImageInfo, RegionZoneInfo, VmSpecInfo};
use cloudmux_driver::{Iid, KeyValue, ValidationError};

const IMAGE: &str = "IMAGE";
const VM_SPEC: &str = "VMSPEC";
const REGION_ZONE: &str = "REGIONZONE";
const PRICE_INFO: &str = "PRICEINFO";
const ANY_CALL: &str = "ANYCALL";

fn required(type_name: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError {
            missing: vec![format!("{}:{}", type_name, field)],
        }
        .into());
    }
    Ok(())
}

impl ControlPlane {
    pub async fn list_images(&self, connection: &str) -> Result<Vec<ImageInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.image_handler()?;
        call(&conn, IMAGE, "list", &Iid::default(), handler.list()).await
    }

    pub async fn get_image(&self, connection: &str, name: &str) -> Result<ImageInfo> {
        required("ImageInfo", "Name", name)?;
        let conn = self.connect(connection).await?;
        let handler = conn.image_handler()?;

        let iid = Iid::new(name.trim(), name.trim());
        call(&conn, IMAGE, "get", &iid, handler.get(&iid)).await
    }

    pub async fn is_windows_image(&self, connection: &str, name: &str) -> Result<bool> {
        required("ImageInfo", "Name", name)?;
        let conn = self.connect(connection).await?;
        let handler = conn.image_handler()?;

        let iid = Iid::new(name.trim(), name.trim());
        call(&conn, IMAGE, "is_windows_image", &iid, handler.is_windows_image(&iid)).await
    }

    pub async fn list_vm_specs(&self, connection: &str) -> Result<Vec<VmSpecInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.vm_spec_handler()?;
        call(&conn, VM_SPEC, "list", &Iid::default(), handler.list()).await
    }

    pub async fn get_vm_spec(&self, connection: &str, name: &str) -> Result<VmSpecInfo> {
        required("VMSpecInfo", "Name", name)?;
        let conn = self.connect(connection).await?;
        let handler = conn.vm_spec_handler()?;

        let name = name.trim();
        call(&conn, VM_SPEC, "get", &Iid::by_name(name), handler.get(name)).await
    }

    /// The provider's own VM spec listing, unparsed
    pub async fn list_org_vm_specs(&self, connection: &str) -> Result<String> {
        let conn = self.connect(connection).await?;
        let handler = conn.vm_spec_handler()?;
        call(&conn, VM_SPEC, "list_org", &Iid::default(), handler.list_org()).await
    }

    pub async fn get_org_vm_spec(&self, connection: &str, name: &str) -> Result<String> {
        required("VMSpecInfo", "Name", name)?;
        let conn = self.connect(connection).await?;
        let handler = conn.vm_spec_handler()?;

        let name = name.trim();
        call(&conn, VM_SPEC, "get_org", &Iid::by_name(name), handler.get_org(name)).await
    }

    pub async fn list_region_zones(&self, connection: &str) -> Result<Vec<RegionZoneInfo>> {
        let conn = self.connect(connection).await?;
        let handler = conn.region_zone_handler()?;
        call(
            &conn,
            REGION_ZONE,
            "list",
            &Iid::default(),
            handler.list_region_zone(),
        )
        .await
    }

    pub async fn get_region_zone(&self, connection: &str, region: &str) -> Result<RegionZoneInfo> {
        required("RegionZoneInfo", "Name", region)?;
        let conn = self.connect(connection).await?;
        let handler = conn.region_zone_handler()?;

        let region = region.trim();
        call(
            &conn,
            REGION_ZONE,
            "get",
            &Iid::by_name(region),
            handler.get_region_zone(region),
        )
        .await
    }

    pub async fn list_org_regions(&self, connection: &str) -> Result<String> {
        let conn = self.connect(connection).await?;
        let handler = conn.region_zone_handler()?;
        call(
            &conn,
            REGION_ZONE,
            "list_org_region",
            &Iid::default(),
            handler.list_org_region(),
        )
        .await
    }

    pub async fn list_org_zones(&self, connection: &str) -> Result<String> {
        let conn = self.connect(connection).await?;
        let handler = conn.region_zone_handler()?;
        call(
            &conn,
            REGION_ZONE,
            "list_org_zone",
            &Iid::default(),
            handler.list_org_zone(),
        )
        .await
    }

    /// Product families priced in the connection's region
    pub async fn list_product_family(&self, connection: &str) -> Result<Vec<String>> {
        let conn = self.connect(connection).await?;
        let handler = conn.price_info_handler()?;
        let region = conn.region().region.clone();
        call(
            &conn,
            PRICE_INFO,
            "list_product_family",
            &Iid::by_name(region.as_str()),
            handler.list_product_family(&region),
        )
        .await
    }

    /// Raw price JSON for one product family in the connection's region
    pub async fn get_price_info(
        &self,
        connection: &str,
        product_family: &str,
        filter: Vec<KeyValue>,
    ) -> Result<String> {
        required("PriceInfo", "ProductFamily", product_family)?;
        let conn = self.connect(connection).await?;
        let handler = conn.price_info_handler()?;

        let product_family = product_family.trim();
        let region = conn.region().region.clone();
        call(
            &conn,
            PRICE_INFO,
            "get_price_info",
            &Iid::by_name(product_family),
            handler.get_price_info(product_family, &region, filter),
        )
        .await
    }

    /// Driver-specific function, passed through untouched
    pub async fn any_call(&self, connection: &str, mut req: AnyCallInfo) -> Result<AnyCallInfo> {
        required("AnyCallInfo", "FID", &req.fid)?;
        req.fid = req.fid.trim().to_string();
        let conn = self.connect(connection).await?;
        let handler = conn.any_call_handler()?;

        let fid = Iid::by_name(req.fid.as_str());
        call(&conn, ANY_CALL, "any_call", &fid, handler.any_call(req)).await
    }
}
