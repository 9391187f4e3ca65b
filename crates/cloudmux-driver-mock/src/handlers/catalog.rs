//! Read-only catalogs: public images, VM specs, regions, prices and AnyCall

use super::Ctx;
use async_trait::async_trait;
use cloudmux_driver::resources::{
    AnyCallHandler, AnyCallInfo, ImageHandler, ImageInfo, ImageStatus, PriceInfoHandler,
    RegionZoneHandler, RegionZoneInfo, VCpuInfo, VmSpecHandler, VmSpecInfo, ZoneInfo, ZoneStatus,
};
use cloudmux_driver::{DriverError, Iid, KeyValue, Result, key_value_get};

pub(crate) const REGIONS: [(&str, [&str; 3]); 3] = [
    ("mock-region-1", ["mock-region-1a", "mock-region-1b", "mock-region-1c"]),
    ("mock-region-2", ["mock-region-2a", "mock-region-2b", "mock-region-2c"]),
    ("us-east-2", ["us-east-2a", "us-east-2b", "us-east-2c"]),
];

pub(crate) fn public_images() -> Vec<ImageInfo> {
    [
        ("ubuntu-22.04", "ami-ubuntu2204", "Linux"),
        ("ubuntu-24.04", "ami-ubuntu2404", "Linux"),
        ("windows-2022", "ami-win2022", "Windows"),
    ]
    .into_iter()
    .map(|(name, id, os)| ImageInfo {
        iid: Iid::new(name, id),
        guest_os: os.to_string(),
        status: ImageStatus::Available,
        key_value_list: Vec::new(),
    })
    .collect()
}

pub(crate) fn vm_specs(region: &str) -> Vec<VmSpecInfo> {
    [("mock.small", "1", "1024"), ("mock.medium", "2", "4096"), ("mock.large", "4", "16384")]
        .into_iter()
        .map(|(name, cpus, mem)| VmSpecInfo {
            region: region.to_string(),
            name: name.to_string(),
            vcpu: VCpuInfo {
                count: cpus.to_string(),
                clock: "2.5".to_string(),
            },
            mem: mem.to_string(),
            gpu: Vec::new(),
            key_value_list: Vec::new(),
        })
        .collect()
}

fn region_zone(name: &str, zones: &[&str]) -> RegionZoneInfo {
    RegionZoneInfo {
        name: name.to_string(),
        display_name: name.to_string(),
        zone_list: zones
            .iter()
            .map(|z| ZoneInfo {
                name: z.to_string(),
                display_name: z.to_string(),
                status: ZoneStatus::Available,
                key_value_list: Vec::new(),
            })
            .collect(),
        key_value_list: Vec::new(),
    }
}

pub struct MockImageHandler {
    pub(crate) ctx: Ctx,
}

#[async_trait]
impl ImageHandler for MockImageHandler {
    async fn list(&self) -> Result<Vec<ImageInfo>> {
        self.ctx.cloud.enter("image.list").await?;
        Ok(public_images())
    }

    async fn get(&self, image: &Iid) -> Result<ImageInfo> {
        self.ctx.cloud.enter("image.get").await?;
        public_images()
            .into_iter()
            .find(|i| i.iid.name_id == image.name_id || i.iid.system_id == image.system_id)
            .ok_or_else(|| DriverError::not_found(format!("IMAGE {}", image)))
    }

    async fn is_windows_image(&self, image: &Iid) -> Result<bool> {
        let info = self.get(image).await?;
        Ok(info.guest_os.eq_ignore_ascii_case("windows"))
    }
}

pub struct MockVmSpecHandler {
    pub(crate) ctx: Ctx,
}

#[async_trait]
impl VmSpecHandler for MockVmSpecHandler {
    async fn list(&self) -> Result<Vec<VmSpecInfo>> {
        self.ctx.cloud.enter("vmspec.list").await?;
        Ok(vm_specs(&self.ctx.region.region))
    }

    async fn get(&self, name: &str) -> Result<VmSpecInfo> {
        self.ctx.cloud.enter("vmspec.get").await?;
        vm_specs(&self.ctx.region.region)
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| DriverError::not_found(format!("VMSpec {}", name)))
    }

    async fn list_org(&self) -> Result<String> {
        let specs = self.list().await?;
        Ok(serde_json::to_string(&specs)?)
    }

    async fn get_org(&self, name: &str) -> Result<String> {
        let spec = self.get(name).await?;
        Ok(serde_json::to_string(&spec)?)
    }
}

pub struct MockRegionZoneHandler {
    pub(crate) ctx: Ctx,
}

#[async_trait]
impl RegionZoneHandler for MockRegionZoneHandler {
    async fn list_region_zone(&self) -> Result<Vec<RegionZoneInfo>> {
        self.ctx.cloud.enter("regionzone.list").await?;
        Ok(REGIONS
            .iter()
            .map(|(name, zones)| region_zone(name, zones))
            .collect())
    }

    async fn get_region_zone(&self, region: &str) -> Result<RegionZoneInfo> {
        self.ctx.cloud.enter("regionzone.get").await?;
        REGIONS
            .iter()
            .find(|(name, _)| *name == region)
            .map(|(name, zones)| region_zone(name, zones))
            .ok_or_else(|| DriverError::not_found(format!("region {}", region)))
    }

    async fn list_org_region(&self) -> Result<String> {
        self.ctx.cloud.enter("regionzone.list_org_region").await?;
        let names: Vec<&str> = REGIONS.iter().map(|(name, _)| *name).collect();
        Ok(serde_json::to_string(&names)?)
    }

    async fn list_org_zone(&self) -> Result<String> {
        self.ctx.cloud.enter("regionzone.list_org_zone").await?;
        let zones: Vec<&str> = REGIONS
            .iter()
            .find(|(name, _)| *name == self.ctx.region.region)
            .map(|(_, zones)| zones.to_vec())
            .unwrap_or_default();
        Ok(serde_json::to_string(&zones)?)
    }
}

pub struct MockPriceInfoHandler {
    pub(crate) ctx: Ctx,
}

#[async_trait]
impl PriceInfoHandler for MockPriceInfoHandler {
    async fn list_product_family(&self, _region: &str) -> Result<Vec<String>> {
        self.ctx.cloud.enter("price.list_product_family").await?;
        Ok(vec!["Compute".to_string(), "Storage".to_string()])
    }

    async fn get_price_info(
        &self,
        product_family: &str,
        region: &str,
        filter: Vec<KeyValue>,
    ) -> Result<String> {
        self.ctx.cloud.enter("price.get_price_info").await?;
        if product_family != "Compute" {
            return Ok(serde_json::json!({ "cloudPriceList": [] }).to_string());
        }

        let wanted = key_value_get(&filter, "instanceType");
        let prices: Vec<serde_json::Value> = vm_specs(region)
            .into_iter()
            .filter(|s| wanted.is_none_or(|w| w == s.name))
            .map(|s| {
                let cpus: f64 = s.vcpu.count.parse().unwrap_or(1.0);
                serde_json::json!({
                    "productInfo": { "instanceType": s.name, "vcpu": s.vcpu.count, "memory": s.mem },
                    "priceInfo": { "unit": "Hrs", "currency": "USD", "price": format!("{:.4}", cpus * 0.0125) },
                })
            })
            .collect();
        Ok(serde_json::json!({
            "meta": { "version": "v0.1", "description": "mock price info" },
            "cloudPriceList": [{ "cloudName": "MOCK", "region": region, "priceList": prices }],
        })
        .to_string())
    }
}

pub struct MockAnyCallHandler {
    pub(crate) ctx: Ctx,
}

#[async_trait]
impl AnyCallHandler for MockAnyCallHandler {
    async fn any_call(&self, call: AnyCallInfo) -> Result<AnyCallInfo> {
        self.ctx.cloud.enter("anycall").await?;
        let output = match call.fid.as_str() {
            "echo" => call.input.clone(),
            "whoami" => vec![
                KeyValue::new("MockName", self.ctx.cloud.name()),
                KeyValue::new("Region", &self.ctx.region.region),
            ],
            other => {
                return Err(DriverError::InvalidArgument(format!(
                    "unknown function id: {}",
                    other
                )));
            }
        };
        Ok(AnyCallInfo {
            output,
            ..call
        })
    }
}
