//! Price catalog contract
//!
//! Prices are passed through as the provider's JSON; no cost computation
//! happens on this side.

use crate::error::Result;
use crate::iid::KeyValue;
use async_trait::async_trait;

#[async_trait]
pub trait PriceInfoHandler: Send + Sync {
    async fn list_product_family(&self, region: &str) -> Result<Vec<String>>;

    async fn get_price_info(
        &self,
        product_family: &str,
        region: &str,
        filter: Vec<KeyValue>,
    ) -> Result<String>;
}
