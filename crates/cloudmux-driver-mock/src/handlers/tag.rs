use super::Ctx;
use async_trait::async_trait;
use cloudmux_driver::resources::{TagHandler, TagInfo, tag_matches};
use cloudmux_driver::{DriverError, Iid, KeyValue, ResourceKind, Result};

pub struct MockTagHandler {
    pub(crate) ctx: Ctx,
}

fn no_tag(kind: ResourceKind, iid: &Iid, key: &str) -> DriverError {
    DriverError::not_found(format!("tag {} on {} {}", key, kind, iid))
}

#[async_trait]
impl TagHandler for MockTagHandler {
    async fn add_tag(&self, kind: ResourceKind, iid: &Iid, tag: KeyValue) -> Result<KeyValue> {
        self.ctx.cloud.enter("tag.add").await?;

        let mut state = self.ctx.cloud.state();
        let tags = state.tags_mut(kind, iid)?;
        match tags.iter_mut().find(|t| t.key == tag.key) {
            Some(existing) => existing.value = tag.value.clone(),
            None => tags.push(tag.clone()),
        }
        Ok(tag)
    }

    async fn list_tag(&self, kind: ResourceKind, iid: &Iid) -> Result<Vec<KeyValue>> {
        self.ctx.cloud.enter("tag.list").await?;
        Ok(self.ctx.cloud.state().tags_mut(kind, iid)?.clone())
    }

    async fn get_tag(&self, kind: ResourceKind, iid: &Iid, key: &str) -> Result<KeyValue> {
        self.ctx.cloud.enter("tag.get").await?;
        self.ctx
            .cloud
            .state()
            .tags_mut(kind, iid)?
            .iter()
            .find(|t| t.key == key)
            .cloned()
            .ok_or_else(|| no_tag(kind, iid, key))
    }

    async fn remove_tag(&self, kind: ResourceKind, iid: &Iid, key: &str) -> Result<bool> {
        self.ctx.cloud.enter("tag.remove").await?;

        let mut state = self.ctx.cloud.state();
        let tags = state.tags_mut(kind, iid)?;
        let before = tags.len();
        tags.retain(|t| t.key != key);
        if tags.len() == before {
            return Err(no_tag(kind, iid, key));
        }
        Ok(true)
    }

    async fn find_tag(&self, kind: ResourceKind, keyword: &str) -> Result<Vec<TagInfo>> {
        self.ctx.cloud.enter("tag.find").await?;

        let tagged = self.ctx.cloud.state().tagged(kind)?;
        Ok(tagged
            .into_iter()
            .filter_map(|(iid, tags)| {
                let tag_list: Vec<KeyValue> =
                    tags.into_iter().filter(|t| tag_matches(t, keyword)).collect();
                (!tag_list.is_empty()).then(|| TagInfo {
                    res_type: kind,
                    res_iid: iid,
                    tag_list,
                    key_value_list: self.ctx.location(),
                })
            })
            .collect())
    }
}
