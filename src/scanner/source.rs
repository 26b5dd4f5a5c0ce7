use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::page::{HostPage, ListEntry, NodeRef, Scope, VideoItem};
use crate::sync::{wait_for, wait_for_batch};

use super::BatchSource;

/// Batches straight from a list on the host page.
pub struct PageBatchSource<'a, P: HostPage + ?Sized> {
    page: &'a P,
    list: NodeRef,
    pagination_timeout: Duration,
}

impl<'a, P: HostPage + ?Sized> PageBatchSource<'a, P> {
    pub fn new(page: &'a P, list: NodeRef, pagination_timeout: Duration) -> Self {
        Self {
            page,
            list,
            pagination_timeout,
        }
    }
}

#[async_trait]
impl<'a, P: HostPage + ?Sized> BatchSource for PageBatchSource<'a, P> {
    async fn duration_label(
        &mut self,
        item: &VideoItem,
        token: &CancellationToken,
    ) -> Result<String> {
        let node = item.node;
        let label = wait_for(self.page, Scope::Node(node), token, None, |page| {
            page.duration_label(node)
        })
        .await?;
        Ok(label)
    }

    async fn next_batch(&mut self, token: &CancellationToken) -> Result<Vec<ListEntry>> {
        let added = wait_for_batch(self.page, self.list, token, self.pagination_timeout).await?;
        Ok(added.into_iter().map(|node| self.page.entry(node)).collect())
    }
}
