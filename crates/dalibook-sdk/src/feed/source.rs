//! Retrieval collaborator for feed pages

use super::item::FeedItem;
use super::segment::SegmentKey;
use crate::error::Result;
use async_trait::async_trait;
use dalibook_client::DalibookClient;

/// Source of feed pages
///
/// Returns the page of `segment` starting at `offset`, newest first.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, segment: &SegmentKey, offset: usize) -> Result<Vec<T>>;
}

/// Page source backed by the Dalibook HTTP routes
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: DalibookClient,
}

impl HttpPageSource {
    pub fn new(client: DalibookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: FeedItem> PageSource<T> for HttpPageSource {
    async fn fetch_page(&self, segment: &SegmentKey, offset: usize) -> Result<Vec<T>> {
        let page = self.client.fetch_page(&segment.request(), offset).await?;
        Ok(page)
    }
}
