//! Persistent course records keyed by playlist id.

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::CourseRecord;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Change notification for one key, carrying both sides of the write.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub playlist_id: String,
    pub old_value: Option<CourseRecord>,
    pub new_value: Option<CourseRecord>,
}

impl StorageChange {
    /// A record appeared or disappeared, as opposed to an in-place update.
    pub fn is_presence_change(&self) -> bool {
        self.old_value.is_none() || self.new_value.is_none()
    }
}

#[async_trait]
pub trait CourseStore: Send + Sync + 'static {
    async fn get(&self, playlist_id: &str) -> Result<Option<CourseRecord>>;

    async fn get_all(&self) -> Result<BTreeMap<String, CourseRecord>>;

    async fn set(&self, playlist_id: &str, record: &CourseRecord) -> Result<()>;

    async fn remove(&self, playlist_id: &str) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

pub(crate) fn change_channel() -> broadcast::Sender<StorageChange> {
    broadcast::channel(CHANGE_CHANNEL_CAPACITY).0
}
