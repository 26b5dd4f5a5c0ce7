use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::models::CourseRecord;

use super::{change_channel, CourseStore, StorageChange};

/// Store kept entirely in memory. Used for tests and for hosts that bring
/// their own durable storage and only need the notification plumbing.
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<String, CourseRecord>>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
            changes: change_channel(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, CourseRecord>>> {
        self.records
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn notify(&self, change: StorageChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn get(&self, playlist_id: &str) -> Result<Option<CourseRecord>> {
        Ok(self.lock()?.get(playlist_id).cloned())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, CourseRecord>> {
        Ok(self.lock()?.clone())
    }

    async fn set(&self, playlist_id: &str, record: &CourseRecord) -> Result<()> {
        let old_value = self.lock()?.insert(playlist_id.to_string(), record.clone());
        if old_value.as_ref() == Some(record) {
            return Ok(());
        }
        self.notify(StorageChange {
            playlist_id: playlist_id.to_string(),
            old_value,
            new_value: Some(record.clone()),
        });
        Ok(())
    }

    async fn remove(&self, playlist_id: &str) -> Result<()> {
        let old_value = self.lock()?.remove(playlist_id);
        if old_value.is_some() {
            self.notify(StorageChange {
                playlist_id: playlist_id.to_string(),
                old_value,
                new_value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
