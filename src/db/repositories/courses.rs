use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tokio::sync::broadcast;

use crate::db::{
    helpers::{record_from_json, record_to_json},
    Database,
};
use crate::models::CourseRecord;
use crate::store::{CourseStore, StorageChange};

impl Database {
    /// Fetch the stored record for one playlist
    pub async fn get_course(&self, playlist_id: &str) -> Result<Option<CourseRecord>> {
        let playlist_id = playlist_id.to_string();
        self.execute(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT data FROM courses WHERE playlist_id = ?1",
                    params![playlist_id],
                    |row| row.get(0),
                )
                .optional()
                .context("failed to query course")?;

            raw.map(|data| record_from_json(&data, &playlist_id))
                .transpose()
        })
        .await
    }

    /// Every stored course keyed by playlist id
    pub async fn get_all_courses(&self) -> Result<BTreeMap<String, CourseRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT playlist_id, data FROM courses")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(playlist_id, data)| {
                    let record = record_from_json(&data, &playlist_id)?;
                    Ok((playlist_id, record))
                })
                .collect()
        })
        .await
    }

    /// Insert or replace a course, returning what was stored before
    pub async fn upsert_course(
        &self,
        playlist_id: &str,
        record: &CourseRecord,
    ) -> Result<Option<CourseRecord>> {
        let playlist_id = playlist_id.to_string();
        let data = record_to_json(record)?;
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let previous: Option<String> = tx
                .query_row(
                    "SELECT data FROM courses WHERE playlist_id = ?1",
                    params![playlist_id],
                    |row| row.get(0),
                )
                .optional()?;

            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO courses (playlist_id, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(playlist_id) DO UPDATE SET
                     data = excluded.data,
                     updated_at = excluded.updated_at",
                params![playlist_id, data, now],
            )
            .with_context(|| "failed to upsert course")?;
            tx.commit()?;

            previous
                .map(|raw| record_from_json(&raw, &playlist_id))
                .transpose()
        })
        .await
    }

    /// Delete a course, returning the removed record if there was one
    pub async fn delete_course(&self, playlist_id: &str) -> Result<Option<CourseRecord>> {
        let playlist_id = playlist_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let previous: Option<String> = tx
                .query_row(
                    "SELECT data FROM courses WHERE playlist_id = ?1",
                    params![playlist_id],
                    |row| row.get(0),
                )
                .optional()?;
            tx.execute(
                "DELETE FROM courses WHERE playlist_id = ?1",
                params![playlist_id],
            )
            .with_context(|| "failed to delete course")?;
            tx.commit()?;

            previous
                .map(|raw| record_from_json(&raw, &playlist_id))
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl CourseStore for Database {
    async fn get(&self, playlist_id: &str) -> Result<Option<CourseRecord>> {
        self.get_course(playlist_id).await
    }

    async fn get_all(&self) -> Result<BTreeMap<String, CourseRecord>> {
        self.get_all_courses().await
    }

    async fn set(&self, playlist_id: &str, record: &CourseRecord) -> Result<()> {
        let old_value = self.upsert_course(playlist_id, record).await?;
        if old_value.as_ref() != Some(record) {
            self.notify(StorageChange {
                playlist_id: playlist_id.to_string(),
                old_value,
                new_value: Some(record.clone()),
            });
        }
        Ok(())
    }

    async fn remove(&self, playlist_id: &str) -> Result<()> {
        if let Some(old_value) = self.delete_course(playlist_id).await? {
            self.notify(StorageChange {
                playlist_id: playlist_id.to_string(),
                old_value: Some(old_value),
                new_value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
