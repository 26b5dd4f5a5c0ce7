use anyhow::{Context, Result};

use crate::models::CourseRecord;

pub fn record_to_json(record: &CourseRecord) -> Result<String> {
    serde_json::to_string(record).context("failed to serialize course record")
}

pub fn record_from_json(raw: &str, playlist_id: &str) -> Result<CourseRecord> {
    serde_json::from_str(raw)
        .with_context(|| format!("stored record for {playlist_id} is not valid JSON"))
}
