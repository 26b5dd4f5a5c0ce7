//! Read model for the course overview: per-course numbers, grouping and the
//! bulk actions it offers.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{CourseRecord, TimeSpan};
use crate::store::CourseStore;

pub const EXPORT_FILE_NAME: &str = "vidlearn-courses.json";

const PLAYLIST_URL_PREFIX: &str = "https://www.youtube.com/playlist?list=";

pub fn playlist_url(playlist_id: &str) -> String {
    format!("{PLAYLIST_URL_PREFIX}{playlist_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub playlist_id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub enrolled: bool,
    pub completion_percent: u8,
    pub watched: TimeSpan,
    pub total: TimeSpan,
    pub invested: TimeSpan,
    pub watched_videos: usize,
    pub total_videos: usize,
    pub url: String,
}

impl CourseSummary {
    pub fn new(playlist_id: &str, record: &CourseRecord) -> Self {
        let stats = record.stats();
        Self {
            playlist_id: playlist_id.to_string(),
            name: record.course_name.clone(),
            image: record.course_img_src.clone(),
            enrolled: record.is_enrolled(),
            completion_percent: stats.percent,
            watched: stats.watched,
            total: stats.total,
            invested: stats.invested,
            watched_videos: stats.watched_videos,
            total_videos: stats.total_videos,
            url: playlist_url(playlist_id),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completion_percent == 100
    }
}

/// Every enrolled course, split by completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryBoard {
    pub in_progress: Vec<CourseSummary>,
    pub completed: Vec<CourseSummary>,
}

impl SummaryBoard {
    pub fn from_records(records: &BTreeMap<String, CourseRecord>) -> Self {
        let (completed, in_progress): (Vec<_>, Vec<_>) = records
            .iter()
            .filter(|(_, record)| record.is_enrolled())
            .map(|(playlist_id, record)| CourseSummary::new(playlist_id, record))
            .partition(CourseSummary::is_completed);
        Self {
            in_progress,
            completed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.in_progress.is_empty() && self.completed.is_empty()
    }
}

pub async fn load_board<S: CourseStore + ?Sized>(store: &S) -> Result<SummaryBoard> {
    let records = store.get_all().await.context("failed to load courses")?;
    Ok(SummaryBoard::from_records(&records))
}

pub async fn course_summary<S: CourseStore + ?Sized>(
    store: &S,
    playlist_id: &str,
) -> Result<Option<CourseSummary>> {
    let record = store.get(playlist_id).await?;
    Ok(record.map(|record| CourseSummary::new(playlist_id, &record)))
}

/// Clears all progress of a course, invested time included. Returns the
/// updated record, or `None` when nothing is stored under `playlist_id`.
pub async fn reset_course<S: CourseStore + ?Sized>(
    store: &S,
    playlist_id: &str,
) -> Result<Option<CourseRecord>> {
    update_course(store, playlist_id, CourseRecord::reset_progress).await
}

pub async fn mark_all_watched<S: CourseStore + ?Sized>(
    store: &S,
    playlist_id: &str,
) -> Result<Option<CourseRecord>> {
    update_course(store, playlist_id, CourseRecord::mark_all_watched).await
}

pub async fn delete_course<S: CourseStore + ?Sized>(store: &S, playlist_id: &str) -> Result<()> {
    store
        .remove(playlist_id)
        .await
        .with_context(|| format!("failed to delete course {playlist_id}"))
}

/// Pretty-printed JSON of every stored record keyed by playlist id, in the
/// same shape the store persists.
pub async fn export_courses<S: CourseStore + ?Sized>(store: &S) -> Result<String> {
    let records = store.get_all().await?;
    serde_json::to_string_pretty(&records).context("failed to serialize courses")
}

async fn update_course<S, F>(store: &S, playlist_id: &str, apply: F) -> Result<Option<CourseRecord>>
where
    S: CourseStore + ?Sized,
    F: FnOnce(&mut CourseRecord),
{
    let Some(mut record) = store.get(playlist_id).await? else {
        return Ok(None);
    };
    apply(&mut record);
    store
        .set(playlist_id, &record)
        .await
        .with_context(|| format!("failed to update course {playlist_id}"))?;
    Ok(Some(record))
}
