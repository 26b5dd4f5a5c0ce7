use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::TimeSpan;

/// Everything tracked for one playlist, stored under its playlist id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourseRecord {
    pub video_watch_status: BTreeMap<String, bool>,
    pub total_duration: TimeSpan,
    pub watched_duration: TimeSpan,
    pub invested_time: TimeSpan,
    pub course_name: Option<String>,
    pub course_img_src: Option<String>,
}

impl CourseRecord {
    /// A freshly scanned course: every video unwatched, counters at zero.
    pub fn enroll(
        video_ids: impl IntoIterator<Item = String>,
        total_duration: TimeSpan,
        course_name: Option<String>,
        course_img_src: Option<String>,
    ) -> Self {
        Self {
            video_watch_status: video_ids.into_iter().map(|id| (id, false)).collect(),
            total_duration,
            watched_duration: TimeSpan::ZERO,
            invested_time: TimeSpan::ZERO,
            course_name,
            course_img_src,
        }
    }

    pub fn is_enrolled(&self) -> bool {
        !self.video_watch_status.is_empty()
    }

    pub fn is_watched(&self, video_id: &str) -> bool {
        self.video_watch_status.get(video_id).copied().unwrap_or(false)
    }

    pub fn watched_count(&self) -> usize {
        self.video_watch_status.values().filter(|watched| **watched).count()
    }

    pub fn total_count(&self) -> usize {
        self.video_watch_status.len()
    }

    pub fn completion_percent(&self) -> u8 {
        self.watched_duration.percent_of(self.total_duration)
    }

    /// Records a checkbox toggle. Watched time only moves when the status
    /// actually flips, so repeated unchecks cannot drain it.
    ///
    /// Returns whether anything changed.
    pub fn set_watched(&mut self, video_id: &str, watched: bool, duration: TimeSpan) -> bool {
        let previous = self.is_watched(video_id);
        self.video_watch_status.insert(video_id.to_string(), watched);
        if previous == watched {
            return false;
        }
        self.watched_duration = if watched {
            self.watched_duration + duration
        } else {
            self.watched_duration.saturating_sub(duration)
        };
        true
    }

    /// Marks every video unwatched and clears watched and invested time.
    pub fn reset_progress(&mut self) {
        for watched in self.video_watch_status.values_mut() {
            *watched = false;
        }
        self.watched_duration = TimeSpan::ZERO;
        self.invested_time = TimeSpan::ZERO;
    }

    pub fn mark_all_watched(&mut self) {
        for watched in self.video_watch_status.values_mut() {
            *watched = true;
        }
        self.watched_duration = self.total_duration;
    }

    pub fn stats(&self) -> ProgressStats {
        ProgressStats::from(self)
    }
}

/// Numbers shown by the progress panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub watched: TimeSpan,
    pub total: TimeSpan,
    pub invested: TimeSpan,
    pub watched_videos: usize,
    pub total_videos: usize,
    pub percent: u8,
}

impl From<&CourseRecord> for ProgressStats {
    fn from(record: &CourseRecord) -> Self {
        Self {
            watched: record.watched_duration,
            total: record.total_duration,
            invested: record.invested_time,
            watched_videos: record.watched_count(),
            total_videos: record.total_count(),
            percent: record.completion_percent(),
        }
    }
}
