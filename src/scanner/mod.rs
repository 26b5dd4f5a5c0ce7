//! Enrollment scan: walks a lazily paginated video list, summing durations
//! and collecting video ids until no continuation marker is left.

mod source;

pub use source::PageBatchSource;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::TimeSpan;
use crate::page::{ListEntry, VideoItem};
use crate::sync::WaitError;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Where the scanner gets durations and further batches from.
#[async_trait]
pub trait BatchSource: Send {
    /// Duration badge text of `item`, waiting for it to render if needed.
    async fn duration_label(&mut self, item: &VideoItem, token: &CancellationToken)
        -> Result<String>;

    /// Triggers loading of the next batch and returns it.
    async fn next_batch(&mut self, token: &CancellationToken) -> Result<Vec<ListEntry>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub scanned: usize,
    /// Set once the first continuation was hit; hosts show the scanning
    /// indicator only then.
    pub paginated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub watch_status: BTreeMap<String, bool>,
    pub total: TimeSpan,
    /// Number of continuation markers followed.
    pub rounds: usize,
}

pub async fn scan_playlist<B>(
    initial: Vec<ListEntry>,
    source: &mut B,
    token: &CancellationToken,
    mut on_progress: impl FnMut(ScanProgress) + Send,
) -> Result<ScanResult>
where
    B: BatchSource + ?Sized,
{
    let mut watch_status = BTreeMap::new();
    let mut total = TimeSpan::ZERO;
    let mut rounds = 0;
    let mut scanned = 0;
    let mut batch = initial;

    loop {
        let mut continuation = false;
        for entry in batch {
            if token.is_cancelled() {
                return Err(WaitError::Cancelled.into());
            }
            match entry {
                ListEntry::Video(item) => {
                    let Some(video_id) = item.video_id.clone() else {
                        continue;
                    };
                    let label = source.duration_label(&item, token).await?;
                    total += TimeSpan::parse(&label);
                    watch_status.insert(video_id, false);
                    scanned += 1;
                    on_progress(ScanProgress {
                        scanned,
                        paginated: rounds > 0,
                    });
                }
                ListEntry::Continuation => {
                    continuation = true;
                    break;
                }
                ListEntry::Other => {}
            }
        }

        if !continuation {
            break;
        }

        rounds += 1;
        on_progress(ScanProgress {
            scanned,
            paginated: true,
        });
        batch = source.next_batch(token).await?;
    }

    log_info!(
        "scanned {} videos ({total}) over {rounds} pagination rounds",
        watch_status.len()
    );

    Ok(ScanResult {
        watch_status,
        total,
        rounds,
    })
}
