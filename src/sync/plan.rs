use crate::page::{NavigationAction, NavigationSignal, PageKind};

/// What a navigation asks of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    /// Tear everything down and rebuild for this page.
    Full(PageKind),
    /// Same playlist, new video: only re-attach watch-page checkboxes.
    Partial,
    /// Left the tracked pages altogether.
    Leave,
}

/// `loaded_playlist` is the playlist whose record the last full sync loaded;
/// while a full sync is still pending there is none, and nothing is partial.
pub fn plan_navigation(
    last_page: PageKind,
    loaded_playlist: Option<&str>,
    signal: &NavigationSignal,
) -> SyncPlan {
    let Some(playlist_id) = signal.playlist_id.as_deref() else {
        return SyncPlan::Leave;
    };

    match signal.action {
        NavigationAction::EnteredWatchPage
            if last_page == PageKind::Watch && loaded_playlist == Some(playlist_id) =>
        {
            SyncPlan::Partial
        }
        NavigationAction::EnteredWatchPage => SyncPlan::Full(PageKind::Watch),
        NavigationAction::EnteredPlaylistPage => SyncPlan::Full(PageKind::Playlist),
        NavigationAction::EnteredOtherPage => SyncPlan::Leave,
    }
}
