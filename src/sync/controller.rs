use std::sync::{Arc, Weak};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::{broadcast::error::RecvError, watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::{CourseRecord, TimeSpan};
use crate::page::{
    Anchor, HostPage, Layout, ListEntry, NavigationSignal, NodeRef, Overlay, PageKind, Scope,
    StartButton, Visibility,
};
use crate::scanner::{scan_playlist, PageBatchSource};
use crate::settings::TrackerSettings;
use crate::store::{CourseStore, StorageChange};
use crate::tracker::{Accrual, InvestedTimeTracker};

use super::plan::{plan_navigation, SyncPlan};
use super::session::PageSyncSession;
use super::wait::{is_cancelled, is_timeout, wait_for, WaitError};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

struct ControllerState {
    page: PageKind,
    playlist_id: Option<String>,
    /// Working copy of the stored record for `loaded_playlist_id`.
    record: CourseRecord,
    /// Playlist whose record the last full sync loaded. Lags `playlist_id`
    /// while a full sync is still waiting for the host.
    loaded_playlist_id: Option<String>,
    course_style: bool,
    session: Option<Arc<PageSyncSession>>,
    tracker: InvestedTimeTracker,
    layout: Option<Layout>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            page: PageKind::None,
            playlist_id: None,
            record: CourseRecord::default(),
            loaded_playlist_id: None,
            course_style: false,
            session: None,
            tracker: InvestedTimeTracker::new(),
            layout: None,
        }
    }
}

struct Inner<P, O, S> {
    page: Arc<P>,
    overlay: Arc<O>,
    store: Arc<S>,
    settings: TrackerSettings,
    state: Mutex<ControllerState>,
    visibility: watch::Sender<Visibility>,
}

/// Owns the per-page sync pipeline for one tab.
///
/// Every navigation starts a fresh [`PageSyncSession`] and cancels the one
/// before it, so at most one pipeline ever writes to the page. Page writes
/// happen under the state lock right after checking that the writing
/// session is still current.
pub struct PageController<P, O, S> {
    inner: Arc<Inner<P, O, S>>,
}

impl<P, O, S> Clone for PageController<P, O, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Background pipeline started by a navigation or storage change.
pub struct PipelineHandle(Option<JoinHandle<()>>);

impl PipelineHandle {
    fn idle() -> Self {
        Self(None)
    }

    pub fn is_idle(&self) -> bool {
        self.0.is_none()
    }

    /// Waits until the pipeline has finished, been superseded or failed.
    pub async fn finished(self) {
        if let Some(handle) = self.0 {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    log_error!("Page sync pipeline panicked: {err}");
                }
            }
        }
    }
}

impl<P: HostPage, O: Overlay, S: CourseStore> PageController<P, O, S> {
    pub fn new(page: Arc<P>, overlay: Arc<O>, store: Arc<S>, settings: TrackerSettings) -> Self {
        let (visibility, _) = watch::channel(Visibility::Visible);
        Self {
            inner: Arc::new(Inner {
                page,
                overlay,
                store,
                settings,
                state: Mutex::new(ControllerState::default()),
                visibility,
            }),
        }
    }

    pub async fn current_page(&self) -> PageKind {
        self.inner.state.lock().await.page
    }

    pub async fn playlist_id(&self) -> Option<String> {
        self.inner.state.lock().await.playlist_id.clone()
    }

    pub async fn record(&self) -> CourseRecord {
        self.inner.state.lock().await.record.clone()
    }

    pub async fn is_course_style(&self) -> bool {
        self.inner.state.lock().await.course_style
    }

    pub async fn is_tracking(&self) -> bool {
        self.inner.state.lock().await.tracker.is_running()
    }

    pub async fn active_session_id(&self) -> Option<Uuid> {
        self.inner
            .state
            .lock()
            .await
            .session
            .as_ref()
            .map(|session| session.id())
    }

    pub async fn handle_navigation(&self, signal: NavigationSignal) -> PipelineHandle {
        let mut state = self.inner.state.lock().await;
        let plan = plan_navigation(state.page, state.loaded_playlist_id.as_deref(), &signal);
        log_debug!(
            "navigation {:?} ({:?}) from {} page: {plan:?}",
            signal.action,
            signal.playlist_id,
            state.page
        );

        match plan {
            SyncPlan::Leave => {
                self.leave(&mut state);
                PipelineHandle::idle()
            }
            SyncPlan::Partial => {
                if !state.record.is_enrolled() {
                    return PipelineHandle::idle();
                }
                let session = Self::begin_session(&mut state, PageKind::Watch);
                drop(state);
                self.spawn_pipeline(session, true)
            }
            SyncPlan::Full(page) => {
                // The previous course stays out of reach until the new
                // record is loaded.
                state.tracker.stop();
                state.record = CourseRecord::default();
                state.loaded_playlist_id = None;
                state.page = page;
                state.playlist_id = signal.playlist_id;
                let session = Self::begin_session(&mut state, page);
                drop(state);
                self.spawn_pipeline(session, false)
            }
        }
    }

    /// Reacts to a write on the course store.
    ///
    /// Enrollment and deletion of the tracked playlist rebuild the page;
    /// any other update refreshes the panel and checkboxes in place.
    pub async fn handle_storage_change(&self, change: StorageChange) -> PipelineHandle {
        let mut state = self.inner.state.lock().await;
        if state.page == PageKind::None
            || state.playlist_id.as_deref() != Some(change.playlist_id.as_str())
        {
            return PipelineHandle::idle();
        }

        if change.is_presence_change() {
            log_info!(
                "course {} {}, rebuilding {} page",
                change.playlist_id,
                if change.new_value.is_some() { "enrolled" } else { "removed" },
                state.page
            );
            return self.restart_locked(state);
        }

        // A pending full sync loads the record itself.
        if state.loaded_playlist_id.as_deref() != Some(change.playlist_id.as_str()) {
            return PipelineHandle::idle();
        }
        let Some(record) = change.new_value else {
            return PipelineHandle::idle();
        };
        state.record = record;

        let overlay = &self.inner.overlay;
        overlay.update_progress(&state.record.stats());
        for (video_id, watched) in &state.record.video_watch_status {
            overlay.set_checkbox(video_id, *watched);
        }
        PipelineHandle::idle()
    }

    /// Full rebuild of whatever page is current.
    pub async fn resync(&self) -> PipelineHandle {
        let state = self.inner.state.lock().await;
        if state.page == PageKind::None {
            return PipelineHandle::idle();
        }
        self.restart_locked(state)
    }

    pub fn handle_visibility_change(&self, visibility: Visibility) {
        self.inner.visibility.send_replace(visibility);
    }

    /// Scans the current playlist and stores it as a new course. The page
    /// is rebuilt once the store reports the new record.
    pub async fn start_course(&self) {
        let Some(session) = self.current_session().await else {
            return;
        };
        let outcome = self.enroll(&session).await;
        self.log_outcome(&session, "course enrollment", &outcome);
    }

    pub async fn toggle_video(&self, video_id: &str, watched: bool) {
        let Some(session) = self.current_session().await else {
            return;
        };
        let outcome = self.apply_toggle(&session, video_id, watched).await;
        self.log_outcome(&session, "checkbox toggle", &outcome);
    }

    pub async fn delete_course(&self) {
        let playlist_id = {
            let mut state = self.inner.state.lock().await;
            state.tracker.stop();
            if let Some(session) = &state.session {
                session.release();
            }
            state.playlist_id.clone()
        };
        let Some(playlist_id) = playlist_id else {
            return;
        };

        if let Err(err) = self.inner.store.remove(&playlist_id).await {
            log_warn!("Failed to delete course {playlist_id}: {err:#}");
        }
    }

    /// Cancels the running session and removes everything drawn.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        self.leave(&mut state);
    }

    /// Forwards store notifications to [`Self::handle_storage_change`] until
    /// the store or the controller goes away.
    pub fn spawn_storage_listener(&self) -> JoinHandle<()> {
        let mut changes = self.inner.store.subscribe();
        let inner = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let received = changes.recv().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let controller = PageController { inner };
                match received {
                    Ok(change) => {
                        controller.handle_storage_change(change).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        log_warn!("Missed {missed} storage notifications, resyncing");
                        controller.resync().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn begin_session(state: &mut ControllerState, page: PageKind) -> Arc<PageSyncSession> {
        if let Some(previous) = state.session.take() {
            previous.cancel();
        }
        let session = PageSyncSession::new(page);
        state.session = Some(session.clone());
        session
    }

    fn restart_locked(&self, mut state: MutexGuard<'_, ControllerState>) -> PipelineHandle {
        let page = state.page;
        let session = Self::begin_session(&mut state, page);
        drop(state);
        self.spawn_pipeline(session, false)
    }

    fn spawn_pipeline(&self, session: Arc<PageSyncSession>, partial: bool) -> PipelineHandle {
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = if partial {
                controller.partial_sync(&session).await
            } else {
                controller.full_sync(&session).await
            };
            if matches!(&outcome, Err(err) if !is_cancelled(err)) {
                session.release();
            }
            controller.log_outcome(&session, "page sync", &outcome);
        });
        PipelineHandle(Some(handle))
    }

    fn log_outcome(&self, session: &PageSyncSession, action: &str, outcome: &Result<()>) {
        match outcome {
            Ok(()) => log_debug!("{action} on {} page done ({})", session.page(), session.id()),
            Err(err) if is_cancelled(err) => {
                log_debug!("{action} on {} page superseded ({})", session.page(), session.id())
            }
            Err(err) if is_timeout(err) => {
                log_warn!("Gave up during {action} on {} page: {err:#}", session.page())
            }
            Err(err) => {
                log_error!("Unexpected error during {action} on {} page: {err:#}", session.page())
            }
        }
    }

    async fn current_session(&self) -> Option<Arc<PageSyncSession>> {
        self.inner.state.lock().await.session.clone()
    }

    async fn lock_active(
        &self,
        session: &PageSyncSession,
    ) -> Result<MutexGuard<'_, ControllerState>, WaitError> {
        let state = self.inner.state.lock().await;
        session.ensure_active()?;
        Ok(state)
    }

    fn leave(&self, state: &mut ControllerState) {
        if let Some(session) = state.session.take() {
            session.cancel();
        }
        self.teardown(state);
        state.page = PageKind::None;
        state.playlist_id = None;
        state.loaded_playlist_id = None;
        state.record = CourseRecord::default();
    }

    fn teardown(&self, state: &mut ControllerState) {
        let overlay = &self.inner.overlay;
        overlay.remove_start_button();
        overlay.remove_checkboxes();
        overlay.remove_progress();
        overlay.hide_scanning();
        state.tracker.stop();
        state.layout = None;
        state.course_style = false;
    }

    async fn load_record(&self, playlist_id: Option<&str>) -> CourseRecord {
        let Some(playlist_id) = playlist_id else {
            return CourseRecord::default();
        };
        match self.inner.store.get(playlist_id).await {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                log_warn!("Failed to load course {playlist_id}, treating as not enrolled: {err:#}");
                CourseRecord::default()
            }
        }
    }

    async fn persist(&self, playlist_id: &str, record: &CourseRecord) {
        if let Err(err) = self.inner.store.set(playlist_id, record).await {
            log_warn!("Failed to save course {playlist_id}: {err:#}");
        }
    }

    async fn full_sync(&self, session: &Arc<PageSyncSession>) -> Result<()> {
        let page = &*self.inner.page;
        wait_for(page, Scope::Document, session.token(), None, |p| {
            p.navigation_settled().then_some(())
        })
        .await?;

        let playlist_id = {
            let mut state = self.lock_active(session).await?;
            self.teardown(&mut state);
            state.playlist_id.clone()
        };

        let record = self.load_record(playlist_id.as_deref()).await;
        {
            let mut state = self.lock_active(session).await?;
            state.record = record;
            state.loaded_playlist_id = playlist_id;
        }

        match session.page() {
            PageKind::Watch => self.sync_watch_page(session).await,
            PageKind::Playlist => self.sync_playlist_page(session).await,
            PageKind::None => Ok(()),
        }
    }

    async fn partial_sync(&self, session: &Arc<PageSyncSession>) -> Result<()> {
        let page = &*self.inner.page;
        let token = session.token();
        wait_for(page, Scope::Document, token, None, |p| {
            p.navigation_settled().then_some(())
        })
        .await?;

        {
            let _state = self.lock_active(session).await?;
            self.inner.overlay.remove_checkboxes();
        }

        let items = wait_for(page, Scope::Document, token, None, |p| {
            p.find(Anchor::WatchPlaylistItems)
        })
        .await?;
        let state = self.lock_active(session).await?;
        self.attach_checkboxes(&state.record, items);
        Ok(())
    }

    async fn sync_watch_page(&self, session: &Arc<PageSyncSession>) -> Result<()> {
        let page = &*self.inner.page;
        let overlay = &self.inner.overlay;
        let token = session.token();

        let items = wait_for(page, Scope::Document, token, None, |p| {
            p.find(Anchor::WatchPlaylistItems)
        })
        .await?;
        let enrolled = self.lock_active(session).await?.record.is_enrolled();

        if enrolled {
            let header =
                wait_for(page, Scope::Document, token, None, |p| p.find(Anchor::WatchHeader))
                    .await?;
            let mut state = self.lock_active(session).await?;
            overlay.remove_start_button();
            overlay.show_progress(PageKind::Watch, header, &state.record.stats());
            self.attach_checkboxes(&state.record, items);
            self.restart_tracker(&mut state);
            overlay.update_progress(&state.record.stats());
        } else {
            let menu = wait_for(page, Scope::Document, token, None, |p| {
                p.find(Anchor::WatchPlaylistMenu)
            })
            .await?;
            let _state = self.lock_active(session).await?;
            overlay.remove_progress();
            overlay.remove_checkboxes();
            let videos = page
                .entries(items)
                .iter()
                .filter(|entry| matches!(entry, ListEntry::Video(_)))
                .count();
            overlay.show_start_button(PageKind::Watch, menu, self.watch_start_button(videos));
        }
        Ok(())
    }

    fn watch_start_button(&self, videos: usize) -> StartButton {
        let threshold = self.inner.settings.large_playlist_threshold;
        if videos >= threshold {
            StartButton::Disabled {
                reason: format!(
                    "Playlists with {threshold} or more videos can only be started from the playlist page"
                ),
            }
        } else {
            StartButton::Enabled
        }
    }

    async fn sync_playlist_page(&self, session: &Arc<PageSyncSession>) -> Result<()> {
        let page = &*self.inner.page;
        let overlay = &self.inner.overlay;
        let settings = &self.inner.settings;
        let token = session.token();

        let classify_timeout = settings.classify_timeout();
        let course_style = match wait_for(page, Scope::Document, token, Some(classify_timeout), |p| {
            p.header_labels().classify()
        })
        .await
        {
            Ok(course_style) => course_style,
            Err(WaitError::Timeout(after)) => {
                log_warn!("Playlist header not recognised within {after:?}, treating as a plain playlist");
                false
            }
            Err(err) => return Err(err.into()),
        };

        let enrolled = {
            let mut state = self.lock_active(session).await?;
            state.course_style = course_style;
            state.record.is_enrolled()
        };
        self.register_layout_listener(session);

        if enrolled {
            let slot = wait_for(page, Scope::Document, token, None, |p| {
                p.find(Anchor::ProgressSlot {
                    layout: Layout::Wide,
                    course_style,
                })
            })
            .await?;
            let contents = wait_for(page, Scope::Document, token, None, |p| {
                p.find(Anchor::PlaylistContents)
            })
            .await?;

            let mut state = self.lock_active(session).await?;
            overlay.remove_start_button();
            overlay.show_progress(PageKind::Playlist, slot, &state.record.stats());
            self.attach_checkboxes(&state.record, contents);
            if page
                .entries(contents)
                .last()
                .is_some_and(ListEntry::is_continuation)
            {
                self.watch_lazy_items(session, contents);
            }
            self.restart_tracker(&mut state);
            overlay.update_progress(&state.record.stats());
        } else {
            let slot = wait_for(page, Scope::Document, token, None, |p| {
                p.find(Anchor::StartSlot {
                    layout: Layout::Wide,
                    course_style,
                })
            })
            .await?;
            let _state = self.lock_active(session).await?;
            overlay.remove_progress();
            overlay.remove_checkboxes();
            overlay.show_start_button(PageKind::Playlist, slot, StartButton::Enabled);
        }

        let width = *page.viewport_width().borrow();
        self.apply_layout(session, Layout::for_width(width, settings.wide_layout_min_width))
            .await
    }

    async fn apply_layout(&self, session: &PageSyncSession, layout: Layout) -> Result<()> {
        let page = &*self.inner.page;
        let token = session.token();
        let course_style = self.lock_active(session).await?.course_style;

        let progress_anchor = wait_for(page, Scope::Document, token, None, |p| {
            p.find(Anchor::ProgressSlot {
                layout,
                course_style,
            })
        })
        .await?;
        let start_anchor = wait_for(page, Scope::Document, token, None, |p| {
            p.find(Anchor::StartSlot {
                layout,
                course_style,
            })
        })
        .await?;

        let mut state = self.lock_active(session).await?;
        if state.layout != Some(layout) {
            self.inner.overlay.place(layout, progress_anchor, start_anchor);
            state.layout = Some(layout);
        }
        Ok(())
    }

    fn register_layout_listener(&self, session: &Arc<PageSyncSession>) {
        if !session.claim_layout_listener() {
            return;
        }

        let mut widths = self.inner.page.viewport_width();
        let breakpoint = self.inner.settings.wide_layout_min_width;
        let controller = self.clone();
        let listener_session = session.clone();

        let handle = tokio::spawn(async move {
            let token = listener_session.token().clone();
            let mut current = Layout::for_width(*widths.borrow_and_update(), breakpoint);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = widths.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = Layout::for_width(*widths.borrow_and_update(), breakpoint);
                        if next == current {
                            continue;
                        }
                        current = next;
                        if let Err(err) = controller.apply_layout(&listener_session, next).await {
                            if is_cancelled(&err) {
                                break;
                            }
                            log_warn!("Failed to switch playlist layout: {err:#}");
                        }
                    }
                }
            }
        });
        session.on_release(move || handle.abort());
    }

    /// Checkboxes for items the host appends after the initial render.
    fn watch_lazy_items(&self, session: &Arc<PageSyncSession>, contents: NodeRef) {
        let mut changes = self.inner.page.observe(Scope::Node(contents));
        let controller = self.clone();
        let watcher_session = session.clone();

        let handle = tokio::spawn(async move {
            let token = watcher_session.token().clone();
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    change = changes.recv() => {
                        let Some(mutation) = change else {
                            break;
                        };
                        if mutation.target != contents || mutation.added.is_empty() {
                            continue;
                        }
                        let Ok(state) = controller.lock_active(&watcher_session).await else {
                            break;
                        };
                        for node in mutation.added {
                            controller.attach_checkbox(&state.record, controller.inner.page.entry(node));
                        }
                    }
                }
            }
        });
        session.on_release(move || handle.abort());
    }

    fn attach_checkboxes(&self, record: &CourseRecord, list: NodeRef) {
        for entry in self.inner.page.entries(list) {
            self.attach_checkbox(record, entry);
        }
    }

    fn attach_checkbox(&self, record: &CourseRecord, entry: ListEntry) {
        let ListEntry::Video(item) = entry else {
            return;
        };
        let Some(video_id) = item.video_id else {
            return;
        };
        let overlay = &self.inner.overlay;
        if !overlay.has_checkbox(item.node) {
            overlay.attach_checkbox(item.node, &video_id, record.is_watched(&video_id));
        }
    }

    fn restart_tracker(&self, state: &mut ControllerState) {
        let enrolled = state.record.is_enrolled();
        state.tracker.start(
            enrolled,
            self.inner.settings.tick_interval(),
            self.inner.visibility.subscribe(),
            TrackedCourse {
                inner: Arc::downgrade(&self.inner),
            },
        );
    }

    async fn add_invested_time(&self, elapsed: TimeSpan) {
        let (playlist_id, snapshot) = {
            let mut state = self.inner.state.lock().await;
            let Some(playlist_id) = state.loaded_playlist_id.clone() else {
                return;
            };
            if !state.record.is_enrolled() {
                return;
            }
            state.record.invested_time += elapsed;
            self.inner.overlay.update_progress(&state.record.stats());
            (playlist_id, state.record.clone())
        };
        self.persist(&playlist_id, &snapshot).await;
    }

    async fn enroll(&self, session: &Arc<PageSyncSession>) -> Result<()> {
        let page = &*self.inner.page;
        let overlay = &*self.inner.overlay;
        let token = session.token();

        let list_anchor = match session.page() {
            PageKind::Watch => Anchor::WatchPlaylistItems,
            PageKind::Playlist => Anchor::PlaylistContents,
            PageKind::None => return Ok(()),
        };
        let playlist_id = {
            let state = self.lock_active(session).await?;
            if state.record.is_enrolled() {
                return Ok(());
            }
            match state.loaded_playlist_id.clone() {
                Some(playlist_id) => playlist_id,
                None => return Ok(()),
            }
        };

        let list = wait_for(page, Scope::Document, token, None, |p| p.find(list_anchor)).await?;
        let initial = page.entries(list);
        if initial.is_empty() {
            log_warn!("No videos found in playlist {playlist_id}, nothing to enroll");
            return Ok(());
        }
        if session.page() == PageKind::Watch {
            let videos = initial
                .iter()
                .filter(|entry| matches!(entry, ListEntry::Video(_)))
                .count();
            if let StartButton::Disabled { reason } = self.watch_start_button(videos) {
                log_warn!("Not enrolling playlist {playlist_id} from the watch page: {reason}");
                return Ok(());
            }
        }

        let scroll = page.scroll_offset();
        {
            let _state = self.lock_active(session).await?;
            overlay.remove_start_button();
        }

        let mut source = PageBatchSource::new(page, list, self.inner.settings.pagination_timeout());
        let scanned = scan_playlist(initial, &mut source, token, |progress| {
            if progress.paginated && !token.is_cancelled() {
                overlay.show_scanning(progress.scanned);
            }
        })
        .await;

        {
            let state = self.lock_active(session).await?;
            overlay.hide_scanning();
            page.scroll_to(scroll);
            if scanned.is_err() {
                self.restore_start_button(&state, session.page());
            }
        }
        let scan = scanned?;

        let snapshot = page.course_snapshot(session.page());
        let record = CourseRecord::enroll(
            scan.watch_status.into_keys(),
            scan.total,
            snapshot.name,
            snapshot.image,
        );

        session.ensure_active()?;
        log_info!(
            "enrolling playlist {playlist_id}: {} videos, {}",
            record.total_count(),
            record.total_duration
        );
        self.persist(&playlist_id, &record).await;
        Ok(())
    }

    fn restore_start_button(&self, state: &ControllerState, page_kind: PageKind) {
        let anchor = match page_kind {
            PageKind::Watch => Anchor::WatchPlaylistMenu,
            PageKind::Playlist => Anchor::StartSlot {
                layout: state.layout.unwrap_or(Layout::Wide),
                course_style: state.course_style,
            },
            PageKind::None => return,
        };
        if let Some(node) = self.inner.page.find(anchor) {
            self.inner
                .overlay
                .show_start_button(page_kind, node, StartButton::Enabled);
        }
    }

    async fn apply_toggle(
        &self,
        session: &Arc<PageSyncSession>,
        video_id: &str,
        watched: bool,
    ) -> Result<()> {
        let page = &*self.inner.page;
        let item = page
            .find_video(video_id)
            .ok_or_else(|| anyhow!("no list item for video {video_id}"))?;
        let label = wait_for(page, Scope::Node(item), session.token(), None, |p| {
            p.duration_label(item)
        })
        .await?;
        let duration = TimeSpan::parse(&label);

        let (playlist_id, snapshot) = {
            let mut state = self.lock_active(session).await?;
            let Some(playlist_id) = state.loaded_playlist_id.clone() else {
                return Ok(());
            };
            if !state.record.is_enrolled() || !state.record.set_watched(video_id, watched, duration)
            {
                return Ok(());
            }
            let overlay = &self.inner.overlay;
            overlay.set_checkbox(video_id, watched);
            overlay.update_progress(&state.record.stats());
            (playlist_id, state.record.clone())
        };
        self.persist(&playlist_id, &snapshot).await;
        Ok(())
    }
}

/// Tracker sink that adds to the controller's working record. Holds the
/// controller weakly so a forgotten tracker cannot keep it alive.
struct TrackedCourse<P, O, S> {
    inner: Weak<Inner<P, O, S>>,
}

#[async_trait]
impl<P: HostPage, O: Overlay, S: CourseStore> Accrual for TrackedCourse<P, O, S> {
    async fn accrue(&self, elapsed: TimeSpan) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        PageController { inner }.add_invested_time(elapsed).await;
        true
    }
}
