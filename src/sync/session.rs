use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::page::PageKind;

use super::wait::WaitError;

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

/// One run of the sync pipeline for one navigation.
///
/// Cancelling a session fires its token, which resolves every pending wait
/// with [`WaitError::Cancelled`], and releases every registered cleanup
/// exactly once.
pub struct PageSyncSession {
    id: Uuid,
    page: PageKind,
    token: CancellationToken,
    // `None` once released.
    cleanups: Mutex<Option<Vec<Cleanup>>>,
    layout_listener: AtomicBool,
}

impl PageSyncSession {
    pub fn new(page: PageKind) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            page,
            token: CancellationToken::new(),
            cleanups: Mutex::new(Some(Vec::new())),
            layout_listener: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn page(&self) -> PageKind {
        self.page
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Gate for every page write the pipeline makes.
    pub fn ensure_active(&self) -> Result<(), WaitError> {
        if self.token.is_cancelled() {
            Err(WaitError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Registers a cleanup. Runs it on the spot if the session was already
    /// released.
    pub fn on_release(&self, cleanup: impl FnOnce() + Send + 'static) {
        let mut guard = self.lock_cleanups();
        if let Some(pending) = guard.as_mut() {
            pending.push(Box::new(cleanup));
            return;
        }
        drop(guard);
        cleanup();
    }

    /// Runs all registered cleanups. Later calls are no-ops.
    pub fn release(&self) {
        let pending = self.lock_cleanups().take();
        for cleanup in pending.into_iter().flatten() {
            cleanup();
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
        self.release();
    }

    /// True for the first caller only; the viewport listener is registered
    /// at most once per session.
    pub fn claim_layout_listener(&self) -> bool {
        !self.layout_listener.swap(true, Ordering::SeqCst)
    }

    fn lock_cleanups(&self) -> MutexGuard<'_, Option<Vec<Cleanup>>> {
        match self.cleanups.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl std::fmt::Debug for PageSyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSyncSession")
            .field("id", &self.id)
            .field("page", &self.page)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hit = count.clone();
        (count, move || {
            hit.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn cleanups_run_exactly_once() {
        let session = PageSyncSession::new(PageKind::Playlist);
        let (first, cleanup_a) = counter();
        let (second, cleanup_b) = counter();
        session.on_release(cleanup_a);
        session.on_release(cleanup_b);

        session.cancel();
        session.cancel();
        session.release();

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(session.is_cancelled());
    }

    #[test]
    fn late_registration_runs_immediately() {
        let session = PageSyncSession::new(PageKind::Watch);
        session.release();

        let (count, cleanup) = counter();
        session.on_release(cleanup);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // Released but not cancelled: pipeline may still finish.
        assert!(session.ensure_active().is_ok());
    }

    #[test]
    fn cancelled_session_rejects_writes() {
        let session = PageSyncSession::new(PageKind::Watch);
        session.cancel();
        assert_eq!(session.ensure_active(), Err(WaitError::Cancelled));
    }

    #[test]
    fn layout_listener_claimed_once() {
        let session = PageSyncSession::new(PageKind::Playlist);
        assert!(session.claim_layout_listener());
        assert!(!session.claim_layout_listener());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let a = PageSyncSession::new(PageKind::Watch);
        let b = PageSyncSession::new(PageKind::Watch);
        assert_ne!(a.id(), b.id());
    }
}
