//! Suspension points of the sync pipeline: waiting for something to show up
//! on the host page.

use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::page::{HostPage, NodeRef, Scope};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The session was superseded. Never surfaced to the user.
    #[error("superseded by a newer sync session")]
    Cancelled,
    #[error("nothing appeared within {0:?}")]
    Timeout(Duration),
    /// The host closed the change feed, so the target can no longer appear.
    #[error("change feed closed before the target appeared")]
    Detached,
}

/// Whether an error chain bottoms out in [`WaitError::Cancelled`].
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<WaitError>(), Some(WaitError::Cancelled))
}

pub fn is_timeout(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<WaitError>(), Some(WaitError::Timeout(_)))
}

/// Resolves with the first `Some` produced by `probe`.
///
/// The probe runs once up front and then after every structural change under
/// `scope`. Without a `timeout` the wait is bounded only by `token`.
pub async fn wait_for<P, T, F>(
    page: &P,
    scope: Scope,
    token: &CancellationToken,
    timeout: Option<Duration>,
    mut probe: F,
) -> Result<T, WaitError>
where
    P: HostPage + ?Sized,
    F: FnMut(&P) -> Option<T>,
{
    if token.is_cancelled() {
        return Err(WaitError::Cancelled);
    }

    // Subscribe before probing so a change landing in between is not lost.
    let mut changes = page.observe(scope);
    if let Some(found) = probe(page) {
        return Ok(found);
    }

    let deadline = timeout.map(|limit| (Instant::now() + limit, limit));
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(WaitError::Cancelled),
            limit = expired(deadline) => return Err(WaitError::Timeout(limit)),
            change = changes.recv() => match change {
                Some(_) => {
                    if let Some(found) = probe(page) {
                        return Ok(found);
                    }
                }
                None => return Err(WaitError::Detached),
            },
        }
    }
}

/// Scrolls `list` to its end and resolves with the next batch of nodes
/// appended directly under it.
pub async fn wait_for_batch<P>(
    page: &P,
    list: NodeRef,
    token: &CancellationToken,
    timeout: Duration,
) -> Result<Vec<NodeRef>, WaitError>
where
    P: HostPage + ?Sized,
{
    if token.is_cancelled() {
        return Err(WaitError::Cancelled);
    }

    let mut changes = page.observe(Scope::Node(list));
    page.scroll_to_end();

    let deadline = Some((Instant::now() + timeout, timeout));
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(WaitError::Cancelled),
            limit = expired(deadline) => return Err(WaitError::Timeout(limit)),
            change = changes.recv() => match change {
                Some(mutation) if mutation.target == list && !mutation.added.is_empty() => {
                    return Ok(mutation.added);
                }
                Some(_) => {}
                None => return Err(WaitError::Detached),
            },
        }
    }
}

async fn expired(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, limit)) => {
            sleep_until(at).await;
            limit
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Anchor;
    use crate::test_support::{FakeItem, FakePage};

    #[tokio::test]
    async fn resolves_immediately_when_present() {
        let page = FakePage::new();
        let node = page.add_anchor(Anchor::WatchHeader);
        let token = CancellationToken::new();

        let found = wait_for(&*page, Scope::Document, &token, None, |p| p.find(Anchor::WatchHeader))
            .await
            .unwrap();
        assert_eq!(found, node);
        assert_eq!(page.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn resolves_when_node_is_inserted_later() {
        let page = FakePage::new();
        let token = CancellationToken::new();

        let waiter = {
            let page = page.clone();
            let token = token.clone();
            tokio::spawn(async move {
                wait_for(&*page, Scope::Document, &token, None, |p| p.find(Anchor::WatchHeader)).await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(page.subscriber_count(), 1);

        let node = page.add_anchor(Anchor::WatchHeader);
        assert_eq!(waiter.await.unwrap(), Ok(node));
        assert_eq!(page.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_wait() {
        let page = FakePage::new();
        let token = CancellationToken::new();

        let waiter = {
            let page = page.clone();
            let token = token.clone();
            tokio::spawn(async move {
                wait_for(&*page, Scope::Document, &token, None, |p| p.find(Anchor::WatchHeader)).await
            })
        };
        tokio::task::yield_now().await;
        token.cancel();

        assert_eq!(waiter.await.unwrap(), Err(WaitError::Cancelled));
        assert_eq!(page.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn already_cancelled_token_fails_fast() {
        let page = FakePage::new();
        page.add_anchor(Anchor::WatchHeader);
        let token = CancellationToken::new();
        token.cancel();

        let result = wait_for(&*page, Scope::Document, &token, None, |p| p.find(Anchor::WatchHeader)).await;
        assert_eq!(result, Err(WaitError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_wait_times_out() {
        let page = FakePage::new();
        let token = CancellationToken::new();
        let limit = Duration::from_secs(120);

        let result = wait_for(&*page, Scope::Document, &token, Some(limit), |p| {
            p.header_labels().classify()
        })
        .await;
        assert_eq!(result, Err(WaitError::Timeout(limit)));
    }

    #[tokio::test]
    async fn scoped_wait_ignores_changes_elsewhere() {
        let page = FakePage::new();
        let list = page.add_list(Anchor::PlaylistContents, vec![FakeItem::video("a", None)]);
        let item = page.entries_of(list)[0];
        let token = CancellationToken::new();

        let waiter = {
            let page = page.clone();
            let token = token.clone();
            tokio::spawn(async move {
                wait_for(&*page, Scope::Node(item), &token, None, |p| p.duration_label(item)).await
            })
        };
        tokio::task::yield_now().await;
        page.add_anchor(Anchor::WatchHeader);
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        page.set_duration(item, "4:20");
        assert_eq!(waiter.await.unwrap(), Ok("4:20".to_string()));
    }

    #[tokio::test]
    async fn batch_wait_returns_appended_nodes() {
        let page = FakePage::new();
        let list = page.add_list(
            Anchor::PlaylistContents,
            vec![FakeItem::video("a", Some("1:00")), FakeItem::Continuation],
        );
        page.queue_page(vec![FakeItem::video("b", Some("2:00")), FakeItem::video("c", Some("3:00"))]);
        let token = CancellationToken::new();

        let added = wait_for_batch(&*page, list, &token, Duration::from_secs(60)).await.unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(page.scroll_to_end_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_wait_times_out_when_nothing_loads() {
        let page = FakePage::new();
        let list = page.add_list(Anchor::PlaylistContents, vec![FakeItem::Continuation]);
        let token = CancellationToken::new();

        let result = wait_for_batch(&*page, list, &token, Duration::from_secs(60)).await;
        assert_eq!(result, Err(WaitError::Timeout(Duration::from_secs(60))));
    }

    #[test]
    fn cancellation_survives_context() {
        let err = anyhow::Error::new(WaitError::Cancelled).context("rendering checkboxes");
        assert!(is_cancelled(&err));
        assert!(!is_timeout(&err));
        assert!(!is_cancelled(&anyhow::anyhow!("boom")));
    }
}
