//! Invested-time accrual while an enrolled course is on screen.

mod loop_worker;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::TimeSpan;
use crate::page::Visibility;

use loop_worker::accrual_loop;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Receives each completed interval.
#[async_trait]
pub trait Accrual: Send + Sync + 'static {
    /// Returns `false` when the owner is gone and the loop should end.
    async fn accrue(&self, elapsed: TimeSpan) -> bool;
}

/// At most one accrual loop at a time. Starting again replaces the running
/// loop; starting for an unenrolled course leaves the tracker idle.
#[derive(Default)]
pub struct InvestedTimeTracker {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl InvestedTimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start<A: Accrual>(
        &mut self,
        enrolled: bool,
        interval: Duration,
        visibility: watch::Receiver<Visibility>,
        accrual: A,
    ) {
        self.stop();
        if !enrolled {
            return;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(accrual_loop(
            interval,
            visibility,
            accrual,
            cancel_token.clone(),
        ));

        log_debug!("invested-time tracker started ({interval:?} ticks)");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for InvestedTimeTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
