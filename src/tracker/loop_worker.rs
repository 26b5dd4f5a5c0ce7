use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::TimeSpan;
use crate::page::Visibility;

use super::Accrual;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub(super) async fn accrual_loop<A: Accrual>(
    period: Duration,
    mut visibility: watch::Receiver<Visibility>,
    accrual: A,
    cancel_token: CancellationToken,
) {
    loop {
        // Park while hidden.
        loop {
            let hidden = *visibility.borrow_and_update() == Visibility::Hidden;
            if !hidden {
                break;
            }
            tokio::select! {
                _ = cancel_token.cancelled() => return,
                changed = visibility.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        // Every visible stretch starts a fresh interval.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    log_debug!("invested-time tracker stopped");
                    return;
                }
                changed = visibility.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *visibility.borrow_and_update() == Visibility::Hidden {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !accrual.accrue(TimeSpan::from(period)).await {
                        return;
                    }
                }
            }
        }
    }
}
