//! Navigation-driven page synchronisation.

mod controller;
mod plan;
mod session;
mod wait;

pub use controller::{PageController, PipelineHandle};
pub use plan::{plan_navigation, SyncPlan};
pub use session::PageSyncSession;
pub use wait::{is_cancelled, is_timeout, wait_for, wait_for_batch, WaitError};
