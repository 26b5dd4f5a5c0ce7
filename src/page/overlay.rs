use crate::models::ProgressStats;

use super::{Layout, NodeRef, PageKind};

/// State of the start-course affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartButton {
    Enabled,
    /// Shown but inert, with the reason surfaced to the user.
    Disabled { reason: String },
}

/// Write side of the host page: everything the tracker draws.
///
/// Implementations own the markup. User actions on what they draw are fed
/// back through the controller (`start_course`, `toggle_video`,
/// `delete_course`).
pub trait Overlay: Send + Sync + 'static {
    fn show_start_button(&self, page: PageKind, anchor: NodeRef, button: StartButton);

    fn remove_start_button(&self);

    fn show_progress(&self, page: PageKind, anchor: NodeRef, stats: &ProgressStats);

    /// Refreshes numbers in an already rendered panel; no-op otherwise.
    fn update_progress(&self, stats: &ProgressStats);

    fn remove_progress(&self);

    fn has_checkbox(&self, item: NodeRef) -> bool;

    fn attach_checkbox(&self, item: NodeRef, video_id: &str, checked: bool);

    fn set_checkbox(&self, video_id: &str, checked: bool);

    fn remove_checkboxes(&self);

    fn show_scanning(&self, scanned: usize);

    fn hide_scanning(&self);

    /// Moves the playlist-page panel and start button next to the anchors
    /// for `layout`.
    fn place(&self, layout: Layout, progress_anchor: NodeRef, start_anchor: NodeRef);
}
