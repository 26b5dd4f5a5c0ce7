//! The host page as the engine sees it.
//!
//! Selectors, markup and the actual DOM live behind [`HostPage`] (reads and
//! change feeds) and [`Overlay`] (everything the engine draws). The engine
//! only ever asks for logical anchors and list entries.

pub mod overlay;

pub use overlay::{Overlay, StartButton};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

/// Which logical page the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageKind {
    Watch,
    Playlist,
    None,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::Watch => "watch",
            PageKind::Playlist => "playlist",
            PageKind::None => "none",
        }
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationAction {
    EnteredWatchPage,
    EnteredPlaylistPage,
    EnteredOtherPage,
}

/// Announced by the extension transport once per in-app navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSignal {
    pub action: NavigationAction,
    pub playlist_id: Option<String>,
}

impl NavigationSignal {
    pub fn watch(playlist_id: impl Into<String>) -> Self {
        Self {
            action: NavigationAction::EnteredWatchPage,
            playlist_id: Some(playlist_id.into()),
        }
    }

    pub fn playlist(playlist_id: impl Into<String>) -> Self {
        Self {
            action: NavigationAction::EnteredPlaylistPage,
            playlist_id: Some(playlist_id.into()),
        }
    }

    pub fn other() -> Self {
        Self {
            action: NavigationAction::EnteredOtherPage,
            playlist_id: None,
        }
    }

    pub fn page_kind(&self) -> PageKind {
        match self.action {
            NavigationAction::EnteredWatchPage => PageKind::Watch,
            NavigationAction::EnteredPlaylistPage => PageKind::Playlist,
            NavigationAction::EnteredOtherPage => PageKind::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Where the playlist page puts the progress panel and start button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Wide,
    Narrow,
}

impl Layout {
    pub fn for_width(width: u32, wide_min_width: u32) -> Self {
        if width >= wide_min_width {
            Layout::Wide
        } else {
            Layout::Narrow
        }
    }
}

/// Logical places on the host page. The host maps each to its own markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Item list of the playlist panel next to the player.
    WatchPlaylistItems,
    /// Title row of that panel; start buttons go here.
    WatchPlaylistMenu,
    /// Header of that panel; the progress panel goes here.
    WatchHeader,
    /// Video list on the playlist page.
    PlaylistContents,
    ProgressSlot { layout: Layout, course_style: bool },
    StartSlot { layout: Layout, course_style: bool },
}

/// Opaque handle to a node the host knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub u64);

/// Subtree a wait listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Document,
    Node(NodeRef),
}

/// One structural change: `added` nodes appeared under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub target: NodeRef,
    pub added: Vec<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoItem {
    pub node: NodeRef,
    /// `None` when the item has no link to a video yet.
    pub video_id: Option<String>,
}

/// A child of a video list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Video(VideoItem),
    /// Placeholder that loads more items once scrolled into view.
    Continuation,
    Other,
}

impl ListEntry {
    pub fn is_continuation(&self) -> bool {
        matches!(self, ListEntry::Continuation)
    }
}

/// Texts of the header badges used to tell course-style playlists apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLabels {
    pub course_badges: Vec<String>,
    pub playlist_badges: Vec<String>,
}

impl HeaderLabels {
    /// `Some(true)` for a course, `Some(false)` for a plain playlist or
    /// podcast, `None` while the header has not rendered.
    pub fn classify(&self) -> Option<bool> {
        if self
            .course_badges
            .iter()
            .any(|text| text.trim().eq_ignore_ascii_case("course"))
        {
            return Some(true);
        }
        if self.playlist_badges.iter().any(|text| {
            let text = text.trim();
            text.eq_ignore_ascii_case("playlist") || text.eq_ignore_ascii_case("podcast")
        }) {
            return Some(false);
        }
        None
    }
}

/// Name and cover captured when a course is first enrolled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseSnapshot {
    pub name: Option<String>,
    /// Data URI of the cover image.
    pub image: Option<String>,
}

/// Read side of the host page.
pub trait HostPage: Send + Sync + 'static {
    fn find(&self, anchor: Anchor) -> Option<NodeRef>;

    /// Current children of a list node, in document order.
    fn entries(&self, list: NodeRef) -> Vec<ListEntry>;

    fn entry(&self, node: NodeRef) -> ListEntry;

    /// Text of an item's duration badge, if rendered.
    fn duration_label(&self, item: NodeRef) -> Option<String>;

    fn find_video(&self, video_id: &str) -> Option<NodeRef>;

    /// Subscribes to structural changes under `scope`. Dropping the receiver
    /// unsubscribes.
    fn observe(&self, scope: Scope) -> mpsc::UnboundedReceiver<Mutation>;

    /// Whether the host's own navigation progress bar has finished.
    fn navigation_settled(&self) -> bool;

    fn header_labels(&self) -> HeaderLabels;

    fn viewport_width(&self) -> watch::Receiver<u32>;

    fn scroll_offset(&self) -> f64;

    fn scroll_to(&self, offset: f64);

    /// Scrolls the document far enough to bring a continuation into view.
    fn scroll_to_end(&self);

    fn course_snapshot(&self, page: PageKind) -> CourseSnapshot;
}
