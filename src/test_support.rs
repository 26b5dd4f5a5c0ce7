//! In-memory host page and recording overlay for tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};

use crate::models::ProgressStats;
use crate::page::{
    Anchor, CourseSnapshot, HeaderLabels, HostPage, Layout, ListEntry, Mutation, NodeRef,
    Overlay, PageKind, Scope, StartButton, VideoItem,
};

const ROOT: NodeRef = NodeRef(0);

/// Item to insert into a fake list.
#[derive(Debug, Clone)]
pub enum FakeItem {
    Video {
        id: String,
        duration: Option<String>,
    },
    Continuation,
    Other,
}

impl FakeItem {
    pub fn video(id: &str, duration: Option<&str>) -> Self {
        FakeItem::Video {
            id: id.to_string(),
            duration: duration.map(str::to_string),
        }
    }
}

#[derive(Default)]
struct Dom {
    next_id: u64,
    anchors: HashMap<Anchor, NodeRef>,
    parents: HashMap<NodeRef, NodeRef>,
    children: HashMap<NodeRef, Vec<NodeRef>>,
    entries: HashMap<NodeRef, ListEntry>,
    durations: HashMap<NodeRef, String>,
    subscribers: Vec<(Scope, mpsc::UnboundedSender<Mutation>)>,
    settled: bool,
    labels: HeaderLabels,
    scroll: f64,
    scroll_to_end_calls: usize,
    lazy_list: Option<NodeRef>,
    pending_pages: VecDeque<Vec<FakeItem>>,
    snapshot: CourseSnapshot,
}

impl Dom {
    fn node(&mut self, parent: NodeRef) -> NodeRef {
        self.next_id += 1;
        let node = NodeRef(self.next_id);
        self.parents.insert(node, parent);
        self.children.entry(parent).or_default().push(node);
        node
    }

    fn within(&self, mut node: NodeRef, ancestor: NodeRef) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parents.get(&node) {
                Some(parent) => node = *parent,
                None => return false,
            }
        }
    }

    fn emit(&mut self, mutation: Mutation) {
        self.subscribers.retain(|(_, tx)| !tx.is_closed());
        let targets: Vec<_> = self
            .subscribers
            .iter()
            .filter(|(scope, _)| match scope {
                Scope::Document => true,
                Scope::Node(node) => self.within(mutation.target, *node),
            })
            .map(|(_, tx)| tx.clone())
            .collect();
        for tx in targets {
            let _ = tx.send(mutation.clone());
        }
    }

    fn append(&mut self, list: NodeRef, items: Vec<FakeItem>) -> Vec<NodeRef> {
        // A loaded batch replaces the continuation that requested it.
        let children = self.children.entry(list).or_default().clone();
        for child in children {
            if matches!(self.entries.get(&child), Some(ListEntry::Continuation)) {
                self.entries.remove(&child);
                self.parents.remove(&child);
                if let Some(siblings) = self.children.get_mut(&list) {
                    siblings.retain(|sibling| *sibling != child);
                }
            }
        }

        let mut added = Vec::new();
        for item in items {
            let node = self.node(list);
            let entry = match item {
                FakeItem::Video { id, duration } => {
                    if let Some(duration) = duration {
                        self.durations.insert(node, duration);
                    }
                    ListEntry::Video(VideoItem {
                        node,
                        video_id: Some(id),
                    })
                }
                FakeItem::Continuation => ListEntry::Continuation,
                FakeItem::Other => ListEntry::Other,
            };
            self.entries.insert(node, entry);
            added.push(node);
        }
        self.emit(Mutation {
            target: list,
            added: added.clone(),
        });
        added
    }
}

pub struct FakePage {
    dom: Mutex<Dom>,
    viewport: watch::Sender<u32>,
}

impl FakePage {
    /// Settled page, 1280px wide, no anchors yet.
    pub fn new() -> Arc<Self> {
        let (viewport, _) = watch::channel(1280);
        Arc::new(Self {
            dom: Mutex::new(Dom {
                settled: true,
                ..Dom::default()
            }),
            viewport,
        })
    }

    fn dom(&self) -> MutexGuard<'_, Dom> {
        self.dom.lock().unwrap()
    }

    pub fn add_anchor(&self, anchor: Anchor) -> NodeRef {
        let mut dom = self.dom();
        let node = dom.node(ROOT);
        dom.anchors.insert(anchor, node);
        dom.emit(Mutation {
            target: ROOT,
            added: vec![node],
        });
        node
    }

    /// Adds a list anchor filled with `items`. The latest list is the one
    /// `scroll_to_end` paginates.
    pub fn add_list(&self, anchor: Anchor, items: Vec<FakeItem>) -> NodeRef {
        let list = self.add_anchor(anchor);
        let mut dom = self.dom();
        dom.lazy_list = Some(list);
        dom.append(list, items);
        list
    }

    pub fn append(&self, list: NodeRef, items: Vec<FakeItem>) -> Vec<NodeRef> {
        self.dom().append(list, items)
    }

    pub fn entries_of(&self, list: NodeRef) -> Vec<NodeRef> {
        self.dom().children.get(&list).cloned().unwrap_or_default()
    }

    pub fn queue_page(&self, items: Vec<FakeItem>) {
        self.dom().pending_pages.push_back(items);
    }

    pub fn set_duration(&self, item: NodeRef, label: &str) {
        let mut dom = self.dom();
        dom.durations.insert(item, label.to_string());
        let badge = dom.node(item);
        dom.emit(Mutation {
            target: item,
            added: vec![badge],
        });
    }

    pub fn set_settled(&self, settled: bool) {
        let mut dom = self.dom();
        dom.settled = settled;
        dom.emit(Mutation {
            target: ROOT,
            added: Vec::new(),
        });
    }

    pub fn set_labels(&self, labels: HeaderLabels) {
        let mut dom = self.dom();
        dom.labels = labels;
        dom.emit(Mutation {
            target: ROOT,
            added: Vec::new(),
        });
    }

    pub fn set_snapshot(&self, snapshot: CourseSnapshot) {
        self.dom().snapshot = snapshot;
    }

    pub fn set_viewport_width(&self, width: u32) {
        self.viewport.send_replace(width);
    }

    pub fn set_scroll(&self, offset: f64) {
        self.dom().scroll = offset;
    }

    pub fn scroll_to_end_calls(&self) -> usize {
        self.dom().scroll_to_end_calls
    }

    pub fn subscriber_count(&self) -> usize {
        let mut dom = self.dom();
        dom.subscribers.retain(|(_, tx)| !tx.is_closed());
        dom.subscribers.len()
    }
}

impl HostPage for FakePage {
    fn find(&self, anchor: Anchor) -> Option<NodeRef> {
        self.dom().anchors.get(&anchor).copied()
    }

    fn entries(&self, list: NodeRef) -> Vec<ListEntry> {
        let dom = self.dom();
        dom.children
            .get(&list)
            .map(|children| {
                children
                    .iter()
                    .map(|child| dom.entries.get(child).cloned().unwrap_or(ListEntry::Other))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn entry(&self, node: NodeRef) -> ListEntry {
        self.dom().entries.get(&node).cloned().unwrap_or(ListEntry::Other)
    }

    fn duration_label(&self, item: NodeRef) -> Option<String> {
        self.dom().durations.get(&item).cloned()
    }

    fn find_video(&self, video_id: &str) -> Option<NodeRef> {
        self.dom().entries.iter().find_map(|(node, entry)| match entry {
            ListEntry::Video(item) if item.video_id.as_deref() == Some(video_id) => Some(*node),
            _ => None,
        })
    }

    fn observe(&self, scope: Scope) -> mpsc::UnboundedReceiver<Mutation> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.dom().subscribers.push((scope, tx));
        rx
    }

    fn navigation_settled(&self) -> bool {
        self.dom().settled
    }

    fn header_labels(&self) -> HeaderLabels {
        self.dom().labels.clone()
    }

    fn viewport_width(&self) -> watch::Receiver<u32> {
        self.viewport.subscribe()
    }

    fn scroll_offset(&self) -> f64 {
        self.dom().scroll
    }

    fn scroll_to(&self, offset: f64) {
        self.dom().scroll = offset;
    }

    fn scroll_to_end(&self) {
        let mut dom = self.dom();
        dom.scroll_to_end_calls += 1;
        dom.scroll = f64::MAX;
        if let (Some(list), Some(page)) = (dom.lazy_list, dom.pending_pages.pop_front()) {
            dom.append(list, page);
        }
    }

    fn course_snapshot(&self, _page: PageKind) -> CourseSnapshot {
        self.dom().snapshot.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    ShowStart(PageKind, StartButton),
    RemoveStart,
    ShowProgress(PageKind, NodeRef),
    UpdateProgress,
    RemoveProgress,
    AttachCheckbox(String),
    SetCheckbox(String, bool),
    RemoveCheckboxes,
    ShowScanning(usize),
    HideScanning,
    Place(Layout),
}

#[derive(Default)]
struct Drawn {
    events: Vec<OverlayEvent>,
    start: Option<StartButton>,
    progress: Option<ProgressStats>,
    checkboxes: BTreeMap<NodeRef, (String, bool)>,
    scanning: Option<usize>,
    layout: Option<Layout>,
}

/// Overlay that remembers what is on screen and every call made.
#[derive(Default)]
pub struct RecordingOverlay {
    drawn: Mutex<Drawn>,
}

impl RecordingOverlay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn drawn(&self) -> MutexGuard<'_, Drawn> {
        self.drawn.lock().unwrap()
    }

    pub fn events(&self) -> Vec<OverlayEvent> {
        self.drawn().events.clone()
    }

    pub fn count(&self, matches: impl Fn(&OverlayEvent) -> bool) -> usize {
        self.drawn().events.iter().filter(|event| matches(event)).count()
    }

    pub fn clear_events(&self) {
        self.drawn().events.clear();
    }

    pub fn start_button(&self) -> Option<StartButton> {
        self.drawn().start.clone()
    }

    pub fn progress(&self) -> Option<ProgressStats> {
        self.drawn().progress.clone()
    }

    pub fn checkbox(&self, video_id: &str) -> Option<bool> {
        self.drawn()
            .checkboxes
            .values()
            .find(|(id, _)| id == video_id)
            .map(|(_, checked)| *checked)
    }

    pub fn checkbox_count(&self) -> usize {
        self.drawn().checkboxes.len()
    }

    pub fn scanning(&self) -> Option<usize> {
        self.drawn().scanning
    }

    pub fn layout(&self) -> Option<Layout> {
        self.drawn().layout
    }
}

impl Overlay for RecordingOverlay {
    fn show_start_button(&self, page: PageKind, _anchor: NodeRef, button: StartButton) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::ShowStart(page, button.clone()));
        drawn.start = Some(button);
    }

    fn remove_start_button(&self) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::RemoveStart);
        drawn.start = None;
    }

    fn show_progress(&self, page: PageKind, anchor: NodeRef, stats: &ProgressStats) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::ShowProgress(page, anchor));
        drawn.progress = Some(stats.clone());
    }

    fn update_progress(&self, stats: &ProgressStats) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::UpdateProgress);
        if drawn.progress.is_some() {
            drawn.progress = Some(stats.clone());
        }
    }

    fn remove_progress(&self) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::RemoveProgress);
        drawn.progress = None;
    }

    fn has_checkbox(&self, item: NodeRef) -> bool {
        self.drawn().checkboxes.contains_key(&item)
    }

    fn attach_checkbox(&self, item: NodeRef, video_id: &str, checked: bool) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::AttachCheckbox(video_id.to_string()));
        drawn.checkboxes.insert(item, (video_id.to_string(), checked));
    }

    fn set_checkbox(&self, video_id: &str, checked: bool) {
        let mut drawn = self.drawn();
        drawn
            .events
            .push(OverlayEvent::SetCheckbox(video_id.to_string(), checked));
        for (id, state) in drawn.checkboxes.values_mut() {
            if id == video_id {
                *state = checked;
            }
        }
    }

    fn remove_checkboxes(&self) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::RemoveCheckboxes);
        drawn.checkboxes.clear();
    }

    fn show_scanning(&self, scanned: usize) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::ShowScanning(scanned));
        drawn.scanning = Some(scanned);
    }

    fn hide_scanning(&self) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::HideScanning);
        drawn.scanning = None;
    }

    fn place(&self, layout: Layout, _progress_anchor: NodeRef, _start_anchor: NodeRef) {
        let mut drawn = self.drawn();
        drawn.events.push(OverlayEvent::Place(layout));
        drawn.layout = Some(layout);
    }
}
