//! Page tree model with resolved icons.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use icontags_core::logging::targets;
use icontags_core::{EventLoop, PerfSpan, Subscriptions};
use parking_lot::{Mutex, RwLock};

use super::traits::{PageTree, RowDisplay, TreePath, TreeSignals};
use crate::cache::ResolutionCache;
use crate::host::{HostEvents, Notebook, PageChange, TagEvent};
use crate::icons::IconRegistry;
use crate::index::IconIndexStore;
use crate::page::{PageId, PageRecord};
use crate::resolve::{self, PageFacts};
use crate::settings::TagIconMap;

struct Node {
    record: PageRecord,
    parent: Option<usize>,
    row: usize,
    children: Vec<usize>,
}

#[derive(Default)]
struct TreeStorage {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    by_page: HashMap<PageId, usize>,
}

impl TreeStorage {
    fn build(notebook: &dyn Notebook) -> Self {
        let mut storage = Self::default();
        let mut pending: Vec<(Option<usize>, PageRecord)> = notebook
            .children(None)
            .into_iter()
            .rev()
            .map(|record| (None, record))
            .collect();

        while let Some((parent, record)) = pending.pop() {
            if storage.by_page.contains_key(&record.id) {
                tracing::warn!(target: targets::MODEL, page = %record.id, "page listed twice, skipping");
                continue;
            }
            let index = storage.nodes.len();
            let siblings = match parent {
                Some(parent) => &mut storage.nodes[parent].children,
                None => &mut storage.roots,
            };
            let row = siblings.len();
            siblings.push(index);

            if record.has_children {
                pending.extend(
                    notebook
                        .children(Some(&record.id))
                        .into_iter()
                        .rev()
                        .map(|child| (Some(index), child)),
                );
            }
            storage.by_page.insert(record.id.clone(), index);
            storage.nodes.push(Node {
                record,
                parent,
                row,
                children: Vec::new(),
            });
        }
        storage
    }

    fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*self.roots.get(first)?)?;
        for &row in rest {
            node = self.nodes.get(*node.children.get(row)?)?;
        }
        Some(node)
    }

    fn path_of(&self, page: &PageId) -> Option<TreePath> {
        let mut index = *self.by_page.get(page)?;
        let mut path = Vec::new();
        loop {
            let node = &self.nodes[index];
            path.push(node.row);
            match node.parent {
                Some(parent) => index = parent,
                None => break,
            }
        }
        path.reverse();
        Some(path)
    }
}

/// Mirrors the host's page hierarchy and resolves each row's presentation.
///
/// Rows are resolved lazily through the [`ResolutionCache`]. Tag and icon
/// changes invalidate single rows; a structural change (unknown page
/// changed, known page deleted) or a finished reindex rebuilds the tree.
pub struct PageTreeModel {
    notebook: Arc<dyn Notebook>,
    registry: Arc<IconRegistry>,
    store: Option<Arc<IconIndexStore>>,
    prefs: RwLock<TagIconMap>,
    show_tags: AtomicBool,
    cache: ResolutionCache,
    storage: RwLock<TreeStorage>,
    signals: TreeSignals,
    subscriptions: Mutex<Subscriptions>,
}

impl PageTreeModel {
    /// Build the tree. `store` is `None` when shortcode indexing is off.
    pub fn new(
        notebook: Arc<dyn Notebook>,
        registry: Arc<IconRegistry>,
        store: Option<Arc<IconIndexStore>>,
        prefs: TagIconMap,
        show_tags: bool,
        event_loop: EventLoop,
    ) -> Arc<Self> {
        let storage = TreeStorage::build(notebook.as_ref());
        Arc::new(Self {
            notebook,
            registry,
            store,
            prefs: RwLock::new(prefs),
            show_tags: AtomicBool::new(show_tags),
            cache: ResolutionCache::new(event_loop),
            storage: RwLock::new(storage),
            signals: TreeSignals::new(),
            subscriptions: Mutex::new(Subscriptions::new()),
        })
    }

    /// Follow host and store notifications until [`disconnect`](Self::disconnect).
    pub fn connect(self: &Arc<Self>, events: &HostEvents) {
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.release();

        let weak = Arc::downgrade(self);
        let on_tag = move |event: &TagEvent| {
            with_model(&weak, |model| model.update_page(&event.page))
        };
        subscriptions.push(events.tag_added.connect_scoped(on_tag.clone()));
        subscriptions.push(events.tag_removed.connect_scoped(on_tag));

        if let Some(store) = &self.store {
            let weak = Arc::downgrade(self);
            subscriptions.push(store.changed().connect_scoped(move |page: &PageId| {
                with_model(&weak, |model| model.update_page(page))
            }));
        }

        let weak = Arc::downgrade(self);
        subscriptions.push(events.page_changed.connect_scoped(move |change: &PageChange| {
            with_model(&weak, |model| {
                if !model.contains(&change.page) {
                    model.reload();
                }
            })
        }));
        let weak = Arc::downgrade(self);
        subscriptions.push(events.page_deleted.connect_scoped(move |page: &PageId| {
            with_model(&weak, |model| {
                if model.contains(page) {
                    model.reload();
                }
            })
        }));

        let weak = Arc::downgrade(self);
        subscriptions.push(events.reindex_started.connect_scoped(move |_: &()| {
            with_model(&weak, |model| model.cache.invalidate_all())
        }));
        let weak = Arc::downgrade(self);
        subscriptions.push(
            events
                .reindex_finished
                .connect_scoped(move |_: &()| with_model(&weak, |model| model.reload())),
        );

        tracing::debug!(target: targets::MODEL, subscriptions = subscriptions.len(), "page tree connected");
    }

    /// Stop following notifications.
    pub fn disconnect(&self) {
        self.subscriptions.lock().release();
    }

    /// Rebuild the whole tree from the host and drop every cached row.
    pub fn reload(&self) {
        let _span = PerfSpan::new("page_tree_reload");
        let storage = TreeStorage::build(self.notebook.as_ref());
        let count = storage.nodes.len();
        *self.storage.write() = storage;
        self.cache.invalidate_all();
        tracing::debug!(target: targets::MODEL, pages = count, "page tree rebuilt");
        self.signals.model_reset.emit(());
    }

    /// Forget the cached row of `page` and tell views to redraw it.
    pub fn update_page(&self, page: &PageId) {
        self.cache.invalidate(page);
        if self.contains(page) {
            self.signals.row_changed.emit(page.clone());
        }
    }

    /// Whether `page` has a row.
    pub fn contains(&self, page: &PageId) -> bool {
        self.storage.read().by_page.contains_key(page)
    }

    /// Number of rows in the whole tree.
    pub fn len(&self) -> usize {
        self.storage.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The host record of the row showing `page`.
    pub fn record(&self, page: &PageId) -> Option<PageRecord> {
        let storage = self.storage.read();
        let index = *storage.by_page.get(page)?;
        Some(storage.nodes[index].record.clone())
    }

    /// Tags of `page`, straight from the host.
    pub fn tags(&self, page: &PageId) -> Vec<String> {
        self.notebook.tags_for_page(page)
    }

    pub fn show_tags(&self) -> bool {
        self.show_tags.load(Ordering::SeqCst)
    }

    /// Show or hide tags in row labels. Every row is redrawn.
    pub fn set_show_tags(&self, show: bool) {
        if self.show_tags.swap(show, Ordering::SeqCst) != show {
            self.cache.invalidate_all();
            self.signals.model_reset.emit(());
        }
    }

    /// Replace the tag → icon preferences. Every row is redrawn.
    pub fn set_prefs(&self, prefs: TagIconMap) {
        *self.prefs.write() = prefs;
        self.cache.invalidate_all();
        self.signals.model_reset.emit(());
    }

    pub fn registry(&self) -> &Arc<IconRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    fn resolve_row(&self, page: &PageId) -> Option<resolve::Resolution> {
        if let Some(hit) = self.cache.get(page) {
            return Some(hit);
        }

        let record = self.record(page).or_else(|| self.notebook.page(page))?;
        let tags = self.notebook.tags_for_page(page);
        let stored = self.store.as_ref().and_then(|store| store.icon_for(page));
        let facts = PageFacts {
            basename: &record.basename,
            has_children: record.has_children,
            tags: &tags,
            stored_icon: stored.as_deref(),
        };
        let resolution =
            resolve::resolve(&facts, &self.prefs.read(), &self.registry, self.show_tags());
        self.cache.put(page.clone(), resolution.clone());
        Some(resolution)
    }
}

fn with_model(weak: &Weak<PageTreeModel>, f: impl FnOnce(&PageTreeModel)) {
    if let Some(model) = weak.upgrade() {
        f(&model);
    }
}

impl PageTree for PageTreeModel {
    fn tree_path(&self, page: &PageId) -> Option<TreePath> {
        self.storage.read().path_of(page)
    }

    fn page_at(&self, path: &[usize]) -> Option<PageId> {
        self.storage
            .read()
            .node_at(path)
            .map(|node| node.record.id.clone())
    }

    fn child_count(&self, path: &[usize]) -> usize {
        let storage = self.storage.read();
        if path.is_empty() {
            return storage.roots.len();
        }
        storage.node_at(path).map_or(0, |node| node.children.len())
    }

    fn row_display(&self, page: &PageId) -> Option<RowDisplay> {
        let resolution = self.resolve_row(page)?;
        let icon = self.registry.lookup(&resolution.icon).clone();
        Some(RowDisplay::new(resolution, icon))
    }

    fn parent_of(&self, page: &PageId) -> Option<PageId> {
        match self.record(page) {
            Some(record) => record.parent,
            None => self.notebook.page(page)?.parent,
        }
    }

    fn signals(&self) -> &TreeSignals {
        &self.signals
    }
}

impl Drop for PageTreeModel {
    fn drop(&mut self) {
        self.subscriptions.get_mut().release();
    }
}

impl std::fmt::Debug for PageTreeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTreeModel")
            .field("rows", &self.len())
            .field("indexed", &self.store.is_some())
            .field("show_tags", &self.show_tags())
            .finish()
    }
}
