//! Tagged-only view of the page tree.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use icontags_core::Subscriptions;
use icontags_core::logging::targets;
use parking_lot::{Mutex, RwLock};

use super::page_tree::PageTreeModel;
use super::traits::{PageTree, RowDisplay, TreePath, TreeSignals};
use crate::page::{PageId, PageRecord};

/// Decides whether a source row is shown, given its record and tags.
pub type VisibleFn = Arc<dyn Fn(&PageRecord, &[String]) -> bool + Send + Sync>;

/// Shows a page when it has sub-pages or at least one tag.
pub fn has_children_or_tags(record: &PageRecord, tags: &[String]) -> bool {
    record.has_children || !tags.is_empty()
}

#[derive(Default)]
struct FilterMapping {
    proxy_to_source: HashMap<TreePath, TreePath>,
    source_to_proxy: HashMap<TreePath, TreePath>,
    child_counts: HashMap<TreePath, usize>,
    visible: HashMap<PageId, TreePath>,
}

impl FilterMapping {
    fn build(source: &PageTreeModel, visible: &VisibleFn) -> Self {
        let mut mapping = Self::default();
        mapping.add_children(source, visible, &[], &[]);
        mapping
    }

    fn add_children(
        &mut self,
        source: &PageTreeModel,
        visible: &VisibleFn,
        source_parent: &[usize],
        proxy_parent: &[usize],
    ) {
        let mut proxy_row = 0;
        for source_row in 0..source.child_count(source_parent) {
            let mut source_path = source_parent.to_vec();
            source_path.push(source_row);

            let Some(page) = source.page_at(&source_path) else {
                continue;
            };
            let Some(record) = source.record(&page) else {
                continue;
            };
            if !visible(&record, &source.tags(&page)) {
                continue;
            }

            let mut proxy_path = proxy_parent.to_vec();
            proxy_path.push(proxy_row);
            proxy_row += 1;

            self.add_children(source, visible, &source_path, &proxy_path);
            self.visible.insert(page, proxy_path.clone());
            self.source_to_proxy.insert(source_path.clone(), proxy_path.clone());
            self.proxy_to_source.insert(proxy_path, source_path);
        }
        self.child_counts.insert(proxy_parent.to_vec(), proxy_row);
    }
}

/// Composition wrapper that hides rows of a [`PageTreeModel`].
///
/// Children of a hidden row are hidden too. The mapping is rebuilt when the
/// source resets, and when a changed row flips visibility.
pub struct TaggedFilter {
    source: Arc<PageTreeModel>,
    visible: VisibleFn,
    mapping: RwLock<FilterMapping>,
    signals: TreeSignals,
    subscriptions: Mutex<Subscriptions>,
}

impl TaggedFilter {
    /// Filter `source` with [`has_children_or_tags`].
    pub fn new(source: Arc<PageTreeModel>) -> Arc<Self> {
        Self::with_predicate(source, Arc::new(has_children_or_tags))
    }

    /// Filter `source` with a custom predicate.
    pub fn with_predicate(source: Arc<PageTreeModel>, visible: VisibleFn) -> Arc<Self> {
        let mapping = FilterMapping::build(&source, &visible);
        let filter = Arc::new(Self {
            source,
            visible,
            mapping: RwLock::new(mapping),
            signals: TreeSignals::new(),
            subscriptions: Mutex::new(Subscriptions::new()),
        });
        filter.follow_source();
        filter
    }

    fn follow_source(self: &Arc<Self>) {
        let mut subscriptions = self.subscriptions.lock();

        let weak = Arc::downgrade(self);
        subscriptions.push(
            self.source
                .signals()
                .model_reset
                .connect_scoped(move |_: &()| with_filter(&weak, |filter| filter.refilter())),
        );

        let weak = Arc::downgrade(self);
        subscriptions.push(self.source.signals().row_changed.connect_scoped(move |page: &PageId| {
            with_filter(&weak, |filter| filter.source_row_changed(page))
        }));
    }

    /// The wrapped model.
    pub fn source(&self) -> &Arc<PageTreeModel> {
        &self.source
    }

    /// Recompute which rows are shown.
    pub fn refilter(&self) {
        let mapping = FilterMapping::build(&self.source, &self.visible);
        let count = mapping.visible.len();
        *self.mapping.write() = mapping;
        tracing::trace!(target: targets::MODEL, visible = count, "filter rebuilt");
        self.signals.model_reset.emit(());
    }

    fn source_row_changed(&self, page: &PageId) {
        let was_visible = self.mapping.read().visible.contains_key(page);
        let is_visible = self
            .source
            .record(page)
            .is_some_and(|record| (self.visible)(&record, &self.source.tags(page)));

        if was_visible != is_visible {
            self.refilter();
        } else if is_visible {
            self.signals.row_changed.emit(page.clone());
        }
    }

    /// Source path of the row at `proxy_path`.
    pub fn map_to_source(&self, proxy_path: &[usize]) -> Option<TreePath> {
        self.mapping.read().proxy_to_source.get(proxy_path).cloned()
    }

    /// Filtered path of the source row at `source_path`, if it is shown.
    pub fn map_from_source(&self, source_path: &[usize]) -> Option<TreePath> {
        self.mapping.read().source_to_proxy.get(source_path).cloned()
    }

    /// Number of shown rows.
    pub fn len(&self) -> usize {
        self.mapping.read().visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn with_filter(weak: &Weak<TaggedFilter>, f: impl FnOnce(&TaggedFilter)) {
    if let Some(filter) = weak.upgrade() {
        f(&filter);
    }
}

impl PageTree for TaggedFilter {
    fn tree_path(&self, page: &PageId) -> Option<TreePath> {
        self.mapping.read().visible.get(page).cloned()
    }

    fn page_at(&self, path: &[usize]) -> Option<PageId> {
        let source_path = self.map_to_source(path)?;
        self.source.page_at(&source_path)
    }

    fn child_count(&self, path: &[usize]) -> usize {
        self.mapping
            .read()
            .child_counts
            .get(path)
            .copied()
            .unwrap_or_default()
    }

    fn row_display(&self, page: &PageId) -> Option<RowDisplay> {
        self.source.row_display(page)
    }

    fn parent_of(&self, page: &PageId) -> Option<PageId> {
        self.source.parent_of(page)
    }

    fn signals(&self) -> &TreeSignals {
        &self.signals
    }
}

impl Drop for TaggedFilter {
    fn drop(&mut self) {
        self.subscriptions.get_mut().release();
    }
}

impl std::fmt::Debug for TaggedFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedFilter")
            .field("visible", &self.len())
            .field("source_rows", &self.source.len())
            .finish()
    }
}
