//! The page tree interface shared by the model and its filter.

use std::sync::Arc;

use icontags_core::Signal;

use crate::icons::IconHandle;
use crate::page::PageId;
use crate::resolve::Resolution;

/// Position of a row: child indices from the top level down.
pub type TreePath = Vec<usize>;

/// What a view needs to draw a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDisplay {
    /// Label, with tags when enabled.
    pub name: String,
    /// Markup-escaped tooltip.
    pub tooltip: String,
    /// Registry name of the icon.
    pub icon_name: String,
    /// The icon itself.
    pub icon: IconHandle,
}

impl RowDisplay {
    pub(crate) fn new(resolution: Resolution, icon: IconHandle) -> Self {
        Self {
            name: resolution.name,
            tooltip: resolution.tooltip,
            icon_name: resolution.icon,
            icon,
        }
    }
}

/// Signals every page tree emits.
#[derive(Default)]
pub struct TreeSignals {
    /// A row must be redrawn.
    pub row_changed: Arc<Signal<PageId>>,
    /// The whole tree was rebuilt; paths held by views are stale.
    pub model_reset: Arc<Signal<()>>,
}

impl TreeSignals {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Where an opened page can be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// The page has a row at this path.
    Row(TreePath),
    /// The page is hidden; this is the path of its nearest visible ancestor.
    Ancestor(TreePath),
    /// Neither the page nor any ancestor has a row.
    Hidden,
}

/// A hierarchical view of notebook pages.
pub trait PageTree: Send + Sync {
    /// Path of the row showing `page`.
    fn tree_path(&self, page: &PageId) -> Option<TreePath>;

    /// Page shown at `path`.
    fn page_at(&self, path: &[usize]) -> Option<PageId>;

    /// Number of children under `path` (top-level rows for an empty path).
    fn child_count(&self, path: &[usize]) -> usize;

    /// Label, tooltip and icon of the row showing `page`.
    fn row_display(&self, page: &PageId) -> Option<RowDisplay>;

    /// The parent of `page`, whether or not it is shown.
    fn parent_of(&self, page: &PageId) -> Option<PageId>;

    fn signals(&self) -> &TreeSignals;

    /// The row of `page`, or of its nearest shown ancestor.
    fn locate(&self, page: &PageId) -> Located {
        if let Some(path) = self.tree_path(page) {
            return Located::Row(path);
        }
        let mut current = self.parent_of(page);
        while let Some(ancestor) = current {
            if let Some(path) = self.tree_path(&ancestor) {
                return Located::Ancestor(path);
            }
            current = self.parent_of(&ancestor);
        }
        Located::Hidden
    }

    /// Every path in the tree, parents before children.
    fn all_paths(&self) -> Vec<TreePath> {
        let mut paths = Vec::new();
        let mut stack: Vec<TreePath> = (0..self.child_count(&[]))
            .rev()
            .map(|row| vec![row])
            .collect();
        while let Some(path) = stack.pop() {
            for row in (0..self.child_count(&path)).rev() {
                let mut child = path.clone();
                child.push(row);
                stack.push(child);
            }
            paths.push(path);
        }
        paths
    }
}
