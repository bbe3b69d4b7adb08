//! Selection and expansion state of the page pane.

use std::collections::BTreeSet;

use super::traits::{Located, PageTree, TreePath};
use crate::page::PageId;
use crate::settings::OpenPagesMode;

/// What the pane shows as expanded and selected.
///
/// State is kept by page, not by path, so it survives tree rebuilds and
/// switching between the full and the filtered tree.
#[derive(Debug, Clone, Default)]
pub struct PaneView {
    mode: OpenPagesMode,
    expanded: BTreeSet<PageId>,
    selected: Option<PageId>,
}

impl PaneView {
    pub fn new(mode: OpenPagesMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> OpenPagesMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OpenPagesMode) {
        self.mode = mode;
    }

    pub fn selected(&self) -> Option<&PageId> {
        self.selected.as_ref()
    }

    pub fn is_expanded(&self, page: &PageId) -> bool {
        self.expanded.contains(page)
    }

    pub fn expand(&mut self, page: PageId) {
        self.expanded.insert(page);
    }

    pub fn collapse(&mut self, page: &PageId) {
        self.expanded.remove(page);
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Paths of the expanded rows that exist in `tree`, in tree order.
    pub fn expanded_paths(&self, tree: &dyn PageTree) -> Vec<TreePath> {
        let mut paths: Vec<TreePath> = self
            .expanded
            .iter()
            .filter_map(|page| tree.tree_path(page))
            .collect();
        paths.sort();
        paths
    }

    /// Path of the selected row in `tree`, if it is shown.
    pub fn selected_path(&self, tree: &dyn PageTree) -> Option<TreePath> {
        self.selected.as_ref().and_then(|page| tree.tree_path(page))
    }

    /// React to the host opening `page`. Returns the path to select.
    ///
    /// A page the tree does not show is not selected; its nearest shown
    /// ancestor is expanded instead, unless the mode forbids expanding.
    pub fn open_page(&mut self, tree: &dyn PageTree, page: &PageId) -> Option<TreePath> {
        if self.mode == OpenPagesMode::Collapse {
            self.expanded.clear();
        }
        let may_expand = self.mode != OpenPagesMode::Disable;

        match tree.locate(page) {
            Located::Row(path) => {
                if may_expand {
                    self.expand_prefixes(tree, &path[..path.len() - 1]);
                }
                self.selected = Some(page.clone());
                Some(path)
            }
            Located::Ancestor(path) => {
                if may_expand {
                    self.expand_prefixes(tree, &path);
                }
                self.selected = None;
                None
            }
            Located::Hidden => {
                self.selected = None;
                None
            }
        }
    }

    fn expand_prefixes(&mut self, tree: &dyn PageTree, path: &[usize]) {
        for len in 1..=path.len() {
            if let Some(page) = tree.page_at(&path[..len]) {
                self.expanded.insert(page);
            }
        }
    }
}
