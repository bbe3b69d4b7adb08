//! Page tree presentation.
//!
//! - [`PageTreeModel`]: the full page hierarchy with resolved icons.
//! - [`TaggedFilter`]: the same tree restricted to tagged pages and parents.
//! - [`PaneView`]: selection and expansion state of the pane.
//!
//! Both trees implement [`PageTree`], so the view works on either.

mod filter;
mod page_tree;
mod traits;
mod view;

pub use filter::{TaggedFilter, VisibleFn, has_children_or_tags};
pub use page_tree::PageTreeModel;
pub use traits::{Located, PageTree, RowDisplay, TreePath, TreeSignals};
pub use view::PaneView;
