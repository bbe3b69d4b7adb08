//! Prelude module for IconTags.
//!
//! ```ignore
//! use icontags::prelude::*;
//! ```

// ============================================================================
// Plugin
// ============================================================================

pub use crate::plugin::{IconTagsPlugin, PluginHost};
pub use crate::tags_manager::{ManagerView, PageRow, TagRow, TagsManager};

// ============================================================================
// Host
// ============================================================================

pub use crate::host::{HostEvents, Notebook, PageChange, TagEvent};
pub use crate::index::{HostDatabase, IconIndexStore};
pub use crate::page::{PageId, PageRecord};

// ============================================================================
// Icons and resolution
// ============================================================================

pub use crate::icons::{IconHandle, IconImage, IconRegistry, StockIcon};
pub use crate::resolve::Resolution;

// ============================================================================
// Tree
// ============================================================================

pub use crate::model::{PageTree, PageTreeModel, PaneView, RowDisplay, TaggedFilter, TreePath};

// ============================================================================
// Settings
// ============================================================================

pub use crate::settings::{OpenPagesMode, PluginPreferences, TagIconMap, UiState};

pub use icontags_core::EventLoop;
