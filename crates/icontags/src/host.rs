//! The seams between IconTags and the notebook application hosting it.
//!
//! The host owns pages, tags, the database and the widgets. IconTags sees
//! the page data through [`Notebook`] and learns about edits through the
//! signals in [`HostEvents`].

use std::sync::Arc;

use icontags_core::Signal;

use crate::page::{PageId, PageRecord};
use crate::shortcode::Token;

/// Read access to the host's page and tag index.
///
/// Implementations must be cheap to call repeatedly; the tree asks for tags
/// whenever it renders a row that is not cached.
pub trait Notebook: Send + Sync {
    /// The record for `page`, if the page exists.
    fn page(&self, page: &PageId) -> Option<PageRecord>;

    /// Direct children of `parent` (top-level pages for `None`), in display order.
    fn children(&self, parent: Option<&PageId>) -> Vec<PageRecord>;

    /// Tag names of `page`, without the leading `@`.
    fn tags_for_page(&self, page: &PageId) -> Vec<String>;

    /// Every tag in the notebook.
    fn all_tags(&self) -> Vec<String>;

    /// Pages carrying `tag`.
    fn pages_for_tag(&self, tag: &str) -> Vec<PageId>;

    /// Ask the host to re-parse every page and emit `page_changed` for each.
    fn request_reindex(&self);
}

/// A page's content was (re)indexed.
#[derive(Debug, Clone)]
pub struct PageChange {
    pub page: PageId,
    /// The page's parsed inline content.
    pub content: Arc<[Token]>,
}

impl PageChange {
    pub fn new(page: impl Into<PageId>, content: impl Into<Arc<[Token]>>) -> Self {
        Self {
            page: page.into(),
            content: content.into(),
        }
    }
}

/// A tag was added to or removed from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent {
    pub tag: String,
    pub page: PageId,
}

impl TagEvent {
    pub fn new(tag: impl Into<String>, page: impl Into<PageId>) -> Self {
        Self {
            tag: tag.into(),
            page: page.into(),
        }
    }
}

/// Notifications the host emits.
///
/// Cloning shares the same signals.
#[derive(Clone, Default)]
pub struct HostEvents {
    /// A page was parsed; carries its content.
    pub page_changed: Arc<Signal<PageChange>>,
    /// A page was removed from the index.
    pub page_deleted: Arc<Signal<PageId>>,
    /// A page gained a tag.
    pub tag_added: Arc<Signal<TagEvent>>,
    /// A page lost a tag.
    pub tag_removed: Arc<Signal<TagEvent>>,
    /// A tag appeared in the notebook for the first time.
    pub tag_created: Arc<Signal<String>>,
    /// The last page carrying a tag lost it.
    pub tag_deleted: Arc<Signal<String>>,
    /// A full reindex is starting.
    pub reindex_started: Arc<Signal<()>>,
    /// A full reindex finished.
    pub reindex_finished: Arc<Signal<()>>,
}

impl HostEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total live subscriptions across every signal.
    pub fn connection_count(&self) -> usize {
        self.page_changed.connection_count()
            + self.page_deleted.connection_count()
            + self.tag_added.connection_count()
            + self.tag_removed.connection_count()
            + self.tag_created.connection_count()
            + self.tag_deleted.connection_count()
            + self.reindex_started.connection_count()
            + self.reindex_finished.connection_count()
    }
}

impl std::fmt::Debug for HostEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEvents")
            .field("connections", &self.connection_count())
            .finish()
    }
}
