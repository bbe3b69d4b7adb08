//! In-memory host for unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::host::Notebook;
use crate::page::{PageId, PageRecord};

/// Pages named `A:B:C`, each with a tag list.
#[derive(Default)]
pub(crate) struct MemoryNotebook {
    pages: Mutex<BTreeMap<String, Vec<String>>>,
    pub(crate) reindex_requests: AtomicUsize,
    /// Calls to `children(None)`, i.e. full tree walks.
    pub(crate) tree_walks: AtomicUsize,
}

impl MemoryNotebook {
    /// `(name, "tag1 tag2")` pairs.
    pub(crate) fn with_pages(pages: &[(&str, &str)]) -> Self {
        let notebook = Self::default();
        for (name, tags) in pages {
            notebook.add_page(name, tags);
        }
        notebook
    }

    /// Add or replace a page; `tags` is space-separated.
    pub(crate) fn add_page(&self, name: &str, tags: &str) {
        self.pages.lock().insert(
            name.to_string(),
            tags.split_whitespace().map(str::to_string).collect(),
        );
    }

    pub(crate) fn remove_page(&self, name: &str) {
        self.pages.lock().remove(name);
    }

    pub(crate) fn set_tags(&self, name: &str, tags: &str) {
        self.add_page(name, tags);
    }

    fn record(pages: &BTreeMap<String, Vec<String>>, name: &str) -> PageRecord {
        let prefix = format!("{name}:");
        let has_children = pages.keys().any(|other| other.starts_with(&prefix));
        let (parent, basename) = match name.rsplit_once(':') {
            Some((parent, basename)) => (Some(PageId::from(parent)), basename),
            None => (None, name),
        };
        PageRecord::new(name, basename, has_children, parent)
    }
}

impl Notebook for MemoryNotebook {
    fn page(&self, page: &PageId) -> Option<PageRecord> {
        let pages = self.pages.lock();
        pages
            .contains_key(page.as_str())
            .then(|| Self::record(&pages, page.as_str()))
    }

    fn children(&self, parent: Option<&PageId>) -> Vec<PageRecord> {
        if parent.is_none() {
            self.tree_walks.fetch_add(1, Ordering::SeqCst);
        }
        let pages = self.pages.lock();
        pages
            .keys()
            .filter(|name| {
                let own_parent = name.rsplit_once(':').map(|(p, _)| p);
                own_parent == parent.map(PageId::as_str)
            })
            .map(|name| Self::record(&pages, name))
            .collect()
    }

    fn tags_for_page(&self, page: &PageId) -> Vec<String> {
        self.pages.lock().get(page.as_str()).cloned().unwrap_or_default()
    }

    fn all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.pages.lock().values().flatten().cloned().collect();
        tags.sort();
        tags.dedup();
        tags
    }

    fn pages_for_tag(&self, tag: &str) -> Vec<PageId> {
        self.pages
            .lock()
            .iter()
            .filter(|(_, tags)| tags.iter().any(|t| t == tag))
            .map(|(name, _)| PageId::from(name.as_str()))
            .collect()
    }

    fn request_reindex(&self) {
        self.reindex_requests.fetch_add(1, Ordering::SeqCst);
    }
}
