//! Page identity and the facts the host knows about a page.

use std::fmt;

/// Stable identity of a notebook page: its full host page name.
///
/// A renamed page is a different page; the host reports a rename as a
/// delete of the old name plus a change of the new one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(String);

impl PageId {
    /// Wrap a host page name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The host page name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PageId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// What the host's page index says about one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// The page.
    pub id: PageId,
    /// Last segment of the page name, shown in the tree.
    pub basename: String,
    /// Whether the page has sub-pages.
    pub has_children: bool,
    /// The parent page, `None` for top-level pages.
    pub parent: Option<PageId>,
}

impl PageRecord {
    /// Build a record; `parent` is `None` for a top-level page.
    pub fn new(
        id: impl Into<PageId>,
        basename: impl Into<String>,
        has_children: bool,
        parent: Option<PageId>,
    ) -> Self {
        Self {
            id: id.into(),
            basename: basename.into(),
            has_children,
            parent,
        }
    }
}
